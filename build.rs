use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const CHECKED_EXTENSIONS: &[&str] = &["rs", "yaml", "toml"];

/// Only the crate's own sources are checked.
const CHECKED_ROOTS: &[&str] = &["src", "Cargo.toml"];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/main");

    let sha = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=CONTENTGRAPH_GIT_SHA={}", sha);

    let root = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set"));
    let files = collect_files_to_check(&root);
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }

    let rust_files: Vec<&PathBuf> = files
        .iter()
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("rs"))
        .collect();

    enforce_line_limits(&root, &files);
    enforce_no_dead_code_allows(&root, &rust_files);
    enforce_no_test_skips(&root, &rust_files);
    enforce_serial_for_env_mutations(&root, &rust_files);
}

fn collect_files_to_check(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in CHECKED_ROOTS {
        let path = root.join(entry);
        if path.is_dir() {
            walk_directory(&path, &mut files);
        } else if should_check_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    files
}

fn walk_directory(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_directory(&path, files);
        } else if should_check_file(&path) {
            files.push(path);
        }
    }
}

fn should_check_file(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => CHECKED_EXTENSIONS.contains(&ext),
        None => false,
    }
}

fn relative(root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(root).unwrap_or(file).to_path_buf()
}

fn count_non_empty_lines(content: &str) -> usize {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count()
}

fn fail(title: &str, violations: &[(PathBuf, usize, String)], advice: &[&str]) -> ! {
    eprintln!("\n========================================");
    eprintln!("{}", title);
    eprintln!("========================================");
    for (path, line, message) in violations {
        eprintln!("  {}:{}", path.display(), line);
        eprintln!("    {}", message);
    }
    eprintln!("========================================");
    for line in advice {
        eprintln!("{}", line);
    }
    eprintln!();
    panic!("Build failed: {} ({} occurrence(s))", title, violations.len());
}

fn enforce_line_limits(root: &Path, files: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in files {
        match std::fs::read_to_string(file) {
            Ok(content) => {
                let line_count = count_non_empty_lines(&content);
                if line_count > MAX_LINES {
                    violations.push((
                        relative(root, file),
                        line_count,
                        format!("{} lines (exceeds by {})", line_count, line_count - MAX_LINES),
                    ));
                }
            }
            Err(e) => println!(
                "cargo:warning=Could not read file {}: {}",
                relative(root, file).display(),
                e
            ),
        }
    }

    if !violations.is_empty() {
        fail(
            &format!("FILE LINE LIMIT EXCEEDED (max {} lines)", MAX_LINES),
            &violations,
            &["Please split these files into smaller modules."],
        );
    }
}

fn enforce_no_dead_code_allows(root: &Path, rust_files: &[&PathBuf]) {
    let mut violations = Vec::new();
    for file in rust_files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if (trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow("))
                && trimmed.contains("dead_code")
            {
                violations.push((relative(root, file), line_num + 1, trimmed.to_string()));
            }
        }
    }

    if !violations.is_empty() {
        fail(
            "#[allow(dead_code)] IS NOT ALLOWED",
            &violations,
            &[
                "Delete unused code entirely.",
                "If the code is for tests, use #[cfg(test)].",
            ],
        );
    }
}

/// Finds the test functions of a file: (attribute line, fn name, body lines).
fn test_functions<'a>(lines: &[&'a str]) -> Vec<(usize, String, Vec<&'a str>)> {
    let mut tests = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed != "#[test]" && !trimmed.starts_with("#[tokio::test") {
            i += 1;
            continue;
        }
        let attribute_line = i;
        let Some(fn_line) = (i + 1..lines.len().min(i + 5)).find(|j| lines[*j].contains("fn ")) else {
            i += 1;
            continue;
        };
        let name = lines[fn_line]
            .split("fn ")
            .nth(1)
            .and_then(|rest| rest.split('(').next())
            .unwrap_or_default()
            .trim()
            .to_string();

        let mut depth = 0i32;
        let mut opened = false;
        let mut body = Vec::new();
        let mut j = fn_line;
        while j < lines.len() {
            body.push(lines[j]);
            for c in lines[j].chars() {
                if c == '{' {
                    depth += 1;
                    opened = true;
                } else if c == '}' {
                    depth -= 1;
                }
            }
            if opened && depth <= 0 {
                break;
            }
            j += 1;
        }
        // Attributes between #[test] and fn belong to the test too.
        let attributes: Vec<&str> = lines[attribute_line.saturating_sub(3)..fn_line].to_vec();
        let mut all = attributes;
        all.extend(body);
        tests.push((attribute_line + 1, name, all));
        i = j + 1;
    }
    tests
}

/// Bans tests that silently skip instead of failing.
fn enforce_no_test_skips(root: &Path, rust_files: &[&PathBuf]) {
    let skip_patterns = ["Skipping test", "skipping test", "Test skipped", "test skipped"];

    let mut violations = Vec::new();
    for file in rust_files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        for (line, name, body) in test_functions(&lines) {
            if let Some(pattern) = skip_patterns.iter().find(|p| body.iter().any(|l| l.contains(*p))) {
                violations.push((
                    relative(root, file),
                    line,
                    format!("test `{}` contains skip pattern: {}", name, pattern),
                ));
            }
        }
    }

    if !violations.is_empty() {
        fail(
            "SILENT TEST SKIPS ARE NOT ALLOWED",
            &violations,
            &["Tests must FAIL if they cannot run, not silently pass."],
        );
    }
}

/// Requires #[serial] for tests that mutate environment variables.
fn enforce_serial_for_env_mutations(root: &Path, rust_files: &[&PathBuf]) {
    let mut violations = Vec::new();
    for file in rust_files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        for (line, name, body) in test_functions(&lines) {
            let has_serial = body
                .iter()
                .any(|l| matches!(l.trim(), "#[serial]" | "#[serial_test::serial]"));
            let mutates_env = body.iter().any(|l| {
                let trimmed = l.trim();
                !trimmed.starts_with("//") && (trimmed.contains("env::set_var") || trimmed.contains("env::remove_var"))
            });
            if mutates_env && !has_serial {
                violations.push((
                    relative(root, file),
                    line,
                    format!("test `{}` mutates env without #[serial]", name),
                ));
            }
        }
    }

    if !violations.is_empty() {
        fail(
            "ENV MUTATIONS REQUIRE #[serial]",
            &violations,
            &["Add #[serial] from the serial_test crate to every test that calls set_var or remove_var."],
        );
    }
}
