use super::*;

fn configs(yaml: &str) -> Vec<ContentDimensionConfig> {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_values_are_flattened_depth_first() {
    let source = ContentDimensionSource::from_configs(&configs(
        r#"
- id: language
  values:
    - value: mul
      specializations:
        - value: en_US
          specializations:
            - value: en_GB
        - value: de
"#,
    ))
    .unwrap();

    let language = source.dimension("language").unwrap();
    let values: Vec<&str> = language.values().iter().map(|v| v.value.as_str()).collect();
    assert_eq!(values, vec!["mul", "en_US", "en_GB", "de"]);
    assert_eq!(language.value("en_GB").unwrap().depth, 2);
    assert_eq!(language.max_depth(), 2);
    assert!(language.is_generalization_or_same("mul", "en_GB"));
    assert!(!language.is_generalization_or_same("de", "en_GB"));
}

#[test]
fn test_duplicate_values_are_rejected() {
    let result = ContentDimensionSource::from_configs(&configs(
        r#"
- id: language
  values:
    - value: de
      specializations:
        - value: de
"#,
    ));
    assert!(matches!(
        result,
        Err(ContentRepositoryError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_without_dimensions_the_empty_point_is_allowed() {
    let source = ContentDimensionSource::from_configs(&[]).unwrap();
    assert_eq!(
        source.allowed_combinations(),
        vec![DimensionSpacePoint::empty()]
    );
}

#[test]
fn test_constraints_filter_combinations() {
    let source = ContentDimensionSource::from_configs(&configs(
        r#"
- id: market
  values:
    - value: eu
    - value: ch
      constraints:
        language:
          fr: false
          '*': true
- id: language
  values:
    - value: de
    - value: fr
"#,
    ))
    .unwrap();

    let combinations = source.allowed_combinations();
    assert_eq!(combinations.len(), 3);
    assert_eq!(
        combinations[0],
        DimensionSpacePoint::new([("market", "eu"), ("language", "de")])
    );
    assert!(!combinations.contains(&DimensionSpacePoint::new([
        ("market", "ch"),
        ("language", "fr")
    ])));
}
