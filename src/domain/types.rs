//! Strongly typed identifiers for the content graph.
//!
//! All identifiers are opaque strings. Node aggregate ids of tethered
//! descendants are derived deterministically from their parent id and path,
//! so that repeating a creation with identical inputs yields identical ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_identifier!(
    /// Identifies one content stream, i.e. one branch of history.
    ContentStreamId
);
string_identifier!(
    /// Stable identity of one logical node across variants and history.
    NodeAggregateId
);
string_identifier!(WorkspaceName);
string_identifier!(NodeTypeName);
string_identifier!(
    /// Name of a node below its parent. Tethered children are addressed by name.
    NodeName
);
string_identifier!(PropertyName);
string_identifier!(ReferenceName);
string_identifier!(UserId);

impl ContentStreamId {
    pub fn create() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl NodeAggregateId {
    pub fn create() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Derives the id of a tethered descendant from its ancestor and path.
    pub fn derived(ancestor: &NodeAggregateId, path: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ancestor.0.as_bytes());
        hasher.update(b"/");
        hasher.update(path.as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().take(16).map(|b| format!("{:02x}", b)).collect();
        Self(hex)
    }
}

impl WorkspaceName {
    pub fn live() -> Self {
        Self::from("live")
    }
}

impl UserId {
    pub fn system() -> Self {
        Self::from("system")
    }
}

/// Classification of a node aggregate within its parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeAggregateClassification {
    #[default]
    Regular,
    Root,
    Tethered,
}

/// Node aggregate ids of tethered descendants, keyed by slash-separated path
/// relative to the aggregate being created (e.g. `main/footer`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAggregateIdsByNodePaths(BTreeMap<String, NodeAggregateId>);

impl NodeAggregateIdsByNodePaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, id: NodeAggregateId) -> Self {
        self.0.insert(path.to_string(), id);
        self
    }

    pub fn get(&self, path: &str) -> Option<&NodeAggregateId> {
        self.0.get(path)
    }

    pub fn insert(&mut self, path: String, id: NodeAggregateId) {
        self.0.insert(path, id);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeAggregateId)> {
        self.0.iter()
    }
}

/// UTC timestamp wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimestampUtc(pub DateTime<Utc>);

impl TimestampUtc {
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl fmt::Display for TimestampUtc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
