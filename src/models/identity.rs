//! Identity of a point of interest.
//!
//! An identity is `"{name}_{category}"`, where a missing category is replaced by
//! [`DEFAULT_CATEGORY`]. It is the only join key between feed records, overrides,
//! deletion markers, visited flags, checklists and must-sees, so nothing else in
//! the crate may build one by hand.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Category label used when a record carries none (or an empty one).
pub fn effective_category(category: Option<&str>) -> &str {
    match category {
        Some(value) if !value.is_empty() => value,
        _ => DEFAULT_CATEGORY,
    }
}

pub fn identity_of(name: &str, category: Option<&str>) -> Identity {
    Identity(format!("{}_{}", name, effective_category(category)))
}
