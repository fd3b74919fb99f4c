//! Strongly typed identifiers shared across services.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metadata-provider id of a catalog entry.
///
/// Keeps provider ids apart from the scrape target's session strings, which
/// are the other way a document can be looked up.
///
/// # Examples
///
/// ```rust
/// use pahe_relay::domain::MalId;
///
/// let id: MalId = "52991".parse().unwrap();
/// assert_eq!(id.value(), 52991);
/// assert_eq!(id.to_string(), "52991");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MalId(i64);

impl MalId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        debug_assert!(id > 0, "MalId should be positive");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MalId> for i64 {
    fn from(id: MalId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id: {0}")]
pub struct InvalidMalId(String);

impl FromStr for MalId {
    type Err = InvalidMalId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(InvalidMalId(s.to_string())),
        }
    }
}
