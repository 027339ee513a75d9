//! Strongly typed identifiers for catalog entities.
//!
//! A movie has two identities: the id the Provider assigns it and the row id
//! the local store assigns it. Keeping them as distinct newtypes prevents a
//! provider id from ever being used to address a local row (and vice versa).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier assigned by the upstream metadata Provider.
///
/// # Examples
///
/// ```rust
/// use movie_nexus::domain::ProviderId;
///
/// let id: ProviderId = "603".parse().unwrap();
/// assert_eq!(id.value(), 603);
/// assert_eq!(id.to_string(), "603");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProviderId(i32);

impl ProviderId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ProviderId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl From<ProviderId> for i32 {
    fn from(id: ProviderId) -> Self {
        id.0
    }
}

impl FromStr for ProviderId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i32>().map(Self)
    }
}

/// Row identifier owned by the local store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MovieId(i32);

impl MovieId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for MovieId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl From<MovieId> for i32 {
    fn from(id: MovieId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_parses_with_whitespace() {
        let id: ProviderId = " 27205 ".parse().unwrap();
        assert_eq!(id, ProviderId::new(27205));
    }

    #[test]
    fn test_provider_id_rejects_garbage() {
        assert!("tt0133093".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&(ProviderId::new(5), MovieId::new(9))).unwrap();
        assert_eq!(json, "[5,9]");
    }
}
