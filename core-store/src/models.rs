//! Shared model types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a playable track.
///
/// The id is assigned by the remote catalog and is treated as an opaque
/// string; it is the primary key for the format store, both byte-cache tiers,
/// the resolved-URL cache and the download job index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_round_trip() {
        let id = TrackId::new("dQw4w9WgXcQ");
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
        assert_eq!(id.to_string(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_track_id_equality_and_hash() {
        use std::collections::HashMap;

        let a = TrackId::from("abc");
        let b = TrackId::from("abc".to_string());
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn test_track_id_serde_transparent() {
        let id = TrackId::new("abc123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc123\"");
    }
}
