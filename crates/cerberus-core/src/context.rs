//! Request identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlates one request across logs and the response.
///
/// Generated IDs are UUID v7, so they sort by creation time. IDs arriving in
/// `x-request-id` are accepted as long as they are any UUID.
///
/// # Example
///
/// ```
/// use cerberus_core::RequestId;
///
/// let id = RequestId::new();
/// let parsed = RequestId::parse(&id.to_string()).unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh time-ordered ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a request ID propagated by a client or upstream proxy.
    ///
    /// Returns `None` if the value is not a UUID.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// The wrapped UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_differ() {
        let first = RequestId::new();
        let second = RequestId::new();
        assert_ne!(first, second);
        assert_eq!(first.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_request_id_parse_rejects_garbage() {
        assert!(RequestId::parse("not-a-uuid").is_none());
        assert!(RequestId::parse("").is_none());
    }

    #[test]
    fn test_request_id_parse_trims() {
        let id = RequestId::new();
        let padded = format!("  {id} ");
        assert_eq!(RequestId::parse(&padded), Some(id));
    }

    #[test]
    fn test_serializes_as_bare_string() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    proptest::proptest! {
        #[test]
        fn prop_display_parse_roundtrip(bytes in proptest::prelude::any::<[u8; 16]>()) {
            let id = RequestId::from(Uuid::from_bytes(bytes));
            proptest::prop_assert_eq!(RequestId::parse(&id.to_string()), Some(id));
        }
    }
}
