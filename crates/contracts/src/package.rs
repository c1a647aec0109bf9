//! Package - the immutable unit of buffered change

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered field -> value mapping carried by a package
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Whether a package creates a new downstream document or updates one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageMode {
    Create,
    #[default]
    Update,
}

impl PackageMode {
    /// Parse a mode from its wire string, `None` for unknown values
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

/// One buffered change record.
///
/// Immutable once minted: it lives in a collection's buffer until it is
/// cleared after a successful dispatch, or snapshotted into a failed
/// shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Identifier of the originating record (opaque to the core)
    pub id: String,
    /// Correlation token used as the buffer storage key
    pub uuid: Uuid,
    /// Changed fields
    pub payload: Payload,
    /// Create or update semantics for subscribers
    pub mode: PackageMode,
    /// Owning collection name
    pub collection: String,
}

impl Package {
    /// Mint a new package with a fresh correlation token
    pub fn new(
        id: impl Into<String>,
        payload: Payload,
        collection: impl Into<String>,
        mode: PackageMode,
    ) -> Self {
        Self {
            id: id.into(),
            uuid: Uuid::new_v4(),
            payload,
            mode,
            collection: collection.into(),
        }
    }

    /// Reconstruct a package from stored fields, keeping its original token
    pub fn with_uuid(
        id: impl Into<String>,
        uuid: Uuid,
        payload: Payload,
        collection: impl Into<String>,
        mode: PackageMode,
    ) -> Self {
        Self {
            id: id.into(),
            uuid,
            payload,
            mode,
            collection: collection.into(),
        }
    }

    /// JSON-encode the payload for field storage
    pub fn pack(&self) -> Result<String, crate::ShipperError> {
        serde_json::to_string(&self.payload)
            .map_err(|e| crate::ShipperError::other(format!("payload encode error: {e}")))
    }

    /// Decode a stored payload string
    pub fn unpack(raw: &str) -> Result<Payload, crate::ShipperError> {
        serde_json::from_str(raw)
            .map_err(|e| crate::ShipperError::other(format!("payload decode error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(pairs: &[(&str, &str)]) -> Payload {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn test_new_package_gets_unique_uuid() {
        let a = Package::new("1", payload(&[("f", "x")]), "users", PackageMode::Update);
        let b = Package::new("1", payload(&[("f", "x")]), "users", PackageMode::Update);
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let p = Package::new(
            "42",
            payload(&[("name", "alice"), ("email", "a@example.com")]),
            "users",
            PackageMode::Create,
        );
        let raw = p.pack().unwrap();
        let decoded = Package::unpack(&raw).unwrap();
        assert_eq!(decoded, p.payload);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(PackageMode::parse("create"), Some(PackageMode::Create));
        assert_eq!(PackageMode::parse("update"), Some(PackageMode::Update));
        assert_eq!(PackageMode::parse("upsert"), None);
        assert_eq!(PackageMode::default(), PackageMode::Update);
    }
}
