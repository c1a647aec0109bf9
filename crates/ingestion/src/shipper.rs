//! Shipper - producer entry point over the buffer store

use std::sync::Arc;

use buffer_store::BufferStore;
use contracts::{Package, PackageMode, Payload, ShipperError};
use metrics::counter;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Changes per buffered batch; large producer calls are split so one push
/// never holds the buffer lock for an unbounded batch
const PUSH_CHUNK_SIZE: usize = 250;

/// Producer facade: validate raw changes and buffer them as packages
pub struct Shipper {
    store: Arc<BufferStore>,
}

impl Shipper {
    pub fn new(store: Arc<BufferStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<BufferStore> {
        &self.store
    }

    /// Buffer many raw changes for a collection
    ///
    /// Every change must carry a non-null value under `identifier_field`.
    /// The identifier and an optional `"mode"` field are lifted out of the
    /// payload; everything else ships as-is. Changes are buffered in chunks
    /// of 250.
    ///
    /// # Errors
    /// `Validation` when any change lacks an identifier (nothing is
    /// buffered); `CoordinationTimeout` from the underlying push.
    #[instrument(name = "shipper_push_many", skip(self, changes), fields(collection = %collection, count = changes.len()))]
    pub async fn push_many(
        &self,
        collection: &str,
        changes: Vec<Payload>,
        identifier_field: &str,
    ) -> Result<usize, ShipperError> {
        // Validate before buffering anything
        for change in &changes {
            let has_id = change
                .get(identifier_field)
                .map(|v| !v.is_null())
                .unwrap_or(false);
            if !has_id {
                return Err(ShipperError::validation("not all changes have an identifier"));
            }
        }

        let total = changes.len();
        let mut buffered = Vec::with_capacity(changes.len().min(PUSH_CHUNK_SIZE));
        for change in changes {
            buffered.push(mint_package(collection, change, identifier_field)?);
            if buffered.len() == PUSH_CHUNK_SIZE {
                self.store.push(collection, &buffered).await?;
                buffered.clear();
            }
        }
        if !buffered.is_empty() {
            self.store.push(collection, &buffered).await?;
        }

        counter!("shipper_packages_pushed", "collection" => collection.to_string())
            .increment(total as u64);
        debug!(collection = %collection, count = total, "changes buffered");
        Ok(total)
    }

    /// Buffer one manually assembled change
    #[instrument(name = "shipper_push_single", skip(self, payload), fields(collection = %collection, identifier = %identifier))]
    pub async fn push_single(
        &self,
        collection: &str,
        identifier: &str,
        payload: Payload,
        mode: PackageMode,
    ) -> Result<(), ShipperError> {
        if identifier.is_empty() {
            return Err(ShipperError::validation("change identifier must not be empty"));
        }
        let package = Package::new(identifier, payload, collection, mode);
        self.store.push(collection, &[package]).await?;
        counter!("shipper_packages_pushed", "collection" => collection.to_string()).increment(1);
        Ok(())
    }

    /// Packages belonging to the next shipment of a collection
    pub fn packages_for_shipment(&self, collection: &str) -> Result<Vec<Package>, ShipperError> {
        self.store.packages_for_shipment(collection)
    }

    /// Correlation tokens for the next shipment of a collection
    pub fn package_uuids_for_shipment(&self, collection: &str) -> Vec<Uuid> {
        self.store.package_uuids_for_shipment(collection)
    }

    /// Collections ready to dispatch now
    pub fn pending_collections(&self) -> Vec<String> {
        self.store.pending_collections()
    }
}

/// Turn one raw change into a package: lift the identifier and mode out of
/// the payload, default mode is update
fn mint_package(
    collection: &str,
    mut change: Payload,
    identifier_field: &str,
) -> Result<Package, ShipperError> {
    let id_value = change
        .remove(identifier_field)
        .ok_or_else(|| ShipperError::validation("not all changes have an identifier"))?;
    let id = match id_value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };

    let mode = match change.remove("mode") {
        Some(serde_json::Value::String(s)) => PackageMode::parse(&s)
            .ok_or_else(|| ShipperError::validation(format!("unknown package mode: {s}")))?,
        Some(other) => {
            return Err(ShipperError::validation(format!(
                "unknown package mode: {other}"
            )))
        }
        None => PackageMode::default(),
    };

    Ok(Package::new(id, change, collection, mode))
}
