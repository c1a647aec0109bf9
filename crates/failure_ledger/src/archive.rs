//! Archive store seam
//!
//! The durable archive for failed shipments. Only CRUD with parent-child
//! cascade delete is required of a backend; anything transactional fits.

use std::time::Duration;

use async_trait::async_trait;
use contracts::{ShipperError, Timestamp};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::model::FailedShipment;

/// Durable archive of failed shipments
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Persist a new failed shipment with its package snapshots
    async fn create(&self, shipment: FailedShipment) -> Result<(), ShipperError>;

    /// Shipments eligible for retry, oldest first, paginated
    ///
    /// Eligible means `retries < max_retries` and `last_retried_at` is
    /// either unset or at least `cooldown` before `now`.
    async fn due_for_retry(
        &self,
        max_retries: u32,
        cooldown: Duration,
        now: Timestamp,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<FailedShipment>, ShipperError>;

    /// Update retry bookkeeping on one shipment
    async fn mark_retried(
        &self,
        id: Uuid,
        retries: u32,
        at: Timestamp,
    ) -> Result<(), ShipperError>;

    /// Delete a shipment, cascading to its package snapshots
    async fn delete(&self, id: Uuid) -> Result<(), ShipperError>;

    /// Fetch one shipment by id
    async fn get(&self, id: Uuid) -> Result<Option<FailedShipment>, ShipperError>;

    /// Number of archived shipments
    async fn count(&self) -> Result<usize, ShipperError>;
}

/// In-memory archive, insertion-ordered
///
/// Cascade delete is structural: packages live inside their shipment.
#[derive(Default)]
pub struct MemoryArchive {
    shipments: Mutex<Vec<FailedShipment>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchive {
    async fn create(&self, shipment: FailedShipment) -> Result<(), ShipperError> {
        self.shipments.lock().push(shipment);
        Ok(())
    }

    async fn due_for_retry(
        &self,
        max_retries: u32,
        cooldown: Duration,
        now: Timestamp,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<FailedShipment>, ShipperError> {
        let shipments = self.shipments.lock();
        Ok(shipments
            .iter()
            .filter(|s| s.retries < max_retries)
            .filter(|s| match s.last_retried_at {
                None => true,
                Some(at) => now.saturating_sub(at) >= cooldown,
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_retried(
        &self,
        id: Uuid,
        retries: u32,
        at: Timestamp,
    ) -> Result<(), ShipperError> {
        let mut shipments = self.shipments.lock();
        let shipment = shipments
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ShipperError::archive(format!("failed shipment {id} not found")))?;
        shipment.retries = retries;
        shipment.last_retried_at = Some(at);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ShipperError> {
        self.shipments.lock().retain(|s| s.id != id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FailedShipment>, ShipperError> {
        Ok(self.shipments.lock().iter().find(|s| s.id == id).cloned())
    }

    async fn count(&self) -> Result<usize, ShipperError> {
        Ok(self.shipments.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FailedPackage;
    use contracts::Payload;

    fn shipment(collection: &str) -> FailedShipment {
        FailedShipment::new(
            collection,
            "search",
            vec![FailedPackage {
                model_id: "1".to_string(),
                payload: Payload::new(),
            }],
        )
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let archive = MemoryArchive::new();
        let s = shipment("users");
        let id = s.id;

        archive.create(s).await.unwrap();
        assert_eq!(archive.count().await.unwrap(), 1);
        assert!(archive.get(id).await.unwrap().is_some());

        archive.delete(id).await.unwrap();
        assert_eq!(archive.count().await.unwrap(), 0);
        assert!(archive.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_due_filters_by_retries_and_cooldown() {
        let archive = MemoryArchive::new();
        let cooldown = Duration::from_secs(900);
        let now = Timestamp(10_000_000);

        let fresh = shipment("a"); // never retried: due
        let mut cooling = shipment("b");
        cooling.retries = 1;
        cooling.last_retried_at = Some(Timestamp(10_000_000 - 1_000)); // too recent
        let mut ready = shipment("c");
        ready.retries = 2;
        ready.last_retried_at = Some(Timestamp(10_000_000 - 900_000)); // cooled down
        let mut exhausted = shipment("d");
        exhausted.retries = 3; // at cap

        for s in [fresh.clone(), cooling, ready.clone(), exhausted] {
            archive.create(s).await.unwrap();
        }

        let due = archive.due_for_retry(3, cooldown, now, 0, 100).await.unwrap();
        let ids: Vec<Uuid> = due.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![fresh.id, ready.id]);
    }

    #[tokio::test]
    async fn test_due_pagination() {
        let archive = MemoryArchive::new();
        for i in 0..5 {
            archive.create(shipment(&format!("c{i}"))).await.unwrap();
        }

        let now = Timestamp(1);
        let page1 = archive
            .due_for_retry(3, Duration::from_secs(900), now, 0, 2)
            .await
            .unwrap();
        let page2 = archive
            .due_for_retry(3, Duration::from_secs(900), now, 2, 2)
            .await
            .unwrap();
        let page3 = archive
            .due_for_retry(3, Duration::from_secs(900), now, 4, 2)
            .await
            .unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 2);
        assert_eq!(page3.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_retried() {
        let archive = MemoryArchive::new();
        let s = shipment("users");
        let id = s.id;
        archive.create(s).await.unwrap();

        archive.mark_retried(id, 2, Timestamp(42)).await.unwrap();
        let stored = archive.get(id).await.unwrap().unwrap();
        assert_eq!(stored.retries, 2);
        assert_eq!(stored.last_retried_at, Some(Timestamp(42)));
    }
}
