//! LogSubscriber - logs shipment summaries via tracing

use async_trait::async_trait;
use contracts::{DataSubscriber, Package, ShipperError};
use tracing::{info, instrument};

/// Subscriber that logs shipment summaries for debugging
pub struct LogSubscriber {
    name: String,
}

impl LogSubscriber {
    /// Create a new LogSubscriber with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogSubscriber {
    fn default() -> Self {
        Self::new("log")
    }
}

#[async_trait]
impl DataSubscriber for LogSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_subscriber_ship",
        skip(self, packages),
        fields(subscriber = %self.name, packages = packages.len())
    )]
    async fn ship(&self, packages: &[Package]) -> Result<(), ShipperError> {
        let collection = packages.first().map(|p| p.collection.as_str()).unwrap_or("");
        info!(
            subscriber = %self.name,
            collection = %collection,
            packages = packages.len(),
            "shipment received"
        );
        Ok(())
    }
}
