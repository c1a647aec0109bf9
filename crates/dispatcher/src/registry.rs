//! Subscriber registry - name resolution at startup
//!
//! Configured subscriber names resolve to implementations exactly once, at
//! startup. An unknown name is a configuration error and aborts boot; it is
//! never discovered mid-dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{DataSubscriber, ShipperError};
use tracing::info;

use crate::subscribers::LogSubscriber;

/// Resolved set of active subscribers, in configured order
pub struct SubscriberRegistry {
    subscribers: Vec<Arc<dyn DataSubscriber>>,
    by_name: HashMap<String, Arc<dyn DataSubscriber>>,
}

impl SubscriberRegistry {
    pub fn empty() -> Self {
        Self {
            subscribers: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Resolve configured names against the built-in implementations
    ///
    /// # Errors
    /// `UnknownSubscriber` for any name without an implementation.
    pub fn from_names(names: &[String]) -> Result<Self, ShipperError> {
        let mut registry = Self::empty();
        for name in names {
            match name.as_str() {
                "log" => registry.register(Arc::new(LogSubscriber::default())),
                _ => return Err(ShipperError::unknown_subscriber(name)),
            }
        }
        info!(subscribers = registry.len(), "subscriber registry resolved");
        Ok(registry)
    }

    /// Add a subscriber, keyed by its own name
    pub fn register(&mut self, subscriber: Arc<dyn DataSubscriber>) {
        self.by_name
            .insert(subscriber.name().to_string(), subscriber.clone());
        self.subscribers.push(subscriber);
    }

    /// Look one subscriber up by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn DataSubscriber>> {
        self.by_name.get(name)
    }

    /// All subscribers in registration order
    pub fn all(&self) -> &[Arc<dyn DataSubscriber>] {
        &self.subscribers
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
