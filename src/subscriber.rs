//! Subscriber Module
//!
//! In-process fan-out of newly stored measurements.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::filter::{FilterCollection, FilterDefinition};
use crate::measurement::Measurement;

/// Something that wants to hear about new measurements
pub trait Subscriber: Send + Sync {
    fn notify(&self, name: &str, measurement: &Measurement);
}

/// Registered subscribers, notified in registration order
#[derive(Default)]
pub struct SubscriberSet {
    subscribers: RwLock<Vec<Arc<dyn Subscriber>>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.write().push(subscriber);
    }

    pub fn notify_all(&self, name: &str, measurement: &Measurement) {
        for subscriber in self.subscribers.read().iter() {
            subscriber.notify(name, measurement);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}

/// Forwards only what passes one long-lived filter
///
/// Unlike a range query, the decimation state persists across notifications.
pub struct FilteredSubscriber {
    filter: Mutex<FilterCollection>,
    inner: Arc<dyn Subscriber>,
}

impl FilteredSubscriber {
    pub fn new(definition: FilterDefinition, inner: Arc<dyn Subscriber>) -> Self {
        Self {
            filter: Mutex::new(FilterCollection::new(definition)),
            inner,
        }
    }
}

impl Subscriber for FilteredSubscriber {
    fn notify(&self, name: &str, measurement: &Measurement) {
        let passes = self.filter.lock().passes(name, measurement);
        if passes {
            self.inner.notify(name, measurement);
        }
    }
}
