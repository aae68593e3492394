//! Position sources API

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::LocationError;
use crate::Position;

/// Receives every fix (or failure) a source produces for one request
pub type FixSink = UnboundedSender<Result<Position, LocationError>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Options forwarded to the platform with every request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    /// Cached fixes older than this must not be reused
    pub maximum_age: Duration,
    /// Longest wait for a fix before the request counts as failed
    pub timeout: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Platform geolocation
pub trait PositionSource: Send + Sync {
    /// One shot request, at most one fix or error is sent
    fn request_position(&self, options: &PositionOptions, sink: FixSink);

    /// Continuous updates until `clear_watch`
    fn watch_position(&self, options: &PositionOptions, sink: FixSink) -> SubscriptionId;

    fn clear_watch(&self, id: SubscriptionId);
}

/// Active watch, cleared when dropped
pub struct Subscription {
    id: SubscriptionId,
    source: Arc<dyn PositionSource>,
}

impl Subscription {
    pub fn watch(
        source: Arc<dyn PositionSource>,
        options: &PositionOptions,
        sink: FixSink,
    ) -> Self {
        let id = source.watch_position(options, sink);
        debug!("Position watch {:?} acquired", id);

        Self { id, source }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("Position watch {:?} released", self.id);
        self.source.clear_watch(self.id);
    }
}

mod manual;

pub use manual::ManualSource;

#[cfg(feature = "csv")]
mod csv_file;

#[cfg(feature = "csv")]
pub use csv_file::{CsvSource, FieldsBuilder};
