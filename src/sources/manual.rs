//! In-memory source fed by the caller

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use time::OffsetDateTime;

use super::{FixSink, PositionOptions, PositionSource, SubscriptionId};
use crate::error::LocationError;
use crate::Position;

#[derive(Default)]
struct Inner {
    next_id: u64,
    watchers: BTreeMap<SubscriptionId, FixSink>,
    /// One shot requests waiting for the next fix
    pending: Vec<FixSink>,
    last: Option<Position>,
}

/// Source whose fixes are pushed by hand, used to replay recorded data
#[derive(Default)]
pub struct ManualSource {
    inner: Mutex<Inner>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver a fix to every pending request and active watch
    pub fn push(&self, position: Position) {
        let mut inner = self.lock();

        for sink in inner.pending.drain(..) {
            let _ = sink.send(Ok(position.clone()));
        }
        inner
            .watchers
            .retain(|_, sink| sink.send(Ok(position.clone())).is_ok());

        inner.last = Some(position);
    }

    /// Report a failure to every pending request and active watch
    pub fn fail(&self, error: LocationError) {
        let mut inner = self.lock();

        for sink in inner.pending.drain(..) {
            let _ = sink.send(Err(error.clone()));
        }
        inner
            .watchers
            .retain(|_, sink| sink.send(Err(error.clone())).is_ok());
    }

    /// Close every stream, watchers see the end of their updates
    pub fn finish(&self) {
        let mut inner = self.lock();
        inner.pending.clear();
        inner.watchers.clear();
    }

    pub fn active_watches(&self) -> usize {
        self.lock().watchers.len()
    }
}

impl PositionSource for ManualSource {
    fn request_position(&self, options: &PositionOptions, sink: FixSink) {
        let mut inner = self.lock();

        let cached = inner.last.clone().filter(|last| {
            let age = OffsetDateTime::now_utc() - last.time;
            age <= options.maximum_age
        });

        match cached {
            Some(last) => {
                let _ = sink.send(Ok(last));
            }
            None => inner.pending.push(sink),
        }
    }

    fn watch_position(&self, _options: &PositionOptions, sink: FixSink) -> SubscriptionId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.watchers.insert(id, sink);

        id
    }

    fn clear_watch(&self, id: SubscriptionId) {
        self.lock().watchers.remove(&id);
    }
}
