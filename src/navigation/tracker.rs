//! Location tracker

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use super::distance::distance;
use super::position::Position;
use crate::error::{LocationError, NavError};
use crate::sources::{PositionOptions, PositionSource, Subscription};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Tracking,
    /// Terminal
    Stopped,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TrackerEvent {
    /// Fix that moved far enough from the previous forwarded one
    Update(Position),
    Error(LocationError),
}

pub struct LocationTracker {
    source: Arc<dyn PositionSource>,
    /// Minimum movement, in meters, for a fix to be forwarded
    pub min_displacement: f64,
    pub options: PositionOptions,
    state: TrackerState,
    subscription: Option<Subscription>,
    fixes: Option<UnboundedReceiver<Result<Position, LocationError>>>,
    last_forwarded: Option<Position>,
}

impl LocationTracker {
    /// Start a new tracker instance, idle until `start`
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self {
            source,
            min_displacement: 1.0, // 1 meter
            options: PositionOptions::default(),
            state: TrackerState::Idle,
            subscription: None,
            fixes: None,
            last_forwarded: None,
        }
    }

    pub fn min_displacement(&mut self, meters: f64) -> &mut Self {
        self.min_displacement = meters.max(0.0);

        self
    }

    pub fn options(&mut self, options: PositionOptions) -> &mut Self {
        self.options = options;

        self
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackerState::Tracking
    }

    pub fn last_forwarded(&self) -> Option<&Position> {
        self.last_forwarded.as_ref()
    }

    /// Seed request plus a continuous watch on the source
    pub fn start(&mut self) -> Result<(), NavError> {
        match self.state {
            TrackerState::Tracking => return Ok(()),
            TrackerState::Stopped => {
                return Err(NavError::Tracker("Tracker already stopped".to_string()))
            }
            TrackerState::Idle => {}
        }

        let (tx, rx) = unbounded_channel();
        self.source.request_position(&self.options, tx.clone());
        self.subscription = Some(Subscription::watch(self.source.clone(), &self.options, tx));
        self.fixes = Some(rx);
        self.state = TrackerState::Tracking;

        info!(
            "Tracking started, min displacement {} m, timeout {:?}",
            self.min_displacement, self.options.timeout
        );

        Ok(())
    }

    /// Jitter filter, returns the fix when it must be forwarded
    pub fn accept(&mut self, fix: Position) -> Option<Position> {
        if !fix.coordinate.is_valid() {
            warn!("Fix dropped, coordinate out of range: {}", fix.coordinate);
            return None;
        }

        if let Some(last) = &self.last_forwarded {
            let moved = distance(last.coordinate, fix.coordinate);
            if moved < self.min_displacement {
                debug!("Fix dropped, moved only {:.2} m", moved);
                return None;
            }
        }

        self.last_forwarded = Some(fix.clone());

        Some(fix)
    }

    /// Next forwarded fix or failure, `None` once stopped
    pub async fn next_event(&mut self) -> Option<TrackerEvent> {
        loop {
            let timeout = self.options.timeout;
            let fixes = self.fixes.as_mut()?;

            let received = match tokio::time::timeout(timeout, fixes.recv()).await {
                Ok(received) => received,
                Err(_) => return Some(TrackerEvent::Error(LocationError::Timeout(timeout))),
            };

            match received {
                Some(Ok(fix)) => {
                    if let Some(position) = self.accept(fix) {
                        return Some(TrackerEvent::Update(position));
                    }
                }
                Some(Err(e)) => {
                    warn!("{}", e);
                    if e.is_fatal() {
                        self.stop();
                    }
                    return Some(TrackerEvent::Error(e));
                }
                None => {
                    info!("Position source closed");
                    self.stop();
                    return None;
                }
            }
        }
    }

    /// Callback flavour of `next_event`, returns once the tracker stops
    pub async fn run<U, E>(&mut self, mut on_update: U, mut on_error: E)
    where
        U: FnMut(Position),
        E: FnMut(LocationError),
    {
        while let Some(event) = self.next_event().await {
            match event {
                TrackerEvent::Update(position) => on_update(position),
                TrackerEvent::Error(e) => on_error(e),
            }
        }
    }

    /// Release the watch, safe to call at any time
    pub fn stop(&mut self) {
        if self.state == TrackerState::Stopped {
            return;
        }

        self.subscription.take();
        self.fixes = None;
        self.state = TrackerState::Stopped;

        info!("Tracking stopped");
    }
}
