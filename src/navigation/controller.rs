//! Navigation session orchestration

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::{AbortHandle, JoinError, JoinSet};

use super::position::{Coordinate, Destination, Position, Route};
use super::route::RouteProvider;
use super::tracker::{LocationTracker, TrackerEvent, TrackerState};
use super::view::NavigationView;
use crate::config::NavigationConfig;
use crate::error::{ErrorKind, LocationError, NavError};
use crate::services::{DirectionsService, ReverseGeocoder};
use crate::sources::PositionSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPhase {
    Initializing,
    /// Waiting for the first fix
    Locating,
    Routing,
    Tracking,
    Stopped,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NavigationState {
    pub current_position: Option<Position>,
    pub destination: Option<Destination>,
    pub route: Option<Route>,
    pub last_error: Option<ErrorKind>,
}

/// Side effects for the rendering layer
#[derive(Clone, Debug, PartialEq)]
pub enum NavigationSignal {
    /// The map should follow the new position
    Recenter(Coordinate),
    RouteUpdated,
    Error(Option<ErrorKind>),
}

/// Inputs a route request was made for
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteTag {
    pub position: Coordinate,
    pub destination: Coordinate,
}

enum Completion {
    Route(RouteTag, Route),
    PlaceName(Coordinate, Result<String, NavError>),
}

enum Wake {
    Tracker(Option<TrackerEvent>),
    Task(Result<Completion, JoinError>),
}

pub struct NavigationController {
    tracker: LocationTracker,
    routes: Arc<RouteProvider>,
    geocoder: Arc<dyn ReverseGeocoder>,
    pub geocode_timeout: Duration,
    state: NavigationState,
    phase: NavigationPhase,
    tasks: JoinSet<Completion>,
    route_request: Option<(RouteTag, AbortHandle)>,
    geocode_request: Option<AbortHandle>,
    signals: UnboundedSender<NavigationSignal>,
}

impl NavigationController {
    pub fn new(
        tracker: LocationTracker,
        routes: RouteProvider,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> (Self, UnboundedReceiver<NavigationSignal>) {
        let (signals, rx) = unbounded_channel();

        let controller = Self {
            tracker,
            routes: Arc::new(routes),
            geocoder,
            geocode_timeout: Duration::from_secs(10),
            state: NavigationState::default(),
            phase: NavigationPhase::Initializing,
            tasks: JoinSet::new(),
            route_request: None,
            geocode_request: None,
            signals,
        };

        (controller, rx)
    }

    /// Controller with the tracker, route provider and timeouts of `config`
    pub fn from_config(
        config: &NavigationConfig,
        source: Arc<dyn PositionSource>,
        directions: Arc<dyn DirectionsService>,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> (Self, UnboundedReceiver<NavigationSignal>) {
        let mut tracker = LocationTracker::new(source);
        tracker
            .min_displacement(config.tracker.min_displacement)
            .options(config.tracker.position_options());

        let mut routes = RouteProvider::new(directions);
        routes
            .near_threshold(config.routing.near_threshold)
            .timeout(config.routing.timeout());

        let (mut controller, rx) = Self::new(tracker, routes, geocoder);
        controller.geocode_timeout = Duration::from_millis(config.geocoder.timeout_ms);

        (controller, rx)
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn phase(&self) -> NavigationPhase {
        self.phase
    }

    pub fn view(&self) -> NavigationView {
        NavigationView::build(&self.state, self.phase)
    }

    /// Begin tracking, must run inside a tokio runtime
    pub fn start(&mut self) -> Result<(), NavError> {
        if self.phase != NavigationPhase::Initializing {
            return Err(NavError::Tracker(format!(
                "Navigation can not start from {:?}",
                self.phase
            )));
        }

        self.tracker.start()?;
        self.phase = NavigationPhase::Locating;

        Ok(())
    }

    /// Replace the destination, the current route is dropped and requested
    /// again. Must run inside a tokio runtime
    pub fn set_destination(&mut self, coordinate: Coordinate) -> Result<(), NavError> {
        let coordinate = coordinate.validated()?;
        if self.phase == NavigationPhase::Stopped {
            return Err(NavError::Tracker("Navigation already stopped".to_string()));
        }

        info!("Destination set to {}", coordinate);
        self.state.destination = Some(Destination::new(coordinate));
        self.lookup_place_name(coordinate);

        if let Some((_, handle)) = self.route_request.take() {
            handle.abort();
        }
        if self.state.route.take().is_some() {
            self.emit(NavigationSignal::RouteUpdated);
        }

        self.request_route();

        Ok(())
    }

    /// Wait for the next fix or background result and apply it. Returns
    /// `false` when nothing is left to wait for.
    pub async fn process_next(&mut self) -> bool {
        if self.phase == NavigationPhase::Stopped {
            return false;
        }

        let tracking = self.tracker.is_tracking();
        let waiting = !self.tasks.is_empty();

        let wake = tokio::select! {
            Some(done) = self.tasks.join_next(), if waiting => Wake::Task(done),
            event = self.tracker.next_event(), if tracking => Wake::Tracker(event),
            else => return false,
        };

        match wake {
            Wake::Tracker(Some(TrackerEvent::Update(position))) => self.on_position(position),
            Wake::Tracker(Some(TrackerEvent::Error(e))) => self.on_location_error(e),
            Wake::Tracker(None) => debug!("Tracker finished"),
            Wake::Task(Ok(done)) => self.on_completion(done),
            Wake::Task(Err(e)) if e.is_cancelled() => {}
            Wake::Task(Err(e)) => warn!("Background task failed: {}", e),
        }

        // source closed and nothing left in flight
        if self.tracker.state() == TrackerState::Stopped && self.tasks.is_empty() {
            self.stop();
        }

        true
    }

    /// Process events until the session can not progress anymore
    pub async fn run(&mut self) {
        while self.process_next().await {}
    }

    /// End the session, results still in flight are discarded
    pub fn stop(&mut self) {
        if self.phase == NavigationPhase::Stopped {
            return;
        }

        self.tracker.stop();
        self.tasks.abort_all();
        self.route_request = None;
        self.geocode_request = None;
        self.phase = NavigationPhase::Stopped;

        info!("Navigation stopped");
    }

    fn emit(&self, signal: NavigationSignal) {
        // nobody listening is fine
        let _ = self.signals.send(signal);
    }

    fn set_error(&mut self, error: Option<ErrorKind>) {
        if self.state.last_error != error {
            self.state.last_error = error;
            self.emit(NavigationSignal::Error(error));
        }
    }

    fn live_tag(&self) -> Option<RouteTag> {
        match (&self.state.current_position, &self.state.destination) {
            (Some(position), Some(destination)) => Some(RouteTag {
                position: position.coordinate,
                destination: destination.coordinate,
            }),
            _ => None,
        }
    }

    fn on_position(&mut self, position: Position) {
        let coordinate = position.coordinate;
        self.state.current_position = Some(position);
        self.emit(NavigationSignal::Recenter(coordinate));

        if self.state.last_error == Some(ErrorKind::LocationUnavailable) {
            self.set_error(None);
        }

        if self.state.destination.is_some() {
            self.request_route();
        } else {
            self.phase = NavigationPhase::Tracking;
        }
    }

    fn on_location_error(&mut self, error: LocationError) {
        self.set_error(Some(error.kind()));

        if error.is_fatal() {
            self.stop();
        }
    }

    fn request_route(&mut self) {
        let tag = match self.live_tag() {
            Some(tag) => tag,
            None => return,
        };

        if let Some((_, handle)) = self.route_request.take() {
            debug!("Route request superseded");
            handle.abort();
        }

        let routes = self.routes.clone();
        let handle = self.tasks.spawn(async move {
            let route = routes.get_route(tag.position, tag.destination).await;
            Completion::Route(tag, route)
        });

        self.route_request = Some((tag, handle));
        self.phase = NavigationPhase::Routing;
    }

    fn lookup_place_name(&mut self, coordinate: Coordinate) {
        if let Some(handle) = self.geocode_request.take() {
            handle.abort();
        }

        let geocoder = self.geocoder.clone();
        let timeout = self.geocode_timeout;
        let handle = self.tasks.spawn(async move {
            let name = match tokio::time::timeout(timeout, geocoder.place_name(coordinate)).await {
                Ok(name) => name,
                Err(_) => Err(NavError::ReverseGeocodeFailed(format!(
                    "No answer within {:?}",
                    timeout
                ))),
            };
            Completion::PlaceName(coordinate, name)
        });

        self.geocode_request = Some(handle);
    }

    fn on_completion(&mut self, done: Completion) {
        match done {
            Completion::Route(tag, route) => {
                if self.live_tag() != Some(tag) {
                    debug!("Discarding route computed for {:?}", tag);
                    return;
                }

                if matches!(&self.route_request, Some((current, _)) if *current == tag) {
                    self.route_request = None;
                }
                self.state.route = Some(route);
                self.phase = NavigationPhase::Tracking;
                self.emit(NavigationSignal::RouteUpdated);
            }
            Completion::PlaceName(coordinate, name) => {
                let destination = match self.state.destination.as_mut() {
                    Some(d) if d.coordinate == coordinate => d,
                    _ => return,
                };

                destination.name = Some(match name {
                    Ok(name) => name,
                    Err(e) => {
                        warn!("{}, using coordinates as name", e);
                        coordinate.to_string()
                    }
                });
                self.geocode_request = None;
            }
        }
    }
}
