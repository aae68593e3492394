//! Route provider with straight line fallback

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use super::distance::distance;
use super::position::{Coordinate, Route, RouteSource};
use crate::error::NavError;
use crate::services::{DirectionsService, RoutedPath};

pub struct RouteProvider {
    directions: Arc<dyn DirectionsService>,
    /// Meters under which the service is not consulted
    pub near_threshold: f64,
    pub timeout: Duration,
}

impl RouteProvider {
    pub fn new(directions: Arc<dyn DirectionsService>) -> Self {
        Self {
            directions,
            near_threshold: 50.0, // 50 meters
            timeout: Duration::from_secs(10),
        }
    }

    pub fn near_threshold(&mut self, meters: f64) -> &mut Self {
        self.near_threshold = meters.max(0.0);

        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;

        self
    }

    /// Routed path from `current` to `destination`, never fails: any service
    /// problem degrades to the straight line
    pub async fn get_route(&self, current: Coordinate, destination: Coordinate) -> Route {
        let straight = distance(current, destination);

        if straight < self.near_threshold {
            debug!("Destination {:.1} m away, using straight line", straight);
            return Route::straight(current, destination, straight);
        }

        let answer = match tokio::time::timeout(
            self.timeout,
            self.directions.directions(current, destination),
        )
        .await
        {
            Ok(answer) => answer,
            Err(_) => Err(NavError::RouteServiceUnavailable(format!(
                "No answer within {:?}",
                self.timeout
            ))),
        };

        match answer.and_then(|path| pinned(path, current, destination)) {
            Ok(route) => route,
            Err(e) => {
                warn!("{}, falling back to straight line", e);
                Route::straight(current, destination, straight)
            }
        }
    }
}

/// Checks the service path and pins its ends to the requested coordinates
fn pinned(path: RoutedPath, current: Coordinate, destination: Coordinate) -> Result<Route, NavError> {
    let RoutedPath {
        mut vertices,
        distance,
    } = path;

    if vertices.len() < 2 {
        return Err(NavError::RouteServiceUnavailable(format!(
            "Path with {} vertices",
            vertices.len()
        )));
    }
    if let Some(bad) = vertices.iter().find(|v| !v.is_valid()) {
        return Err(NavError::RouteServiceUnavailable(format!(
            "Path vertex out of range: {}",
            bad
        )));
    }
    if !distance.is_finite() || distance < 0.0 {
        return Err(NavError::RouteServiceUnavailable(format!(
            "Invalid path distance {}",
            distance
        )));
    }

    // services snap both ends to the road network
    let last = vertices.len() - 1;
    vertices[0] = current;
    vertices[last] = destination;

    Ok(Route {
        vertices,
        distance,
        source: RouteSource::Api,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Scripted directions service counting its calls
    pub struct FakeDirections {
        pub answer: Option<Result<RoutedPath, String>>,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
    }

    impl FakeDirections {
        pub fn answering(path: RoutedPath) -> Self {
            Self {
                answer: Some(Ok(path)),
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(reason: &str) -> Self {
            Self {
                answer: Some(Err(reason.to_string())),
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Never answers
        pub fn silent() -> Self {
            Self {
                answer: None,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DirectionsService for FakeDirections {
        async fn directions(&self, _from: Coordinate, _to: Coordinate) -> Result<RoutedPath, NavError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match &self.answer {
                Some(Ok(path)) => Ok(path.clone()),
                Some(Err(reason)) => Err(NavError::RouteServiceUnavailable(reason.clone())),
                None => std::future::pending().await,
            }
        }
    }

    pub fn path(from: Coordinate, to: Coordinate, vertices: usize, distance: f64) -> RoutedPath {
        let steps = (vertices - 1) as f64;
        let vertices = (0..vertices)
            .map(|i| {
                let t = i as f64 / steps;
                Coordinate::new(
                    from.lat + (to.lat - from.lat) * t,
                    from.lng + (to.lng - from.lng) * t,
                )
            })
            .collect();

        RoutedPath { vertices, distance }
    }

    fn kathmandu() -> (Coordinate, Coordinate) {
        (Coordinate::new(27.7172, 85.3240), Coordinate::new(27.7000, 85.3300))
    }

    #[tokio::test]
    async fn near_destination_skips_service() {
        let fake = Arc::new(FakeDirections::failing("unused"));
        let provider = RouteProvider::new(fake.clone());

        let current = Coordinate::new(27.7172, 85.3240);
        let destination = Coordinate::new(27.7174, 85.3241);
        let route = provider.get_route(current, destination).await;

        assert_eq!(RouteSource::Fallback, route.source);
        assert_eq!(vec![current, destination], route.vertices);
        assert_eq!(distance(current, destination), route.distance);
        assert!(route.distance < 50.0);
        assert_eq!(0, fake.calls());
    }

    #[tokio::test]
    async fn service_route() {
        let (current, destination) = kathmandu();
        let fake = Arc::new(FakeDirections::answering(path(current, destination, 5, 2600.0)));
        let provider = RouteProvider::new(fake.clone());

        let route = provider.get_route(current, destination).await;
        assert_eq!(RouteSource::Api, route.source);
        assert_eq!(5, route.vertices.len());
        assert_eq!(2600.0, route.distance);
        assert_eq!(1, fake.calls());

        // idempotent for the same inputs
        assert_eq!(route, provider.get_route(current, destination).await);
    }

    #[tokio::test]
    async fn ends_are_pinned() {
        let (current, destination) = kathmandu();
        let snapped = path(
            Coordinate::new(27.7171, 85.3242),
            Coordinate::new(27.7001, 85.3301),
            4,
            2500.0,
        );
        let provider = RouteProvider::new(Arc::new(FakeDirections::answering(snapped)));

        let route = provider.get_route(current, destination).await;
        assert_eq!(4, route.vertices.len());
        assert_eq!(Some(&current), route.vertices.first());
        assert_eq!(Some(&destination), route.vertices.last());
    }

    #[tokio::test]
    async fn service_failure_falls_back() {
        let (current, destination) = kathmandu();
        let provider = RouteProvider::new(Arc::new(FakeDirections::failing("HTTP 502")));

        let route = provider.get_route(current, destination).await;
        assert_eq!(RouteSource::Fallback, route.source);
        assert_eq!(vec![current, destination], route.vertices);
        assert_eq!(distance(current, destination), route.distance);
    }

    #[tokio::test]
    async fn malformed_paths_fall_back() {
        let (current, destination) = kathmandu();

        let answers = vec![
            RoutedPath {
                vertices: vec![current],
                distance: 10.0,
            },
            RoutedPath {
                vertices: vec![current, Coordinate::new(95.0, 0.0), destination],
                distance: 10.0,
            },
            path(current, destination, 3, -1.0),
            path(current, destination, 3, f64::NAN),
        ];

        for answer in answers {
            let provider = RouteProvider::new(Arc::new(FakeDirections::answering(answer)));
            let route = provider.get_route(current, destination).await;
            assert_eq!(RouteSource::Fallback, route.source);
            assert_eq!(2, route.vertices.len());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_back() {
        let (current, destination) = kathmandu();
        let mut provider = RouteProvider::new(Arc::new(FakeDirections::silent()));
        provider.timeout(Duration::from_secs(10));

        let started = tokio::time::Instant::now();
        let route = provider.get_route(current, destination).await;

        assert_eq!(RouteSource::Fallback, route.source);
        assert_eq!(distance(current, destination), route.distance);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn custom_near_threshold() {
        let (current, destination) = kathmandu();
        let fake = Arc::new(FakeDirections::failing("unused"));
        let mut provider = RouteProvider::new(fake.clone());
        provider.near_threshold(5000.0);

        let route = provider.get_route(current, destination).await;
        assert_eq!(RouteSource::Fallback, route.source);
        assert_eq!(0, fake.calls());
    }
}
