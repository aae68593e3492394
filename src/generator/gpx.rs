//! GPX export of a navigation session

use geo::geometry::Point;
use gpx::{Gpx, GpxVersion, Route as GpxRoute, Track, TrackSegment, Waypoint};

use crate::navigation::distance::format_distance;
use crate::{Position, Route, RouteSource};

pub struct GpxGenerator {
    pub routes: Vec<GpxRoute>,
    pub tracks: Vec<Track>,
}

impl GpxGenerator {
    pub fn empty() -> Self {
        Self {
            routes: vec![],
            tracks: vec![],
        }
    }

    /// Computed route as a `<rte>`
    pub fn route(&mut self, route: &Route, name: String) -> &mut Self {
        let mut rte: GpxRoute = Default::default();
        rte.name = Some(name);
        rte.description = Some(format_distance(route.distance));
        rte.source = Some(
            match route.source {
                RouteSource::Api => "directions service",
                RouteSource::Fallback => "straight line",
            }
            .to_string(),
        );
        rte.points = route
            .vertices
            .iter()
            .map(|c| Waypoint::new(Point::from(*c)))
            .collect();

        self.routes.push(rte);

        self
    }

    /// Accepted fixes as a single segment `<trk>`
    pub fn track(&mut self, positions: &[Position], name: String) -> &mut Self {
        let mut segment = TrackSegment::new();
        for pos in positions {
            let mut wp = Waypoint::new(Point::from(pos.coordinate));
            wp.time = Some(pos.time.into());
            segment.points.push(wp);
        }

        let mut track = Track::new();
        track.name = Some(name);
        track.segments.push(segment);

        self.tracks.push(track);

        self
    }

    pub fn generate(self) -> Result<Gpx, String> {
        let mut gpx: Gpx = Default::default();
        gpx.version = GpxVersion::Gpx11;
        gpx.creator = Some("navtrack".to_string());
        gpx.routes = self.routes;
        gpx.tracks = self.tracks;

        Ok(gpx)
    }
}
