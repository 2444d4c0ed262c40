//! Simulated positioning
//!
//! Stands in for the vehicle's location sensor: a route of waypoints is walked
//! leg by leg, producing evenly spaced location samples, one per tick.

use crate::config::{RouteConfig, Waypoint};
use corridor_engine::{CorridorError, LocationSample, Result};

/// Drive from south-west of signal 1 through all three demo signals
const DEMO_WAYPOINTS: [Waypoint; 5] = [
    Waypoint { lat: 12.9680, lng: 77.5910 },
    Waypoint { lat: 12.9716, lng: 77.5946 },
    Waypoint { lat: 12.9750, lng: 77.5980 },
    Waypoint { lat: 12.9800, lng: 77.6000 },
    Waypoint { lat: 12.9840, lng: 77.6030 },
];

#[derive(Debug, Clone)]
pub struct Route {
    waypoints: Vec<Waypoint>,
    samples_per_leg: usize,
    speed_kmh: f64,
}

impl Route {
    /// Build a route
    ///
    /// No waypoints means there is no position to report, which is fatal to
    /// starting a mission.
    pub fn new(waypoints: Vec<Waypoint>, samples_per_leg: usize, speed_kmh: f64) -> Result<Self> {
        if waypoints.is_empty() {
            return Err(CorridorError::PositioningUnavailable(
                "route has no waypoints".to_string(),
            ));
        }
        if samples_per_leg == 0 {
            return Err(CorridorError::InvalidConfig(
                "samples_per_leg must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            waypoints,
            samples_per_leg,
            speed_kmh,
        })
    }

    /// Route from configuration, or the demo drive if none is configured
    pub fn from_config(config: &RouteConfig) -> Result<Self> {
        let waypoints = match &config.waypoints {
            Some(waypoints) => waypoints.clone(),
            None => {
                log::info!("No route configured; using the demo drive");
                DEMO_WAYPOINTS.to_vec()
            }
        };
        Self::new(waypoints, config.samples_per_leg, config.speed_kmh)
    }

    /// Every sample along the route, ending exactly on the last waypoint
    pub fn samples(&self) -> Vec<LocationSample> {
        let mut samples = Vec::with_capacity(self.len());

        for leg in self.waypoints.windows(2) {
            let (from, to) = (leg[0], leg[1]);
            for step in 0..self.samples_per_leg {
                let t = step as f64 / self.samples_per_leg as f64;
                samples.push(LocationSample::new(
                    from.lat + (to.lat - from.lat) * t,
                    from.lng + (to.lng - from.lng) * t,
                    self.speed_kmh,
                ));
            }
        }

        if let Some(last) = self.waypoints.last() {
            samples.push(LocationSample::new(last.lat, last.lng, self.speed_kmh));
        }
        samples
    }

    /// Number of samples [`Route::samples`] yields
    pub fn len(&self) -> usize {
        (self.waypoints.len() - 1) * self.samples_per_leg + 1
    }
}
