// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Spherical-earth geodesy helpers.
//!
//! Everything here is a pure function of its inputs. NaN inputs propagate to
//! NaN outputs rather than producing errors.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// 1 knot = 0.514444 m/s
pub const KNOTS_TO_MPS: f64 = 0.514_444;

/// Meters in one statute mile.
pub const METERS_PER_STATUTE_MILE: f64 = 1609.34;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_distance_m(self.lat, self.lon, other.lat, other.lon)
    }

    /// Initial bearing to `other` in degrees (0-360, north = 0).
    #[must_use]
    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        initial_bearing_deg(self.lat, self.lon, other.lat, other.lon)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Calculate distance between two lat/lon points using Haversine formula (in meters).
#[must_use]
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Calculate initial bearing from point 1 to point 2 in degrees (0-360).
#[must_use]
pub fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let x = delta_lon.sin() * lat2_rad.cos();
    let y = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Solve the forward geodesic problem on a sphere: start at `(lat, lon)`,
/// travel `distance_m` along initial bearing `bearing_deg`.
#[must_use]
pub fn destination(lat: f64, lon: f64, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let angular = distance_m / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat_rad = lat.to_radians();
    let lon_rad = lon.to_radians();

    let dest_lat = (lat_rad.sin() * angular.cos()
        + lat_rad.cos() * angular.sin() * bearing.cos())
    .asin();
    let dest_lon = lon_rad
        + (bearing.sin() * angular.sin() * lat_rad.cos())
            .atan2(angular.cos() - lat_rad.sin() * dest_lat.sin());

    GeoPoint::new(dest_lat.to_degrees(), dest_lon.to_degrees())
}

/// Dead-reckon a position forward along a great circle.
///
/// Speed is in knots, duration in seconds. Zero speed returns the input point.
#[must_use]
pub fn project(
    lat: f64,
    lon: f64,
    heading_deg: f64,
    speed_knots: f64,
    duration_secs: f64,
) -> GeoPoint {
    let distance_m = speed_knots * KNOTS_TO_MPS * duration_secs;
    if distance_m == 0.0 {
        return GeoPoint::new(lat, lon);
    }
    destination(lat, lon, heading_deg, distance_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAX: GeoPoint = GeoPoint::new(33.9425, -118.4081);
    const JFK: GeoPoint = GeoPoint::new(40.6413, -73.7781);

    #[test]
    fn test_haversine_distance() {
        // LAX to JFK is approximately 2,475 statute miles
        let miles = LAX.distance_to(&JFK) / METERS_PER_STATUTE_MILE;
        assert!((miles - 2475.0).abs() < 10.0);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert!(LAX.distance_to(&LAX).abs() < 1e-9);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (LAX, JFK),
            (GeoPoint::new(0.0, 179.9), GeoPoint::new(0.0, -179.9)),
            (GeoPoint::new(-33.9, 151.2), GeoPoint::new(51.47, -0.45)),
        ];
        for (a, b) in pairs {
            assert!((a.distance_to(&b) - b.distance_to(&a)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_nan_propagates() {
        assert!(haversine_distance_m(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn test_project_zero_speed_is_identity() {
        let p = project(LAX.lat, LAX.lon, 123.0, 0.0, 60.0);
        assert_eq!(p, LAX);
    }

    #[test]
    fn test_project_due_east_distance() {
        let p = project(LAX.lat, LAX.lon, 90.0, 120.0, 60.0);
        let expected = 120.0 * KNOTS_TO_MPS * 60.0;
        assert!(p.lon > LAX.lon);
        assert!((LAX.distance_to(&p) - expected).abs() < 0.01);
        // Great-circle travel starting east drifts only marginally off the parallel
        assert!((p.lat - LAX.lat).abs() < 1e-3);
    }

    #[test]
    fn test_project_due_east_on_equator_keeps_latitude() {
        let p = project(0.0, 10.0, 90.0, 300.0, 60.0);
        assert!(p.lat.abs() < 1e-9);
        assert!(p.lon > 10.0);
    }

    #[test]
    fn test_project_north_keeps_longitude() {
        let p = project(LAX.lat, LAX.lon, 0.0, 250.0, 60.0);
        assert!(p.lat > LAX.lat);
        assert!((p.lon - LAX.lon).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_matches_projection_heading() {
        let p = project(LAX.lat, LAX.lon, 45.0, 400.0, 60.0);
        assert!((LAX.bearing_to(&p) - 45.0).abs() < 0.01);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!((origin.bearing_to(&GeoPoint::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((origin.bearing_to(&GeoPoint::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((origin.bearing_to(&GeoPoint::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((origin.bearing_to(&GeoPoint::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }
}
