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

//! Click-to-select hit testing.

use crate::prediction::is_displayable;
use crate::tracker::Track;
use crate::transform::{RadarTransform, ScreenVec};

/// Click radius around a blip, in pixels.
pub const HIT_RADIUS_PX: f64 = 15.0;

/// Find the track drawn under `screen_point`.
///
/// Returns the first track in iteration order whose blip lies within
/// [`HIT_RADIUS_PX`], not necessarily the closest one. Tracks that are not
/// drawn (out of range or above the altitude ceiling) cannot be hit.
pub fn hit_test<'a, I>(screen_point: ScreenVec, tracks: I, transform: &RadarTransform) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a Track>,
{
    let radius_sq = HIT_RADIUS_PX * HIT_RADIUS_PX;

    tracks
        .into_iter()
        .filter(|track| is_displayable(&track.latest))
        .find(|track| {
            transform
                .to_pixel(track.position())
                .is_ok_and(|pixel| pixel.distance_squared(screen_point) <= radius_sq)
        })
        .map(|track| track.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::protocol::RawReport;
    use crate::tracker::TrackStore;

    const LAX: GeoPoint = GeoPoint::new(33.9425, -118.4081);

    fn transform() -> RadarTransform {
        RadarTransform::new(LAX, 1.0, ScreenVec::new(500.0, 500.0))
    }

    #[test]
    fn test_hit_track_under_cursor() {
        let mut store = TrackStore::default();
        store.update(&[RawReport::at("UAL1", LAX.lat, LAX.lon)]);

        let hit = hit_test(ScreenVec::new(510.0, 505.0), store.iter(), &transform());
        assert_eq!(hit, Some("UAL1"));
    }

    #[test]
    fn test_miss_returns_none() {
        let mut store = TrackStore::default();
        store.update(&[RawReport::at("UAL1", LAX.lat, LAX.lon)]);

        assert!(hit_test(ScreenVec::new(516.0, 500.0), store.iter(), &transform()).is_none());
        assert!(hit_test(ScreenVec::new(0.0, 0.0), store.iter(), &transform()).is_none());
    }

    #[test]
    fn test_first_encountered_wins() {
        let mut store = TrackStore::default();
        // 0.005 deg of latitude is 4 px at unit scale, both inside the radius
        store.update(&[
            RawReport::at("FAR", LAX.lat + 0.005, LAX.lon),
            RawReport::at("NEAR", LAX.lat, LAX.lon),
        ]);

        let hit = hit_test(ScreenVec::new(500.0, 500.0), store.iter(), &transform());
        assert_eq!(hit, Some("FAR"));
    }

    #[test]
    fn test_hidden_tracks_not_selectable() {
        let mut store = TrackStore::default();
        store.update(&[RawReport::at("HIGH", LAX.lat, LAX.lon).with_altitude(30_000.0)]);

        assert!(hit_test(ScreenVec::new(500.0, 500.0), store.iter(), &transform()).is_none());
    }

    #[test]
    fn test_out_of_range_track_not_hit_at_center() {
        let mut store = TrackStore::default();
        store.update(&[RawReport::at("JFK1", 40.6413, -73.7781)]);

        assert!(hit_test(ScreenVec::new(500.0, 500.0), store.iter(), &transform()).is_none());
    }

    #[test]
    fn test_hit_follows_pan_and_zoom() {
        let mut store = TrackStore::default();
        store.update(&[RawReport::at("UAL1", LAX.lat + 0.1, LAX.lon)]);

        let mut t = transform();
        t.pan_by(ScreenVec::new(100.0, 0.0));
        t.zoom_at(t.origin_pixel(), 2.0);
        // 0.1 deg north = 80 units, doubled by zoom, shifted right by pan
        let hit = hit_test(ScreenVec::new(600.0, 340.0), store.iter(), &t);
        assert_eq!(hit, Some("UAL1"));
    }
}
