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

//! Geographic to screen-space mapping with pan and zoom.
//!
//! Positions are first projected into a planar offset from the radar origin
//! using an equirectangular approximation at a fixed [`PROJECTION_SCALE`].
//! The mutable view state ([`RadarTransform::scale`] and the pan offset) is
//! then applied on top to get window pixels:
//!
//! ```text
//! pixel.x = viewport_center.x + offset.x * scale + pan.x
//! pixel.y = viewport_center.y - offset.y * scale + pan.y   // north is up
//! ```
//!
//! Only pan/zoom gestures mutate this state. Track ingestion never touches it.

mod screen;

pub use screen::ScreenVec;

use log::{debug, warn};
use thiserror::Error;

use crate::geo::{haversine_distance_m, GeoPoint};

/// Projection units per degree of latitude.
pub const PROJECTION_SCALE: f64 = 800.0;

/// 200 statute miles in meters. Anything farther is not drawn.
pub const MAX_RANGE_M: f64 = 321_869.0;

/// Smallest zoom scale. Zooming out never goes below this.
pub const MIN_SCALE: f64 = 1e-3;

/// Multiplier applied by the zoom in / zoom out buttons.
pub const BUTTON_ZOOM_STEP: f64 = 1.2;

/// Number of range rings drawn around the origin.
pub const RANGE_RING_COUNT: u32 = 9;

/// Spacing between range rings in projection units.
pub const RANGE_RING_SPACING: f64 = 80.0;

/// A position lies beyond the drawable radius around the radar origin.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("position is {distance_m:.0} m from the radar origin (limit {limit_m:.0} m)")]
pub struct OutOfRange {
    pub distance_m: f64,
    pub limit_m: f64,
}

/// Zoom multiplier for one mouse wheel notch.
///
/// A modified wheel (Ctrl held) zooms faster in both directions.
#[must_use]
pub fn wheel_zoom_factor(zoom_in: bool, modified: bool) -> f64 {
    match (zoom_in, modified) {
        (true, false) => 1.1,
        (false, false) => 0.9,
        (true, true) => 1.7,
        (false, true) => 0.5,
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() {
        scale.max(MIN_SCALE)
    } else {
        warn!("Non-finite scale {scale} replaced with 1.0");
        1.0
    }
}

/// Pan/zoom view state anchored at a fixed radar origin.
#[derive(Debug, Clone)]
pub struct RadarTransform {
    origin: GeoPoint,
    origin_cos_lat: f64,
    scale: f64,
    pan_offset: ScreenVec,
    viewport_center: ScreenVec,
}

impl RadarTransform {
    /// Create a transform for a radar site.
    ///
    /// `viewport_center` is the pixel the origin is drawn at before any pan.
    #[must_use]
    pub fn new(origin: GeoPoint, scale: f64, viewport_center: ScreenVec) -> Self {
        Self {
            origin,
            origin_cos_lat: origin.lat.to_radians().cos(),
            scale: sanitize_scale(scale),
            pan_offset: ScreenVec::ZERO,
            viewport_center,
        }
    }

    #[must_use]
    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub fn pan_offset(&self) -> ScreenVec {
        self.pan_offset
    }

    #[must_use]
    pub fn viewport_center(&self) -> ScreenVec {
        self.viewport_center
    }

    /// Move the pre-pan origin pixel, e.g. after a window resize.
    pub fn set_viewport_center(&mut self, center: ScreenVec) {
        self.viewport_center = center;
    }

    /// Project a position into an unscaled offset from the origin (Y up).
    pub fn to_screen(&self, point: GeoPoint) -> Result<ScreenVec, OutOfRange> {
        let distance_m = haversine_distance_m(self.origin.lat, self.origin.lon, point.lat, point.lon);
        // Written so a NaN distance also lands here
        if !(distance_m <= MAX_RANGE_M) {
            return Err(OutOfRange {
                distance_m,
                limit_m: MAX_RANGE_M,
            });
        }

        Ok(ScreenVec::new(
            (point.lon - self.origin.lon) * PROJECTION_SCALE * self.origin_cos_lat,
            (point.lat - self.origin.lat) * PROJECTION_SCALE,
        ))
    }

    /// Apply zoom, pan and viewport placement to a projected offset.
    #[must_use]
    pub fn offset_to_pixel(&self, offset: ScreenVec) -> ScreenVec {
        ScreenVec::new(
            self.viewport_center.x + offset.x * self.scale + self.pan_offset.x,
            self.viewport_center.y - offset.y * self.scale + self.pan_offset.y,
        )
    }

    /// Map a position straight to window pixels.
    pub fn to_pixel(&self, point: GeoPoint) -> Result<ScreenVec, OutOfRange> {
        self.to_screen(point).map(|offset| self.offset_to_pixel(offset))
    }

    /// Inverse of [`Self::to_pixel`], ignoring the range limit.
    #[must_use]
    pub fn pixel_to_geo(&self, pixel: ScreenVec) -> GeoPoint {
        let rel = pixel - self.viewport_center - self.pan_offset;
        let offset_x = rel.x / self.scale;
        let offset_y = -rel.y / self.scale;

        GeoPoint::new(
            self.origin.lat + offset_y / PROJECTION_SCALE,
            self.origin.lon + offset_x / (PROJECTION_SCALE * self.origin_cos_lat),
        )
    }

    /// Pixel the origin is currently drawn at.
    #[must_use]
    pub fn origin_pixel(&self) -> ScreenVec {
        self.viewport_center + self.pan_offset
    }

    pub fn pan_by(&mut self, delta: ScreenVec) {
        self.pan_offset += delta;
    }

    /// Rescale by `factor`, keeping whatever is under `screen_point` in place.
    ///
    /// The resulting scale never drops below [`MIN_SCALE`]; when the floor
    /// kicks in the recentering uses the factor actually applied.
    pub fn zoom_at(&mut self, screen_point: ScreenVec, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            warn!("Ignoring invalid zoom factor {factor}");
            return;
        }

        let new_scale = (self.scale * factor).max(MIN_SCALE);
        let applied = new_scale / self.scale;
        if (applied - factor).abs() > f64::EPSILON {
            debug!("Zoom clamped at scale {new_scale}");
        }

        let rel = screen_point - self.viewport_center - self.pan_offset;
        self.pan_offset -= rel * (applied - 1.0);
        self.scale = new_scale;
    }

    /// Zoom in one button step about the drawn origin.
    pub fn zoom_in(&mut self) {
        self.zoom_at(self.origin_pixel(), BUTTON_ZOOM_STEP);
    }

    /// Zoom out one button step about the drawn origin.
    pub fn zoom_out(&mut self) {
        self.zoom_at(self.origin_pixel(), 1.0 / BUTTON_ZOOM_STEP);
    }

    /// Clear the pan offset and return to unit scale.
    pub fn reset(&mut self) {
        self.pan_offset = ScreenVec::ZERO;
        self.scale = 1.0;
    }

    /// Pixel radii of the range rings at the current scale, innermost first.
    pub fn range_ring_radii(&self) -> impl Iterator<Item = f64> + '_ {
        (1..=RANGE_RING_COUNT).map(move |i| f64::from(i) * RANGE_RING_SPACING * self.scale)
    }
}
