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

//! Render-ready scope frames.
//!
//! A [`ScopeFrame`] is everything a renderer needs for one paint: range ring
//! geometry and one [`Blip`] per visible track, all in window pixels. The
//! renderer decides colors, fonts and shapes; this module only decides what is
//! visible and where.

use serde::Serialize;

use crate::prediction::{is_displayable, predicted_position};
use crate::tracker::Track;
use crate::transform::{OutOfRange, RadarTransform, ScreenVec};

/// Intensity of the newest trail dot.
pub const TRAIL_MAX_INTENSITY: u8 = 255;

/// Intensity lost per step back in the trail.
pub const TRAIL_FADE_STEP: u8 = 30;

/// Oldest trail dots never fade below this.
pub const TRAIL_MIN_INTENSITY: u8 = 50;

/// Leader line length above the blip, in pixels.
pub const LEADER_LINE_LENGTH_PX: f64 = 20.0;

/// Intensity hint for the trail dot `age` steps back (0 = newest).
#[must_use]
pub fn trail_intensity(age: usize) -> u8 {
    let fade = u8::try_from(age)
        .ok()
        .and_then(|age| age.checked_mul(TRAIL_FADE_STEP))
        .unwrap_or(u8::MAX);
    TRAIL_MAX_INTENSITY
        .saturating_sub(fade)
        .max(TRAIL_MIN_INTENSITY)
}

/// Altitude stratum letter shown in the data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sector {
    /// Below 10,000 ft.
    F,
    /// 10,000 to 19,999 ft.
    V,
    /// 20,000 to 29,999 ft.
    A,
    /// 30,000 ft and up.
    H,
}

impl Sector {
    #[must_use]
    pub fn from_altitude(altitude_ft: f64) -> Self {
        if altitude_ft < 10_000.0 {
            Self::F
        } else if altitude_ft < 20_000.0 {
            Self::V
        } else if altitude_ft < 30_000.0 {
            Self::A
        } else {
            Self::H
        }
    }
}

/// Text lines drawn at the end of the leader line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataBlock {
    pub callsign: String,
    /// Altitude in hundreds of feet (3 digits) and ground speed in knots.
    pub detail: String,
}

impl DataBlock {
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "display values in feet and knots")]
    pub fn new(callsign: &str, altitude_ft: f64, ground_speed_kt: f64) -> Self {
        let flight_level = (altitude_ft / 100.0).floor() as i64;
        let speed = ground_speed_kt.trunc() as i64;
        Self {
            callsign: callsign.to_string(),
            detail: format!("{flight_level:03} {speed}"),
        }
    }
}

/// One trail dot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailDot {
    pub position: ScreenVec,
    pub intensity: u8,
}

/// A visible track, in window pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blip {
    pub id: String,
    pub position: ScreenVec,
    /// Dead-reckoned position; `None` when it leaves the drawable range or the
    /// track is above the altitude ceiling.
    pub predicted: Option<ScreenVec>,
    pub leader_end: ScreenVec,
    /// Newest first, including the current position.
    pub trail: Vec<TrailDot>,
    pub data_block: DataBlock,
    pub sector: Sector,
    pub highlighted: bool,
}

impl Blip {
    /// Place a track on screen. Fails if its current position is out of range.
    pub fn for_track(track: &Track, transform: &RadarTransform) -> Result<Self, OutOfRange> {
        let report = &track.latest;
        let position = transform.to_pixel(report.position)?;

        let trail = track
            .history()
            .rev()
            .enumerate()
            .filter_map(|(age, point)| {
                transform.to_pixel(*point).ok().map(|position| TrailDot {
                    position,
                    intensity: trail_intensity(age),
                })
            })
            .collect();

        Ok(Self {
            id: track.id.clone(),
            position,
            predicted: predicted_position(track).and_then(|p| transform.to_pixel(p).ok()),
            leader_end: position - ScreenVec::new(0.0, LEADER_LINE_LENGTH_PX),
            trail,
            data_block: DataBlock::new(&report.callsign, report.altitude_ft, report.ground_speed_kt),
            sector: Sector::from_altitude(report.altitude_ft),
            highlighted: track.is_highlighted(),
        })
    }
}

/// Everything to paint for one render cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeFrame {
    /// Pixel the radar origin is drawn at.
    pub origin: ScreenVec,
    /// Range ring radii in pixels, innermost first.
    pub range_rings: Vec<f64>,
    pub blips: Vec<Blip>,
    /// Tracks skipped for being beyond the drawable range.
    pub out_of_range: usize,
    /// Tracks skipped for being above the altitude ceiling.
    pub above_ceiling: usize,
}

impl ScopeFrame {
    /// Build a frame from the tracks to show and the current view.
    pub fn build<'a, I>(tracks: I, transform: &RadarTransform) -> Self
    where
        I: IntoIterator<Item = &'a Track>,
    {
        let mut frame = Self {
            origin: transform.origin_pixel(),
            range_rings: transform.range_ring_radii().collect(),
            blips: Vec::new(),
            out_of_range: 0,
            above_ceiling: 0,
        };

        for track in tracks {
            if !is_displayable(&track.latest) {
                frame.above_ceiling += 1;
                continue;
            }
            match Blip::for_track(track, transform) {
                Ok(blip) => frame.blips.push(blip),
                Err(_) => frame.out_of_range += 1,
            }
        }

        frame
    }
}
