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

//! Short-horizon dead reckoning for displayed tracks.

use crate::geo::{project, GeoPoint};
use crate::protocol::AircraftReport;
use crate::tracker::Track;

/// How far ahead the predicted position is projected.
pub const PREDICTION_HORIZON_SECS: f64 = 60.0;

/// Tracks above this altitude (feet) are neither predicted nor displayed.
pub const ALTITUDE_CEILING_FT: f64 = 18_000.0;

/// Whether a report falls inside the display altitude band.
#[must_use]
pub fn is_displayable(report: &AircraftReport) -> bool {
    report.altitude_ft <= ALTITUDE_CEILING_FT
}

/// Position one horizon ahead along the reported heading.
///
/// Ground sentinels were already folded to zero speed at validation, so an
/// aircraft on the ground predicts to its current position.
#[must_use]
pub fn predict_report(report: &AircraftReport) -> GeoPoint {
    project(
        report.position.lat,
        report.position.lon,
        report.heading_deg,
        report.ground_speed_kt,
        PREDICTION_HORIZON_SECS,
    )
}

/// Predicted position for a track, or `None` above the altitude ceiling.
#[must_use]
pub fn predicted_position(track: &Track) -> Option<GeoPoint> {
    is_displayable(&track.latest).then(|| predict_report(&track.latest))
}
