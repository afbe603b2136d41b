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

//! Ingestion boundary for aircraft report batches.
//!
//! Feeds hand over loosely typed records ([`RawReport`]). They are validated
//! exactly once into [`AircraftReport`], applying the documented defaults:
//!
//! | field   | missing              | special values           |
//! |---------|----------------------|--------------------------|
//! | `flight`| `"N/A"`              | numbers kept as text     |
//! | `alt`   | `alt_baro`, then 0   | `"ground"` → 0           |
//! | `gs`    | 0                    | `"ground"` / `"N/A"` → 0 |
//! | `track` | 0                    |                          |
//!
//! A record whose `lat`/`lon` is missing or non-numeric is rejected with a
//! [`ReportError`]; that never fails the rest of the batch.

mod readsb;

pub use readsb::JsonBatchParser;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::GeoPoint;

/// Identifier used when a report carries no flight id.
pub const UNKNOWN_FLIGHT: &str = "N/A";

/// Errors that can occur while parsing a batch document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized batch document: {0}")]
    UnrecognizedShape(String),
}

/// A single report that cannot be used for tracking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("missing {field} for aircraft {id}")]
    MissingField { id: String, field: &'static str },

    #[error("non-numeric {field} for aircraft {id}: {value}")]
    NonNumeric {
        id: String,
        field: &'static str,
        value: String,
    },
}

/// A JSON field that may arrive as a number, a numeric string, or a sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl FieldValue {
    /// Numeric value, coercing numeric strings.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }

    /// Whether this is the literal `"ground"` sentinel.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().eq_ignore_ascii_case("ground"))
    }

    fn is_not_available(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().eq_ignore_ascii_case("n/a"))
    }

    fn describe(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => format!("{s:?}"),
            Self::Other(v) => v.to_string(),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Unvalidated aircraft record as delivered by a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReport {
    #[serde(default, deserialize_with = "flight_from_any")]
    pub flight: Option<String>,
    #[serde(default)]
    pub lat: Option<FieldValue>,
    #[serde(default)]
    pub lon: Option<FieldValue>,
    #[serde(default)]
    pub alt: Option<FieldValue>,
    /// Barometric altitude as sent by readsb; used when `alt` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_baro: Option<FieldValue>,
    #[serde(default)]
    pub gs: Option<FieldValue>,
    #[serde(default)]
    pub track: Option<FieldValue>,
}

impl RawReport {
    /// Convenience constructor for a report with a numeric position.
    #[must_use]
    pub fn at(flight: &str, lat: f64, lon: f64) -> Self {
        Self {
            flight: Some(flight.to_string()),
            lat: Some(lat.into()),
            lon: Some(lon.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_altitude(mut self, alt: impl Into<FieldValue>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    #[must_use]
    pub fn with_velocity(mut self, gs: impl Into<FieldValue>, track: f64) -> Self {
        self.gs = Some(gs.into());
        self.track = Some(track.into());
        self
    }

    /// Track key for this report; feeds pad callsigns with spaces.
    #[must_use]
    pub fn id(&self) -> String {
        match self.flight.as_deref().map(str::trim) {
            Some(flight) if !flight.is_empty() => flight.to_string(),
            _ => UNKNOWN_FLIGHT.to_string(),
        }
    }

    /// Altitude field, preferring `alt` over `alt_baro`.
    #[must_use]
    pub fn altitude(&self) -> Option<&FieldValue> {
        self.alt.as_ref().or(self.alt_baro.as_ref())
    }

    /// Validate into a typed report, applying field defaults.
    pub fn validate(&self) -> Result<AircraftReport, ReportError> {
        let id = self.id();
        let lat = required_coordinate(&id, "lat", self.lat.as_ref())?;
        let lon = required_coordinate(&id, "lon", self.lon.as_ref())?;

        let on_ground = self.altitude().is_some_and(FieldValue::is_ground)
            || self.gs.as_ref().is_some_and(FieldValue::is_ground);

        let altitude_ft = optional_number(&id, "alt", self.altitude());
        let ground_speed_kt = optional_number(&id, "gs", self.gs.as_ref());
        let heading_deg = optional_number(&id, "track", self.track.as_ref());

        Ok(AircraftReport {
            callsign: id,
            position: GeoPoint::new(lat, lon),
            altitude_ft,
            heading_deg,
            ground_speed_kt,
            on_ground,
        })
    }
}

/// Accept any JSON value as a flight id. Numbers are kept as their text;
/// anything else that is not a string reads as missing.
fn flight_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn required_coordinate(
    id: &str,
    field: &'static str,
    value: Option<&FieldValue>,
) -> Result<f64, ReportError> {
    let value = value.ok_or_else(|| ReportError::MissingField {
        id: id.to_string(),
        field,
    })?;

    match value.as_number() {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(ReportError::NonNumeric {
            id: id.to_string(),
            field,
            value: value.describe(),
        }),
    }
}

fn optional_number(id: &str, field: &'static str, value: Option<&FieldValue>) -> f64 {
    let Some(value) = value else {
        return 0.0;
    };
    if value.is_ground() || value.is_not_available() {
        return 0.0;
    }

    match value.as_number() {
        Some(n) if n.is_finite() => n,
        _ => {
            warn!("Using 0 for non-numeric {field} on aircraft {id}: {}", value.describe());
            0.0
        }
    }
}

/// Validated aircraft state from one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftReport {
    /// Flight id; also the track key.
    pub callsign: String,
    pub position: GeoPoint,
    /// Altitude in feet.
    pub altitude_ft: f64,
    /// Track angle in degrees (0-360, north = 0).
    pub heading_deg: f64,
    /// Ground speed in knots.
    pub ground_speed_kt: f64,
    /// Reported with the `"ground"` sentinel.
    pub on_ground: bool,
}

/// Trait for protocol parsers.
///
/// Implement this trait to add support for new feed formats.
pub trait Protocol {
    /// The message type produced by this parser.
    type Message;
    /// The error type for parsing failures.
    type Error;

    /// Parse input bytes into a message.
    ///
    /// Returns `Ok(Some(message))` if parsing succeeded,
    /// `Ok(None)` if the input is valid but doesn't produce a message,
    /// or `Err(error)` if parsing failed.
    fn parse(&mut self, input: &[u8]) -> Result<Option<Self::Message>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_numeric_report() {
        let report = RawReport::at("UAL123", 33.9, -118.4)
            .with_altitude(12_000.0)
            .with_velocity(250.0, 90.0)
            .validate()
            .unwrap();
        assert_eq!(report.callsign, "UAL123");
        assert_eq!(report.position, GeoPoint::new(33.9, -118.4));
        assert!((report.altitude_ft - 12_000.0).abs() < f64::EPSILON);
        assert!((report.ground_speed_kt - 250.0).abs() < f64::EPSILON);
        assert!((report.heading_deg - 90.0).abs() < f64::EPSILON);
        assert!(!report.on_ground);
    }

    #[test]
    fn test_validate_string_numbers() {
        let raw = RawReport {
            flight: Some("SWA9  ".to_string()),
            lat: Some(" 34.1".into()),
            lon: Some("-118.2".into()),
            alt: Some("9000".into()),
            alt_baro: None,
            gs: Some("180".into()),
            track: Some("270".into()),
        };
        let report = raw.validate().unwrap();
        assert_eq!(report.callsign, "SWA9");
        assert_eq!(report.position, GeoPoint::new(34.1, -118.2));
        assert!((report.altitude_ft - 9000.0).abs() < f64::EPSILON);
        assert!((report.heading_deg - 270.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let report = RawReport {
            lat: Some(1.0.into()),
            lon: Some(2.0.into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(report.callsign, UNKNOWN_FLIGHT);
        assert!(report.altitude_ft.abs() < f64::EPSILON);
        assert!(report.ground_speed_kt.abs() < f64::EPSILON);
        assert!(report.heading_deg.abs() < f64::EPSILON);
    }

    #[test]
    fn test_ground_sentinel_is_zero() {
        let report = RawReport::at("N123", 33.0, -118.0)
            .with_altitude("ground")
            .with_velocity("ground", 45.0)
            .validate()
            .unwrap();
        assert!(report.on_ground);
        assert!(report.ground_speed_kt.abs() < f64::EPSILON);
        assert!(report.altitude_ft.abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_numeric_latitude_rejected() {
        let raw = RawReport {
            flight: Some("DAL1".to_string()),
            lat: Some("abc".into()),
            lon: Some(1.0.into()),
            ..Default::default()
        };
        assert_eq!(
            raw.validate(),
            Err(ReportError::NonNumeric {
                id: "DAL1".to_string(),
                field: "lat",
                value: "\"abc\"".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_longitude_rejected() {
        let raw = RawReport {
            flight: Some("DAL1".to_string()),
            lat: Some(1.0.into()),
            ..Default::default()
        };
        assert!(matches!(
            raw.validate(),
            Err(ReportError::MissingField { field: "lon", .. })
        ));
    }

    #[test]
    fn test_nan_string_rejected() {
        let raw = RawReport {
            lat: Some("NaN".into()),
            lon: Some(1.0.into()),
            ..Default::default()
        };
        assert!(raw.validate().is_err());
    }

    #[test]
    fn test_garbage_speed_falls_back_to_zero() {
        let report = RawReport::at("AAL7", 10.0, 10.0)
            .with_velocity("fast", 10.0)
            .validate()
            .unwrap();
        assert!(report.ground_speed_kt.abs() < f64::EPSILON);
    }
}
