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

//! Application configuration management.
//!
//! Configuration is stored in TOML format and read once at startup. It holds
//! one profile per TRACON (radar site position and initial scale), the feed
//! cadence, the viewport size, and optional track retention caps.

use std::collections::BTreeMap;
use std::path::Path;

use log::warn;
use radar_scope::{GeoPoint, TrackerConfig};
use serde::{Deserialize, Serialize};

/// Application name used for the config file location.
pub const APP_NAME: &str = "radarview";

/// TRACON used when none is requested or the requested one is unknown.
pub const DEFAULT_TRACON: &str = "C90";

/// Radar site placement for one TRACON.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RadarSettings {
    /// Radar origin as (latitude, longitude).
    pub lat_lon: (f64, f64),

    /// Initial zoom scale
    pub scale_factor: f64,
}

/// One selectable TRACON profile.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TraconConfig {
    /// Display name shown in logs and frame output
    pub tracon_name: String,

    pub radar_settings: RadarSettings,
}

impl TraconConfig {
    fn new(name: &str, lat: f64, lon: f64) -> Self {
        Self {
            tracon_name: name.to_string(),
            radar_settings: RadarSettings {
                lat_lon: (lat, lon),
                scale_factor: 1.0,
            },
        }
    }

    /// Radar origin.
    #[must_use]
    pub fn origin(&self) -> GeoPoint {
        self.radar_settings.lat_lon.into()
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// TRACON selected when none is given on the command line
    #[serde(default = "default_tracon")]
    pub default_tracon: String,

    /// Milliseconds between report batches
    #[serde(default = "default_fetch_interval_ms")]
    pub fetch_interval_ms: u64,

    /// Viewport width in pixels
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,

    /// Viewport height in pixels
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,

    /// Drop tracks missing from more than this many consecutive batches
    #[serde(default)]
    pub stale_after_cycles: Option<u64>,

    /// Upper bound on retained tracks
    #[serde(default)]
    pub max_tracks: Option<usize>,

    /// Known TRACON profiles keyed by identifier
    #[serde(default = "default_tracons")]
    pub tracons: BTreeMap<String, TraconConfig>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_tracon() -> String {
    DEFAULT_TRACON.to_string()
}

fn default_tracons() -> BTreeMap<String, TraconConfig> {
    BTreeMap::from([
        ("C90".to_string(), TraconConfig::new("Chicago TRACON", 41.9786, -87.9048)),
        ("N90".to_string(), TraconConfig::new("New York TRACON", 40.6413, -73.7781)),
        ("SCT".to_string(), TraconConfig::new("Southern California TRACON", 33.9425, -118.4081)),
    ])
}

fn default_fetch_interval_ms() -> u64 {
    2000
}

fn default_viewport_width() -> f64 {
    1400.0
}

fn default_viewport_height() -> f64 {
    800.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            default_tracon: default_tracon(),
            fetch_interval_ms: default_fetch_interval_ms(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            stale_after_cycles: None,
            max_tracks: None,
            tracons: default_tracons(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "config")
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, confy::ConfyError> {
        confy::load_path(path)
    }

    /// Save configuration to an explicit path
    #[allow(dead_code, reason = "used by tests to seed config files")]
    pub fn save_to(&self, path: &Path) -> Result<(), confy::ConfyError> {
        confy::store_path(path, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, "config")
    }

    /// Resolve the TRACON to display.
    ///
    /// An unknown request falls back to the configured default, then to
    /// [`DEFAULT_TRACON`].
    #[must_use]
    pub fn select_tracon(&self, requested: Option<&str>) -> Option<(&str, &TraconConfig)> {
        let wanted = requested.unwrap_or(&self.default_tracon);
        if let Some((id, tracon)) = self.tracons.get_key_value(wanted) {
            return Some((id.as_str(), tracon));
        }

        warn!("Selected TRACON {wanted} not found, using default");
        [self.default_tracon.as_str(), DEFAULT_TRACON]
            .into_iter()
            .find_map(|id| self.tracons.get_key_value(id))
            .map(|(id, tracon)| (id.as_str(), tracon))
    }

    /// Retention settings for the track store.
    #[must_use]
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            stale_after_cycles: self.stale_after_cycles,
            max_tracks: self.max_tracks,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_requested_tracon() {
        let config = AppConfig::default();
        let (id, tracon) = config.select_tracon(Some("SCT")).unwrap();
        assert_eq!(id, "SCT");
        assert_eq!(tracon.origin(), GeoPoint::new(33.9425, -118.4081));
    }

    #[test]
    fn test_unknown_tracon_falls_back_to_c90() {
        let config = AppConfig::default();
        let (id, _) = config.select_tracon(Some("ZZZ")).unwrap();
        assert_eq!(id, "C90");
        let (id, _) = config.select_tracon(None).unwrap();
        assert_eq!(id, "C90");
    }

    #[test]
    fn test_no_profiles_selects_nothing() {
        let config = AppConfig {
            tracons: BTreeMap::new(),
            ..Default::default()
        };
        assert!(config.select_tracon(Some("C90")).is_none());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.default_tracon = "N90".to_string();
        config.stale_after_cycles = Some(5);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.default_tracon, "N90");
        assert_eq!(loaded.stale_after_cycles, Some(5));
        assert_eq!(loaded.tracons, config.tracons);
        assert_eq!(loaded.tracker_config().stale_after_cycles, Some(5));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "fetch_interval_ms = 500\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.fetch_interval_ms, 500);
        assert_eq!(loaded.default_tracon, DEFAULT_TRACON);
        assert_eq!(loaded.tracons.len(), 3);
        assert!((loaded.viewport_width - 1400.0).abs() < f64::EPSILON);
    }
}
