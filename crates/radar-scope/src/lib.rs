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

//! Geospatial tracking and projection engine for a radar scope display.
//!
//! The engine ingests periodic batches of aircraft reports, keeps a short
//! trail per aircraft, dead-reckons each aircraft one minute ahead, and maps
//! geographic positions into a pannable, zoomable screen space. Drawing is
//! left to the caller, which receives ready-to-paint [`ScopeFrame`]s.
//!
//! The layers can be used independently:
//!
//! - **Geo layer** ([`geo`]): haversine distance, bearings, dead reckoning
//! - **Transform layer** ([`transform`]): lat/lon to pixels, pan and zoom
//! - **Protocol layer** ([`protocol`]): report schema and batch parsing
//! - **Tracker layer** ([`tracker`]): trails, highlight carry-over, retention
//! - **Display layer** ([`display`], [`prediction`], [`selection`]): frames,
//!   predicted positions and click hit testing
//!
//! # Quick Start
//!
//! [`Scope`] wires the tracker for one producer and any number of readers:
//!
//! ```
//! use radar_scope::{GeoPoint, RadarTransform, RawReport, Scope, ScreenVec, TrackerConfig};
//!
//! let scope = Scope::new(TrackerConfig::default());
//! let lax = GeoPoint::new(33.9425, -118.4081);
//! let mut view = RadarTransform::new(lax, 1.0, ScreenVec::new(700.0, 400.0));
//!
//! scope.ingest(&[RawReport::at("UAL123", 34.0, -118.3).with_velocity(180.0, 270.0)]);
//!
//! view.zoom_at(ScreenVec::new(650.0, 380.0), 1.1);
//! let frame = scope.frame(&view);
//! assert_eq!(frame.blips.len(), 1);
//! ```
//!
//! The view ([`RadarTransform`]) is owned by whoever handles input gestures.
//! It is never shared with the ingestion path.

pub mod display;
pub mod geo;
pub mod prediction;
pub mod protocol;
pub mod selection;
pub mod tracker;
pub mod transform;

use std::sync::{Arc, Mutex, RwLock, TryLockError};

use log::{debug, warn};
use tokio::sync::broadcast;

pub use display::{Blip, DataBlock, ScopeFrame, Sector, TrailDot};
pub use geo::GeoPoint;
pub use protocol::{AircraftReport, JsonBatchParser, ParseError, Protocol, RawReport, ReportError};
pub use tracker::{Track, TrackStore, TrackerConfig, TrackerEvent, UpdateSummary};
pub use transform::{OutOfRange, RadarTransform, ScreenVec};

/// What happened to a batch handed to [`Scope::ingest`].
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The batch was folded into the store.
    Applied(UpdateSummary),
    /// Another batch was still being applied, or the document was empty.
    Skipped,
}

/// Shared handle to a track store for concurrent ingest and render.
///
/// Cloning is cheap; clones share the same store. A batch is applied under an
/// exclusive lock, readers take a shared lock for the duration of a frame, and
/// a batch that arrives while another is still being applied is skipped
/// rather than interleaved.
#[derive(Debug, Clone)]
pub struct Scope {
    tracks: Arc<RwLock<TrackStore>>,
    ingest_guard: Arc<Mutex<()>>,
}

impl Scope {
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Arc::new(RwLock::new(TrackStore::new(config))),
            ingest_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Apply a batch, or skip it if another batch is in flight.
    pub fn ingest(&self, reports: &[RawReport]) -> IngestOutcome {
        let _guard = match self.ingest_guard.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!("Batch of {} reports arrived mid-update, skipping", reports.len());
                return IngestOutcome::Skipped;
            }
        };

        match self.tracks.write() {
            Ok(mut store) => IngestOutcome::Applied(store.update(reports)),
            Err(_) => {
                warn!("Track store lock poisoned, dropping batch");
                IngestOutcome::Skipped
            }
        }
    }

    /// Parse a batch document and apply it.
    pub fn ingest_document(&self, input: &[u8]) -> Result<IngestOutcome, ParseError> {
        let mut parser = JsonBatchParser::new();
        match parser.parse(input)? {
            Some(reports) => Ok(self.ingest(&reports)),
            None => {
                debug!("Empty batch document");
                Ok(IngestOutcome::Skipped)
            }
        }
    }

    /// Build the frame for the tracks in the latest batch.
    #[must_use]
    pub fn frame(&self, transform: &RadarTransform) -> ScopeFrame {
        self.tracks.read().map_or_else(
            |_| ScopeFrame::build(std::iter::empty(), transform),
            |store| ScopeFrame::build(store.iter(), transform),
        )
    }

    /// Toggle highlight on whatever track is under `screen_point`.
    ///
    /// Returns the selected id and its new highlight state, or `None` when the
    /// click hit nothing.
    pub fn select_at(
        &self,
        screen_point: ScreenVec,
        transform: &RadarTransform,
    ) -> Option<(String, bool)> {
        let mut store = self.tracks.write().ok()?;
        let id = selection::hit_test(screen_point, store.iter(), transform)?.to_string();
        let highlighted = store.toggle_highlight(&id);
        Some((id, highlighted))
    }

    /// Toggle highlight by id.
    pub fn toggle_highlight(&self, id: &str) -> Option<bool> {
        self.tracks
            .write()
            .ok()
            .map(|mut store| store.toggle_highlight(id))
    }

    /// Run a closure with read access to the store.
    pub fn with_tracks<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&TrackStore) -> R,
    {
        self.tracks.read().ok().map(|store| f(&*store))
    }

    /// Get the number of retained tracks.
    #[must_use]
    pub fn track_count(&self) -> usize {
        self.with_tracks(TrackStore::len).unwrap_or(0)
    }

    /// Subscribe to tracker events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.with_tracks(TrackStore::subscribe).unwrap_or_else(|| {
            let (tx, rx) = broadcast::channel(1);
            drop(tx);
            rx
        })
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
