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

//! Per-aircraft track state.
//!
//! The store folds report batches into tracks keyed by flight id. Each track
//! keeps a short trail of recent positions and the latest full report.
//! Highlight state is kept apart from the tracks themselves so that it carries
//! over between batches, and even across eviction, for ids that reappear.
//!
//! Tracks missing from a batch are left alone. They stop being yielded by
//! [`TrackStore::iter`] but keep their trail until an optional retention
//! policy in [`TrackerConfig`] removes them.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::geo::GeoPoint;
use crate::protocol::{AircraftReport, RawReport, ReportError};

/// Number of positions kept per trail.
pub const TRAIL_LENGTH: usize = 8;

/// One aircraft's trail and latest state.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    /// Flight id. Not unique for `"N/A"`; those reports share one trail but
    /// each is drawn at its own position.
    pub id: String,
    /// Most recent report, replaced wholesale on every update.
    pub latest: AircraftReport,
    /// Wall-clock time of the last update.
    pub last_seen: DateTime<Utc>,
    history: VecDeque<GeoPoint>,
    highlighted: bool,
    last_cycle: u64,
}

impl Track {
    fn new(report: AircraftReport, capacity: usize) -> Self {
        Self {
            id: report.callsign.clone(),
            latest: report,
            last_seen: Utc::now(),
            history: VecDeque::with_capacity(capacity),
            highlighted: false,
            last_cycle: 0,
        }
    }

    fn record(&mut self, report: AircraftReport, cycle: u64, capacity: usize) {
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(report.position);
        self.latest = report;
        self.last_seen = Utc::now();
        self.last_cycle = cycle;
    }

    /// Current position (the newest trail entry).
    #[must_use]
    pub fn position(&self) -> GeoPoint {
        self.latest.position
    }

    /// Trail positions, oldest first.
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &GeoPoint> + ExactSizeIterator {
        self.history.iter()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }
}

/// Events emitted by the store when track state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// A new track was created.
    TrackAdded(String),
    /// A track received a new position.
    PositionUpdated(String),
    /// A track was dropped by the retention policy.
    TrackEvicted(String),
    /// A highlight flag was toggled.
    HighlightChanged { id: String, highlighted: bool },
}

/// Configuration for the track store.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Positions kept per trail.
    pub trail_length: usize,
    /// Drop tracks absent from more than this many consecutive batches.
    pub stale_after_cycles: Option<u64>,
    /// Upper bound on retained tracks; least recently seen go first.
    pub max_tracks: Option<usize>,
    /// Broadcast channel capacity for events.
    pub event_channel_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            trail_length: TRAIL_LENGTH,
            stale_after_cycles: None,
            max_tracks: None,
            event_channel_capacity: 256,
        }
    }
}

/// Result of folding one batch into the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    /// Reports applied to a track.
    pub accepted: usize,
    /// Reports dropped at validation.
    pub rejected: Vec<ReportError>,
    /// Tracks created by this batch.
    pub added: usize,
    /// Tracks removed by the retention policy after this batch.
    pub evicted: usize,
}

/// Mapping from flight id to track, plus persisted highlight state.
pub struct TrackStore {
    tracks: HashMap<String, Track>,
    highlighted: HashSet<String>,
    /// One entry per accepted report of the latest batch, as of that report.
    current: Vec<Track>,
    cycle: u64,
    config: TrackerConfig,
    event_tx: broadcast::Sender<TrackerEvent>,
}

impl std::fmt::Debug for TrackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackStore")
            .field("track_count", &self.tracks.len())
            .field("highlighted", &self.highlighted.len())
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl TrackStore {
    /// Create a new store with the given configuration.
    #[must_use]
    pub fn new(mut config: TrackerConfig) -> Self {
        if config.trail_length == 0 {
            warn!("Trail length 0 requested, keeping 1 position per track");
            config.trail_length = 1;
        }
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Self {
            tracks: HashMap::new(),
            highlighted: HashSet::new(),
            current: Vec::new(),
            cycle: 0,
            config,
            event_tx,
        }
    }

    /// Fold a batch of reports into the store.
    ///
    /// Malformed reports are logged and skipped. Every valid report appends
    /// to its track's trail and replaces its latest state; the persisted
    /// highlight flag is re-applied.
    pub fn update(&mut self, reports: &[RawReport]) -> UpdateSummary {
        self.cycle += 1;
        self.current.clear();

        let mut summary = UpdateSummary::default();

        for raw in reports {
            let report = match raw.validate() {
                Ok(report) => report,
                Err(e) => {
                    warn!("Skipping report: {e}");
                    summary.rejected.push(e);
                    continue;
                }
            };

            let id = report.callsign.clone();
            let capacity = self.config.trail_length;
            let track = self.tracks.entry(id.clone()).or_insert_with(|| {
                summary.added += 1;
                let _ = self.event_tx.send(TrackerEvent::TrackAdded(id.clone()));
                Track::new(report.clone(), capacity)
            });

            track.record(report, self.cycle, capacity);
            track.highlighted = self.highlighted.contains(&id);
            summary.accepted += 1;

            self.current.push(track.clone());
            let _ = self.event_tx.send(TrackerEvent::PositionUpdated(id));
        }

        summary.evicted = self.apply_retention();
        summary
    }

    /// Flip the persisted highlight flag for `id` and return the new value.
    ///
    /// No track needs to exist yet; a track created later under this id
    /// picks the flag up on its first update.
    pub fn toggle_highlight(&mut self, id: &str) -> bool {
        let highlighted = if self.highlighted.remove(id) {
            false
        } else {
            self.highlighted.insert(id.to_string());
            true
        };

        match self.tracks.get_mut(id) {
            Some(track) => track.highlighted = highlighted,
            None => debug!("Highlight for {id} recorded without a track"),
        }
        for track in self.current.iter_mut().filter(|t| t.id == id) {
            track.highlighted = highlighted;
        }

        let _ = self.event_tx.send(TrackerEvent::HighlightChanged {
            id: id.to_string(),
            highlighted,
        });
        highlighted
    }

    /// Persisted highlight flag for `id`.
    #[must_use]
    pub fn is_highlighted(&self, id: &str) -> bool {
        self.highlighted.contains(id)
    }

    /// One track per accepted report of the latest batch, in report order.
    ///
    /// Reports sharing an id (the `"N/A"` case) each appear with their own
    /// latest state and the shared trail as of that report. Restartable and
    /// lazy; borrows the store so it cannot observe an update half-way through.
    pub fn iter(&self) -> impl Iterator<Item = &Track> + Clone + '_ {
        self.current.iter()
    }

    /// Every retained track, including those missing from the latest batch.
    pub fn all_tracks(&self) -> impl Iterator<Item = &Track> + '_ {
        self.tracks.values()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    /// Number of retained tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of batches applied so far.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Subscribe to store events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.event_tx.subscribe()
    }

    fn apply_retention(&mut self) -> usize {
        let mut evicted = Vec::new();

        if let Some(max_missed) = self.config.stale_after_cycles {
            let cycle = self.cycle;
            evicted.extend(
                self.tracks
                    .values()
                    .filter(|t| cycle - t.last_cycle > max_missed)
                    .map(|t| t.id.clone()),
            );
            for id in &evicted {
                self.tracks.remove(id);
            }
        }

        if let Some(max_tracks) = self.config.max_tracks {
            if self.tracks.len() > max_tracks {
                let mut candidates: Vec<_> = self
                    .tracks
                    .values()
                    .filter(|t| t.last_cycle != self.cycle)
                    .map(|t| (t.last_cycle, t.last_seen, t.id.clone()))
                    .collect();
                candidates.sort();

                let excess = self.tracks.len() - max_tracks;
                for (_, _, id) in candidates.into_iter().take(excess) {
                    self.tracks.remove(&id);
                    evicted.push(id);
                }
            }
        }

        for id in &evicted {
            debug!("Evicted stale track {id}");
            let _ = self.event_tx.send(TrackerEvent::TrackEvicted(id.clone()));
        }
        evicted.len()
    }
}
