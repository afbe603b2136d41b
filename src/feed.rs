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

//! Periodic batch producer.
//!
//! Replays recorded batch documents (one JSON document per line) on a fixed
//! cadence. The hand-off channel holds a single batch; if the consumer has not
//! taken the previous batch when the next tick fires, the new batch is dropped
//! rather than queued.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// Configuration for the replay feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Time between batches.
    pub interval: Duration,
    /// Start over after the last batch instead of stopping.
    pub repeat: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            repeat: false,
        }
    }
}

/// Read batch documents from a file, or stdin when `path` is `None`.
///
/// Blank lines are dropped.
pub async fn load_batches(path: Option<&Path>) -> std::io::Result<Vec<Vec<u8>>> {
    let mut text = String::new();
    match path {
        Some(path) => text = tokio::fs::read_to_string(path).await?,
        None => {
            tokio::io::stdin().read_to_string(&mut text).await?;
        }
    }

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.as_bytes().to_vec())
        .collect())
}

/// Handle to a running feed task.
///
/// Dropping the handle stops the task.
pub struct ReplayFeed {
    batch_rx: mpsc::Receiver<Vec<u8>>,
    skipped: Arc<AtomicUsize>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for ReplayFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayFeed")
            .field("skipped", &self.skipped())
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl ReplayFeed {
    /// Spawn the producer task. It stops when `cancel_token` (or a child of
    /// it held by the handle) is cancelled.
    #[must_use]
    pub fn spawn(batches: Vec<Vec<u8>>, config: FeedConfig, cancel_token: &CancellationToken) -> Self {
        let (batch_tx, batch_rx) = mpsc::channel(1);
        let skipped = Arc::new(AtomicUsize::new(0));
        let cancel_token = cancel_token.child_token();

        let task_cancel = cancel_token.clone();
        let task_skipped = Arc::clone(&skipped);
        tokio::spawn(async move {
            replay_loop(batches, config, batch_tx, task_skipped, task_cancel).await;
        });

        Self {
            batch_rx,
            skipped,
            cancel_token,
        }
    }

    /// Receive the next batch. Returns `None` once the feed is exhausted or
    /// shut down.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.batch_rx.recv().await
    }

    /// Number of batches dropped because the consumer lagged.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for ReplayFeed {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn replay_loop(
    batches: Vec<Vec<u8>>,
    config: FeedConfig,
    batch_tx: mpsc::Sender<Vec<u8>>,
    skipped: Arc<AtomicUsize>,
    cancel_token: CancellationToken,
) {
    if batches.is_empty() {
        warn!("Replay feed has no batches");
        return;
    }

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut next = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            () = cancel_token.cancelled() => {
                info!("Replay feed cancelled");
                return;
            }
        }

        let Some(batch) = batches.get(next) else {
            info!("Replay feed finished after {} batches", batches.len());
            return;
        };

        match batch_tx.try_send(batch.clone()) {
            Ok(()) => debug!("Queued batch {}", next + 1),
            Err(TrySendError::Full(_)) => {
                skipped.fetch_add(1, Ordering::Relaxed);
                warn!("Previous batch still pending, skipping batch {}", next + 1);
            }
            Err(TrySendError::Closed(_)) => return, // Receiver dropped
        }

        next += 1;
        if next == batches.len() && config.repeat {
            next = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batches(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| format!(r#"[{{"flight":"T{i}","lat":41.9,"lon":-87.9}}]"#).into_bytes()).collect()
    }

    fn fast() -> FeedConfig {
        FeedConfig {
            interval: Duration::from_millis(5),
            repeat: false,
        }
    }

    #[tokio::test]
    async fn test_delivers_batches_in_order() {
        let cancel = CancellationToken::new();
        let mut feed = ReplayFeed::spawn(batches(3), fast(), &cancel);

        let mut received = Vec::new();
        while let Some(batch) = feed.recv().await {
            received.push(batch);
        }
        assert_eq!(received, batches(3));
        assert_eq!(feed.skipped(), 0);
    }

    #[tokio::test]
    async fn test_lagging_consumer_skips_batches() {
        let cancel = CancellationToken::new();
        let mut feed = ReplayFeed::spawn(batches(5), fast(), &cancel);

        // Let every tick fire while nobody is reading
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(feed.recv().await, Some(batches(1).remove(0)));
        assert_eq!(feed.recv().await, None);
        assert_eq!(feed.skipped(), 4);
    }

    #[tokio::test]
    async fn test_cancellation_stops_feed() {
        let cancel = CancellationToken::new();
        let config = FeedConfig {
            interval: Duration::from_millis(5),
            repeat: true,
        };
        let mut feed = ReplayFeed::spawn(batches(2), config, &cancel);

        assert!(feed.recv().await.is_some());
        cancel.cancel();
        // At most the one batch already queued remains
        let mut remaining = 0;
        while feed.recv().await.is_some() {
            remaining += 1;
        }
        assert!(remaining <= 1);
    }

    #[tokio::test]
    async fn test_load_batches_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.jsonl");
        std::fs::write(&path, "[]\n\n  {\"ac\":[]}  \n").unwrap();

        let loaded = load_batches(Some(&path)).await.unwrap();
        assert_eq!(loaded, [b"[]".to_vec(), br#"{"ac":[]}"#.to_vec()]);
    }
}
