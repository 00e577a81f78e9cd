use super::model::{LiveFrame, TelemetrySnapshot};
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, warn};

const FEED_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct TelemetryState {
    history: VecDeque<TelemetrySnapshot>,
    live: Option<LiveFrame>,
}

/// Bounded telemetry history shared between the frame loop and the API.
/// Readers only ever get copies.
#[derive(Debug)]
pub struct TelemetryStore {
    state: Mutex<TelemetryState>,
    max_history: usize,
    file: Option<PathBuf>,
    feed: broadcast::Sender<TelemetrySnapshot>,
}

impl TelemetryStore {
    /// In-memory store with no backing file
    pub fn in_memory(max_history: usize) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            state: Mutex::new(TelemetryState::default()),
            max_history: max_history.max(1),
            file: None,
            feed,
        }
    }

    /// Store persisted to `file`. Existing history is loaded; a corrupt file
    /// starts an empty history.
    pub async fn open<P: Into<PathBuf>>(file: P, max_history: usize) -> Result<Self> {
        let file = file.into();
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut store = Self::in_memory(max_history);
        let history = load_history(&file).await;
        {
            let mut state = store.state.lock();
            state.history.extend(history);
            while state.history.len() > store.max_history {
                state.history.pop_front();
            }
            debug!("Loaded {} telemetry entries", state.history.len());
        }
        store.file = Some(file);
        Ok(store)
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Append a snapshot, notify live subscribers and persist the history
    pub async fn publish(&self, snapshot: TelemetrySnapshot) -> Result<()> {
        let serialized = {
            let mut state = self.state.lock();
            state.history.push_back(snapshot.clone());
            while state.history.len() > self.max_history {
                state.history.pop_front();
            }
            match &self.file {
                Some(_) => Some(serde_json::to_string_pretty(&state.history)?),
                None => None,
            }
        };

        // no subscribers is fine
        let _ = self.feed.send(snapshot);

        if let (Some(file), Some(json)) = (&self.file, serialized) {
            tokio::fs::write(file, json).await?;
        }
        Ok(())
    }

    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.state.lock().history.back().cloned()
    }

    /// The most recent `limit` entries, oldest first. `limit` is clamped to `1..=max_history`.
    pub fn history(&self, limit: usize) -> Vec<TelemetrySnapshot> {
        let limit = limit.clamp(1, self.max_history);
        let state = self.state.lock();
        let skip = state.history.len().saturating_sub(limit);
        state.history.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the frame the overlay renders from
    pub fn record_frame(&self, frame: LiveFrame) {
        self.state.lock().live = Some(frame);
    }

    pub fn latest_frame(&self) -> Option<LiveFrame> {
        self.state.lock().live.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetrySnapshot> {
        self.feed.subscribe()
    }
}

async fn load_history(file: &Path) -> Vec<TelemetrySnapshot> {
    let contents = match tokio::fs::read_to_string(file).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!("Cannot read telemetry file {}: {}", file.display(), e);
            return Vec::new();
        }
    };

    serde_json::from_str(&contents).unwrap_or_else(|e| {
        warn!(
            "Telemetry file {} is corrupt, starting fresh: {}",
            file.display(),
            e
        );
        Vec::new()
    })
}
