//! Favorites and recently viewed documents.
//!
//! The lists are kept in memory and written to `metadata.json` by an explicit
//! [`Metadata::save`] or by the background flusher started with
//! [`spawn_flusher`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::document::ShortDocument;
use crate::error::Result;

pub const LAST_VIEWED_LIMIT: usize = 5;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Lists {
    #[serde(default)]
    favorites: Vec<ShortDocument>,
    #[serde(default)]
    last_viewed: Vec<ShortDocument>,
}

#[derive(Default)]
struct State {
    lists: Lists,
    dirty: bool,
}

pub struct Metadata {
    file: PathBuf,
    state: Mutex<State>,
}

fn within(path: &str, root: &str) -> bool {
    path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

impl Metadata {
    /// Load `<base_dir>/metadata.json`, writing an empty file when absent.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
        let file = base_dir.as_ref().join("metadata.json");
        let (lists, fresh) = match fs::read(&file) {
            Ok(data) => (serde_json::from_slice(&data)?, false),
            Err(e) if e.kind() == ErrorKind::NotFound => (Lists::default(), true),
            Err(e) => return Err(e.into()),
        };
        let metadata = Self {
            file,
            state: Mutex::new(State {
                lists,
                dirty: false,
            }),
        };
        if fresh {
            metadata.save()?;
        }
        Ok(metadata)
    }

    /// Write the lists to disk and clear the dirty flag.
    pub fn save(&self) -> Result<()> {
        let mut state = self.state.lock();
        let data = serde_json::to_vec_pretty(&state.lists)?;
        let tmp = self.file.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.file)?;
        state.dirty = false;
        Ok(())
    }

    /// Save only when something changed since the last save.
    pub fn flush(&self) -> Result<bool> {
        if !self.state.lock().dirty {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    pub fn add_favorite(&self, doc: ShortDocument) {
        let mut state = self.state.lock();
        if state.lists.favorites.iter().any(|f| f.path == doc.path) {
            return;
        }
        state.lists.favorites.push(doc);
        state.dirty = true;
    }

    pub fn remove_favorite(&self, path: &str) {
        let mut state = self.state.lock();
        let before = state.lists.favorites.len();
        state.lists.favorites.retain(|f| f.path != path);
        if state.lists.favorites.len() != before {
            state.dirty = true;
        }
    }

    pub fn is_favorite(&self, path: &str) -> bool {
        self.state.lock().lists.favorites.iter().any(|f| f.path == path)
    }

    pub fn favorites(&self) -> Vec<ShortDocument> {
        self.state.lock().lists.favorites.clone()
    }

    /// Put `doc` at the front of the recently viewed list.
    pub fn record_view(&self, doc: ShortDocument) {
        let mut state = self.state.lock();
        let views = &mut state.lists.last_viewed;
        views.retain(|v| v.path != doc.path);
        views.insert(0, doc);
        views.truncate(LAST_VIEWED_LIMIT);
        state.dirty = true;
    }

    pub fn last_viewed(&self) -> Vec<ShortDocument> {
        self.state.lock().lists.last_viewed.clone()
    }

    /// Drop `path` and its descendants from both lists.
    pub fn forget(&self, path: &str) {
        let mut state = self.state.lock();
        let before = state.lists.favorites.len() + state.lists.last_viewed.len();
        state.lists.favorites.retain(|d| !within(&d.path, path));
        state.lists.last_viewed.retain(|d| !within(&d.path, path));
        if state.lists.favorites.len() + state.lists.last_viewed.len() != before {
            state.dirty = true;
        }
    }
}

/// Handle to a running flusher. Stopping consumes the handle, so the stop
/// signal can only be sent once.
pub struct FlushHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
    metadata: Arc<Metadata>,
}

impl FlushHandle {
    /// Stop the flusher and write any pending changes.
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "metadata flusher ended abnormally");
        }
        self.metadata.flush()?;
        info!("metadata flusher stopped");
        Ok(())
    }
}

/// Save `metadata` every `period` while it has unsaved changes.
pub fn spawn_flusher(metadata: Arc<Metadata>, period: Duration) -> FlushHandle {
    let (stop, mut stopped) = oneshot::channel();
    let flushed = metadata.clone();
    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => match flushed.flush() {
                    Ok(true) => debug!("metadata saved"),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "failed to save metadata"),
                },
                _ = &mut stopped => break,
            }
        }
    });
    FlushHandle {
        stop,
        task,
        metadata,
    }
}
