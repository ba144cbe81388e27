// src/store/mod.rs - JSON snapshot persistence, one file per tracked source

use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::fs;

/// Read the last persisted snapshot for one source. Never fails: a
/// missing or corrupt file yields the empty default so the poller can
/// treat every fetched item as potentially new.
pub async fn load_snapshot<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            debug!(
                "No snapshot at {} ({}), starting from empty",
                path.display(),
                e
            );
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(
                "Corrupt snapshot at {} ({}), starting from empty",
                path.display(),
                e
            );
            T::default()
        }
    }
}

/// Persist the latest successful fetch for one source. Write failures
/// are logged and swallowed: a change set already in memory is still
/// worth announcing even if the snapshot cannot be saved.
pub async fn save_snapshot<T>(path: &Path, snapshot: &T)
where
    T: Serialize,
{
    let content = match serde_json::to_string(snapshot) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to serialize snapshot for {}: {}", path.display(), e);
            return;
        }
    };

    if let Err(e) = fs::write(path, content).await {
        error!("Failed to write snapshot {}: {}", path.display(), e);
    } else {
        debug!("Wrote snapshot {}", path.display());
    }
}
