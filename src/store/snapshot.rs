//! JSON snapshot loader for the update pool and the sent history.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{FirmProfile, InMemoryUpdateStore, RawUpdate, SentRecord};

/// Load an [`InMemoryUpdateStore`] from JSON files.
///
/// `pool_path` holds a `RawUpdate[]` array; `history_path`, when given, holds a
/// `SentRecord[]` array; `profile_path`, when given, holds one `FirmProfile`.
///
/// # Errors
/// Returns an error when a file cannot be read or does not parse.
pub async fn load_snapshot(
    pool_path: &Path,
    history_path: Option<&Path>,
    profile_path: Option<&Path>,
) -> Result<InMemoryUpdateStore> {
    let updates: Vec<RawUpdate> = read_json(pool_path).await?;
    let sent: Vec<SentRecord> = match history_path {
        Some(path) => read_json(path).await?,
        None => Vec::new(),
    };

    info!(
        pool = %pool_path.display(),
        updates = updates.len(),
        sent = sent.len(),
        "loaded update snapshot"
    );

    let mut store = InMemoryUpdateStore::new(updates).with_sent(sent);
    if let Some(path) = profile_path {
        let profile: FirmProfile = read_json(path).await?;
        store = store.with_profile(profile);
    }
    Ok(store)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
