//! Metadata record I/O shared by the cart and batch stores

use std::path::Path;

use tokio::fs;
use tracing::warn;

use crate::error::{FactoryError, FactoryResult};
use shared::Item;

/// Read and parse one metadata record.
pub(crate) async fn read_record(path: &Path) -> FactoryResult<Item> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| FactoryError::storage("read_record", path, e))?;

    Ok(serde_json::from_str(&content)?)
}

/// Rewrite a metadata record atomically: write a sibling temp file, then
/// rename over the target, so readers never observe a partial record.
pub(crate) async fn write_record_atomic(path: &Path, item: &Item) -> FactoryResult<()> {
    let content = serde_json::to_string_pretty(item)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    fs::write(&tmp, content)
        .await
        .map_err(|e| FactoryError::storage("write_record", &tmp, e))?;

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(FactoryError::storage("commit_record", path, e));
    }

    Ok(())
}

/// Collect every parsable metadata record in a directory, newest first.
///
/// Corrupt or unreadable records are logged and skipped so one bad file
/// never takes down a listing. A missing directory reads as empty.
pub(crate) async fn scan_records(dir: &Path) -> FactoryResult<Vec<Item>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(FactoryError::storage("scan_records", dir, e)),
    };

    let mut items = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => return Err(FactoryError::storage("scan_records", dir, e)),
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.ends_with(".json") {
            continue;
        }

        match read_record(&entry.path()).await {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!("⚠️ Skipping unreadable record {}: {}", entry.path().display(), e);
            }
        }
    }

    items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    Ok(items)
}
