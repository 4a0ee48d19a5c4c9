//! Storage root layout
//!
//! One directory tree backs the whole engine: `cart/` holds one payload plus
//! one metadata record per staged item, `production/<batch_id>/` holds the
//! same pairs after launch plus the generated manifest. Record and payload
//! are associated by a shared basename derived from the item id.

use std::path::{Path, PathBuf};

use shared::{BatchId, Item, ItemId};

pub const MANIFEST_FILE: &str = "manifest.txt";

/// Path helper for the storage root
#[derive(Clone, Debug)]
pub struct StorageLayout {
    data_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn cart_dir(&self) -> PathBuf {
        self.data_dir.join("cart")
    }

    pub fn production_dir(&self) -> PathBuf {
        self.data_dir.join("production")
    }

    pub fn batch_dir(&self, id: &BatchId) -> PathBuf {
        self.production_dir().join(id.as_str())
    }

    pub fn manifest_path(&self, id: &BatchId) -> PathBuf {
        self.batch_dir(id).join(MANIFEST_FILE)
    }

    /// Stored payload name for a fresh item: `<id>_<sanitized filename>`.
    /// The id prefix keeps records unique and findable; the display filename
    /// stays untouched in the metadata.
    pub fn payload_ref(id: &ItemId, filename: &str) -> String {
        format!("{}_{}", id, sanitize_filename(filename))
    }

    /// Metadata record name for a payload reference.
    pub fn metadata_name(payload_ref: &str) -> String {
        format!("{}.json", payload_ref)
    }

    pub fn cart_payload_path(&self, item: &Item) -> PathBuf {
        self.cart_dir().join(&item.payload_ref)
    }

    pub fn cart_metadata_path(&self, item: &Item) -> PathBuf {
        self.cart_dir().join(Self::metadata_name(&item.payload_ref))
    }

    pub fn batch_payload_path(&self, batch: &BatchId, item: &Item) -> PathBuf {
        self.batch_dir(batch).join(&item.payload_ref)
    }

    pub fn batch_metadata_path(&self, batch: &BatchId, item: &Item) -> PathBuf {
        self.batch_dir(batch).join(Self::metadata_name(&item.payload_ref))
    }
}

/// Confine an uploaded filename to a safe storage name.
///
/// Alphanumerics, `.`, `-` and `_` survive; everything else becomes `_`.
/// The result can never contain a path separator, so uploads cannot escape
/// the cart directory.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "payload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Find the metadata record for an item id inside a directory.
///
/// Records are keyed by the `<id>_` basename prefix, so a directory scan is
/// enough; returns `None` when no record matches or the directory does not
/// exist yet.
pub async fn find_metadata_path(dir: &Path, id: &ItemId) -> std::io::Result<Option<PathBuf>> {
    let prefix = format!("{}_", id);

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(&prefix) && name.ends_with(".json") {
            return Ok(Some(entry.path()));
        }
    }

    Ok(None)
}
