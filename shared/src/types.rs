//! Core shared types and identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::SharedError;

/// Unique identifier for a staged or batched fabrication item
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, SharedError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| SharedError::InvalidItemId { input: s.to_string() })
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a production batch, derived from its creation time.
///
/// The token doubles as the batch directory name, so construction from
/// untrusted input goes through [`BatchId::parse`] which confines the token
/// to the expected `YYYY-MM-DD_HH-MM-SS[_N]` shape. Lexicographic order on
/// the token is creation order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BatchId(String);

impl BatchId {
    /// Build the canonical token for a creation timestamp.
    ///
    /// `attempt` 1 yields the bare timestamp token; higher attempts append
    /// a `_N` suffix so two launches within the same second never share a
    /// directory.
    pub fn from_timestamp(ts: DateTime<Utc>, attempt: u32) -> Self {
        let base = ts.format("%Y-%m-%d_%H-%M-%S").to_string();
        if attempt <= 1 {
            Self(base)
        } else {
            Self(format!("{}_{}", base, attempt))
        }
    }

    /// Validate an untrusted token (e.g. a URL path segment).
    ///
    /// Only digits, `-` and `_` are accepted, so the token can never escape
    /// the production root when joined onto a path.
    pub fn parse(token: &str) -> Result<Self, SharedError> {
        let valid = !token.is_empty()
            && token.len() <= 64
            && token.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '_');
        if valid {
            Ok(Self(token.to_string()))
        } else {
            Err(SharedError::InvalidBatchId { token: token.to_string() })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BatchId {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BatchId> for String {
    fn from(id: BatchId) -> Self {
        id.0
    }
}

/// Production state of a single item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Done,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "pending"),
            ItemStatus::Done => write!(f, "done"),
        }
    }
}

/// Fabrication parameters for a part.
///
/// Stored as-is: `extra` preserves technology-specific fields this version
/// does not model, so older records survive schema growth. [`PartConfig::process`]
/// projects into the tagged [`Process`] variant at the points that care
/// whether infill is meaningful.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartConfig {
    pub tech: String,
    pub material: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infill: Option<u8>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PartConfig {
    pub fn filament(material: &str, infill: u8) -> Self {
        Self {
            tech: "FDM".to_string(),
            material: material.to_string(),
            infill: Some(infill),
            extra: serde_json::Map::new(),
        }
    }

    /// Project the stored form into the process variant.
    pub fn process(&self) -> Process {
        if self.tech.eq_ignore_ascii_case("fdm") {
            Process::Filament {
                material: self.material.clone(),
                infill: self.infill.unwrap_or(0),
            }
        } else {
            Process::Other {
                tech: self.tech.clone(),
                material: self.material.clone(),
            }
        }
    }
}

/// Tagged view of a part's fabrication process.
///
/// Filament extrusion is the only technology where infill participates in
/// display and manifests; everything else is carried opaquely.
#[derive(Clone, Debug, PartialEq)]
pub enum Process {
    Filament { material: String, infill: u8 },
    Other { tech: String, material: String },
}

/// A single fabricable part, staged in the cart or owned by a batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub filename: String,
    /// Name of the stored binary inside the owning directory
    pub payload_ref: String,
    pub config: PartConfig,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn is_done(&self) -> bool {
        self.status == ItemStatus::Done
    }
}

/// Aggregate production state of a batch, always derived from its items
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Empty,
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Empty => write!(f, "empty"),
            BatchStatus::Pending => write!(f, "pending"),
            BatchStatus::InProgress => write!(f, "in_progress"),
            BatchStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One row of the batch listing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub id: BatchId,
    pub status: BatchStatus,
    pub item_count: usize,
}

/// Full view of a single batch: the captured manifest plus live item state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchDetail {
    pub id: BatchId,
    pub status: BatchStatus,
    pub manifest: String,
    pub items: Vec<Item>,
}

/// Result of a launch operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaunchReceipt {
    pub batch_id: BatchId,
    /// Items actually moved into the batch
    pub moved: usize,
    /// Items in the cart snapshot at launch time
    pub staged: usize,
}

/// Request body for a price estimate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub volume_cm3: f64,
    pub material: String,
    pub infill: u8,
}

/// Price and weight estimate for a part
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub weight_g: f64,
}

/// Measured volume of an uploaded mesh
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeReport {
    pub volume_cm3: f64,
}
