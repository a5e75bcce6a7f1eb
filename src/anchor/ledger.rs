//! Published Root Ledger
//!
//! Content-addressed store where the log operator anchors tree roots. Each
//! anchored root is a document tagged with its tree name and size.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

pub const TREE_SIZE_TAG: &str = "tree_size";
pub const TREE_NAME_TAG: &str = "tree_name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTag {
    pub name: String,
    pub value: String,
}

/// An anchored document as listed by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "id")]
    pub address: String,
    #[serde(default)]
    pub tags: Vec<LedgerTag>,
}

impl LedgerEntry {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }

    /// Tree size this entry was tagged with, if present and numeric
    pub fn tree_size(&self) -> Option<u64> {
        self.tag(TREE_SIZE_TAG)?.trim().parse().ok()
    }
}

/// Content behind a ledger address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerContent {
    Available(String),
    /// Accepted by the ledger but not yet retrievable
    Pending,
}

impl LedgerContent {
    pub fn is_pending(&self) -> bool {
        matches!(self, LedgerContent::Pending)
    }
}

#[async_trait]
pub trait PublishedRootLedger: Send + Sync {
    /// Entries tagged with `tree_name` and any of `sizes`
    async fn list_by_tags(&self, tree_name: &str, sizes: &[u64]) -> Result<Vec<LedgerEntry>, VerifyError>;

    async fn fetch_by_address(&self, address: &str) -> Result<LedgerContent, VerifyError>;
}
