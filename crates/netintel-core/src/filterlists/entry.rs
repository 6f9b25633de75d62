//! Blocklist entry records

use netintel_store::{Meta, Record, Result as StoreResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeSet;

/// List sources that flagged one normalized value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockListEntry {
    #[serde(skip)]
    key: String,
    #[serde(skip)]
    meta: Meta,

    /// Identifiers of the lists containing the value
    #[serde(rename = "Sources", default)]
    pub sources: BTreeSet<String>,
}

impl BlockListEntry {
    /// Create an entry stored at `key`
    pub fn new<I, S>(key: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            meta: Meta::default(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// Restore key and metadata after decoding a wrapped record
    pub(crate) fn with_store_info(mut self, key: &str, meta: Meta) -> Self {
        self.key = key.to_string();
        self.meta = meta;
        self
    }

    /// Mutable metadata block
    pub fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }
}

impl Record for BlockListEntry {
    fn key(&self) -> &str {
        &self.key
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn marshal(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
