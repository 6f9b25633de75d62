//! Record model
//!
//! Every record carries a key and a metadata block. Stores may keep records
//! in their concrete type or wrap them into an encoded payload for transport,
//! so readers must be prepared for both representations.

use crate::error::{Result, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as unix seconds
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Record metadata managed by the store
///
/// All timestamps are unix seconds; zero means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// When the record was first saved
    pub created: i64,
    /// When the record was last saved
    pub modified: i64,
    /// Absolute expiry, zero for permanent records
    pub expires: i64,
    /// Deletion mark
    pub deleted: i64,
}

impl Meta {
    /// Set an absolute expiry timestamp
    pub fn set_absolute_expiry(&mut self, timestamp: i64) {
        self.expires = timestamp;
        self.deleted = 0;
    }

    /// Set the expiry relative to now. Negative durations are ignored.
    pub fn set_relative_expiry(&mut self, seconds: i64) {
        if seconds >= 0 {
            self.set_absolute_expiry(unix_now() + seconds);
        }
    }

    /// Remove any expiry
    pub fn make_permanent(&mut self) {
        self.expires = 0;
        self.deleted = 0;
    }

    /// Touch the created/modified timestamps
    pub fn update(&mut self) {
        self.update_at(unix_now());
    }

    /// Touch the created/modified timestamps with an explicit clock
    pub fn update_at(&mut self, now: i64) {
        if self.created == 0 {
            self.created = now;
        }
        self.modified = now;
    }

    /// Whether the record is past its absolute expiry
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        self.expires > 0 && self.expires <= now
    }
}

/// A keyed record that can live in a [`RecordStore`](crate::RecordStore)
pub trait Record: Any + Send + Sync + fmt::Debug {
    /// Store key of the record
    fn key(&self) -> &str;

    /// Metadata block
    fn meta(&self) -> &Meta;

    /// Encode the record payload for wrapped transport
    fn marshal(&self) -> Result<Vec<u8>>;

    /// Dynamic access for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Concrete type name, used in diagnostics
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Generic, encoded form of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapper {
    key: String,
    meta: Meta,
    payload: Vec<u8>,
}

impl Wrapper {
    /// Create a wrapper from its parts
    pub fn new(key: impl Into<String>, meta: Meta, payload: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            meta,
            payload,
        }
    }

    /// Wrap a concrete record
    pub fn from_record(record: &dyn Record) -> Result<Self> {
        Ok(Self::new(record.key(), *record.meta(), record.marshal()?))
    }

    /// Store key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Metadata block
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Encoded payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the payload into a concrete type
    pub fn unwrap_into<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload).map_err(|e| StoreError::TypeMismatch {
            key: self.key.clone(),
            expected: std::any::type_name::<T>(),
            found: format!("undecodable payload ({e})"),
        })
    }
}

/// A record as returned by a store
#[derive(Debug, Clone)]
pub enum StoredRecord {
    /// Record kept in its concrete type
    Typed(Arc<dyn Record>),
    /// Record kept in encoded form
    Wrapped(Wrapper),
}

impl StoredRecord {
    /// Wrap a concrete record for handing to a store
    pub fn typed<R: Record>(record: R) -> Self {
        Self::Typed(Arc::new(record))
    }

    /// Whether the record is in encoded form
    pub fn is_wrapped(&self) -> bool {
        matches!(self, Self::Wrapped(_))
    }

    /// Store key
    pub fn key(&self) -> &str {
        match self {
            Self::Typed(record) => record.key(),
            Self::Wrapped(wrapper) => wrapper.key(),
        }
    }

    /// Metadata block
    pub fn meta(&self) -> &Meta {
        match self {
            Self::Typed(record) => record.meta(),
            Self::Wrapped(wrapper) => wrapper.meta(),
        }
    }

    /// Convert into the encoded form
    pub fn into_wrapped(self) -> Result<Wrapper> {
        match self {
            Self::Typed(record) => Wrapper::from_record(record.as_ref()),
            Self::Wrapped(wrapper) => Ok(wrapper),
        }
    }

    /// Downcast a typed record to `T`, failing with a type mismatch otherwise
    pub fn downcast_ref<T: Record>(&self) -> Result<&T> {
        match self {
            Self::Typed(record) => {
                record
                    .as_any()
                    .downcast_ref::<T>()
                    .ok_or_else(|| StoreError::TypeMismatch {
                        key: record.key().to_string(),
                        expected: std::any::type_name::<T>(),
                        found: record.type_name().to_string(),
                    })
            }
            Self::Wrapped(wrapper) => Err(StoreError::TypeMismatch {
                key: wrapper.key().to_string(),
                expected: std::any::type_name::<T>(),
                found: "wrapped record".to_string(),
            }),
        }
    }
}
