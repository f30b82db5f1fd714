//! Keyed visitor record storage.
//!
//! The engine persists two records per visitor: completion progress and the list of
//! issued rewards. Backends only see opaque JSON values keyed by `(visitor, kind)`.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::error::TourError;

/// Opaque visitor identity supplied by the calling layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(String);

impl VisitorId {
    /// Validate and wrap a visitor token.
    ///
    /// # Errors
    ///
    /// Rejects empty tokens and tokens with characters outside `[A-Za-z0-9_.-]`.
    pub fn new(token: impl Into<String>) -> Result<Self, TourError> {
        let token = token.into();
        if token.is_empty() {
            return Err(TourError::input("visitor id must not be empty"));
        }
        if let Some(bad) = token
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(TourError::input(format!(
                "visitor id contains unsupported character {bad:?}"
            )));
        }
        Ok(Self(token))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Progress,
    Rewards,
}

impl RecordKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Rewards => "rewards",
        }
    }
}

/// Storage backend for per-visitor records.
/// Platform-specific implementations should provide this.
pub trait VisitorStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load(&self, visitor: &VisitorId, kind: RecordKind) -> Result<Option<Value>, Self::Error>;

    /// Replace a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, visitor: &VisitorId, kind: RecordKind, record: Value) -> Result<(), Self::Error>;
}

/// In-process store, used by tests and embedders without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(VisitorId, RecordKind), Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VisitorStore for MemoryStore {
    type Error = Infallible;

    fn load(&self, visitor: &VisitorId, kind: RecordKind) -> Result<Option<Value>, Self::Error> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(&(visitor.clone(), kind)).cloned())
    }

    fn save(&self, visitor: &VisitorId, kind: RecordKind, record: Value) -> Result<(), Self::Error> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((visitor.clone(), kind), record);
        Ok(())
    }
}

/// Load and decode a typed record, falling back to `T::default()` when absent.
pub(crate) fn load_record<S, T>(store: &S, visitor: &VisitorId, kind: RecordKind) -> Result<T, TourError>
where
    S: VisitorStore,
    T: DeserializeOwned + Default,
{
    let raw = store
        .load(visitor, kind)
        .map_err(|err| TourError::Storage(Box::new(err)))?;
    match raw {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}

pub(crate) fn save_record<S, T>(
    store: &S,
    visitor: &VisitorId,
    kind: RecordKind,
    record: &T,
) -> Result<(), TourError>
where
    S: VisitorStore,
    T: Serialize,
{
    let value = serde_json::to_value(record)?;
    store
        .save(visitor, kind, value)
        .map_err(|err| TourError::Storage(Box::new(err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visitor_id_validation() {
        assert!(VisitorId::new("user_1700000000_abc123xyz").is_ok());
        assert!(VisitorId::new("").is_err());
        assert!(VisitorId::new("../etc/passwd").is_err());
        assert!(VisitorId::new("two words").is_err());
    }

    #[test]
    fn memory_store_round_trips_and_isolates_kinds() {
        let store = MemoryStore::new();
        let visitor = VisitorId::new("v1").unwrap();
        save_record(&store, &visitor, RecordKind::Progress, &vec![1, 2, 3]).unwrap();

        let progress: Vec<i32> = load_record(&store, &visitor, RecordKind::Progress).unwrap();
        assert_eq!(progress, vec![1, 2, 3]);
        let rewards: Vec<i32> = load_record(&store, &visitor, RecordKind::Rewards).unwrap();
        assert!(rewards.is_empty());
    }

    #[test]
    fn malformed_record_surfaces_as_serialization_error() {
        let store = MemoryStore::new();
        let visitor = VisitorId::new("v2").unwrap();
        store
            .save(&visitor, RecordKind::Progress, Value::String("oops".into()))
            .unwrap();
        let err = load_record::<_, Vec<i32>>(&store, &visitor, RecordKind::Progress).unwrap_err();
        assert!(matches!(err, TourError::Serialization(_)));
    }
}
