use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use tourpass_core::{RecordKind, VisitorId, VisitorStore};

const ITINERARY_FILE: &str = "itinerary.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Visitor records as pretty JSON files under `<root>/<visitor>/<kind>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn visitor_dir(&self, visitor: &VisitorId) -> PathBuf {
        self.root.join(visitor.as_str())
    }

    fn record_path(&self, visitor: &VisitorId, kind: RecordKind) -> PathBuf {
        self.visitor_dir(visitor)
            .join(format!("{}.json", kind.as_str()))
    }

    /// Itinerary accepted by the visitor, if any.
    pub fn load_itinerary<T: DeserializeOwned>(
        &self,
        visitor: &VisitorId,
    ) -> Result<Option<T>, StoreError> {
        read_json(&self.visitor_dir(visitor).join(ITINERARY_FILE))
    }

    pub fn save_itinerary<T: Serialize>(
        &self,
        visitor: &VisitorId,
        itinerary: &T,
    ) -> Result<(), StoreError> {
        write_json(&self.visitor_dir(visitor).join(ITINERARY_FILE), itinerary)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Write through a sibling temp file so a crash never leaves half a record.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let body = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

impl VisitorStore for JsonFileStore {
    type Error = StoreError;

    fn load(&self, visitor: &VisitorId, kind: RecordKind) -> Result<Option<Value>, Self::Error> {
        read_json(&self.record_path(visitor, kind))
    }

    fn save(&self, visitor: &VisitorId, kind: RecordKind, record: Value) -> Result<(), Self::Error> {
        write_json(&self.record_path(visitor, kind), &record)
    }
}
