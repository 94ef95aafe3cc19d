//! Named JSON records on disk.
//!
//! Games persist high scores, settings or saved [`Vars`](tessel_scene::Vars)
//! through a [`JsonStore`]: each record `name` is the file `{name}.json`
//! under the store's root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};

/// Directory of pretty-printed JSON records.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing the record `name`.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// Write `value` as the record `name`, replacing any previous one.
    pub fn save<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> EngineResult<()> {
        let json = serde_json::to_string_pretty(value).map_err(|e| EngineError::Persistence {
            name: name.to_owned(),
            details: e.to_string(),
        })?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.path_of(name), json)?;
        tracing::debug!(record = %name, "record saved");
        Ok(())
    }

    /// Read the record `name`, or `None` if it was never saved.
    ///
    /// # Errors
    ///
    /// [`EngineError::Persistence`] if the record does not decode as `T`.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> EngineResult<Option<T>> {
        let json = match std::fs::read_to_string(self.path_of(name)) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| EngineError::Persistence {
                name: name.to_owned(),
                details: e.to_string(),
            })
    }

    /// Remove the record `name`. Returns whether it existed.
    pub fn delete(&self, name: &str) -> EngineResult<bool> {
        match std::fs::remove_file(self.path_of(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
