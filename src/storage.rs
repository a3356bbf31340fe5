/// Persistence of collections and settings
///
/// The whole document is loaded and saved at once. Readers get complete
/// settings through `merge_with_defaults`, so fields missing on disk never
/// surface as errors.
use crate::config::{merge_with_defaults, PartialSettings, Settings};
use crate::error::{InitWindowError, Result};
use crate::types::Collection;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The persisted document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StoredData {
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub settings: PartialSettings,
}

impl StoredData {
    pub fn settings(&self) -> Settings {
        merge_with_defaults(self.settings.clone())
    }
}

/// Load/save access to the persisted document
pub trait Storage: Send + Sync {
    fn load(&self) -> Result<StoredData>;
    fn save(&self, data: &StoredData) -> Result<()>;
}

/// `data.json` in the application data directory
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt document is moved on load
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }
}

impl Storage for JsonFileStorage {
    /// Missing, empty or unparseable file loads as the default document. A corrupt
    /// file is moved aside to `data.json.bak` so the next save cannot lose it.
    fn load(&self) -> Result<StoredData> {
        if !self.path.exists() {
            return Ok(StoredData::default());
        }

        let contents =
            fs::read_to_string(&self.path).map_err(|e| InitWindowError::io(&self.path, e))?;
        if contents.trim().is_empty() {
            return Ok(StoredData::default());
        }

        match serde_json::from_str(&contents) {
            Ok(data) => Ok(data),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse {}, starting from defaults: {}",
                    self.path.display(),
                    e
                );
                let backup = self.backup_path();
                if let Err(e) = fs::rename(&self.path, &backup) {
                    tracing::warn!("Failed to back up {}: {}", self.path.display(), e);
                }
                Ok(StoredData::default())
            }
        }
    }

    fn save(&self, data: &StoredData) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| InitWindowError::io(dir, e))?;

        let json = serde_json::to_string_pretty(data)?;

        // Write next to the target and rename so readers never see half a file
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| InitWindowError::io(dir, e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| InitWindowError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| InitWindowError::io(&self.path, e.error))?;

        tracing::debug!("Saved {} collections to {}", data.collections.len(), self.path.display());
        Ok(())
    }
}

/// In-process storage, used by tests and embedders that persist elsewhere
#[derive(Default)]
pub struct MemoryStorage {
    data: Mutex<StoredData>,
}

impl MemoryStorage {
    pub fn new(data: StoredData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::new(StoredData {
            collections: Vec::new(),
            settings: settings.into(),
        })
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<StoredData> {
        Ok(self.data.lock().clone())
    }

    fn save(&self, data: &StoredData) -> Result<()> {
        *self.data.lock() = data.clone();
        Ok(())
    }
}
