//! Collections of apps
//!
//! CRUD over the stored document plus the auto-start flag. At most one
//! collection carries `is_auto_start` at any time; `set_auto_start` clears
//! every other flag in the same save.

use crate::config::{Settings, SettingsSource};
use crate::error::Result;
use crate::storage::Storage;
use crate::types::{App, Collection};
use std::path::Path;
use std::sync::Arc;

/// Read access the launch orchestrator needs
pub trait CollectionSource: Send + Sync {
    fn collection(&self, id: &str) -> Result<Option<Collection>>;
}

/// Fields of a collection that may be replaced by `update`
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub apps: Option<Vec<App>>,
}

pub struct CollectionService {
    storage: Arc<dyn Storage>,
}

impl CollectionService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn list(&self) -> Result<Vec<Collection>> {
        Ok(self.storage.load()?.collections)
    }

    pub fn get(&self, id: &str) -> Result<Option<Collection>> {
        Ok(self.list()?.into_iter().find(|c| c.id == id))
    }

    /// Create a collection; a blank name becomes "Collection N"
    pub fn create(&self, name: &str, apps: Vec<App>) -> Result<Collection> {
        let mut data = self.storage.load()?;

        let name = match name.trim() {
            "" => format!("Collection {}", data.collections.len() + 1),
            trimmed => trimmed.to_string(),
        };
        let collection = Collection::new(name, apps);

        data.collections.push(collection.clone());
        self.storage.save(&data)?;

        tracing::info!(
            "Created collection '{}' with {} apps",
            collection.name,
            collection.apps.len()
        );
        Ok(collection)
    }

    /// Replace name and/or apps. Returns `None` for an unknown id.
    pub fn update(&self, id: &str, update: CollectionUpdate) -> Result<Option<Collection>> {
        self.modify(id, |collection| {
            if let Some(name) = update.name {
                collection.name = name;
            }
            if let Some(apps) = update.apps {
                collection.apps = apps;
            }
        })
    }

    pub fn rename(&self, id: &str, name: &str) -> Result<Option<Collection>> {
        self.update(
            id,
            CollectionUpdate {
                name: Some(name.to_string()),
                apps: None,
            },
        )
    }

    /// Append an app unless one with the same path is already present
    pub fn add_app(&self, id: &str, app: App) -> Result<Option<Collection>> {
        self.modify(id, |collection| {
            if !collection.apps.iter().any(|existing| existing.has_path(&app.path)) {
                collection.apps.push(app);
            }
        })
    }

    pub fn remove_app(&self, id: &str, path: &Path) -> Result<Option<Collection>> {
        self.modify(id, |collection| {
            collection.apps.retain(|app| !app.has_path(path));
        })
    }

    /// Returns false when no collection had this id
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut data = self.storage.load()?;
        let before = data.collections.len();
        data.collections.retain(|c| c.id != id);

        if data.collections.len() == before {
            return Ok(false);
        }

        self.storage.save(&data)?;
        tracing::info!("Deleted collection {}", id);
        Ok(true)
    }

    /// Make `id` the only auto-start collection
    pub fn set_auto_start(&self, id: &str) -> Result<Option<Collection>> {
        let mut data = self.storage.load()?;
        if !data.collections.iter().any(|c| c.id == id) {
            return Ok(None);
        }

        let mut selected = None;
        for collection in data.collections.iter_mut() {
            collection.is_auto_start = collection.id == id;
            collection.touch();
            if collection.is_auto_start {
                selected = Some(collection.clone());
            }
        }

        self.storage.save(&data)?;
        Ok(selected)
    }

    pub fn clear_auto_start(&self) -> Result<()> {
        let mut data = self.storage.load()?;
        for collection in data.collections.iter_mut() {
            collection.is_auto_start = false;
        }
        self.storage.save(&data)
    }

    pub fn auto_start_collection(&self) -> Result<Option<Collection>> {
        Ok(self.list()?.into_iter().find(|c| c.is_auto_start))
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.storage.load()?.settings())
    }

    pub fn update_settings(&self, settings: Settings) -> Result<Settings> {
        let mut data = self.storage.load()?;
        data.settings = settings.into();
        self.storage.save(&data)?;
        Ok(data.settings())
    }

    fn modify<F>(&self, id: &str, f: F) -> Result<Option<Collection>>
    where
        F: FnOnce(&mut Collection),
    {
        let mut data = self.storage.load()?;
        let Some(collection) = data.collections.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };

        f(collection);
        collection.touch();
        let updated = collection.clone();

        self.storage.save(&data)?;
        Ok(Some(updated))
    }
}

impl CollectionSource for CollectionService {
    fn collection(&self, id: &str) -> Result<Option<Collection>> {
        self.get(id)
    }
}

impl SettingsSource for CollectionService {
    fn settings(&self) -> Result<Settings> {
        CollectionService::settings(self)
    }
}
