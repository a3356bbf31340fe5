//! Core data model: discovered apps, stored collections and run outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One launchable executable, either freshly discovered or stored in a collection.
///
/// `id` is regenerated on every scan; persisted associations must key on `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    /// Cached PNG for this executable, if one could be resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
}

impl App {
    /// Create an app with a fresh id and no icon
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            path: path.into(),
            icon: None,
        }
    }

    /// Case-insensitive path comparison (Windows paths)
    pub fn has_path(&self, path: &Path) -> bool {
        paths_equal(&self.path, path)
    }
}

/// A named, ordered group of app snapshots launched together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub apps: Vec<App>,
    #[serde(default)]
    pub is_auto_start: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(name: impl Into<String>, apps: Vec<App>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            apps,
            is_auto_start: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A skipped or failed app together with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResultItem {
    pub app: String,
    pub reason: String,
}

impl RunResultItem {
    pub fn new(app: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of one collection run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub launched: Vec<String>,
    pub skipped: Vec<RunResultItem>,
    pub failed: Vec<RunResultItem>,
}

impl RunResult {
    /// Result returned when the requested collection does not exist
    pub fn collection_not_found() -> Self {
        Self {
            failed: vec![RunResultItem::new("Unknown", "Collection not found")],
            ..Self::default()
        }
    }

    /// Short one-line description, used for logging and notifications
    pub fn summary(&self) -> String {
        format!(
            "{} launched, {} skipped, {} failed",
            self.launched.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Compare two paths the way Windows does: ignoring ASCII/Unicode case
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_ids_are_fresh() {
        let a = App::new("Code", "C:\\Code\\Code.exe");
        let b = App::new("Code", "C:\\Code\\Code.exe");
        assert_ne!(a.id, b.id);
        assert!(a.has_path(Path::new("c:\\code\\code.EXE")));
    }

    #[test]
    fn test_collection_serializes_camel_case() {
        let collection = Collection::new("Work", vec![App::new("Slack", "C:\\Slack\\slack.exe")]);
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["isAutoStart"], false);
        assert!(json.get("createdAt").is_some());
        // Apps without an icon omit the field entirely
        assert!(json["apps"][0].get("icon").is_none());
    }

    #[test]
    fn test_collection_not_found_shape() {
        let result = RunResult::collection_not_found();
        assert!(result.launched.is_empty());
        assert!(result.skipped.is_empty());
        assert_eq!(
            result.failed,
            vec![RunResultItem::new("Unknown", "Collection not found")]
        );
    }

    #[test]
    fn test_summary() {
        let result = RunResult {
            launched: vec!["A".into(), "B".into()],
            skipped: vec![RunResultItem::new("C", "Already running")],
            failed: vec![],
        };
        assert_eq!(result.summary(), "2 launched, 1 skipped, 0 failed");
    }
}
