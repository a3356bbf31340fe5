/// Configuration module for Init Window.
///
/// This module provides:
/// - The strongly typed `Settings` with every recognised option
/// - `PartialSettings`, the shape the persisted document may actually contain
/// - `merge_with_defaults`, which turns the latter into the former
/// - Resolution of the application data directory and the icon cache
///
/// Data lives in the platform-specific application data directory
/// (%APPDATA%/InitWindow/ on Windows) unless `INIT_WINDOW_DATA_DIR` is set.
///
/// # Example
///
/// ```rust
/// use init_window::config::{merge_with_defaults, PartialSettings};
///
/// let partial = PartialSettings {
///     auto_start_delay_secs: Some(30),
///     ..Default::default()
/// };
/// let settings = merge_with_defaults(partial);
/// assert_eq!(settings.auto_start_delay_secs, 30);
/// assert!(settings.minimize_to_tray);
/// ```
use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "INIT_WINDOW_DATA_DIR";

/// File holding collections and settings
pub const DATA_FILE_NAME: &str = "data.json";

/// Sub-directory of the data directory holding cached icons
pub const ICON_CACHE_DIR_NAME: &str = "icons";

/// Complete application settings
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Seconds to wait after startup before running the auto-start collection
    pub auto_start_delay_secs: u64,
    /// Whether a run result should be surfaced as a notification
    pub show_notifications: bool,
    /// Hide instead of closing when the window is closed
    pub minimize_to_tray: bool,
    /// Process names (lowercase, with extension) hidden from discovery
    pub excluded_process_names: Vec<String>,
    /// Path prefixes hidden from discovery
    pub excluded_paths: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_start_delay_secs: 15,
            show_notifications: true,
            minimize_to_tray: true,
            excluded_process_names: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }
}

impl Settings {
    /// The subset of settings discovery needs
    pub fn exclusions(&self) -> ExclusionSettings {
        ExclusionSettings {
            excluded_process_names: self
                .excluded_process_names
                .iter()
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
            excluded_paths: self
                .excluded_paths
                .iter()
                .map(|path| path.trim().to_string())
                .filter(|path| !path.is_empty())
                .collect(),
        }
    }
}

/// Settings as stored on disk. Any field may be missing (older data files,
/// hand edits); `merge_with_defaults` fills the gaps.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartialSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_start_delay_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimize_to_tray: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_process_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_paths: Option<Vec<String>>,
}

impl From<Settings> for PartialSettings {
    fn from(settings: Settings) -> Self {
        PartialSettings {
            auto_start_delay_secs: Some(settings.auto_start_delay_secs),
            show_notifications: Some(settings.show_notifications),
            minimize_to_tray: Some(settings.minimize_to_tray),
            excluded_process_names: Some(settings.excluded_process_names),
            excluded_paths: Some(settings.excluded_paths),
        }
    }
}

/// Fill every missing option from `Settings::default()`
pub fn merge_with_defaults(partial: PartialSettings) -> Settings {
    let defaults = Settings::default();
    Settings {
        auto_start_delay_secs: partial
            .auto_start_delay_secs
            .unwrap_or(defaults.auto_start_delay_secs),
        show_notifications: partial
            .show_notifications
            .unwrap_or(defaults.show_notifications),
        minimize_to_tray: partial.minimize_to_tray.unwrap_or(defaults.minimize_to_tray),
        excluded_process_names: partial
            .excluded_process_names
            .unwrap_or(defaults.excluded_process_names),
        excluded_paths: partial.excluded_paths.unwrap_or(defaults.excluded_paths),
    }
}

/// Where discovery and the auto-start runner read settings from
pub trait SettingsSource: Send + Sync {
    fn settings(&self) -> crate::error::Result<Settings>;
}

/// Fixed settings
impl SettingsSource for Settings {
    fn settings(&self) -> crate::error::Result<Settings> {
        Ok(self.clone())
    }
}

/// User-configured exclusions, normalised for matching
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusionSettings {
    /// Lowercase process names
    pub excluded_process_names: Vec<String>,
    /// Path prefixes as entered by the user
    pub excluded_paths: Vec<String>,
}

/// Get the application's data directory
/// Returns %APPDATA%/InitWindow/ on Windows
/// Creates directory if it doesn't exist
pub fn get_data_directory() -> Result<PathBuf> {
    let data_dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => ProjectDirs::from("", "", "InitWindow")
            .ok_or_else(|| anyhow!("Failed to determine user data directory"))?
            .data_dir()
            .to_path_buf(),
    };

    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    Ok(data_dir)
}

/// Path of the JSON document holding collections and settings
pub fn get_data_file() -> Result<PathBuf> {
    Ok(get_data_directory()?.join(DATA_FILE_NAME))
}

/// Get the icon cache directory, creating it if needed
pub fn get_icon_cache_directory() -> Result<PathBuf> {
    let dir = get_data_directory()?.join(ICON_CACHE_DIR_NAME);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create icon cache {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.auto_start_delay_secs, 15);
        assert!(settings.show_notifications);
        assert!(settings.minimize_to_tray);
        assert!(settings.excluded_process_names.is_empty());
        assert!(settings.excluded_paths.is_empty());
    }

    #[test]
    fn test_merge_empty_partial_is_default() {
        assert_eq!(merge_with_defaults(PartialSettings::default()), Settings::default());
    }

    #[test]
    fn test_merge_keeps_present_fields() {
        let partial = PartialSettings {
            show_notifications: Some(false),
            excluded_paths: Some(vec!["D:\\Tools".to_string()]),
            ..Default::default()
        };
        let settings = merge_with_defaults(partial);
        assert!(!settings.show_notifications);
        assert_eq!(settings.excluded_paths, vec!["D:\\Tools".to_string()]);
        assert_eq!(settings.auto_start_delay_secs, 15);
        assert!(settings.excluded_process_names.is_empty());
    }

    #[test]
    fn test_merge_from_old_document() {
        // Data files written before exclusion lists existed
        let json = r#"{"autoStartDelaySecs": 5, "showNotifications": true, "minimizeToTray": false}"#;
        let partial: PartialSettings = serde_json::from_str(json).unwrap();
        let settings = merge_with_defaults(partial);
        assert_eq!(settings.auto_start_delay_secs, 5);
        assert!(!settings.minimize_to_tray);
        assert!(settings.excluded_process_names.is_empty());
    }

    #[test]
    fn test_partial_round_trips_complete_settings() {
        let settings = Settings {
            auto_start_delay_secs: 42,
            excluded_process_names: vec!["steam.exe".to_string()],
            ..Settings::default()
        };
        let merged = merge_with_defaults(PartialSettings::from(settings.clone()));
        assert_eq!(merged, settings);
    }

    #[test]
    fn test_exclusions_are_normalised() {
        let settings = Settings {
            excluded_process_names: vec![" Steam.EXE ".to_string(), "".to_string()],
            excluded_paths: vec!["  ".to_string(), "D:\\Games".to_string()],
            ..Settings::default()
        };
        let exclusions = settings.exclusions();
        assert_eq!(exclusions.excluded_process_names, vec!["steam.exe".to_string()]);
        assert_eq!(exclusions.excluded_paths, vec!["D:\\Games".to_string()]);
    }
}
