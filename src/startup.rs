//! Startup integration
//!
//! - `LoginItem`: the per-user "run at login" registry entry
//! - `AutoStartRunner`: runs the auto-start collection once the configured
//!   delay after application start has passed

use crate::engine::Engine;
use crate::error::{InitWindowError, Result};
use crate::launcher::Pacer;
use crate::types::RunResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Command-line flag the login entry passes to the binary
pub const AUTO_START_FLAG: &str = "--auto-start";

/// Registry value name under the Run key
pub const LOGIN_ITEM_NAME: &str = "InitWindow";

/// HKCU sub-key holding per-user login commands
pub const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

pub struct LoginItem {
    exe: PathBuf,
}

impl LoginItem {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    /// Login item for the running executable
    pub fn current() -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| InitWindowError::io("current executable", e))?;
        Ok(Self::new(exe))
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Command stored in the registry
    pub fn command(&self) -> String {
        format!("\"{}\" {}", self.exe.display(), AUTO_START_FLAG)
    }

    #[cfg(windows)]
    pub fn enable(&self) -> Result<()> {
        registry::set_value(LOGIN_ITEM_NAME, &self.command())?;
        tracing::info!("Login item enabled: {}", self.command());
        Ok(())
    }

    /// Succeeds when the entry is already absent
    #[cfg(windows)]
    pub fn disable(&self) -> Result<()> {
        registry::delete_value(LOGIN_ITEM_NAME)?;
        tracing::info!("Login item disabled");
        Ok(())
    }

    #[cfg(windows)]
    pub fn is_enabled(&self) -> bool {
        registry::value_exists(LOGIN_ITEM_NAME)
    }

    #[cfg(not(windows))]
    pub fn enable(&self) -> Result<()> {
        Err(InitWindowError::Unsupported("run at login"))
    }

    #[cfg(not(windows))]
    pub fn disable(&self) -> Result<()> {
        Err(InitWindowError::Unsupported("run at login"))
    }

    #[cfg(not(windows))]
    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(windows)]
mod registry {
    use super::RUN_KEY;
    use crate::error::{InitWindowError, Result};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS, WIN32_ERROR};
    use windows::Win32::System::Registry::{
        RegCloseKey, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
        HKEY_CURRENT_USER, KEY_QUERY_VALUE, KEY_SET_VALUE, REG_SAM_FLAGS, REG_SZ,
    };

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(Some(0)).collect()
    }

    fn check(status: WIN32_ERROR, what: &str) -> Result<()> {
        if status == ERROR_SUCCESS {
            Ok(())
        } else {
            Err(InitWindowError::LoginItem(format!("{what} failed: {status:?}")))
        }
    }

    /// Open the Run key, call `f`, close the key
    fn with_run_key<T>(access: REG_SAM_FLAGS, f: impl FnOnce(HKEY) -> Result<T>) -> Result<T> {
        let subkey = wide(RUN_KEY);
        let mut key = HKEY::default();
        check(
            unsafe { RegOpenKeyExW(HKEY_CURRENT_USER, PCWSTR(subkey.as_ptr()), 0, access, &mut key) },
            "RegOpenKeyExW",
        )?;

        let result = f(key);
        unsafe {
            let _ = RegCloseKey(key);
        }
        result
    }

    pub fn set_value(name: &str, data: &str) -> Result<()> {
        let name = wide(name);
        let bytes: Vec<u8> = wide(data).iter().flat_map(|unit| unit.to_le_bytes()).collect();

        with_run_key(KEY_SET_VALUE, |key| {
            check(
                unsafe { RegSetValueExW(key, PCWSTR(name.as_ptr()), 0, REG_SZ, Some(&bytes)) },
                "RegSetValueExW",
            )
        })
    }

    pub fn delete_value(name: &str) -> Result<()> {
        let name = wide(name);
        with_run_key(KEY_SET_VALUE, |key| {
            let status = unsafe { RegDeleteValueW(key, PCWSTR(name.as_ptr())) };
            if status == ERROR_FILE_NOT_FOUND {
                return Ok(());
            }
            check(status, "RegDeleteValueW")
        })
    }

    pub fn value_exists(name: &str) -> bool {
        let name = wide(name);
        with_run_key(KEY_QUERY_VALUE, |key| {
            let status =
                unsafe { RegQueryValueExW(key, PCWSTR(name.as_ptr()), None, None, None, None) };
            Ok(status == ERROR_SUCCESS)
        })
        .unwrap_or(false)
    }
}

/// Runs the auto-start collection after the configured delay
pub struct AutoStartRunner<'a> {
    engine: &'a Engine,
    pacer: Pacer,
}

impl<'a> AutoStartRunner<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            pacer: Arc::new(thread::sleep),
        }
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// `None` when no collection is marked for auto-start
    pub fn run(&self) -> Option<RunResult> {
        let collections = self.engine.collections();

        let collection = match collections.auto_start_collection() {
            Ok(Some(collection)) => collection,
            Ok(None) => {
                tracing::info!("No auto-start collection configured");
                return None;
            }
            Err(e) => {
                tracing::error!("Failed to read collections: {}", e);
                return None;
            }
        };

        let delay = collections
            .settings()
            .map(|s| Duration::from_secs(s.auto_start_delay_secs))
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to read settings, using default delay: {}", e);
                Duration::from_secs(crate::config::Settings::default().auto_start_delay_secs)
            });

        tracing::info!(
            "Running auto-start collection '{}' in {}s",
            collection.name,
            delay.as_secs()
        );
        (self.pacer)(delay);

        // The flag may have moved or been cleared during the wait
        match collections.auto_start_collection() {
            Ok(Some(current)) => Some(self.engine.orchestrator().run_collection(&current)),
            Ok(None) => {
                tracing::info!("Auto-start cleared during the startup delay");
                None
            }
            Err(e) => {
                tracing::error!("Failed to read collections: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::storage::MemoryStorage;
    use crate::testing::FakeBackend;
    use crate::types::App;
    use parking_lot::Mutex;

    #[test]
    fn test_login_command_quotes_path() {
        let item = LoginItem::new("C:\\Program Files\\Init Window\\init_window.exe");
        assert_eq!(
            item.command(),
            "\"C:\\Program Files\\Init Window\\init_window.exe\" --auto-start"
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_login_item_unsupported() {
        let item = LoginItem::new("/usr/bin/init_window");
        assert!(matches!(item.enable(), Err(InitWindowError::Unsupported(_))));
        assert!(!item.is_enabled());
    }

    #[test]
    fn test_no_auto_start_collection() {
        let engine = Engine::new(
            Arc::new(MemoryStorage::default()),
            Arc::new(FakeBackend::default()),
            None,
        );
        let waited = Arc::new(Mutex::new(Vec::new()));
        let log = waited.clone();
        let runner = AutoStartRunner::new(&engine).with_pacer(Arc::new(move |d| log.lock().push(d)));

        assert!(runner.run().is_none());
        assert!(waited.lock().is_empty());
    }

    #[test]
    fn test_waits_configured_delay_then_runs() {
        let storage = Arc::new(MemoryStorage::with_settings(Settings {
            auto_start_delay_secs: 7,
            ..Settings::default()
        }));
        let backend = FakeBackend::default().with_running("C:\\Mail\\mail.exe");
        let engine = Engine::new(storage, Arc::new(backend), None);

        let other = engine.collections().create("Other", vec![]).unwrap();
        let auto = engine
            .collections()
            .create("Morning", vec![App::new("Mail", "C:\\Mail\\mail.exe")])
            .unwrap();
        engine.collections().set_auto_start(&auto.id).unwrap();
        assert_ne!(other.id, auto.id);

        let waited = Arc::new(Mutex::new(Vec::new()));
        let log = waited.clone();
        let runner = AutoStartRunner::new(&engine).with_pacer(Arc::new(move |d| log.lock().push(d)));

        let result = runner.run().unwrap();
        assert_eq!(*waited.lock(), vec![Duration::from_secs(7)]);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].app, "Mail");
    }

    #[test]
    fn test_runs_collection_flagged_after_delay() {
        let backend = FakeBackend::default()
            .with_running("C:\\Mail\\mail.exe")
            .with_running("C:\\Games\\launcher.exe");
        let engine = Engine::new(Arc::new(MemoryStorage::default()), Arc::new(backend), None);
        let engine = Arc::new(engine);

        let morning = engine
            .collections()
            .create("Morning", vec![App::new("Mail", "C:\\Mail\\mail.exe")])
            .unwrap();
        let evening = engine
            .collections()
            .create("Evening", vec![App::new("Launcher", "C:\\Games\\launcher.exe")])
            .unwrap();
        engine.collections().set_auto_start(&morning.id).unwrap();

        // User switches the auto-start collection while the runner waits
        let during_wait = engine.clone();
        let evening_id = evening.id.clone();
        let runner = AutoStartRunner::new(&engine).with_pacer(Arc::new(move |_| {
            during_wait.collections().set_auto_start(&evening_id).unwrap();
        }));

        let result = runner.run().unwrap();
        assert_eq!(result.skipped, vec![crate::types::RunResultItem::new("Launcher", "Already running")]);
    }

    #[test]
    fn test_auto_start_cleared_during_delay() {
        let engine = Arc::new(Engine::new(
            Arc::new(MemoryStorage::default()),
            Arc::new(FakeBackend::default()),
            None,
        ));
        let morning = engine.collections().create("Morning", vec![]).unwrap();
        engine.collections().set_auto_start(&morning.id).unwrap();

        let during_wait = engine.clone();
        let runner = AutoStartRunner::new(&engine).with_pacer(Arc::new(move |_| {
            during_wait.collections().clear_auto_start().unwrap();
        }));

        assert!(runner.run().is_none());
    }
}
