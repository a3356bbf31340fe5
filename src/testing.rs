//! Test fixtures shared by module tests

use crate::error::{InitWindowError, Result};
use crate::process::{ProcessBackend, RawProcess};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

fn key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Scripted process backend. Paths compare case-insensitively.
#[derive(Default)]
pub struct FakeBackend {
    processes: Vec<RawProcess>,
    list_fails: bool,
    existing: HashSet<String>,
    running: HashSet<String>,
    start_failures: HashMap<String, String>,
    /// Shared log of "start:<path>" entries, interleaved with whatever else
    /// the test records (e.g. pacing sleeps)
    pub events: Arc<Mutex<Vec<String>>>,
}

impl FakeBackend {
    /// Running process whose executable exists on disk
    pub fn with_process(mut self, name: &str, path: &str) -> Self {
        self.processes.push(RawProcess::new(name, path));
        self.existing.insert(key(Path::new(path)));
        self
    }

    /// Running process whose executable path the OS would not reveal
    pub fn with_unreadable_process(mut self, name: &str) -> Self {
        self.processes.push(RawProcess {
            name: name.to_string(),
            path: None,
        });
        self
    }

    /// Listed process whose executable has since been deleted
    pub fn with_missing_process(mut self, name: &str, path: &str) -> Self {
        self.processes.push(RawProcess::new(name, path));
        self
    }

    /// Executable present on disk, not running
    pub fn with_installed(mut self, path: &str) -> Self {
        self.existing.insert(key(Path::new(path)));
        self
    }

    pub fn with_running(mut self, path: &str) -> Self {
        self.existing.insert(key(Path::new(path)));
        self.running.insert(key(Path::new(path)));
        self
    }

    pub fn with_start_failure(mut self, path: &str, reason: &str) -> Self {
        self.start_failures
            .insert(key(Path::new(path)), reason.to_string());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn with_events(mut self, events: Arc<Mutex<Vec<String>>>) -> Self {
        self.events = events;
        self
    }
}

impl ProcessBackend for FakeBackend {
    fn list_processes(&self) -> Result<Vec<RawProcess>> {
        if self.list_fails {
            return Err(InitWindowError::ProcessList("access denied".to_string()));
        }
        Ok(self.processes.clone())
    }

    fn start_process(&self, path: &Path) -> Result<()> {
        if let Some(reason) = self.start_failures.get(&key(path)) {
            return Err(InitWindowError::ProcessStart {
                path: path.to_path_buf(),
                reason: reason.clone(),
            });
        }
        self.events.lock().push(format!("start:{}", path.display()));
        Ok(())
    }

    fn is_running(&self, path: &Path) -> Result<bool> {
        Ok(self.running.contains(&key(path)))
    }

    fn executable_exists(&self, path: &Path) -> bool {
        self.existing.contains(&key(path))
    }
}
