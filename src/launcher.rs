//! Collection launch orchestration
//!
//! Apps are handled strictly in stored order, one at a time. Each one ends up
//! launched, skipped (already running) or failed (missing executable, start
//! error). A fixed pause follows every successful launch, and only those, so
//! starting a large collection does not spike system load.

use crate::collection::CollectionSource;
use crate::error::InitWindowError;
use crate::process::ProcessBackend;
use crate::types::{App, Collection, RunResult, RunResultItem};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause after each successful launch
pub const DEFAULT_LAUNCH_DELAY: Duration = Duration::from_millis(500);

pub const REASON_NOT_FOUND: &str = "Executable not found";
pub const REASON_ALREADY_RUNNING: &str = "Already running";
pub const REASON_UNKNOWN: &str = "Unknown error";

/// How the orchestrator waits between launches
pub type Pacer = Arc<dyn Fn(Duration) + Send + Sync>;

pub struct LaunchOrchestrator {
    collections: Arc<dyn CollectionSource>,
    backend: Arc<dyn ProcessBackend>,
    delay: Duration,
    pacer: Pacer,
}

impl LaunchOrchestrator {
    pub fn new(collections: Arc<dyn CollectionSource>, backend: Arc<dyn ProcessBackend>) -> Self {
        Self {
            collections,
            backend,
            delay: DEFAULT_LAUNCH_DELAY,
            pacer: Arc::new(thread::sleep),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Run the collection with this id. Never fails: an unknown id, or a
    /// lookup error, comes back as a single "Collection not found" failure.
    pub fn run(&self, collection_id: &str) -> RunResult {
        match self.collections.collection(collection_id) {
            Ok(Some(collection)) => self.run_collection(&collection),
            Ok(None) => {
                tracing::warn!("Collection {} not found", collection_id);
                RunResult::collection_not_found()
            }
            Err(e) => {
                tracing::error!("Failed to load collection {}: {}", collection_id, e);
                RunResult::collection_not_found()
            }
        }
    }

    /// Run an already loaded collection
    pub fn run_collection(&self, collection: &Collection) -> RunResult {
        tracing::info!(
            "Running collection '{}' ({} apps)",
            collection.name,
            collection.apps.len()
        );

        let mut result = RunResult::default();
        for app in &collection.apps {
            self.launch_one(app, &mut result);
        }

        tracing::info!("Collection '{}': {}", collection.name, result.summary());
        result
    }

    /// Whether a process started from `path` is running. Lookup errors count as "no".
    pub fn is_process_running(&self, path: &Path) -> bool {
        self.backend.is_running(path).unwrap_or_else(|e| {
            tracing::warn!("Running check failed for {}: {}", path.display(), e);
            false
        })
    }

    fn launch_one(&self, app: &App, result: &mut RunResult) {
        if !self.backend.executable_exists(&app.path) {
            tracing::warn!("{}: executable not found at {}", app.name, app.path.display());
            result
                .failed
                .push(RunResultItem::new(&app.name, REASON_NOT_FOUND));
            return;
        }

        if self.is_process_running(&app.path) {
            tracing::info!("{}: already running", app.name);
            result
                .skipped
                .push(RunResultItem::new(&app.name, REASON_ALREADY_RUNNING));
            return;
        }

        match self.backend.start_process(&app.path) {
            Ok(()) => {
                tracing::info!("{}: launched", app.name);
                result.launched.push(app.name.clone());
                (self.pacer)(self.delay);
            }
            Err(e) => {
                let reason = failure_reason(&e);
                tracing::warn!("{}: launch failed: {}", app.name, reason);
                result.failed.push(RunResultItem::new(&app.name, reason));
            }
        }
    }
}

/// The collaborator's own message, without our path prefix
fn failure_reason(error: &InitWindowError) -> String {
    let reason = match error {
        InitWindowError::ProcessStart { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    if reason.trim().is_empty() {
        REASON_UNKNOWN.to_string()
    } else {
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionService;
    use crate::error::Result;
    use crate::storage::MemoryStorage;
    use crate::testing::FakeBackend;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    /// Pacer that records into the same log as the fake backend
    fn recording_pacer(events: Arc<Mutex<Vec<String>>>) -> Pacer {
        Arc::new(move |delay: Duration| events.lock().push(format!("sleep:{}", delay.as_millis())))
    }

    fn setup(backend: FakeBackend, apps: Vec<App>) -> (LaunchOrchestrator, String, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let backend = backend.with_events(events.clone());
        let service = CollectionService::new(Arc::new(MemoryStorage::default()));
        let collection = service.create("Morning", apps).unwrap();
        let orchestrator = LaunchOrchestrator::new(Arc::new(service), Arc::new(backend))
            .with_pacer(recording_pacer(events.clone()));
        (orchestrator, collection.id, events)
    }

    #[test]
    fn test_missing_running_and_launchable() {
        let backend = FakeBackend::default()
            .with_running("C:\\B\\b.exe")
            .with_installed("C:\\C\\c.exe");
        let apps = vec![
            App::new("A", "C:\\A\\a.exe"),
            App::new("B", "C:\\B\\b.exe"),
            App::new("C", "C:\\C\\c.exe"),
        ];
        let (orchestrator, id, events) = setup(backend, apps);

        let result = orchestrator.run(&id);

        assert_eq!(
            result,
            RunResult {
                launched: vec!["C".to_string()],
                skipped: vec![RunResultItem::new("B", "Already running")],
                failed: vec![RunResultItem::new("A", "Executable not found")],
            }
        );
        // Exactly one pause, right after C was started
        assert_eq!(
            *events.lock(),
            vec!["start:C:\\C\\c.exe".to_string(), "sleep:500".to_string()]
        );
    }

    #[test]
    fn test_unknown_collection() {
        let (orchestrator, _, events) = setup(FakeBackend::default(), vec![]);
        let result = orchestrator.run("nonexistent");
        assert_eq!(result, RunResult::collection_not_found());
        assert!(events.lock().is_empty());
    }

    struct BrokenSource;

    impl CollectionSource for BrokenSource {
        fn collection(&self, _id: &str) -> Result<Option<Collection>> {
            Err(InitWindowError::io(
                "data.json",
                std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
            ))
        }
    }

    #[test]
    fn test_lookup_error_is_not_found() {
        let orchestrator =
            LaunchOrchestrator::new(Arc::new(BrokenSource), Arc::new(FakeBackend::default()));
        assert_eq!(orchestrator.run("any"), RunResult::collection_not_found());
    }

    #[test]
    fn test_launches_in_stored_order_with_pause_after_each() {
        let backend = FakeBackend::default()
            .with_installed("C:\\Z\\z.exe")
            .with_installed("C:\\A\\a.exe")
            .with_installed("C:\\M\\m.exe");
        let apps = vec![
            App::new("Z", "C:\\Z\\z.exe"),
            App::new("A", "C:\\A\\a.exe"),
            App::new("M", "C:\\M\\m.exe"),
        ];
        let (orchestrator, id, events) = setup(backend, apps);
        let orchestrator = orchestrator.with_delay(Duration::from_millis(250));

        let result = orchestrator.run(&id);
        assert_eq!(result.launched, vec!["Z", "A", "M"]);
        assert_eq!(
            *events.lock(),
            vec![
                "start:C:\\Z\\z.exe",
                "sleep:250",
                "start:C:\\A\\a.exe",
                "sleep:250",
                "start:C:\\M\\m.exe",
                "sleep:250",
            ]
        );
    }

    #[test]
    fn test_start_failure_reason_and_no_pause() {
        let backend = FakeBackend::default()
            .with_installed("C:\\X\\x.exe")
            .with_start_failure("C:\\X\\x.exe", "The requested operation requires elevation.")
            .with_installed("C:\\Y\\y.exe")
            .with_start_failure("C:\\Y\\y.exe", "");
        let apps = vec![App::new("X", "C:\\X\\x.exe"), App::new("Y", "C:\\Y\\y.exe")];
        let (orchestrator, id, events) = setup(backend, apps);

        let result = orchestrator.run(&id);
        assert!(result.launched.is_empty());
        assert_eq!(
            result.failed,
            vec![
                RunResultItem::new("X", "The requested operation requires elevation."),
                RunResultItem::new("Y", "Unknown error"),
            ]
        );
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_is_process_running() {
        let backend = FakeBackend::default().with_running("C:\\B\\b.exe");
        let (orchestrator, _, _) = setup(backend, vec![]);
        assert!(orchestrator.is_process_running(&PathBuf::from("c:\\b\\B.EXE")));
        assert!(!orchestrator.is_process_running(&PathBuf::from("C:\\C\\c.exe")));
    }

    #[test]
    fn test_real_sleep_is_default() {
        let backend = FakeBackend::default().with_installed("C:\\Q\\q.exe");
        let service = CollectionService::new(Arc::new(MemoryStorage::default()));
        let collection = service.create("Q", vec![App::new("Q", "C:\\Q\\q.exe")]).unwrap();
        let orchestrator = LaunchOrchestrator::new(Arc::new(service), Arc::new(backend))
            .with_delay(Duration::from_millis(30));

        let started = std::time::Instant::now();
        let result = orchestrator.run(&collection.id);
        assert_eq!(result.launched, vec!["Q"]);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
