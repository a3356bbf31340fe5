/// Operating system process collaborator
///
/// Everything the discovery and launch logic needs from the OS goes through
/// `ProcessBackend`, so tests can swap in a scripted fake.
use crate::error::{InitWindowError, Result};
use crate::types::paths_equal;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use sysinfo::{ProcessRefreshKind, System};

/// One entry of a raw process listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProcess {
    /// Image name as reported by the OS, e.g. "Code.exe"
    pub name: String,
    /// Executable path, when the OS let us read it
    pub path: Option<PathBuf>,
}

impl RawProcess {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
        }
    }
}

pub trait ProcessBackend: Send + Sync {
    /// All running processes, in OS listing order
    fn list_processes(&self) -> Result<Vec<RawProcess>>;

    /// Start the executable, detached from this process
    fn start_process(&self, path: &Path) -> Result<()>;

    /// Whether a process running from `path` exists right now
    fn is_running(&self, path: &Path) -> Result<bool>;

    /// Best-effort on-disk check
    fn executable_exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Real backend: sysinfo for listing, `std::process::Command` for starting
#[derive(Debug, Default)]
pub struct SystemProcessBackend;

impl SystemProcessBackend {
    pub fn new() -> Self {
        Self
    }

    fn snapshot() -> System {
        let mut system = System::new();
        system.refresh_processes_specifics(ProcessRefreshKind::everything());
        system
    }
}

impl ProcessBackend for SystemProcessBackend {
    fn list_processes(&self) -> Result<Vec<RawProcess>> {
        let system = Self::snapshot();

        let mut processes: Vec<_> = system.processes().iter().collect();
        if processes.is_empty() {
            return Err(InitWindowError::ProcessList(
                "process table is empty".to_string(),
            ));
        }
        processes.sort_by_key(|(pid, _)| **pid);

        Ok(processes
            .into_iter()
            .map(|(_, process)| RawProcess {
                name: process.name().to_string(),
                path: process
                    .exe()
                    .filter(|exe| !exe.as_os_str().is_empty())
                    .map(Path::to_path_buf),
            })
            .collect())
    }

    fn start_process(&self, path: &Path) -> Result<()> {
        let mut command = Command::new(path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if let Some(dir) = path.parent().filter(|dir| dir.is_dir()) {
            command.current_dir(dir);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::{CREATE_NEW_PROCESS_GROUP, DETACHED_PROCESS};

            command.creation_flags(DETACHED_PROCESS.0 | CREATE_NEW_PROCESS_GROUP.0);
        }

        let child = command.spawn().map_err(|e| InitWindowError::ProcessStart {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Spawned {} (pid {})", path.display(), child.id());
        Ok(())
    }

    fn is_running(&self, path: &Path) -> Result<bool> {
        let system = Self::snapshot();
        let image_name = path.file_name().map(|name| name.to_string_lossy().to_lowercase());

        Ok(system.processes().values().any(|process| match process.exe() {
            Some(exe) if !exe.as_os_str().is_empty() => paths_equal(exe, path),
            // Path not readable (elevated or protected process): fall back to the image name
            _ => image_name
                .as_deref()
                .is_some_and(|image| process.name().to_lowercase() == image),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_contains_current_process() {
        let backend = SystemProcessBackend::new();
        let processes = backend.list_processes().unwrap();
        assert!(!processes.is_empty());

        let me = std::env::current_exe().unwrap();
        assert!(backend.is_running(&me).unwrap());
    }

    #[test]
    fn test_missing_executable_is_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = dir.path().join("definitely-not-running-4b1d.bin");
        let backend = SystemProcessBackend::new();
        assert!(!backend.is_running(&ghost).unwrap());
        assert!(!backend.executable_exists(&ghost));
    }

    #[test]
    fn test_start_missing_executable_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = dir.path().join("missing.exe");
        let err = SystemProcessBackend::new().start_process(&ghost).unwrap_err();
        assert!(matches!(err, InitWindowError::ProcessStart { .. }));
    }
}
