/// Decides which discovered processes are hidden from the user
///
/// Built-in rules cover OS core processes, shell components, search and
/// indexing, security and update services, common developer tooling, this
/// application itself and common OEM utilities. Users extend them with
/// names and path prefixes from settings.
use crate::config::ExclusionSettings;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::Path;

/// Built-in excluded process names (lowercase)
const BUILTIN_EXCLUDED_NAMES: &[&str] = &[
    // OS core
    "system", "registry", "idle", "memory compression", "secure system",
    "smss.exe", "csrss.exe", "wininit.exe", "winlogon.exe", "services.exe",
    "lsass.exe", "lsaiso.exe", "svchost.exe", "fontdrvhost.exe", "dwm.exe",
    "sihost.exe", "taskhostw.exe", "ctfmon.exe", "conhost.exe", "dllhost.exe",
    "spoolsv.exe", "wudfhost.exe", "dashost.exe", "wmiprvse.exe", "msdtc.exe",
    "vdsldr.exe", "vds.exe", "audiodg.exe", "unsecapp.exe", "smartscreen.exe",
    "userinit.exe", "logonui.exe", "lockapp.exe",
    // Shell
    "runtimebroker.exe", "shellexperiencehost.exe", "startmenuexperiencehost.exe",
    "textinputhost.exe", "applicationframehost.exe", "systemsettings.exe",
    "backgroundtaskhost.exe", "shellhost.exe", "widgets.exe", "widgetservice.exe",
    "gamebar.exe", "gamebarftserver.exe", "phoneexperiencehost.exe",
    "crossdeviceresume.exe", "useroobebroker.exe",
    // Search and indexing
    "searchui.exe", "searchapp.exe", "searchhost.exe", "searchindexer.exe",
    "searchprotocolhost.exe", "searchfilterhost.exe",
    // Security and updates
    "securityhealthservice.exe", "securityhealthsystray.exe", "sgrmbroker.exe",
    "msmpeng.exe", "nissrv.exe", "mpdefendercoreservice.exe",
    "trustedinstaller.exe", "tiworker.exe", "msiexec.exe",
    "musnotification.exe", "musnotifyicon.exe", "usocoreworker.exe",
    "wuauclt.exe", "compattelrunner.exe", "mousocoreworker.exe",
    // Developer tooling
    "cmd.exe", "powershell.exe", "pwsh.exe", "windowsterminal.exe",
    "openconsole.exe", "wsl.exe", "wslhost.exe", "wslservice.exe", "openssh.exe",
    "ssh.exe", "ssh-agent.exe", "git.exe", "node.exe", "python.exe", "pythonw.exe",
    "cargo.exe", "rustc.exe", "rust-analyzer.exe", "electron.exe",
    // This application
    "init_window.exe", "init-window.exe", "initwindow.exe",
    // OEM utilities
    "igfxem.exe", "igfxtray.exe", "igfxhk.exe", "nvcontainer.exe",
    "nvdisplay.container.exe", "nvidia share.exe", "nvidia web helper.exe",
    "radeonsoftware.exe", "amdrsserv.exe", "rtkauduservice64.exe",
    "realtekaudioservice.exe", "lenovovantageservice.exe", "dellsupportassistremedationservice.exe",
    "hpsupportsolutionsframeworkservice.exe", "asusoptimization.exe",
];

/// Built-in excluded entries under the Windows directory (lowercase)
const BUILTIN_WINDOWS_ENTRIES: &[&str] = &[
    "system32\\",
    "syswow64\\",
    "systemapps\\",
    "winsxs\\",
    "servicing\\",
    "immersivecontrolpanel\\",
    // The shell itself lives directly under the Windows directory
    "explorer.exe",
];

/// Used when neither `SystemRoot` nor `windir` is set
const DEFAULT_WINDOWS_DIR: &str = "c:\\windows";

static EXCLUDED_NAMES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| BUILTIN_EXCLUDED_NAMES.iter().copied().collect());

/// Which rule caused a process to be hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionRule {
    BuiltinName,
    BuiltinPath,
    UserName,
    UserPath,
}

/// Every decision depends only on its arguments and the built-in tables,
/// which are fixed when the policy is built.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    system_prefixes: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusionPolicy {
    /// Policy for the Windows directory named by `SystemRoot` (or `windir`)
    pub fn new() -> Self {
        let root = std::env::var("SystemRoot")
            .or_else(|_| std::env::var("windir"))
            .ok();
        Self::with_windows_dir(root.as_deref())
    }

    /// Policy for an explicit Windows directory. `C:\Windows` is always covered.
    pub fn with_windows_dir(windows_dir: Option<&str>) -> Self {
        let mut roots = vec![DEFAULT_WINDOWS_DIR.to_string()];
        if let Some(dir) = windows_dir {
            let dir = dir.trim().trim_end_matches(['\\', '/']).to_lowercase();
            if !dir.is_empty() && !roots.contains(&dir) {
                roots.push(dir);
            }
        }

        let system_prefixes = roots
            .iter()
            .flat_map(|root| {
                BUILTIN_WINDOWS_ENTRIES
                    .iter()
                    .map(move |entry| format!("{root}\\{entry}"))
            })
            .collect();
        Self { system_prefixes }
    }

    pub fn should_exclude(&self, name: &str, path: &Path, settings: &ExclusionSettings) -> bool {
        self.matching_rule(name, path, settings).is_some()
    }

    /// First matching rule, in decision order
    pub fn matching_rule(
        &self,
        name: &str,
        path: &Path,
        settings: &ExclusionSettings,
    ) -> Option<ExclusionRule> {
        let name = name.trim().to_lowercase();
        let stem = strip_exe_extension(&name);
        let path = path.to_string_lossy().to_lowercase();

        let with_ext = format!("{stem}.exe");
        if EXCLUDED_NAMES.contains(name.as_str()) || EXCLUDED_NAMES.contains(with_ext.as_str()) {
            return Some(ExclusionRule::BuiltinName);
        }

        if self
            .system_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Some(ExclusionRule::BuiltinPath);
        }

        // User names may be entered with or without ".exe"
        if settings.excluded_process_names.iter().any(|excluded| {
            let excluded = excluded.to_lowercase();
            excluded == name || strip_exe_extension(&excluded) == stem
        }) {
            return Some(ExclusionRule::UserName);
        }

        if settings
            .excluded_paths
            .iter()
            .any(|prefix| path.starts_with(&prefix.to_lowercase()))
        {
            return Some(ExclusionRule::UserPath);
        }

        None
    }
}

/// Strip a trailing ".exe" (case-insensitive)
pub fn strip_exe_extension(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe") {
        &name[..len - 4]
    } else {
        name
    }
}
