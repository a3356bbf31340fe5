//! Running-process discovery
//!
//! Reduces a raw OS process listing to the list of user-facing apps:
//! - drops entries without a readable, existing executable
//! - applies the exclusion policy
//! - collapses processes sharing an install directory into one app,
//!   preferring a "main" process over helpers
//! - sorts by display name and attaches cached icons
//!
//! `scan` never fails; collaborator errors are logged and produce an empty list.

use crate::config::{Settings, SettingsSource};
use crate::exclusion::{strip_exe_extension, ExclusionPolicy};
use crate::icon::IconResolver;
use crate::process::{ProcessBackend, RawProcess};
use crate::types::App;
use crossbeam::channel;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Substrings marking a process as a helper rather than the app itself
const HELPER_INDICATORS: &[&str] = &[
    "helper", "updater", "update", "broker", "renderer", "background",
    "service", "worker", "daemon", "installer", "agent", "crashpad",
    "crash_handler", "crashhandler", "crashreporter", "plugin",
];

/// How processes are collapsed into apps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupMode {
    /// One app per install directory, main process preferred over helpers
    #[default]
    ByDirectory,
    /// One app per exact executable path, first seen wins
    ByPath,
}

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub dedup: DedupMode,
    /// Skip icon extraction entirely (tests, headless listing)
    pub resolve_icons: bool,
    /// Upper bound on concurrent icon resolutions
    pub icon_workers: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            dedup: DedupMode::ByDirectory,
            resolve_icons: true,
            icon_workers: 8,
        }
    }
}

pub struct ProcessDiscovery {
    backend: Arc<dyn ProcessBackend>,
    settings: Arc<dyn SettingsSource>,
    icons: Option<Arc<IconResolver>>,
    policy: ExclusionPolicy,
    options: DiscoveryOptions,
}

/// A surviving process before it becomes an `App`
struct Candidate {
    name: String,
    path: PathBuf,
    helper: bool,
}

impl ProcessDiscovery {
    pub fn new(
        backend: Arc<dyn ProcessBackend>,
        settings: Arc<dyn SettingsSource>,
        icons: Option<Arc<IconResolver>>,
    ) -> Self {
        Self {
            backend,
            settings,
            icons,
            policy: ExclusionPolicy::new(),
            options: DiscoveryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Scan with the configured options
    pub fn scan(&self) -> Vec<App> {
        self.scan_with(&self.options)
    }

    /// Scan with per-call options
    pub fn scan_with(&self, options: &DiscoveryOptions) -> Vec<App> {
        let settings = self.settings.settings().unwrap_or_else(|e| {
            tracing::warn!("Failed to read settings, using defaults: {}", e);
            Settings::default()
        });
        let exclusions = settings.exclusions();

        let processes = match self.backend.list_processes() {
            Ok(processes) => processes,
            Err(e) => {
                tracing::error!("Failed to scan processes: {}", e);
                return Vec::new();
            }
        };
        let total = processes.len();

        let candidates = processes.into_iter().filter_map(|process| {
            let RawProcess { name, path } = process;
            let path = path.filter(|p| !p.as_os_str().is_empty())?;
            let name = name.trim().to_string();
            if name.is_empty() || !self.backend.executable_exists(&path) {
                return None;
            }
            if let Some(rule) = self.policy.matching_rule(&name, &path, &exclusions) {
                tracing::debug!("Excluded {} ({:?})", path.display(), rule);
                return None;
            }
            Some(Candidate {
                helper: is_helper_name(&name),
                name,
                path,
            })
        });

        let mut apps: Vec<App> = dedup(candidates, options.dedup)
            .into_iter()
            .map(|candidate| App::new(display_name(&candidate.name), candidate.path))
            .collect();
        apps.sort_by(compare_apps);

        tracing::info!("Discovered {} apps from {} processes", apps.len(), total);

        if options.resolve_icons {
            if let Some(resolver) = &self.icons {
                attach_icons(resolver, &mut apps, options.icon_workers);
            }
        }

        apps
    }
}

/// Whether a process name looks like a helper/background component
pub fn is_helper_name(name: &str) -> bool {
    let name = name.to_lowercase();
    let stem = strip_exe_extension(&name);
    HELPER_INDICATORS.iter().any(|indicator| stem.contains(indicator))
}

/// Process name without a trailing ".exe"
pub fn display_name(process_name: &str) -> String {
    strip_exe_extension(process_name.trim()).to_string()
}

/// Lowercased grouping key. Splits on both separators so Windows paths group
/// the same way whatever platform the listing is processed on.
fn dedup_key(path: &Path, mode: DedupMode) -> String {
    let path = path.to_string_lossy().to_lowercase();
    match mode {
        DedupMode::ByDirectory => match path.rfind(['\\', '/']) {
            Some(sep) if sep > 0 => path[..sep].to_string(),
            _ => path,
        },
        DedupMode::ByPath => path,
    }
}

fn dedup(candidates: impl Iterator<Item = Candidate>, mode: DedupMode) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let key = dedup_key(&candidate.path, mode);
        match index.get(&key).copied() {
            None => {
                index.insert(key, kept.len());
                kept.push(candidate);
            }
            Some(slot) => {
                // Only a main process displaces a helper; otherwise first seen wins
                if mode == DedupMode::ByDirectory && kept[slot].helper && !candidate.helper {
                    tracing::debug!(
                        "Preferring {} over helper {}",
                        candidate.name,
                        kept[slot].name
                    );
                    kept[slot] = candidate;
                }
            }
        }
    }

    kept
}

/// Name order that ignores case and Latin accents, with a total tie-break
fn compare_apps(a: &App, b: &App) -> Ordering {
    collation_key(&a.name)
        .cmp(&collation_key(&b.name))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| {
            a.path
                .to_string_lossy()
                .to_lowercase()
                .cmp(&b.path.to_string_lossy().to_lowercase())
        })
}

/// Lowercased name with accented Latin letters folded to their base letter
fn collation_key(name: &str) -> String {
    name.to_lowercase().chars().flat_map(fold_accent).collect()
}

fn fold_accent(c: char) -> impl Iterator<Item = char> {
    let folded: &[char] = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => &['a'],
        'æ' => &['a', 'e'],
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => &['c'],
        'ď' | 'đ' | 'ð' => &['d'],
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => &['e'],
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => &['g'],
        'ĥ' | 'ħ' => &['h'],
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => &['i'],
        'ĵ' => &['j'],
        'ķ' => &['k'],
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => &['l'],
        'ñ' | 'ń' | 'ņ' | 'ň' => &['n'],
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => &['o'],
        'œ' => &['o', 'e'],
        'ŕ' | 'ŗ' | 'ř' => &['r'],
        'ś' | 'ŝ' | 'ş' | 'š' => &['s'],
        'ß' => &['s', 's'],
        'ţ' | 'ť' | 'ŧ' => &['t'],
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => &['u'],
        'ŵ' => &['w'],
        'ý' | 'ÿ' | 'ŷ' => &['y'],
        'ź' | 'ż' | 'ž' => &['z'],
        'þ' => &['t', 'h'],
        _ => &[],
    };
    if folded.is_empty() {
        vec![c].into_iter()
    } else {
        folded.to_vec().into_iter()
    }
}

/// Resolve icons on a small worker pool; each app only ever gets its own result
fn attach_icons(resolver: &IconResolver, apps: &mut [App], workers: usize) {
    if apps.is_empty() {
        return;
    }

    let (job_tx, job_rx) = channel::unbounded::<(usize, PathBuf)>();
    let (done_tx, done_rx) = channel::unbounded::<(usize, Option<PathBuf>)>();

    for (i, app) in apps.iter().enumerate() {
        let _ = job_tx.send((i, app.path.clone()));
    }
    drop(job_tx);

    let workers = workers.clamp(1, apps.len());
    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                for (i, path) in job_rx.iter() {
                    let _ = done_tx.send((i, resolver.resolve(&path)));
                }
            });
        }
    });
    drop(done_tx);

    for (i, icon) in done_rx.iter() {
        apps[i].icon = icon;
    }
}
