//! Init Window command-line front end
//!
//! Every command prints JSON on stdout; logs go to stderr.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use init_window::discovery::{display_name, DedupMode, DiscoveryOptions};
use init_window::startup::{AutoStartRunner, LoginItem};
use init_window::{App, Engine};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "init_window", version, about = "Relaunch your working set of apps")]
struct Cli {
    /// Run the auto-start collection after the configured delay, then exit
    #[arg(long, global = true)]
    auto_start: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List running user applications
    Scan {
        /// Skip icon extraction
        #[arg(long)]
        no_icons: bool,
        /// Deduplicate by exact executable path instead of install directory
        #[arg(long)]
        exact_path: bool,
    },
    /// List stored collections
    List,
    Show {
        id: String,
    },
    Create {
        name: String,
        paths: Vec<PathBuf>,
    },
    Rename {
        id: String,
        name: String,
    },
    AddApp {
        id: String,
        path: PathBuf,
    },
    RemoveApp {
        id: String,
        path: PathBuf,
    },
    Delete {
        id: String,
    },
    /// Choose or clear the collection run at login
    AutoStart {
        #[command(subcommand)]
        action: AutoStartAction,
    },
    /// Launch every app of a collection that is not already running
    Run {
        id: String,
    },
    IsRunning {
        path: PathBuf,
    },
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Manage the run-at-login entry
    Login {
        #[command(subcommand)]
        action: LoginAction,
    },
}

#[derive(Subcommand)]
enum AutoStartAction {
    Set { id: String },
    Clear,
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Hide a process name from scans
    ExcludeName { name: String },
    /// Hide every executable under a path prefix from scans
    ExcludePath { path: String },
}

#[derive(Subcommand)]
enum LoginAction {
    Enable,
    Disable,
    Status,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn app_from_path(path: &Path) -> App {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    App::new(display_name(&file_name), path)
}

fn found<T>(value: Option<T>, id: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("Collection not found: {}", id))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = Engine::open_default().context("Failed to open data directory")?;

    if cli.auto_start {
        return print_json(&AutoStartRunner::new(&engine).run());
    }

    let Some(command) = cli.command else {
        return print_json(&engine.collections().list()?);
    };

    let collections = engine.collections();
    match command {
        Command::Scan {
            no_icons,
            exact_path,
        } => {
            let options = DiscoveryOptions {
                dedup: if exact_path {
                    DedupMode::ByPath
                } else {
                    DedupMode::ByDirectory
                },
                resolve_icons: !no_icons,
                ..DiscoveryOptions::default()
            };
            print_json(&engine.discovery().scan_with(&options))
        }
        Command::List => print_json(&collections.list()?),
        Command::Show { id } => print_json(&found(collections.get(&id)?, &id)?),
        Command::Create { name, paths } => {
            let apps = paths.iter().map(|p| app_from_path(p)).collect();
            print_json(&collections.create(&name, apps)?)
        }
        Command::Rename { id, name } => print_json(&found(collections.rename(&id, &name)?, &id)?),
        Command::AddApp { id, path } => {
            print_json(&found(collections.add_app(&id, app_from_path(&path))?, &id)?)
        }
        Command::RemoveApp { id, path } => {
            print_json(&found(collections.remove_app(&id, &path)?, &id)?)
        }
        Command::Delete { id } => {
            if !collections.delete(&id)? {
                return Err(anyhow!("Collection not found: {}", id));
            }
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::AutoStart { action } => match action {
            AutoStartAction::Set { id } => print_json(&found(collections.set_auto_start(&id)?, &id)?),
            AutoStartAction::Clear => {
                collections.clear_auto_start()?;
                print_json(&serde_json::json!({ "autoStart": null }))
            }
        },
        Command::Run { id } => print_json(&engine.run_collection(&id)),
        Command::IsRunning { path } => print_json(&serde_json::json!({
            "path": path,
            "running": engine.is_process_running(&path),
        })),
        Command::Settings { action } => {
            let mut settings = collections.settings()?;
            match action.unwrap_or(SettingsAction::Show) {
                SettingsAction::Show => {}
                SettingsAction::ExcludeName { name } => {
                    settings.excluded_process_names.push(name);
                    settings = collections.update_settings(settings)?;
                }
                SettingsAction::ExcludePath { path } => {
                    settings.excluded_paths.push(path);
                    settings = collections.update_settings(settings)?;
                }
            }
            print_json(&settings)
        }
        Command::Login { action } => {
            let item = LoginItem::current()?;
            match action {
                LoginAction::Enable => item.enable()?,
                LoginAction::Disable => item.disable()?,
                LoginAction::Status => {}
            }
            print_json(&serde_json::json!({
                "enabled": item.is_enabled(),
                "command": item.command(),
            }))
        }
    }
}
