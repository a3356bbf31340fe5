//! Application lifecycle
//!
//! Closing the main window hides it to the tray unless the user asked to quit
//! or turned `minimize_to_tray` off.

use crate::config::Settings;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Keep running in the background
    Hide,
    Close,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    quitting: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit quit, e.g. from the tray menu
    pub fn begin_quit(&self) {
        self.quitting.store(true, Ordering::SeqCst);
        tracing::info!("Quit requested");
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    pub fn on_close_requested(&self, settings: &Settings) -> CloseAction {
        if !self.is_quitting() && settings.minimize_to_tray {
            CloseAction::Hide
        } else {
            CloseAction::Close
        }
    }
}
