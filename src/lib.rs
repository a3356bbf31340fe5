//! Init Window Library
//!
//! Discovers running desktop applications, stores them in named collections
//! and relaunches a collection on demand or at login.

pub mod collection;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod icon;
pub mod launcher;
pub mod lifecycle;
pub mod process;
pub mod startup;
pub mod storage;
pub mod types;

#[cfg(test)]
mod testing;

pub use engine::Engine;
pub use error::{InitWindowError, Result};
pub use types::{App, Collection, RunResult, RunResultItem};
