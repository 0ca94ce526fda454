//! jarvis-sync library: Exposes the binary's components for testing.
//!
//! This is a thin layer over sync-core: native stores for entities and
//! settings, and the `App` that wires them to a sync client.

pub mod app;
pub mod json_store;
pub mod settings_file;

pub use app::{App, NewTask};
pub use json_store::JsonStore;
pub use settings_file::SettingsFile;
