//! # parley-settings
//!
//! Configuration management with layered sources for the interview engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ParleySettings::default()`]
//! 2. **User file**: `~/.parley/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `PARLEY_*` overrides (highest priority)
//!
//! The merged result is validated before it is handed out. There is no
//! process-wide singleton: callers load settings once and pass the relevant
//! sections to the components they construct.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
