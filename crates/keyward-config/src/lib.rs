//! Configuration for the Keyward approval broker.
//!
//! A single TOML document supplies the transport endpoint, the HTTP callback
//! port, file paths, timing knobs, the open/gated vault lists, the
//! standing-approval rule table, and the provider/channel configuration.
//!
//! This crate has no dependencies on other keyward crates; domain types are
//! mirrored here and converted at the integration boundary.
//!
//! # Usage
//!
//! ```rust,no_run
//! use keyward_config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("socket at {}", config.socket_path.display());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod error;
mod loader;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

use std::path::Path;

impl Config {
    /// Load the configuration.
    ///
    /// The file is taken from `explicit` when given, else from the
    /// `KEYWARD_CONFIG` environment variable, else from the default
    /// location. `KEYWARD_SOCKET` and `KEYWARD_PENDING_DIR` override the
    /// corresponding fields after parsing.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or if
    /// the result fails validation.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        loader::load(explicit)
    }

    /// Load and validate a specific configuration file, applying the same
    /// environment overrides as [`Config::load`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or if
    /// the result fails validation.
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        loader::load(Some(path))
    }
}
