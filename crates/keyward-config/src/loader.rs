//! Config file discovery, parsing, and environment overrides.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Environment variable naming an alternate config file.
const ENV_CONFIG: &str = "KEYWARD_CONFIG";
/// Environment variable overriding the socket path.
const ENV_SOCKET: &str = "KEYWARD_SOCKET";
/// Environment variable overriding the pending drop directory.
const ENV_PENDING_DIR: &str = "KEYWARD_PENDING_DIR";

/// Load, override, and validate the configuration.
pub(crate) fn load(explicit: Option<&Path>) -> ConfigResult<Config> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from))
        .unwrap_or_else(default_config_path);

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");

    apply_env_overrides(&mut config);
    validate::validate(&config)?;
    Ok(config)
}

/// Default config location: `$HOME/.keyward/config.toml`, falling back to
/// the system path when no home directory is available.
fn default_config_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".keyward").join("config.toml"),
        None => PathBuf::from("/etc/keyward/config.toml"),
    }
}

/// Apply `KEYWARD_SOCKET` / `KEYWARD_PENDING_DIR` on top of the parsed file.
fn apply_env_overrides(config: &mut Config) {
    if let Some(socket) = std::env::var_os(ENV_SOCKET) {
        debug!(socket = %PathBuf::from(&socket).display(), "socket path overridden from environment");
        config.socket_path = PathBuf::from(socket);
    }
    if let Some(dir) = std::env::var_os(ENV_PENDING_DIR) {
        debug!(dir = %PathBuf::from(&dir).display(), "pending dir overridden from environment");
        config.pending_dir = PathBuf::from(dir);
    }
}
