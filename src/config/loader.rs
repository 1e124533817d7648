// src/config/loader.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `ConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load `path` if it exists, else fall back to defaults.
///
/// A missing file is only tolerated when `explicit` is false, i.e. the path
/// is the implicit [`default_config_path`]. A user-supplied path that does
/// not exist is an error.
pub fn load_or_default(path: impl AsRef<Path>, explicit: bool) -> Result<ConfigFile> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(_) => load_and_validate(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => {
            debug!(?path, "no config file; using defaults");
            Ok(ConfigFile::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Default config location: `Fdplane.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Fdplane.toml")
}
