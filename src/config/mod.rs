// src/config/mod.rs

//! Configuration loading and validation for fdplane.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Parse duration strings like `"250ms"` (`duration.rs`).
//! - Validate value ranges and convert into library types (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, ReaderSection, SubprocessSection, TeardownSection};
pub use validate::validate_config;
