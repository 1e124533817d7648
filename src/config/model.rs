// src/config/model.rs

use serde::Deserialize;

use crate::types::{Capture, DEFAULT_CHUNK_SIZE};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [reader]
/// chunk_size = 8192
/// follow = false
/// follow_interval = "250ms"
///
/// [teardown]
/// grace_period = "500ms"
/// poll_interval = "10ms"
///
/// [subprocess]
/// capture = "combined"
/// exit_timeout = "5s"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub reader: ReaderSection,

    #[serde(default)]
    pub teardown: TeardownSection,

    #[serde(default)]
    pub subprocess: SubprocessSection,
}

/// `[reader]` section: FdPlane read loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderSection {
    /// Maximum bytes per `on_data` chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Keep reading after EOF (`tail -f`).
    #[serde(default)]
    pub follow: bool,

    /// Pause between re-armed reads in follow mode.
    #[serde(default = "default_follow_interval")]
    pub follow_interval: String,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_follow_interval() -> String {
    "250ms".to_string()
}

impl Default for ReaderSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            follow: false,
            follow_interval: default_follow_interval(),
        }
    }
}

/// `[teardown]` section: how long a child gets between SIGTERM and SIGKILL.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeardownSection {
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

fn default_grace_period() -> String {
    "500ms".to_string()
}

fn default_poll_interval() -> String {
    "10ms".to_string()
}

impl Default for TeardownSection {
    fn default() -> Self {
        Self {
            grace_period: default_grace_period(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// `[subprocess]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubprocessSection {
    /// `"combined"` (stdout + stderr) or `"stdout"`.
    #[serde(default)]
    pub capture: Capture,

    /// How long `run` waits for the child to exit once its output has
    /// closed before tearing it down.
    #[serde(default = "default_exit_timeout")]
    pub exit_timeout: String,
}

fn default_exit_timeout() -> String {
    "5s".to_string()
}

impl Default for SubprocessSection {
    fn default() -> Self {
        Self {
            capture: Capture::default(),
            exit_timeout: default_exit_timeout(),
        }
    }
}
