// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::ConfigFile;
use crate::errors::{PlaneError, Result};
use crate::plane::FdPlaneOptions;
use crate::subproc::TeardownPolicy;
use crate::types::FollowMode;

/// Largest accepted `[reader].chunk_size`.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - `chunk_size` is within `1..=MAX_CHUNK_SIZE`
/// - every duration string parses
/// - `follow_interval` is non-zero
/// - `poll_interval` is non-zero and not longer than `grace_period`
/// - `[subprocess].exit_timeout` parses
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_reader(cfg)?;
    validate_teardown(cfg)?;
    cfg.exit_timeout()?;
    Ok(())
}

fn validate_reader(cfg: &ConfigFile) -> Result<()> {
    let chunk = cfg.reader.chunk_size;
    if chunk == 0 || chunk > MAX_CHUNK_SIZE {
        return Err(PlaneError::ConfigError(format!(
            "[reader].chunk_size must be between 1 and {MAX_CHUNK_SIZE} (got {chunk})"
        )));
    }

    let interval = duration_field("[reader].follow_interval", &cfg.reader.follow_interval)?;
    if interval.is_zero() {
        return Err(PlaneError::ConfigError(
            "[reader].follow_interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_teardown(cfg: &ConfigFile) -> Result<()> {
    let grace = duration_field("[teardown].grace_period", &cfg.teardown.grace_period)?;
    let poll = duration_field("[teardown].poll_interval", &cfg.teardown.poll_interval)?;

    if poll.is_zero() {
        return Err(PlaneError::ConfigError(
            "[teardown].poll_interval must be greater than zero".to_string(),
        ));
    }
    if !grace.is_zero() && poll > grace {
        return Err(PlaneError::ConfigError(format!(
            "[teardown].poll_interval ({poll:?}) must not exceed grace_period ({grace:?})"
        )));
    }
    Ok(())
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| PlaneError::ConfigError(format!("invalid {name}: {e}")))
}

impl ConfigFile {
    /// Build FdPlane options from `[reader]`, carrying `context`.
    pub fn reader_options<C>(&self, context: C) -> Result<FdPlaneOptions<C>> {
        let follow = if self.reader.follow {
            FollowMode::On {
                interval: duration_field("[reader].follow_interval", &self.reader.follow_interval)?,
            }
        } else {
            FollowMode::Off
        };

        Ok(FdPlaneOptions::new(context)
            .follow(follow)
            .chunk_size(self.reader.chunk_size))
    }

    /// `[subprocess].exit_timeout` as a duration.
    pub fn exit_timeout(&self) -> Result<Duration> {
        duration_field("[subprocess].exit_timeout", &self.subprocess.exit_timeout)
    }

    /// Build the subprocess teardown policy from `[teardown]`.
    pub fn teardown_policy(&self) -> Result<TeardownPolicy> {
        Ok(TeardownPolicy {
            grace_period: duration_field("[teardown].grace_period", &self.teardown.grace_period)?,
            poll_interval: duration_field(
                "[teardown].poll_interval",
                &self.teardown.poll_interval,
            )?,
        })
    }
}
