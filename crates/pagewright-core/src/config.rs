//! Editor settings.
//!
//! Every field has a default, so a partial JSON object (or `{}`) is a valid
//! configuration. A few settings can also be overridden from the environment.

use crate::recovery::{DEFAULT_RETAINED_SNAPSHOTS, DEFAULT_SNAPSHOT_INTERVAL_SECS};
use crate::snap::{DEFAULT_SNAP_THRESHOLD, SnapOptions};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime configuration of the editor engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum distance in pixels at which an edge snaps to a line.
    pub snap_threshold: f64,
    pub snap_to_grid: bool,
    pub snap_to_guides: bool,
    /// Align to sibling objects while dragging.
    pub smart_alignment: bool,
    /// How long snap indicators stay visible.
    pub indicator_duration_ms: u64,
    /// Interval between recovery snapshots of the open page.
    pub snapshot_interval_secs: u64,
    /// Recovery snapshots kept per page.
    pub retained_snapshots: usize,
    /// Bound on a document load before the emergency path takes over.
    pub load_timeout_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            snap_to_grid: true,
            snap_to_guides: true,
            smart_alignment: true,
            indicator_duration_ms: 800,
            snapshot_interval_secs: DEFAULT_SNAPSHOT_INTERVAL_SECS,
            retained_snapshots: DEFAULT_RETAINED_SNAPSHOTS,
            load_timeout_ms: 5_000,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Apply overrides from the environment.
    ///
    /// Reads `PAGEWRIGHT_SNAP_THRESHOLD`, `PAGEWRIGHT_SNAPSHOT_INTERVAL_SECS` and
    /// `PAGEWRIGHT_LOAD_TIMEOUT_MS`. Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup`, keyed like the environment variables.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(threshold) = override_value::<f64>(&lookup, "PAGEWRIGHT_SNAP_THRESHOLD") {
            if threshold.is_finite() && threshold >= 0.0 {
                self.snap_threshold = threshold;
            } else {
                log::warn!("Ignoring PAGEWRIGHT_SNAP_THRESHOLD={}", threshold);
            }
        }
        if let Some(secs) = override_value::<u64>(&lookup, "PAGEWRIGHT_SNAPSHOT_INTERVAL_SECS") {
            self.snapshot_interval_secs = secs.max(1);
        }
        if let Some(ms) = override_value::<u64>(&lookup, "PAGEWRIGHT_LOAD_TIMEOUT_MS") {
            self.load_timeout_ms = ms.max(1);
        }
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.snap_threshold.is_finite() && self.snap_threshold >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "snapThreshold",
                reason: format!("{} is not a non-negative number", self.snap_threshold),
            });
        }
        if self.snapshot_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "snapshotIntervalSecs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.load_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "loadTimeoutMs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn indicator_duration(&self) -> Duration {
        Duration::from_millis(self.indicator_duration_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Snap options for a page whose grid is `grid_size_px` pixels.
    pub fn snap_options(&self, grid_size_px: f64) -> SnapOptions {
        SnapOptions {
            threshold: self.snap_threshold,
            grid_size: self.snap_to_grid.then_some(grid_size_px),
            guides: self.snap_to_guides,
            alignment: self.smart_alignment,
        }
    }
}

fn override_value<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        log::warn!("Ignoring unparseable {}={:?}", key, raw);
    }
    parsed
}
