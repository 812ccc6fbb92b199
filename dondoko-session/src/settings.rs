//! Editor settings for dondoko.
//!
//! Settings are plain JSON with a default for every field, so an empty object
//! (or a file written by an older version) still loads.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use dondoko_core::DEFAULT_RESOLUTION;

fn default_history_limit() -> Option<usize> {
    Some(500)
}

fn default_coalesce() -> bool {
    true
}

fn default_resolution() -> u32 {
    DEFAULT_RESOLUTION
}

fn default_log_filter() -> String {
    "dondoko=info".into()
}

fn default_view_span() -> i64 {
    i64::from(DEFAULT_RESOLUTION) * 16
}

/// User-tunable editor behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Maximum undo entries kept; `None` keeps everything
    #[serde(default = "default_history_limit")]
    pub history_limit: Option<usize>,

    /// Fold repeated identical tool edits (same tool, same tick) into one undo step
    #[serde(default = "default_coalesce")]
    pub coalesce_tool_edits: bool,

    /// Ticks per beat for new charts
    #[serde(default = "default_resolution")]
    pub default_resolution: u32,

    /// Fallback tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Ticks visible in the chart view at once
    #[serde(default = "default_view_span")]
    pub view_span_ticks: i64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            coalesce_tool_edits: default_coalesce(),
            default_resolution: default_resolution(),
            log_filter: default_log_filter(),
            view_span_ticks: default_view_span(),
        }
    }
}

impl EditorSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.history_limit == Some(0) {
            tracing::error!("history_limit must be at least 1");
            return Err(SettingsError::ZeroHistoryLimit);
        }

        if self.default_resolution == 0 {
            tracing::error!("default_resolution must be at least 1");
            return Err(SettingsError::InvalidResolution);
        }

        if self.view_span_ticks <= 0 {
            tracing::error!(
                view_span_ticks = self.view_span_ticks,
                "view span out of range"
            );
            return Err(SettingsError::InvalidViewSpan {
                span: self.view_span_ticks,
            });
        }

        if self.log_filter.trim().is_empty() {
            tracing::error!("log_filter cannot be empty");
            return Err(SettingsError::EmptyLogFilter);
        }

        Ok(())
    }

    /// Install the global tracing subscriber, falling back to `log_filter`
    /// when RUST_LOG is unset.
    pub fn init_logging(&self) -> anyhow::Result<()> {
        self.validate().context("validate settings")?;
        dondoko_editor::init_logging(&self.log_filter)
    }
}

/// Settings validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("history_limit must be at least 1 (use null for unlimited)")]
    ZeroHistoryLimit,

    #[error("default_resolution must be at least 1 tick per beat")]
    InvalidResolution,

    #[error("invalid view span: {span} ticks (must be positive)")]
    InvalidViewSpan { span: i64 },

    #[error("log_filter cannot be empty")]
    EmptyLogFilter,
}

/// Load and validate settings from a JSON file.
pub fn load_settings(path: impl AsRef<Path>) -> anyhow::Result<EditorSettings> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("read settings file: {}", path.display()))?;
    let settings: EditorSettings =
        serde_json::from_str(&data).context("parse settings json")?;
    settings
        .validate()
        .with_context(|| format!("validate settings: {}", path.display()))?;
    tracing::info!(path = %path.display(), "settings loaded");
    Ok(settings)
}

/// Save settings as pretty JSON, creating parent directories as needed.
pub fn save_settings(path: impl AsRef<Path>, settings: &EditorSettings) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create parent dir: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings).context("serialize settings to json")?;
    fs::write(path, json).with_context(|| format!("write settings file: {}", path.display()))?;
    Ok(())
}
