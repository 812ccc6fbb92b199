//! dondoko-session: the editing session that owns one open chart.
//!
//! Design rules:
//! - One session owns the document, its history and its view; nothing else
//!   writes to them.
//! - Saving goes through the session so the history's save point stays true.
//! - Settings are validated before a session is created.

pub mod session;
pub mod settings;

pub use session::{
    load_chart, save_chart, EditSession, SessionError, CHART_FILE_EXT, DEFAULT_BPM,
};
pub use settings::{load_settings, save_settings, EditorSettings, SettingsError};
