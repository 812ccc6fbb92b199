//! dondoko-core: chart model and tick math shared by the dondoko editor.
//!
//! Design rules:
//! - Every structural position is an integer tick; fractional beats only
//!   exist at the editor boundary.
//! - Notes and tempo changes are kept sorted by tick.
//! - Edits never draw anything themselves; they queue [`ChartEvent`]s on the
//!   [`ChartDocument`] for the view to drain.

pub mod chart;
pub mod document;
pub mod tick;

pub use chart::{
    Beatmap, Bookmark, ChartError, Metadata, Note, NoteKind, TempoChange, DEFAULT_RESOLUTION,
};
pub use document::{ChartDocument, ChartEvent};
pub use tick::{AffectedRange, Selection, Tick, TickMap};
