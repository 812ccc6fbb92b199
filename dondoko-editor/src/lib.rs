//! dondoko-editor: undo/redo history and charting tools for the dondoko editor.
//!
//! Design rules:
//! - Every edit is a [`Change`]; nothing mutates the chart behind the history's back.
//! - A change that reports "nothing happened" is never recorded.
//! - History never owns the document, it borrows it for each operation.
//! - Single-threaded: the UI loop owns both the document and its history.

pub mod editor;
pub mod logging;

pub use editor::{
    bookmark_change, metadata, metadata_change, tempo_change, ActionChange, BoxedChange, Change,
    ChartView, CompositeChange, CompositeScope, Fill, History, HistoryStatus, ListChange,
    NoteEraser, NotePen, NoteRangeChange, Property, PropertyChange, SavePoint, Tool,
};
pub use logging::init_logging;
