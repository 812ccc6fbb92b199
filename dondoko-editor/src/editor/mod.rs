// Editor module for dondoko.

pub mod change;
pub mod composite;
pub mod history;
pub mod notes;
pub mod tools;
pub mod view;

pub use change::{ActionChange, BoxedChange, Change, ListChange, Property, PropertyChange};
pub use composite::{CompositeChange, CompositeScope};
pub use history::{History, HistoryStatus, SavePoint};
pub use notes::{bookmark_change, metadata, metadata_change, tempo_change, NoteRangeChange};
pub use tools::{Fill, NoteEraser, NotePen, Tool};
pub use view::ChartView;
