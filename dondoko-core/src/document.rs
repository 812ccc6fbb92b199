//! The editable document and the events it emits while being edited.

use serde::{Deserialize, Serialize};

use crate::chart::Beatmap;
use crate::tick::{AffectedRange, Tick};

/// Structural notifications produced by edits, drained by whatever draws the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartEvent {
    NotesChanged { range: AffectedRange },
    TempoChanged,
    BookmarksChanged,
    MetadataChanged,
    /// Suggested scroll target after an edit
    PullView { tick: Tick },
}

/// A beatmap plus the queue of events its edits have produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartDocument {
    pub beatmap: Beatmap,
    events: Vec<ChartEvent>,
}

impl ChartDocument {
    pub fn new(beatmap: Beatmap) -> Self {
        Self {
            beatmap,
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: ChartEvent) {
        tracing::trace!(?event, "chart event");
        self.events.push(event);
    }

    /// Queue a display refresh for `range` and, unless the range is unbounded,
    /// a hint to bring its start into view.
    pub fn refresh_notes(&mut self, range: AffectedRange) {
        if !range.has_change() {
            return;
        }
        self.emit(ChartEvent::NotesChanged { range });
        if !range.is_everything() {
            self.emit(ChartEvent::PullView { tick: range.start });
        }
    }

    pub fn pending_events(&self) -> &[ChartEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ChartEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn into_beatmap(self) -> Beatmap {
        self.beatmap
    }
}

impl From<Beatmap> for ChartDocument {
    fn from(beatmap: Beatmap) -> Self {
        Self::new(beatmap)
    }
}
