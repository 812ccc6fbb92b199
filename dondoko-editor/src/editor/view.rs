// Display-side state for the chart editor.
// It does not draw anything; it tracks what needs redrawing and where the
// view should be scrolled after edits.

use dondoko_core::{AffectedRange, ChartEvent, Tick};
use tracing::{debug, info, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    /// First visible tick
    pub scroll: Tick,
    /// Number of ticks visible at once
    pub span: Tick,
    invalid: AffectedRange,
    tempo_dirty: bool,
    bookmarks_dirty: bool,
    metadata_dirty: bool,
}

impl ChartView {
    pub fn new(span: Tick) -> Self {
        info!("Creating chart view spanning {} ticks", span);
        Self {
            scroll: 0,
            span: span.max(1),
            invalid: AffectedRange::NO_CHANGE,
            tempo_dirty: false,
            bookmarks_dirty: false,
            metadata_dirty: false,
        }
    }

    pub fn visible(&self) -> AffectedRange {
        AffectedRange::new(self.scroll, self.scroll + self.span)
    }

    pub fn is_visible(&self, tick: Tick) -> bool {
        self.visible().contains(tick)
    }

    // Bring `tick` into view, keeping a quarter of the span as lead-in
    fn pull_to(&mut self, tick: Tick) {
        if self.is_visible(tick) {
            trace!("Tick {} already visible", tick);
            return;
        }
        let scroll = (tick - self.span / 4).max(0);
        debug!("Pulling view from {} to {}", self.scroll, scroll);
        self.scroll = scroll;
    }

    pub fn handle(&mut self, event: &ChartEvent) {
        match event {
            ChartEvent::NotesChanged { range } => {
                self.invalid = self.invalid.union(*range);
            }
            ChartEvent::TempoChanged => {
                // tempo moves every bar line, so the whole lane is stale
                self.tempo_dirty = true;
                self.invalid = AffectedRange::EVERYTHING;
            }
            ChartEvent::BookmarksChanged => self.bookmarks_dirty = true,
            ChartEvent::MetadataChanged => self.metadata_dirty = true,
            ChartEvent::PullView { tick } => self.pull_to(*tick),
        }
    }

    pub fn handle_all(&mut self, events: impl IntoIterator<Item = ChartEvent>) {
        for event in events {
            self.handle(&event);
        }
    }

    /// Accumulated note range that needs redrawing.
    pub fn invalid_range(&self) -> AffectedRange {
        self.invalid
    }

    /// Whether anything inside the visible window needs redrawing.
    pub fn needs_redraw(&self) -> bool {
        if self.tempo_dirty || self.bookmarks_dirty || self.metadata_dirty {
            return true;
        }
        if !self.invalid.has_change() {
            return false;
        }
        let visible = self.visible();
        self.invalid.is_everything()
            || (self.invalid.start < visible.end && visible.start < self.invalid.end)
    }

    /// Reset the dirty state once a frame has been drawn.
    pub fn mark_drawn(&mut self) {
        trace!("Chart view drawn");
        self.invalid = AffectedRange::NO_CHANGE;
        self.tempo_dirty = false;
        self.bookmarks_dirty = false;
        self.metadata_dirty = false;
    }

    pub fn metadata_dirty(&self) -> bool {
        self.metadata_dirty
    }

    pub fn bookmarks_dirty(&self) -> bool {
        self.bookmarks_dirty
    }
}

impl Default for ChartView {
    fn default() -> Self {
        ChartView::new(768)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_changes_accumulate() {
        let mut view = ChartView::new(192);
        view.handle(&ChartEvent::NotesChanged {
            range: AffectedRange::new(10, 20),
        });
        view.handle(&ChartEvent::NotesChanged {
            range: AffectedRange::new(50, 60),
        });
        assert_eq!(view.invalid_range(), AffectedRange::new(10, 60));
        assert!(view.needs_redraw());

        view.mark_drawn();
        assert!(!view.needs_redraw());
    }

    #[test]
    fn test_offscreen_change_needs_no_redraw() {
        let mut view = ChartView::new(192);
        view.handle(&ChartEvent::NotesChanged {
            range: AffectedRange::new(500, 510),
        });
        assert!(!view.needs_redraw());
    }

    #[test]
    fn test_pull_view() {
        let mut view = ChartView::new(192);
        view.handle(&ChartEvent::PullView { tick: 100 });
        assert_eq!(view.scroll, 0);

        view.handle(&ChartEvent::PullView { tick: 1000 });
        assert_eq!(view.scroll, 952);
        assert!(view.is_visible(1000));
    }

    #[test]
    fn test_tempo_invalidates_everything() {
        let mut view = ChartView::default();
        view.handle_all(vec![ChartEvent::TempoChanged, ChartEvent::MetadataChanged]);
        assert!(view.invalid_range().is_everything());
        assert!(view.metadata_dirty());
        assert!(!view.bookmarks_dirty());
    }
}
