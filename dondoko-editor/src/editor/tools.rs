// Charting tools for the note editor.
//
// A tool never touches the chart directly: it inspects the document and hands
// back a change for the history to apply.

use dondoko_core::{AffectedRange, ChartDocument, Note, NoteKind, Selection, Tick, TickMap};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::notes::NoteRangeChange;

pub trait Tool {
    /// The edit this tool makes with the cursor on `tick`, if any.
    fn change_at(&self, doc: &ChartDocument, tick: Tick) -> Option<NoteRangeChange>;

    fn name(&self) -> &str;

    fn cursor_size(&self) -> Tick {
        1
    }
}

fn kind_label(kind: NoteKind) -> &'static str {
    match kind {
        NoteKind::Don => "don",
        NoteKind::Ka => "ka",
        NoteKind::BigDon => "big don",
        NoteKind::BigKa => "big ka",
        NoteKind::Roll => "roll",
        NoteKind::Balloon { .. } => "balloon",
    }
}

/// Toggles a note of one kind under the cursor.
///
/// Clicking an empty tick places the note, clicking a note of another kind
/// replaces it, clicking the same kind removes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotePen {
    pub kind: NoteKind,
    /// Sustain length for rolls and balloons
    #[serde(default)]
    pub length: Tick,
}

impl NotePen {
    pub fn new(kind: NoteKind) -> Self {
        Self { kind, length: 0 }
    }

    pub fn sustained(kind: NoteKind, length: Tick) -> Self {
        Self { kind, length }
    }
}

impl Tool for NotePen {
    fn change_at(&self, _doc: &ChartDocument, tick: Tick) -> Option<NoteRangeChange> {
        let kind = self.kind;
        let note = if kind.is_sustained() {
            Note::sustained(tick, kind, self.length.max(0))
        } else {
            Note::new(tick, kind)
        };
        trace!(tick, kind = kind_label(kind), "note pen");

        let description = format!("toggle {} at {}", kind_label(kind), tick);
        Some(NoteRangeChange::new(description, move |notes: &mut Vec<Note>| {
            let placed = AffectedRange::new(tick, note.end_tick());
            match notes.binary_search_by_key(&tick, |n| n.tick) {
                Ok(i) if notes[i].kind == kind => {
                    let removed = notes.remove(i);
                    placed.union(AffectedRange::new(tick, removed.end_tick()))
                }
                Ok(i) => {
                    let replaced = std::mem::replace(&mut notes[i], note);
                    placed.union(AffectedRange::new(tick, replaced.end_tick()))
                }
                Err(i) => {
                    notes.insert(i, note);
                    placed
                }
            }
        }))
    }

    fn name(&self) -> &str {
        "Note pen"
    }
}

/// Removes every note starting within `size` ticks centred on the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEraser {
    pub size: Tick,
}

impl NoteEraser {
    pub fn new(size: Tick) -> Self {
        debug!(size, "creating note eraser");
        Self { size: size.max(1) }
    }

    fn span(&self, tick: Tick) -> (Tick, Tick) {
        let half = self.size / 2;
        (tick - half, tick - half + self.size)
    }
}

impl Tool for NoteEraser {
    fn change_at(&self, doc: &ChartDocument, tick: Tick) -> Option<NoteRangeChange> {
        let (start, end) = self.span(tick);
        let hits = doc
            .beatmap
            .notes
            .iter()
            .filter(|n| n.tick >= start && n.tick < end)
            .count();
        if hits == 0 {
            trace!(start, end, "eraser found nothing");
            return None;
        }

        debug!(start, end, hits, "erasing notes");
        let description = format!("erase notes at {start}..{end}");
        Some(NoteRangeChange::new(description, move |notes: &mut Vec<Note>| {
            let mut range = AffectedRange::NO_CHANGE;
            notes.retain(|n| {
                let erased = n.tick >= start && n.tick < end;
                if erased {
                    range = range.union(AffectedRange::new(start, end.max(n.end_tick())));
                }
                !erased
            });
            range
        }))
    }

    fn name(&self) -> &str {
        "Eraser"
    }

    fn cursor_size(&self) -> Tick {
        self.size
    }
}

/// Fills empty space with evenly spaced notes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub kind: NoteKind,
    /// Notes per beat
    pub division: u32,
    /// How far a cursor fill may run when nothing stops it
    pub max_beats: u32,
}

impl Fill {
    pub fn new(kind: NoteKind, division: u32) -> Self {
        Self {
            kind,
            division,
            max_beats: 4,
        }
    }

    /// Fill `[start, end)` at this tool's spacing, leaving existing notes alone.
    fn fill_between(&self, step: Tick, start: Tick, end: Tick) -> NoteRangeChange {
        let kind = self.kind;
        let description = format!("fill {} at {start}..{end}", kind_label(kind));
        NoteRangeChange::new(description, move |notes: &mut Vec<Note>| {
            let mut range = AffectedRange::NO_CHANGE;
            let mut tick = start;
            while tick < end {
                if let Err(i) = notes.binary_search_by_key(&tick, |n| n.tick) {
                    notes.insert(i, Note::new(tick, kind));
                    range = range.union(AffectedRange::single(tick));
                }
                tick += step;
            }
            range
        })
    }

    /// Fill a selection. A zero-width selection fills nothing.
    pub fn fill_selection(
        &self,
        doc: &ChartDocument,
        selection: &Selection,
    ) -> Option<NoteRangeChange> {
        let step = match doc.beatmap.ticks_per_division(self.division) {
            Ok(step) => step,
            Err(e) => {
                warn!(error = %e, "fill tool misconfigured");
                return None;
            }
        };
        if selection.is_empty() {
            return None;
        }
        let start = doc.beatmap.to_tick(selection.left);
        let end = doc.beatmap.to_tick(selection.right);
        debug!(start, end, step, "filling selection");
        Some(self.fill_between(step, start, end))
    }
}

impl Tool for Fill {
    /// Fills forward from the cursor up to the next note (or `max_beats`).
    fn change_at(&self, doc: &ChartDocument, tick: Tick) -> Option<NoteRangeChange> {
        let step = match doc.beatmap.ticks_per_division(self.division) {
            Ok(step) => step,
            Err(e) => {
                warn!(error = %e, "fill tool misconfigured");
                return None;
            }
        };

        if doc.beatmap.note_at(tick).is_some() {
            debug!(tick, "fill started on an existing note, skipping");
            return None;
        }

        let limit = tick + Tick::from(doc.beatmap.resolution) * Tick::from(self.max_beats);
        let end = doc
            .beatmap
            .notes
            .iter()
            .map(|n| n.tick)
            .find(|&t| t > tick)
            .map_or(limit, |next| next.min(limit));

        trace!(tick, end, step, "fill from cursor");
        Some(self.fill_between(step, tick, end))
    }

    fn name(&self) -> &str {
        "Fill"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::change::Change;
    use dondoko_core::Beatmap;

    fn doc() -> ChartDocument {
        ChartDocument::new(Beatmap::default())
    }

    fn ticks(doc: &ChartDocument) -> Vec<Tick> {
        doc.beatmap.notes.iter().map(|n| n.tick).collect()
    }

    #[test]
    fn test_pen_toggles() {
        let mut doc = doc();
        let pen = NotePen::new(NoteKind::Don);

        let mut place = pen.change_at(&doc, 48).unwrap();
        assert!(place.apply(&mut doc));
        assert_eq!(doc.beatmap.note_at(48).map(|n| n.kind), Some(NoteKind::Don));

        let mut remove = pen.change_at(&doc, 48).unwrap();
        assert_eq!(remove.description(), place.description());
        assert!(remove.apply(&mut doc));
        assert!(doc.beatmap.notes.is_empty());

        remove.undo(&mut doc);
        assert_eq!(ticks(&doc), vec![48]);
    }

    #[test]
    fn test_pen_replaces_other_kind() {
        let mut doc = doc();
        NotePen::new(NoteKind::Don)
            .change_at(&doc, 0)
            .unwrap()
            .apply(&mut doc);
        let mut ka = NotePen::new(NoteKind::Ka).change_at(&doc, 0).unwrap();
        assert!(ka.apply(&mut doc));
        assert_eq!(doc.beatmap.note_at(0).map(|n| n.kind), Some(NoteKind::Ka));
        ka.undo(&mut doc);
        assert_eq!(doc.beatmap.note_at(0).map(|n| n.kind), Some(NoteKind::Don));
    }

    #[test]
    fn test_pen_sustained_range() {
        let mut doc = doc();
        let mut roll = NotePen::sustained(NoteKind::Roll, 24)
            .change_at(&doc, 96)
            .unwrap();
        assert!(roll.apply(&mut doc));
        assert_eq!(roll.affected(), AffectedRange::new(96, 121));
    }

    #[test]
    fn test_pen_replacing_roll_covers_its_tail() {
        let mut doc = doc();
        doc.beatmap.put_note(Note::sustained(96, NoteKind::Roll, 100));

        let mut don = NotePen::new(NoteKind::Don).change_at(&doc, 96).unwrap();
        assert!(don.apply(&mut doc));
        assert_eq!(doc.beatmap.note_at(96).map(|n| n.kind), Some(NoteKind::Don));
        assert!(don.affected().contains(150));
        assert_eq!(don.affected(), AffectedRange::new(96, 197));
    }

    #[test]
    fn test_pen_removing_roll_covers_its_tail() {
        let mut doc = doc();
        let pen = NotePen::sustained(NoteKind::Roll, 10);
        doc.beatmap.put_note(Note::sustained(0, NoteKind::Roll, 60));

        let mut remove = pen.change_at(&doc, 0).unwrap();
        assert!(remove.apply(&mut doc));
        assert!(doc.beatmap.notes.is_empty());
        assert_eq!(remove.affected(), AffectedRange::new(0, 61));
    }

    #[test]
    fn test_tool_descriptions_name_the_position() {
        let mut doc = doc();
        for tick in [0, 500] {
            doc.beatmap.put_note(Note::new(tick, NoteKind::Don));
        }

        let eraser = NoteEraser::new(4);
        let near = eraser.change_at(&doc, 0).unwrap();
        let far = eraser.change_at(&doc, 500).unwrap();
        assert_eq!(near.description(), "erase notes at -2..2");
        assert_ne!(near.description(), far.description());

        let fill = Fill::new(NoteKind::Ka, 4);
        let first = fill.change_at(&doc, 12).unwrap();
        let second = fill.change_at(&doc, 24).unwrap();
        assert_ne!(first.description(), second.description());
    }

    #[test]
    fn test_eraser() {
        let mut doc = doc();
        for tick in [0, 10, 12, 14, 30] {
            doc.beatmap.put_note(Note::new(tick, NoteKind::Don));
        }

        let eraser = NoteEraser::new(6);
        assert_eq!(eraser.cursor_size(), 6);
        let mut erase = eraser.change_at(&doc, 12).unwrap();
        assert!(erase.apply(&mut doc));
        assert_eq!(ticks(&doc), vec![0, 30]);
        assert_eq!(erase.affected(), AffectedRange::new(9, 15));

        assert!(eraser.change_at(&doc, 20).is_none());
    }

    #[test]
    fn test_fill_stops_at_next_note() {
        let mut doc = doc();
        doc.beatmap.put_note(Note::new(48, NoteKind::Ka));

        let fill = Fill::new(NoteKind::Don, 4);
        let mut change = fill.change_at(&doc, 0).unwrap();
        assert!(change.apply(&mut doc));
        assert_eq!(ticks(&doc), vec![0, 12, 24, 36, 48]);
        assert_eq!(change.affected(), AffectedRange::new(0, 37));

        assert!(fill.change_at(&doc, 48).is_none());
    }

    #[test]
    fn test_fill_without_next_note_uses_limit() {
        let mut doc = doc();
        let fill = Fill {
            max_beats: 1,
            ..Fill::new(NoteKind::Don, 2)
        };
        fill.change_at(&doc, 0).unwrap().apply(&mut doc);
        assert_eq!(ticks(&doc), vec![0, 24]);
    }

    #[test]
    fn test_fill_selection_keeps_existing_notes() {
        let mut doc = doc();
        doc.beatmap.put_note(Note::new(24, NoteKind::Ka));

        let fill = Fill::new(NoteKind::Don, 2);
        let mut change = fill
            .fill_selection(&doc, &Selection::new(0.0, 2.0))
            .unwrap();
        assert!(change.apply(&mut doc));
        assert_eq!(ticks(&doc), vec![0, 24, 48, 72]);
        assert_eq!(doc.beatmap.note_at(24).map(|n| n.kind), Some(NoteKind::Ka));

        assert!(fill
            .fill_selection(&doc, &Selection::cursor(1.0))
            .is_none());
        let broken = Fill::new(NoteKind::Don, 0);
        assert!(broken
            .fill_selection(&doc, &Selection::new(0.0, 1.0))
            .is_none());
    }
}
