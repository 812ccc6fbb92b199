use dondoko_core::{AffectedRange, Beatmap, ChartDocument, Note, NoteKind, TempoChange, Tick};
use dondoko_editor::{
    metadata, metadata_change, tempo_change, BoxedChange, Change, CompositeChange, History,
    NotePen, NoteRangeChange, SavePoint, Tool,
};

fn chart() -> ChartDocument {
    let mut beatmap = Beatmap::default();
    for tick in [0, 24, 48, 96] {
        beatmap.put_note(Note::new(tick, NoteKind::Don));
    }
    ChartDocument::new(beatmap)
}

/// Retimes notes to match whatever tempo is currently first in the chart,
/// relative to the tempo the chart had when this change was built.
struct RetimeToTempo {
    base_bpm: f64,
    before: Option<Vec<Note>>,
}

impl Change<ChartDocument> for RetimeToTempo {
    fn apply(&mut self, doc: &mut ChartDocument) -> bool {
        let factor = doc.beatmap.bpm_at(0) / self.base_bpm;
        self.before = Some(doc.beatmap.notes.clone());
        for note in doc.beatmap.notes.iter_mut() {
            note.tick = (note.tick as f64 * factor).round() as Tick;
        }
        true
    }

    fn undo(&mut self, doc: &mut ChartDocument) {
        if let Some(before) = self.before.take() {
            doc.beatmap.notes = before;
        }
    }

    fn description(&self) -> &str {
        "retime notes"
    }
}

#[test]
fn undo_restores_state_and_redo_reapplies() {
    let mut doc = chart();
    let mut history = History::new();
    let pen = NotePen::new(NoteKind::Ka);

    let mut states = vec![doc.beatmap.clone()];
    for tick in [12, 24, 60] {
        let change = pen.change_at(&doc, tick).unwrap();
        assert!(history.push_change(&mut doc, change));
        states.push(doc.beatmap.clone());
    }

    for expected in states.iter().rev().skip(1) {
        history.undo(&mut doc);
        assert_eq!(&doc.beatmap, expected);
    }
    for expected in states.iter().skip(1) {
        history.redo(&mut doc);
        assert_eq!(&doc.beatmap, expected);
    }
}

#[test]
fn new_branch_discards_redo_entries() {
    let mut doc = chart();
    let mut history = History::new();
    let pen = NotePen::new(NoteKind::Don);

    for tick in [1, 2, 3] {
        let change = pen.change_at(&doc, tick).unwrap();
        history.push_change(&mut doc, change);
    }
    history.undo(&mut doc);
    history.undo(&mut doc);

    let change = pen.change_at(&doc, 200).unwrap();
    history.push_change(&mut doc, change);
    let after_branch = doc.beatmap.clone();

    assert!(!history.redo(&mut doc));
    assert_eq!(doc.beatmap, after_branch);
    assert_eq!(history.len(), 2);
    assert!(doc.beatmap.note_at(2).is_none());
    assert!(doc.beatmap.note_at(3).is_none());
}

#[test]
fn composite_undoes_children_in_reverse() {
    let mut doc = chart();
    let original = doc.beatmap.clone();
    let mut history = History::new();

    {
        let mut scope = history.use_composite(&mut doc, "double tempo");
        scope.push_change(tempo_change("scale tempo", |tempos: &mut Vec<TempoChange>| {
            for tempo in tempos.iter_mut() {
                tempo.bpm *= 2.0;
            }
        }));
        scope.push_change(RetimeToTempo {
            base_bpm: 120.0,
            before: None,
        });
    }

    assert_eq!(doc.beatmap.bpm_at(0), 240.0);
    let ticks: Vec<_> = doc.beatmap.notes.iter().map(|n| n.tick).collect();
    assert_eq!(ticks, vec![0, 48, 96, 192]);
    let doubled = doc.beatmap.clone();

    history.undo(&mut doc);
    assert_eq!(doc.beatmap, original);

    // redo re-runs the children front to back, so the retime sees the new tempo again
    history.redo(&mut doc);
    assert_eq!(doc.beatmap, doubled);
}

#[test]
fn noop_changes_leave_history_untouched() {
    let mut doc = chart();
    let mut history = History::new();
    history.mark_saved();

    let untitled = metadata_change(&doc, metadata::title(), String::new());
    assert!(!history.push_change(&mut doc, untitled));

    let nothing = NoteRangeChange::new("nothing", |_: &mut Vec<Note>| AffectedRange::NO_CHANGE);
    assert!(!history.push_change(&mut doc, nothing));

    assert!(history.is_empty());
    assert_eq!(history.top_of_stack(), None);
    assert!(!history.is_dirty());
    assert!(doc.pending_events().is_empty());
}

#[test]
fn merge_if_coalesces_matching_descriptions_only() {
    let mut doc = chart();
    let mut history = History::new();
    let pen = NotePen::new(NoteKind::BigDon);

    let first = pen.change_at(&doc, 30).unwrap();
    history.merge_if_same_description(&mut doc, first);
    let second = pen.change_at(&doc, 30).unwrap();
    history.merge_if_same_description(&mut doc, second);
    assert_eq!(history.len(), 1);
    assert!(doc.beatmap.note_at(30).is_none());

    let other = pen.change_at(&doc, 31).unwrap();
    history.merge_if_same_description(&mut doc, other);
    assert_eq!(history.len(), 2);

    history.undo(&mut doc);
    history.undo(&mut doc);
    assert_eq!(doc.beatmap, chart().beatmap);
}

#[test]
fn merge_change_if_uses_predicate() {
    let mut doc = chart();
    let mut history = History::new();
    let pen = NotePen::new(NoteKind::Ka);

    let change = pen.change_at(&doc, 5).unwrap();
    history.push_change(&mut doc, change);
    let change = pen.change_at(&doc, 6).unwrap();
    history.merge_change_if(&mut doc, change, |current| {
        current.description().starts_with("toggle")
    });
    assert_eq!(history.len(), 1);

    let change = pen.change_at(&doc, 7).unwrap();
    history.merge_change_if(&mut doc, change, |_| false);
    assert_eq!(history.len(), 2);
}

#[test]
fn saved_state_lost_after_branch() {
    let mut doc = chart();
    let mut history = History::new();
    let pen = NotePen::new(NoteKind::Don);

    let change = pen.change_at(&doc, 10).unwrap();
    history.push_change(&mut doc, change);
    history.mark_saved();
    history.undo(&mut doc);

    let change = pen.change_at(&doc, 11).unwrap();
    history.push_change(&mut doc, change);
    assert_eq!(history.last_save(), SavePoint::Unreachable);

    history.undo(&mut doc);
    history.redo(&mut doc);
    assert_eq!(history.top_of_stack(), Some(0));
    assert!(history.is_dirty());
}

#[test]
fn prebuilt_composite_can_be_pushed() {
    let mut doc = chart();
    let mut history = History::new();
    let pen = NotePen::new(NoteKind::Ka);

    let children: Vec<BoxedChange<ChartDocument>> = vec![
        Box::new(pen.change_at(&doc, 100).unwrap()),
        Box::new(pen.change_at(&doc, 101).unwrap()),
    ];
    let group = CompositeChange::new("two kas", children);
    assert!(history.push_change(&mut doc, group));
    assert_eq!(doc.beatmap.notes.len(), 6);
    history.undo(&mut doc);
    assert_eq!(doc.beatmap.notes.len(), 4);
}
