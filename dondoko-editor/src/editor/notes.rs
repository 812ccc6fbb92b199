// Chart-specific changes: note edits with affected ranges, tempo and
// bookmark list edits, and metadata properties.

use dondoko_core::{AffectedRange, Bookmark, ChartDocument, ChartEvent, Note, TempoChange};
use tracing::{debug, trace};

use super::change::{Change, ListChange, Property, PropertyChange};

/// Structural note edit that reports which ticks it touched.
///
/// The note list is cloned before the mutator runs. A mutator returning
/// [`AffectedRange::NO_CHANGE`] makes the change a no-op that history will not
/// record; anything else queues a scoped refresh plus a scroll hint.
pub struct NoteRangeChange {
    description: String,
    mutate: Box<dyn FnMut(&mut Vec<Note>) -> AffectedRange>,
    snapshot: Option<Vec<Note>>,
    range: AffectedRange,
}

impl NoteRangeChange {
    pub fn new(
        description: impl Into<String>,
        mutate: impl FnMut(&mut Vec<Note>) -> AffectedRange + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            mutate: Box::new(mutate),
            snapshot: None,
            range: AffectedRange::NO_CHANGE,
        }
    }

    /// Range reported by the last successful apply.
    pub fn affected(&self) -> AffectedRange {
        self.range
    }
}

impl Change<ChartDocument> for NoteRangeChange {
    fn apply(&mut self, doc: &mut ChartDocument) -> bool {
        let snapshot = doc.beatmap.notes.clone();
        let range = (self.mutate)(&mut doc.beatmap.notes);
        if !range.has_change() {
            trace!(description = %self.description, "note edit reported no change");
            return false;
        }

        debug!(description = %self.description, %range, "note edit applied");
        self.snapshot = Some(snapshot);
        self.range = range;
        doc.refresh_notes(range);
        true
    }

    fn undo(&mut self, doc: &mut ChartDocument) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        doc.beatmap.notes = snapshot;
        doc.refresh_notes(self.range);
    }

    fn description(&self) -> &str {
        &self.description
    }
}

fn tempo_list(doc: &mut ChartDocument) -> &mut Vec<TempoChange> {
    &mut doc.beatmap.tempo_changes
}

fn bookmark_list(doc: &mut ChartDocument) -> &mut Vec<Bookmark> {
    &mut doc.beatmap.bookmarks
}

fn tempo_updated(doc: &mut ChartDocument) {
    doc.emit(ChartEvent::TempoChanged);
}

fn bookmarks_updated(doc: &mut ChartDocument) {
    doc.emit(ChartEvent::BookmarksChanged);
}

fn metadata_updated(doc: &mut ChartDocument) {
    doc.emit(ChartEvent::MetadataChanged);
}

/// Bulk tempo edit. The list is re-sorted by tick after the mutator runs.
pub fn tempo_change(
    description: impl Into<String>,
    mut mutate: impl FnMut(&mut Vec<TempoChange>) + 'static,
) -> ListChange<ChartDocument, TempoChange> {
    ListChange::new(description, tempo_list, move |tempos: &mut Vec<TempoChange>| {
        mutate(tempos);
        tempos.sort_by_key(|t| t.tick);
    })
    .with_notify(tempo_updated)
}

pub fn bookmark_change(
    description: impl Into<String>,
    mutate: impl FnMut(&mut Vec<Bookmark>) + 'static,
) -> ListChange<ChartDocument, Bookmark> {
    ListChange::new(description, bookmark_list, mutate).with_notify(bookmarks_updated)
}

/// Set one metadata field, announcing it as a metadata update.
pub fn metadata_change<V>(
    doc: &ChartDocument,
    property: Property<ChartDocument, V>,
    value: V,
) -> PropertyChange<ChartDocument, V>
where
    V: Clone + PartialEq,
{
    PropertyChange::new(doc, property, value)
        .with_description(format!("set {}", property.name))
        .with_notify(metadata_updated)
}

/// Accessors for the metadata fields exposed to the editor.
pub mod metadata {
    use dondoko_core::{ChartDocument, Metadata};

    use super::Property;

    fn meta(doc: &ChartDocument) -> &Metadata {
        &doc.beatmap.metadata
    }

    fn meta_mut(doc: &mut ChartDocument) -> &mut Metadata {
        &mut doc.beatmap.metadata
    }

    pub fn title() -> Property<ChartDocument, String> {
        Property::new("title", |d| &meta(d).title, |d| &mut meta_mut(d).title)
    }

    pub fn artist() -> Property<ChartDocument, String> {
        Property::new("artist", |d| &meta(d).artist, |d| &mut meta_mut(d).artist)
    }

    pub fn charter() -> Property<ChartDocument, String> {
        Property::new("charter", |d| &meta(d).charter, |d| &mut meta_mut(d).charter)
    }

    pub fn level() -> Property<ChartDocument, Option<u8>> {
        Property::new("level", |d| &meta(d).level, |d| &mut meta_mut(d).level)
    }

    pub fn preview_tick() -> Property<ChartDocument, Option<i64>> {
        Property::new(
            "preview tick",
            |d| &meta(d).preview_tick,
            |d| &mut meta_mut(d).preview_tick,
        )
    }
}
