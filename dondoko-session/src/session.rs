//! Editing session for dondoko.
//!
//! A session is the single owner of one open chart. It holds:
//! - the chart document and its pending events
//! - the undo/redo history over that document
//! - the chart view fed from the document's events
//! - recording state for live drum input

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use dondoko_core::{
    AffectedRange, Beatmap, Bookmark, ChartDocument, ChartError, Note, NoteKind, Selection,
    TempoChange, Tick,
};
use dondoko_editor::{
    bookmark_change, metadata_change, tempo_change, BoxedChange, Change, ChartView,
    CompositeScope, Fill, History, HistoryStatus, NoteRangeChange, Property, Tool,
};

use crate::settings::{EditorSettings, SettingsError};

/// File extension recommended for saved charts.
pub const CHART_FILE_EXT: &str = "dondoko.json";

/// BPM given to charts created from scratch.
pub const DEFAULT_BPM: f64 = 120.0;

const RECORD_DESCRIPTION: &str = "record hits";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RecordingTake {
    hits: usize,
}

/// One open chart plus everything needed to edit it.
#[derive(Debug)]
pub struct EditSession {
    pub session_id: Uuid,
    document: ChartDocument,
    history: History<ChartDocument>,
    view: ChartView,
    settings: EditorSettings,
    recording: Option<RecordingTake>,
    path: Option<PathBuf>,
}

impl EditSession {
    /// Start editing `beatmap` with a clean history.
    pub fn new(beatmap: Beatmap, settings: EditorSettings) -> Result<Self, SessionError> {
        settings.validate()?;

        let history = match settings.history_limit {
            Some(limit) => History::with_limit(limit),
            None => History::new(),
        };
        let session_id = Uuid::new_v4();
        tracing::info!(
            session_id = %session_id,
            notes = beatmap.notes.len(),
            history_limit = ?settings.history_limit,
            "opening edit session"
        );

        Ok(Self {
            session_id,
            document: ChartDocument::new(beatmap),
            history,
            view: ChartView::new(settings.view_span_ticks),
            settings,
            recording: None,
            path: None,
        })
    }

    /// Empty chart at the configured resolution.
    pub fn blank(settings: EditorSettings) -> Result<Self, SessionError> {
        settings.validate()?;
        let beatmap = Beatmap::new(settings.default_resolution, DEFAULT_BPM)?;
        Self::new(beatmap, settings)
    }

    /// Load a chart from disk. The loaded state counts as saved.
    pub fn open(path: impl AsRef<Path>, settings: EditorSettings) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let beatmap = load_chart(path)?;
        let mut session = Self::new(beatmap, settings)?;
        session.path = Some(path.to_path_buf());
        Ok(session)
    }

    pub fn document(&self) -> &ChartDocument {
        &self.document
    }

    pub fn beatmap(&self) -> &Beatmap {
        &self.document.beatmap
    }

    pub fn history(&self) -> &History<ChartDocument> {
        &self.history
    }

    pub fn view(&self) -> &ChartView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ChartView {
        &mut self.view
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True when the chart differs from what was last saved or opened.
    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty()
    }

    pub fn status(&self) -> HistoryStatus {
        self.history.status()
    }

    /// Register a callback for history updates (menu state, title bar, save prompts).
    pub fn subscribe_history(&mut self, subscriber: impl FnMut(&HistoryStatus) + 'static) {
        self.history.subscribe(subscriber);
    }

    // Feed queued document events to the view
    fn sync_view(&mut self) {
        let events = self.document.drain_events();
        if !events.is_empty() {
            tracing::trace!(count = events.len(), "forwarding chart events to view");
            self.view.handle_all(events);
        }
    }

    pub fn push_change(&mut self, change: impl Change<ChartDocument> + 'static) -> bool {
        self.push_boxed(Box::new(change))
    }

    pub fn push_boxed(&mut self, change: BoxedChange<ChartDocument>) -> bool {
        let changed = self.history.push_boxed(&mut self.document, change, true);
        self.sync_view();
        changed
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.document);
        self.sync_view();
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.document);
        self.sync_view();
        redone
    }

    /// Run several edits as one undo step.
    pub fn edit_batch<R>(
        &mut self,
        description: impl Into<String>,
        edit: impl FnOnce(&mut CompositeScope<'_, ChartDocument>) -> R,
    ) -> R {
        let result = {
            let mut scope = self.history.use_composite(&mut self.document, description);
            edit(&mut scope)
        };
        self.sync_view();
        result
    }

    /// Use `tool` with the cursor on `tick`.
    ///
    /// With `coalesce_tool_edits` on, repeating the exact same edit (same tool
    /// and tick) folds into the previous undo step instead of adding one.
    pub fn apply_tool(&mut self, tool: &dyn Tool, tick: Tick) -> bool {
        let Some(change) = tool.change_at(&self.document, tick) else {
            tracing::trace!(tool = tool.name(), tick, "tool had nothing to do");
            return false;
        };

        tracing::debug!(tool = tool.name(), tick, "applying tool");
        let changed = if self.settings.coalesce_tool_edits {
            self.history
                .merge_if_same_description(&mut self.document, change)
        } else {
            self.history.push_change(&mut self.document, change)
        };
        self.sync_view();
        changed
    }

    pub fn fill_selection(&mut self, fill: &Fill, selection: &Selection) -> bool {
        match fill.fill_selection(&self.document, selection) {
            Some(change) => self.push_change(change),
            None => false,
        }
    }

    /// Set a metadata field through the history.
    pub fn set_metadata<V>(&mut self, property: Property<ChartDocument, V>, value: V) -> bool
    where
        V: Clone + PartialEq + 'static,
    {
        let change = metadata_change(&self.document, property, value);
        self.push_change(change)
    }

    /// Insert a tempo change, replacing any existing one on the same tick.
    pub fn set_tempo(&mut self, tick: Tick, bpm: f64) -> Result<bool, SessionError> {
        let tempo = TempoChange::new(tick, bpm)?;
        if self
            .beatmap()
            .tempo_changes
            .iter()
            .any(|t| t.tick == tick && t.bpm == bpm)
        {
            return Ok(false);
        }

        let change = tempo_change(format!("set tempo at {tick}"), move |tempos| {
            tempos.retain(|t| t.tick != tick);
            tempos.push(tempo);
        });
        Ok(self.push_change(change))
    }

    /// Remove the tempo change on `tick`. The initial tempo cannot be removed.
    pub fn remove_tempo(&mut self, tick: Tick) -> bool {
        let first = self.beatmap().tempo_changes.first().map(|t| t.tick);
        let exists = self.beatmap().tempo_changes.iter().any(|t| t.tick == tick);
        if !exists || first == Some(tick) {
            return false;
        }
        let change = tempo_change(format!("remove tempo at {tick}"), move |tempos| {
            tempos.retain(|t| t.tick != tick)
        });
        self.push_change(change)
    }

    pub fn add_bookmark(&mut self, tick: Tick, label: impl Into<String>) -> bool {
        let bookmark = Bookmark {
            tick,
            label: label.into(),
        };
        let change = bookmark_change("add bookmark", move |marks| {
            marks.push(bookmark.clone());
            marks.sort_by_key(|b| b.tick);
        });
        self.push_change(change)
    }

    pub fn remove_bookmarks_at(&mut self, tick: Tick) -> bool {
        if !self.beatmap().bookmarks.iter().any(|b| b.tick == tick) {
            return false;
        }
        let change = bookmark_change("remove bookmark", move |marks| {
            marks.retain(|b| b.tick != tick)
        });
        self.push_change(change)
    }

    /// Multiply every tempo by `factor` while keeping notes at the same song
    /// time, so all tick positions scale by the same factor. Recorded as one
    /// undo step.
    pub fn scale_tempo(&mut self, factor: f64) -> Result<bool, SessionError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ChartError::InvalidScale { factor }.into());
        }
        if factor == 1.0 {
            return Ok(false);
        }

        let scale = move |tick: Tick| (tick as f64 * factor).round() as Tick;
        tracing::info!(factor, "scaling tempo");

        let changed = self.edit_batch(format!("scale tempo x{factor}"), |scope| {
            let mut changed = scope.push_change(tempo_change("scale tempo", move |tempos| {
                for tempo in tempos.iter_mut() {
                    tempo.tick = scale(tempo.tick);
                    tempo.bpm *= factor;
                }
            }));
            changed |= scope.push_change(NoteRangeChange::new(
                "retime notes",
                move |notes: &mut Vec<Note>| {
                    if notes.is_empty() {
                        return AffectedRange::NO_CHANGE;
                    }
                    for note in notes.iter_mut() {
                        note.tick = scale(note.tick);
                        note.length = scale(note.length);
                    }
                    AffectedRange::EVERYTHING
                },
            ));
            changed |= scope.push_change(bookmark_change("retime bookmarks", move |marks| {
                for mark in marks.iter_mut() {
                    mark.tick = scale(mark.tick);
                }
            }));
            changed
        });
        Ok(changed)
    }

    /// Begin a live recording take. Hits recorded until [`stop_recording`]
    /// form a single undo step.
    ///
    /// [`stop_recording`]: EditSession::stop_recording
    pub fn start_recording(&mut self) {
        tracing::info!(session_id = %self.session_id, "recording started");
        self.recording = Some(RecordingTake::default());
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Place a hit from live input. Outside a take each hit is its own step.
    pub fn record_hit(&mut self, kind: NoteKind, tick: Tick) -> bool {
        let note = Note::new(tick, kind);
        let change = NoteRangeChange::new(RECORD_DESCRIPTION, move |notes: &mut Vec<Note>| {
            match notes.binary_search_by_key(&tick, |n| n.tick) {
                Ok(i) if notes[i] == note => return AffectedRange::NO_CHANGE,
                Ok(i) => notes[i] = note,
                Err(i) => notes.insert(i, note),
            }
            AffectedRange::single(tick)
        });

        let changed = match self.recording.as_mut() {
            Some(take) => {
                let changed = if take.hits == 0 {
                    self.history.push_change(&mut self.document, change)
                } else {
                    // a different edit in between starts a fresh step
                    self.history.merge_change_if(&mut self.document, change, |current| {
                        current.description() == RECORD_DESCRIPTION
                    })
                };
                if changed {
                    take.hits += 1;
                }
                changed
            }
            None => self.history.push_change(&mut self.document, change),
        };
        self.sync_view();
        changed
    }

    /// End the current take, returning how many hits it recorded.
    pub fn stop_recording(&mut self) -> usize {
        let hits = self.recording.take().map_or(0, |take| take.hits);
        tracing::info!(session_id = %self.session_id, hits, "recording stopped");
        hits
    }

    /// Write the chart to `path` and mark the history as saved.
    pub fn save_to(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        save_chart(path, &self.document.beatmap)?;
        self.history.mark_saved();
        self.path = Some(path.to_path_buf());
        tracing::info!(path = %path.display(), "chart saved");
        Ok(())
    }

    /// Save back to the file the chart was opened from or last saved to.
    pub fn save(&mut self) -> anyhow::Result<()> {
        let path = self.path.clone().ok_or(SessionError::NoPath)?;
        self.save_to(path)
    }
}

/// Session-level errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("invalid chart edit: {0}")]
    Chart(#[from] ChartError),

    #[error("chart has never been saved; choose a file first")]
    NoPath,
}

/// Save a chart to disk as pretty JSON.
pub fn save_chart(path: impl AsRef<Path>, beatmap: &Beatmap) -> anyhow::Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        // fs::write does NOT create directories
        fs::create_dir_all(parent)
            .with_context(|| format!("create parent dir: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(beatmap).context("serialize chart to json")?;
    fs::write(path, json).with_context(|| format!("write chart file: {}", path.display()))?;
    Ok(())
}

fn validate_chart(beatmap: &Beatmap) -> Result<(), ChartError> {
    if beatmap.resolution == 0 {
        return Err(ChartError::InvalidResolution);
    }
    if beatmap.tempo_changes.is_empty() {
        return Err(ChartError::MissingTempo);
    }
    for tempo in &beatmap.tempo_changes {
        TempoChange::new(tempo.tick, tempo.bpm)?;
    }
    Ok(())
}

/// Load a chart from disk.
pub fn load_chart(path: impl AsRef<Path>) -> anyhow::Result<Beatmap> {
    let path = path.as_ref();
    let data =
        fs::read_to_string(path).with_context(|| format!("read chart file: {}", path.display()))?;
    let mut beatmap: Beatmap = serde_json::from_str(&data).context("parse chart json")?;
    validate_chart(&beatmap).context("validate chart")?;
    beatmap.notes.sort_by_key(|n| n.tick);
    beatmap.sort_tempo_changes();
    Ok(beatmap)
}
