//! Chart (beatmap) model for dondoko.
//!
//! Everything is positioned on an integer tick grid. `resolution` says how many
//! ticks make up one beat; editors work in fractional beats and convert
//! through [`TickMap`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tick::{Tick, TickMap};

/// Ticks per beat used when nothing else is specified.
pub const DEFAULT_RESOLUTION: u32 = 48;

/// Drum hit types a note can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Center hit
    Don,
    /// Rim hit
    Ka,
    BigDon,
    BigKa,
    /// Drum roll held until `Note::length` runs out
    Roll,
    /// Balloon with a required hit count
    Balloon { hits: u32 },
}

impl NoteKind {
    pub fn is_big(&self) -> bool {
        matches!(self, NoteKind::BigDon | NoteKind::BigKa)
    }

    pub fn is_sustained(&self) -> bool {
        matches!(self, NoteKind::Roll | NoteKind::Balloon { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub tick: Tick,
    pub kind: NoteKind,
    /// Sustain length in ticks. Always 0 for plain hits.
    #[serde(default)]
    pub length: Tick,
}

impl Note {
    pub fn new(tick: Tick, kind: NoteKind) -> Self {
        Self {
            tick,
            kind,
            length: 0,
        }
    }

    pub fn sustained(tick: Tick, kind: NoteKind, length: Tick) -> Self {
        Self { tick, kind, length }
    }

    /// Last tick (exclusive) this note occupies.
    pub fn end_tick(&self) -> Tick {
        self.tick + self.length.max(0) + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: Tick,
    pub bpm: f64,
}

impl TempoChange {
    pub fn new(tick: Tick, bpm: f64) -> Result<Self, ChartError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ChartError::InvalidBpm { bpm });
        }
        Ok(Self { tick, bpm })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub tick: Tick,
    pub label: String,
}

/// Free-form chart information shown in song select.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    pub charter: String,
    /// Star rating, `None` until the charter sets one
    pub level: Option<u8>,
    pub preview_tick: Option<Tick>,
}

/// A complete editable chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beatmap {
    pub resolution: u32,
    pub metadata: Metadata,
    pub notes: Vec<Note>,
    pub tempo_changes: Vec<TempoChange>,
    pub bookmarks: Vec<Bookmark>,
}

impl Beatmap {
    pub fn new(resolution: u32, initial_bpm: f64) -> Result<Self, ChartError> {
        if resolution == 0 {
            return Err(ChartError::InvalidResolution);
        }
        let tempo = TempoChange::new(0, initial_bpm)?;
        tracing::debug!(resolution, initial_bpm, "creating beatmap");
        Ok(Self {
            resolution,
            metadata: Metadata::default(),
            notes: Vec::new(),
            tempo_changes: vec![tempo],
            bookmarks: Vec::new(),
        })
    }

    /// Ticks covered by one `1/division` of a beat (e.g. 4 = sixteenths).
    pub fn ticks_per_division(&self, division: u32) -> Result<Tick, ChartError> {
        if division == 0 {
            return Err(ChartError::EmptyDivision);
        }
        Ok((Tick::from(self.resolution) / Tick::from(division)).max(1))
    }

    pub fn beats_at(&self, tick: Tick) -> f64 {
        tick as f64 / f64::from(self.resolution)
    }

    pub fn note_at(&self, tick: Tick) -> Option<&Note> {
        self.notes
            .binary_search_by_key(&tick, |n| n.tick)
            .ok()
            .map(|i| &self.notes[i])
    }

    /// Insert or replace the note at `note.tick`, keeping notes ordered.
    /// Returns the note that was replaced, if any.
    pub fn put_note(&mut self, note: Note) -> Option<Note> {
        match self.notes.binary_search_by_key(&note.tick, |n| n.tick) {
            Ok(i) => Some(std::mem::replace(&mut self.notes[i], note)),
            Err(i) => {
                self.notes.insert(i, note);
                None
            }
        }
    }

    pub fn remove_note_at(&mut self, tick: Tick) -> Option<Note> {
        self.notes
            .binary_search_by_key(&tick, |n| n.tick)
            .ok()
            .map(|i| self.notes.remove(i))
    }

    /// Remove every note starting inside `[start, end)`, returning how many went.
    pub fn remove_notes_in(&mut self, start: Tick, end: Tick) -> usize {
        let before = self.notes.len();
        self.notes.retain(|n| n.tick < start || n.tick >= end);
        before - self.notes.len()
    }

    /// Tempo in effect at `tick`.
    pub fn bpm_at(&self, tick: Tick) -> f64 {
        self.tempo_changes
            .iter()
            .take_while(|t| t.tick <= tick)
            .last()
            .or_else(|| self.tempo_changes.first())
            .map(|t| t.bpm)
            .unwrap_or(0.0)
    }

    pub fn sort_tempo_changes(&mut self) {
        self.tempo_changes.sort_by_key(|t| t.tick);
    }

    /// Tick of the last object in the chart.
    pub fn last_tick(&self) -> Tick {
        let notes = self.notes.last().map(|n| n.end_tick() - 1).unwrap_or(0);
        let tempo = self.tempo_changes.last().map(|t| t.tick).unwrap_or(0);
        let marks = self.bookmarks.iter().map(|b| b.tick).max().unwrap_or(0);
        notes.max(tempo).max(marks)
    }
}

impl Default for Beatmap {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            metadata: Metadata::default(),
            notes: Vec::new(),
            tempo_changes: vec![TempoChange { tick: 0, bpm: 120.0 }],
            bookmarks: Vec::new(),
        }
    }
}

impl TickMap for Beatmap {
    fn to_tick(&self, position: f64) -> Tick {
        (position * f64::from(self.resolution)).round() as Tick
    }
}

/// Chart validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("resolution must be at least one tick per beat")]
    InvalidResolution,

    #[error("invalid bpm: {bpm} (must be a positive finite number)")]
    InvalidBpm { bpm: f64 },

    #[error("beat division must be non-zero")]
    EmptyDivision,

    #[error("invalid scale factor: {factor}")]
    InvalidScale { factor: f64 },

    #[error("chart has no tempo")]
    MissingTempo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_input() {
        assert_eq!(Beatmap::new(0, 120.0), Err(ChartError::InvalidResolution));
        assert!(matches!(
            Beatmap::new(48, -1.0),
            Err(ChartError::InvalidBpm { .. })
        ));
        assert!(Beatmap::new(48, f64::NAN).is_err());
    }

    #[test]
    fn test_put_note_keeps_order() {
        let mut map = Beatmap::default();
        map.put_note(Note::new(96, NoteKind::Don));
        map.put_note(Note::new(0, NoteKind::Ka));
        map.put_note(Note::new(48, NoteKind::Don));

        let ticks: Vec<_> = map.notes.iter().map(|n| n.tick).collect();
        assert_eq!(ticks, vec![0, 48, 96]);

        let replaced = map.put_note(Note::new(48, NoteKind::BigKa));
        assert_eq!(replaced.map(|n| n.kind), Some(NoteKind::Don));
        assert_eq!(map.note_at(48).map(|n| n.kind), Some(NoteKind::BigKa));
    }

    #[test]
    fn test_remove_notes_in() {
        let mut map = Beatmap::default();
        for tick in [0, 12, 24, 36, 48] {
            map.put_note(Note::new(tick, NoteKind::Don));
        }
        assert_eq!(map.remove_notes_in(12, 48), 3);
        assert_eq!(map.notes.len(), 2);
        assert!(map.remove_note_at(0).is_some());
        assert!(map.remove_note_at(0).is_none());
    }

    #[test]
    fn test_bpm_at() {
        let mut map = Beatmap::default();
        map.tempo_changes.push(TempoChange { tick: 96, bpm: 180.0 });
        assert_eq!(map.bpm_at(0), 120.0);
        assert_eq!(map.bpm_at(95), 120.0);
        assert_eq!(map.bpm_at(200), 180.0);
    }

    #[test]
    fn test_tick_mapping() {
        let map = Beatmap::default();
        assert_eq!(map.to_tick(1.0), 48);
        assert_eq!(map.to_tick(0.25), 12);
        assert_eq!(map.ticks_per_division(4), Ok(12));
        assert_eq!(map.ticks_per_division(0), Err(ChartError::EmptyDivision));
        assert_eq!(map.beats_at(24), 0.5);
    }

    #[test]
    fn test_last_tick() {
        let mut map = Beatmap::default();
        map.put_note(Note::sustained(48, NoteKind::Roll, 24));
        assert_eq!(map.last_tick(), 72);
    }
}
