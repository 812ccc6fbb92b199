//! Tick positions and the affected-range algebra used by structural edits.
//!
//! A tick is the discretized unit every note, tempo change and bookmark is
//! placed on. Editors think in fractional beat positions (a [`Selection`]),
//! so anything that has to report *where* a chart changed goes through a
//! [`TickMap`] first.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discretized chart position.
pub type Tick = i64;

/// Maps a fractional editor position onto the tick grid.
pub trait TickMap {
    fn to_tick(&self, position: f64) -> Tick;
}

impl<F> TickMap for F
where
    F: Fn(f64) -> Tick,
{
    fn to_tick(&self, position: f64) -> Tick {
        self(position)
    }
}

/// A selected span of the chart in fractional positions.
///
/// `left` and `right` may be given in either order; the selection is
/// normalised on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub left: f64,
    pub right: f64,
}

impl Selection {
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { left: a, right: b }
        } else {
            Self { left: b, right: a }
        }
    }

    /// A zero-width selection, i.e. a plain cursor.
    pub fn cursor(position: f64) -> Self {
        Self {
            left: position,
            right: position,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0.0
    }
}

/// Half-open interval `[start, end)` of ticks touched by an edit.
///
/// Two encodings are reserved:
/// - `end == Tick::MIN` means nothing changed ([`AffectedRange::NO_CHANGE`]).
/// - `end == Tick::MAX` means the whole structure changed
///   ([`AffectedRange::EVERYTHING`]); consumers should not try to be precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffectedRange {
    pub start: Tick,
    pub end: Tick,
}

impl AffectedRange {
    pub const NO_CHANGE: AffectedRange = AffectedRange {
        start: Tick::MAX,
        end: Tick::MIN,
    };

    pub const EVERYTHING: AffectedRange = AffectedRange {
        start: Tick::MIN,
        end: Tick::MAX,
    };

    pub fn new(start: Tick, end: Tick) -> Self {
        Self { start, end }
    }

    /// Range covering exactly one tick.
    pub fn single(tick: Tick) -> Self {
        Self {
            start: tick,
            end: tick.saturating_add(1),
        }
    }

    pub fn has_change(&self) -> bool {
        self.end != Tick::MIN
    }

    pub fn is_everything(&self) -> bool {
        self.end == Tick::MAX
    }

    /// Range spanned by a selection after mapping it onto ticks.
    ///
    /// A zero-width selection still yields the single tick under it.
    pub fn from_selection(selection: &Selection, map: &impl TickMap) -> Self {
        let start = map.to_tick(selection.left);
        if selection.is_empty() {
            return Self::single(start);
        }
        let end = map.to_tick(selection.right);
        if end <= start {
            Self::single(start)
        } else {
            Self { start, end }
        }
    }

    /// Like [`AffectedRange::from_selection`], but an absent selection
    /// means the edit touches everything.
    pub fn from_selection_or_everything(
        selection: Option<&Selection>,
        map: &impl TickMap,
    ) -> Self {
        match selection {
            Some(selection) => Self::from_selection(selection, map),
            None => Self::EVERYTHING,
        }
    }

    pub fn contains(&self, tick: Tick) -> bool {
        if self.is_everything() {
            return true;
        }
        self.has_change() && self.start <= tick && tick < self.end
    }

    /// Number of ticks covered, `None` for the unbounded range.
    pub fn len(&self) -> Option<u64> {
        if !self.has_change() {
            return Some(0);
        }
        if self.is_everything() {
            return None;
        }
        Some(self.end.abs_diff(self.start))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Smallest range covering both operands.
    pub fn union(self, other: AffectedRange) -> AffectedRange {
        if !self.has_change() {
            return other;
        }
        if !other.has_change() {
            return self;
        }
        if self.is_everything() || other.is_everything() {
            return Self::EVERYTHING;
        }
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl Default for AffectedRange {
    fn default() -> Self {
        Self::NO_CHANGE
    }
}

impl From<bool> for AffectedRange {
    fn from(changed: bool) -> Self {
        if changed {
            Self::EVERYTHING
        } else {
            Self::NO_CHANGE
        }
    }
}

impl From<Tick> for AffectedRange {
    fn from(tick: Tick) -> Self {
        Self::single(tick)
    }
}

impl fmt::Display for AffectedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_change() {
            write!(f, "[no change]")
        } else if self.is_everything() {
            write!(f, "[everything]")
        } else {
            write!(f, "[{}, {})", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn per_beat(position: f64) -> Tick {
        (position * 48.0).round() as Tick
    }

    #[test]
    fn test_sentinels() {
        assert!(!AffectedRange::NO_CHANGE.has_change());
        assert!(AffectedRange::EVERYTHING.has_change());
        assert!(AffectedRange::EVERYTHING.is_everything());
        assert!(!AffectedRange::new(0, 10).is_everything());
        assert_eq!(AffectedRange::default(), AffectedRange::NO_CHANGE);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(AffectedRange::from(true), AffectedRange::EVERYTHING);
        assert_eq!(AffectedRange::from(false), AffectedRange::NO_CHANGE);
        assert_eq!(AffectedRange::from(7), AffectedRange::new(7, 8));
    }

    #[test]
    fn test_from_selection() {
        let range = AffectedRange::from_selection(&Selection::new(2.0, 1.0), &per_beat);
        assert_eq!(range, AffectedRange::new(48, 96));

        let cursor = AffectedRange::from_selection(&Selection::cursor(0.5), &per_beat);
        assert_eq!(cursor, AffectedRange::new(24, 25));
    }

    #[test]
    fn test_selection_or_everything() {
        let none = AffectedRange::from_selection_or_everything(None, &per_beat);
        assert!(none.is_everything());

        let sel = Selection::new(0.0, 1.0);
        let some = AffectedRange::from_selection_or_everything(Some(&sel), &per_beat);
        assert_eq!(some, AffectedRange::new(0, 48));
    }

    #[test]
    fn test_union_and_contains() {
        let a = AffectedRange::new(0, 10);
        let b = AffectedRange::new(20, 30);
        let joined = a.union(b);
        assert_eq!(joined, AffectedRange::new(0, 30));
        assert!(joined.contains(15));
        assert!(!joined.contains(30));

        assert_eq!(a.union(AffectedRange::NO_CHANGE), a);
        assert!(a.union(AffectedRange::EVERYTHING).is_everything());
        assert!(!AffectedRange::NO_CHANGE.contains(0));
        assert_eq!(AffectedRange::NO_CHANGE.len(), Some(0));
        assert_eq!(AffectedRange::EVERYTHING.len(), None);
        assert_eq!(joined.len(), Some(30));
    }
}
