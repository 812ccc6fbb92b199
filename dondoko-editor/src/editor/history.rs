// Undo/redo history module for the editor.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use super::change::{BoxedChange, Change};
use super::composite::{CompositeChange, CompositeScope};

/// Where the last save left the history.
///
/// `At(n)` means the document was saved with `n` entries applied.
/// `Unreachable` means that state was discarded by a new branch (or trimmed
/// off the front), so no amount of undo/redo can get back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePoint {
    At(usize),
    Unreachable,
}

/// Snapshot handed to history subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryStatus {
    pub len: usize,
    /// Number of applied entries
    pub position: usize,
    pub dirty: bool,
    pub can_undo: bool,
    pub can_redo: bool,
}

struct PendingComposite<T> {
    description: String,
    changes: Vec<BoxedChange<T>>,
}

type Subscriber = Box<dyn FnMut(&HistoryStatus)>;

/// Linear undo/redo log over a target `T`.
///
/// The history does not own the target; every call that needs to touch it
/// takes it by `&mut`. Entries past the cursor are redoable until the next
/// push or merge, which drops them for good.
pub struct History<T> {
    entries: VecDeque<BoxedChange<T>>,
    position: usize,
    save_point: SavePoint,
    dirty: bool,
    limit: Option<usize>,
    pending: Option<PendingComposite<T>>,
    subscribers: Vec<Subscriber>,
}

impl<T: 'static> History<T> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            position: 0,
            save_point: SavePoint::At(0),
            dirty: false,
            limit: None,
            pending: None,
            subscribers: Vec::new(),
        }
    }

    /// History that forgets its oldest entries beyond `limit` (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::new()
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Apply `change` and record it. Returns `false` (and records nothing)
    /// when the change reports that it did nothing.
    pub fn push_change(&mut self, target: &mut T, change: impl Change<T> + 'static) -> bool {
        self.push_boxed(target, Box::new(change), true)
    }

    /// Record a boxed change. With `trigger_apply == false` the caller has
    /// already applied it and it is recorded unconditionally.
    pub fn push_boxed(
        &mut self,
        target: &mut T,
        mut change: BoxedChange<T>,
        trigger_apply: bool,
    ) -> bool {
        if trigger_apply && !change.apply(target) {
            trace!(description = change.description(), "change did nothing; not recorded");
            return false;
        }

        if let Some(pending) = self.pending.as_mut() {
            trace!(
                description = change.description(),
                group = %pending.description,
                "buffering change into composite"
            );
            pending.changes.push(change);
            return true;
        }

        self.record(change);
        true
    }

    fn record(&mut self, change: BoxedChange<T>) {
        debug!(
            description = change.description(),
            position = self.position,
            discarded = self.entries.len() - self.position,
            "recording change"
        );

        self.dirty = true;
        if matches!(self.save_point, SavePoint::At(save) if save > self.position) {
            self.save_point = SavePoint::Unreachable;
        }
        self.entries.truncate(self.position);
        self.entries.push_back(change);
        self.position += 1;
        self.enforce_limit();
        self.notify();
    }

    fn enforce_limit(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        while self.entries.len() > limit {
            let Some(dropped) = self.entries.pop_front() else {
                break;
            };
            self.position = self.position.saturating_sub(1);
            self.save_point = match self.save_point {
                SavePoint::At(0) | SavePoint::Unreachable => SavePoint::Unreachable,
                SavePoint::At(save) => SavePoint::At(save - 1),
            };
            trace!(description = dropped.description(), "history limit reached; dropped oldest entry");
        }
    }

    /// Revert the most recently applied entry. Returns `false` at the bottom.
    pub fn undo(&mut self, target: &mut T) -> bool {
        if self.position == 0 {
            trace!("nothing to undo");
            return false;
        }

        let entry = &mut self.entries[self.position - 1];
        debug!(description = entry.description(), "undo");
        entry.undo(target);
        self.position -= 1;
        self.refresh_dirty();
        self.notify();
        true
    }

    /// Re-apply the next undone entry. Returns `false` at the top.
    pub fn redo(&mut self, target: &mut T) -> bool {
        if self.position == self.entries.len() {
            trace!("nothing to redo");
            return false;
        }

        self.position += 1;
        self.refresh_dirty();
        let entry = &mut self.entries[self.position - 1];
        debug!(description = entry.description(), "redo");
        entry.apply(target);
        self.notify();
        true
    }

    /// Remember the current position as the saved state.
    pub fn mark_saved(&mut self) {
        debug!(position = self.position, "marking history as saved");
        self.save_point = SavePoint::At(self.position);
        self.dirty = false;
        self.notify();
    }

    /// Apply `change` and fold it into the current entry so one undo reverts
    /// both. With nothing applied yet this is a plain push.
    pub fn merge_change(&mut self, target: &mut T, change: impl Change<T> + 'static) -> bool {
        self.merge_boxed(target, Box::new(change))
    }

    pub fn merge_boxed(&mut self, target: &mut T, mut change: BoxedChange<T>) -> bool {
        if self.position == 0 || self.pending.is_some() {
            return self.push_boxed(target, change, true);
        }

        if !change.apply(target) {
            trace!(description = change.description(), "merged change did nothing");
            return false;
        }

        self.dirty = true;
        if matches!(self.save_point, SavePoint::At(save) if save >= self.position) {
            self.save_point = SavePoint::Unreachable;
        }
        self.entries.truncate(self.position);
        let merged: BoxedChange<T> = match self.entries.pop_back() {
            Some(previous) => {
                debug!(
                    into = previous.description(),
                    description = change.description(),
                    "merging change"
                );
                Box::new(CompositeChange::merged(previous, change))
            }
            None => change,
        };
        self.entries.push_back(merged);
        self.notify();
        true
    }

    /// Merge when `predicate` accepts the current entry, push otherwise.
    pub fn merge_change_if(
        &mut self,
        target: &mut T,
        change: impl Change<T> + 'static,
        predicate: impl FnOnce(&dyn Change<T>) -> bool,
    ) -> bool {
        let merge = self.pending.is_none() && self.current().is_some_and(predicate);
        if merge {
            self.merge_change(target, change)
        } else {
            self.push_change(target, change)
        }
    }

    /// Merge when the current entry carries the same description.
    pub fn merge_if_same_description(
        &mut self,
        target: &mut T,
        change: impl Change<T> + 'static,
    ) -> bool {
        let description = change.description().to_owned();
        self.merge_change_if(target, change, |current| current.description() == description)
    }

    /// Open a composite group. Changes pushed through the returned scope are
    /// recorded as one entry when it is dropped. If a group is already open
    /// the returned scope is inert and the outer group keeps collecting.
    pub fn use_composite<'a>(
        &'a mut self,
        target: &'a mut T,
        description: impl Into<String>,
    ) -> CompositeScope<'a, T> {
        let description = description.into();
        if let Some(pending) = &self.pending {
            trace!(
                ignored = %description,
                group = %pending.description,
                "composite already open; nested request ignored"
            );
            return CompositeScope::new(self, target, false);
        }

        debug!(description = %description, "opening composite");
        self.pending = Some(PendingComposite {
            description,
            changes: Vec::new(),
        });
        CompositeScope::new(self, target, true)
    }

    pub(crate) fn close_composite(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.changes.is_empty() {
            trace!(description = %pending.description, "composite closed with no changes");
            return;
        }
        debug!(
            description = %pending.description,
            children = pending.changes.len(),
            "closing composite"
        );
        self.record(Box::new(CompositeChange::new(
            pending.description,
            pending.changes,
        )));
    }

    pub fn is_collecting(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget every entry. The current state stays saved only if it was.
    pub fn clear(&mut self) {
        debug!(entries = self.entries.len(), "clearing history");
        self.save_point = if self.save_point == SavePoint::At(self.position) {
            SavePoint::At(0)
        } else {
            SavePoint::Unreachable
        };
        self.entries.clear();
        self.position = 0;
        self.refresh_dirty();
        self.notify();
    }

    fn refresh_dirty(&mut self) {
        self.dirty = self.save_point != SavePoint::At(self.position);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position < self.entries.len()
    }

    /// The most recently applied entry.
    pub fn current(&self) -> Option<&dyn Change<T>> {
        let index = self.top_of_stack()?;
        Some(self.entries[index].as_ref())
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.current().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.entries.get(self.position).map(|c| c.description())
    }

    /// Index of the most recently applied entry.
    pub fn top_of_stack(&self) -> Option<usize> {
        self.position.checked_sub(1)
    }

    pub fn last_save(&self) -> SavePoint {
        self.save_point
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.description())
    }

    pub fn status(&self) -> HistoryStatus {
        HistoryStatus {
            len: self.entries.len(),
            position: self.position,
            dirty: self.dirty,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Register a callback run after every change to the log.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&HistoryStatus) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    fn notify(&mut self) {
        let status = self.status();
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&status);
        }
    }
}

impl<T: 'static> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for History<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.entries)
            .field("position", &self.position)
            .field("save_point", &self.save_point)
            .field("dirty", &self.dirty)
            .field("limit", &self.limit)
            .field("collecting", &self.pending.is_some())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
