// Grouping several changes into one undo step.

use tracing::trace;

use super::change::{BoxedChange, Change};
use super::history::History;

/// An ordered group of changes that is applied and undone as a unit.
///
/// Children are applied front to back and undone back to front, so a child may
/// rely on state produced by the ones before it.
pub struct CompositeChange<T> {
    description: String,
    children: Vec<BoxedChange<T>>,
}

impl<T> CompositeChange<T> {
    pub fn new(description: impl Into<String>, children: Vec<BoxedChange<T>>) -> Self {
        Self {
            description: description.into(),
            children,
        }
    }

    /// Wrap an already recorded entry and a follow-up change, keeping the
    /// label of the earlier one.
    pub fn merged(previous: BoxedChange<T>, next: BoxedChange<T>) -> Self {
        Self {
            description: previous.description().to_owned(),
            children: vec![previous, next],
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<T> Change<T> for CompositeChange<T> {
    fn apply(&mut self, target: &mut T) -> bool {
        let mut changed = false;
        for child in self.children.iter_mut() {
            changed |= child.apply(target);
        }
        changed
    }

    fn undo(&mut self, target: &mut T) {
        for child in self.children.iter_mut().rev() {
            child.undo(target);
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Scoped handle returned by [`History::use_composite`].
///
/// Every change pushed through the scope is applied right away but buffered;
/// when the outermost scope is dropped the buffer is recorded as a single
/// [`CompositeChange`]. Opening a scope while one is already open gives back
/// an inert handle, and the outer group keeps collecting.
pub struct CompositeScope<'a, T: 'static> {
    history: &'a mut History<T>,
    target: &'a mut T,
    owner: bool,
}

impl<'a, T: 'static> CompositeScope<'a, T> {
    pub(crate) fn new(history: &'a mut History<T>, target: &'a mut T, owner: bool) -> Self {
        Self {
            history,
            target,
            owner,
        }
    }

    /// Whether dropping this handle records the group.
    pub fn is_outermost(&self) -> bool {
        self.owner
    }

    pub fn target(&self) -> &T {
        &*self.target
    }

    pub fn push_change(&mut self, change: impl Change<T> + 'static) -> bool {
        self.history.push_change(self.target, change)
    }

    pub fn push_boxed(&mut self, change: BoxedChange<T>) -> bool {
        self.history.push_boxed(self.target, change, true)
    }

    pub fn merge_change(&mut self, change: impl Change<T> + 'static) -> bool {
        self.history.merge_change(self.target, change)
    }

    /// Nested request; always inert because this scope is already collecting.
    pub fn use_composite(&mut self, description: impl Into<String>) -> CompositeScope<'_, T> {
        self.history.use_composite(self.target, description)
    }

    /// Close the scope now instead of at the end of the enclosing block.
    pub fn commit(self) {}
}

impl<T: 'static> Drop for CompositeScope<'_, T> {
    fn drop(&mut self) {
        if self.owner {
            self.history.close_composite();
        } else {
            trace!("leaving nested composite scope");
        }
    }
}
