// Reversible edits recorded by the editor history.

use std::fmt;

use tracing::trace;

/// A reversible mutation of some target `T`.
///
/// `apply` returns whether anything actually changed. A `false` result is the
/// normal way to say "nothing to record" and keeps the change out of history.
/// `undo` must restore the state from before the last successful `apply`.
pub trait Change<T> {
    fn apply(&mut self, target: &mut T) -> bool;

    fn undo(&mut self, target: &mut T);

    /// Human-readable label, shown in undo/redo menus.
    fn description(&self) -> &str;
}

pub type BoxedChange<T> = Box<dyn Change<T>>;

impl<T> fmt::Debug for dyn Change<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Change").field(&self.description()).finish()
    }
}

/// A pair of closures plus a fixed description.
pub struct ActionChange<T> {
    description: String,
    apply: Box<dyn FnMut(&mut T)>,
    undo: Box<dyn FnMut(&mut T)>,
}

impl<T> ActionChange<T> {
    pub fn new(
        description: impl Into<String>,
        apply: impl FnMut(&mut T) + 'static,
        undo: impl FnMut(&mut T) + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            apply: Box::new(apply),
            undo: Box::new(undo),
        }
    }
}

impl<T> Change<T> for ActionChange<T> {
    fn apply(&mut self, target: &mut T) -> bool {
        (self.apply)(target);
        true
    }

    fn undo(&mut self, target: &mut T) {
        (self.undo)(target);
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Typed accessor for one field of `T`.
///
/// Stands in for runtime reflection: a property is just a name plus a pair of
/// plain function pointers reaching the field.
pub struct Property<T, V> {
    pub name: &'static str,
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T, V> Property<T, V> {
    pub const fn new(
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        Self { name, get, get_mut }
    }

    pub fn get<'a>(&self, target: &'a T) -> &'a V {
        (self.get)(target)
    }

    pub fn get_mut<'a>(&self, target: &'a mut T) -> &'a mut V {
        (self.get_mut)(target)
    }
}

impl<T, V> Clone for Property<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Property<T, V> {}

impl<T, V> fmt::Debug for Property<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property").field("name", &self.name).finish()
    }
}

/// Sets a property, remembering the value it had when the change was built.
pub struct PropertyChange<T, V> {
    description: String,
    property: Property<T, V>,
    old_value: V,
    new_value: V,
    notify: Option<fn(&mut T)>,
}

impl<T, V> PropertyChange<T, V>
where
    V: Clone + PartialEq,
{
    /// Capture the current value of `property` on `target` as the undo value.
    pub fn new(target: &T, property: Property<T, V>, new_value: V) -> Self {
        Self {
            description: format!("change {}", property.name),
            old_value: property.get(target).clone(),
            property,
            new_value,
            notify: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Callback run on the target after every apply or undo that touched it.
    pub fn with_notify(mut self, notify: fn(&mut T)) -> Self {
        self.notify = Some(notify);
        self
    }

    pub fn old_value(&self) -> &V {
        &self.old_value
    }

    pub fn new_value(&self) -> &V {
        &self.new_value
    }
}

impl<T, V> Change<T> for PropertyChange<T, V>
where
    V: Clone + PartialEq,
{
    fn apply(&mut self, target: &mut T) -> bool {
        if self.new_value == self.old_value {
            trace!(property = self.property.name, "property unchanged");
            return false;
        }
        *self.property.get_mut(target) = self.new_value.clone();
        if let Some(notify) = self.notify {
            notify(target);
        }
        true
    }

    fn undo(&mut self, target: &mut T) {
        *self.property.get_mut(target) = self.old_value.clone();
        if let Some(notify) = self.notify {
            notify(target);
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Bulk edit of an ordered list inside `T`.
///
/// The list is cloned right before the mutator runs, so undo is a plain
/// restore no matter how many elements the mutator touched.
pub struct ListChange<T, E> {
    description: String,
    list: fn(&mut T) -> &mut Vec<E>,
    mutate: Box<dyn FnMut(&mut Vec<E>)>,
    notify: Option<fn(&mut T)>,
    snapshot: Option<Vec<E>>,
}

impl<T, E: Clone> ListChange<T, E> {
    pub fn new(
        description: impl Into<String>,
        list: fn(&mut T) -> &mut Vec<E>,
        mutate: impl FnMut(&mut Vec<E>) + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            list,
            mutate: Box::new(mutate),
            notify: None,
            snapshot: None,
        }
    }

    /// Callback fired as the "list updated" event after apply and undo.
    pub fn with_notify(mut self, notify: fn(&mut T)) -> Self {
        self.notify = Some(notify);
        self
    }
}

impl<T, E: Clone> Change<T> for ListChange<T, E> {
    fn apply(&mut self, target: &mut T) -> bool {
        let list = (self.list)(target);
        self.snapshot = Some(list.clone());
        (self.mutate)(list);
        if let Some(notify) = self.notify {
            notify(target);
        }
        true
    }

    fn undo(&mut self, target: &mut T) {
        let Some(snapshot) = self.snapshot.take() else {
            trace!(description = %self.description, "list change was never applied");
            return;
        };
        *(self.list)(target) = snapshot;
        if let Some(notify) = self.notify {
            notify(target);
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}
