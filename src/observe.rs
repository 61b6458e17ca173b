//! Publish/subscribe primitives for model values.
//!
//! Notification always walks a snapshot of the subscriber list taken after the value lock is
//! released, so listeners may read or write properties, subscribe or unsubscribe while being
//! notified.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned by a subscription, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback receiving the new value.
pub type ValueListener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Callback receiving only the fact that something changed.
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

/// Anything that can tell subscribers it changed.
pub trait Observable {
    fn add_change_listener(&self, listener: ChangeListener) -> ListenerId;

    fn remove_change_listener(&self, id: ListenerId) -> bool;
}

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

fn next_listener_id() -> ListenerId {
    ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Subscriber registry with snapshot notification.
pub struct ListenerList<T: ?Sized> {
    entries: Mutex<Vec<(ListenerId, Arc<dyn Fn(&T) + Send + Sync>)>>,
}

impl<T: ?Sized> Default for ListenerList<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> ListenerList<T> {
    pub fn add(&self, f: Arc<dyn Fn(&T) + Send + Sync>) -> ListenerId {
        let id = next_listener_id();
        lock(&self.entries).push((id, f));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|(i, _)| *i != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self, value: &T) {
        let snapshot: Vec<_> = lock(&self.entries).iter().map(|(_, f)| Arc::clone(f)).collect();
        for f in snapshot {
            f(value);
        }
    }
}

/// One listener registered on several observables under a single id.
#[derive(Default)]
pub(crate) struct ListenerGroups {
    groups: Mutex<Vec<(ListenerId, Vec<ListenerId>)>>,
}

impl ListenerGroups {
    pub(crate) fn add(&self, members: &[&dyn Observable], listener: ChangeListener) -> ListenerId {
        let ids = members
            .iter()
            .map(|m| m.add_change_listener(Arc::clone(&listener)))
            .collect();
        let id = next_listener_id();
        lock(&self.groups).push((id, ids));
        id
    }

    pub(crate) fn remove(&self, members: &[&dyn Observable], id: ListenerId) -> bool {
        let ids = {
            let mut groups = lock(&self.groups);
            match groups.iter().position(|(g, _)| *g == id) {
                Some(pos) => groups.remove(pos).1,
                None => return false,
            }
        };
        for member_id in ids {
            for m in members {
                if m.remove_change_listener(member_id) {
                    break;
                }
            }
        }
        true
    }
}

/// A value plus the callbacks interested in it.
pub struct Property<T> {
    value: Mutex<T>,
    default: T,
    listeners: ListenerList<T>,
}

impl<T> Property<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value.clone()),
            default: value,
            listeners: ListenerList::default(),
        }
    }

    pub fn get(&self) -> T {
        lock(&self.value).clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.value))
    }

    /// Store `value`; listeners run only if it differs from the current one.
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = lock(&self.value);
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.listeners.notify(&value);
        true
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn is_default(&self) -> bool {
        *lock(&self.value) == self.default
    }

    pub fn reset(&self) -> bool {
        self.set(self.default.clone())
    }

    pub fn add_listener(&self, f: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        self.listeners.add(Arc::new(f))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<T> Observable for Property<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn add_change_listener(&self, listener: ChangeListener) -> ListenerId {
        self.listeners.add(Arc::new(move |_: &T| listener()))
    }

    fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl<T> std::fmt::Debug for Property<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &*lock(&self.value))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../tests/unit/observe/property.rs"]
mod tests;
