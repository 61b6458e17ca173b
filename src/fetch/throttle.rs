//! Bounded-concurrency admission per request class.
//!
//! Callers of the same class are admitted strictly in arrival order and at most `cap` of them
//! hold a [`Permit`] at any time. Classes are independent of each other.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};

use crate::observe::lock;

/// Request class shared by source, gradient and texture downloads.
pub const IMAGE_REQUEST_CLASS: &str = "imageRequest";

/// Default cap for [`IMAGE_REQUEST_CLASS`].
pub const MAX_SIMULTANEOUS_IMAGE_REQUESTS: usize = 5;

#[derive(Default)]
struct ClassState {
    in_flight: usize,
    next_ticket: u64,
    waiting: VecDeque<u64>,
}

impl ClassState {
    fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.waiting.is_empty()
    }
}

#[derive(Default)]
struct Shared {
    classes: Mutex<HashMap<String, ClassState>>,
    admitted: Condvar,
}

/// Cloneable handle to one throttle; clones share the same queues.
#[derive(Clone, Default)]
pub struct FetchThrottle {
    shared: Arc<Shared>,
}

impl FetchThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until admitted into `class`, then hold the slot until the permit drops.
    ///
    /// A `cap` of zero is treated as one.
    pub fn acquire(&self, class: &str, cap: usize) -> Permit {
        let cap = cap.max(1);
        let mut classes = lock(&self.shared.classes);
        let ticket = {
            let state = classes.entry(class.to_owned()).or_default();
            let t = state.next_ticket;
            state.next_ticket += 1;
            state.waiting.push_back(t);
            t
        };

        loop {
            let state = classes.entry(class.to_owned()).or_default();
            if state.waiting.front() == Some(&ticket) && state.in_flight < cap {
                state.waiting.pop_front();
                state.in_flight += 1;
                tracing::trace!(class, ticket, in_flight = state.in_flight, "fetch admitted");
                break;
            }
            classes = self
                .shared
                .admitted
                .wait(classes)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        drop(classes);
        // The next ticket in line may also fit under the cap.
        self.shared.admitted.notify_all();

        Permit {
            shared: Arc::clone(&self.shared),
            class: class.to_owned(),
        }
    }

    /// Run `work` while holding a permit for `class`.
    pub fn run<R>(&self, class: &str, cap: usize, work: impl FnOnce() -> R) -> R {
        let _permit = self.acquire(class, cap);
        work()
    }

    pub fn in_flight(&self, class: &str) -> usize {
        lock(&self.shared.classes)
            .get(class)
            .map_or(0, |s| s.in_flight)
    }

    pub fn queued(&self, class: &str) -> usize {
        lock(&self.shared.classes)
            .get(class)
            .map_or(0, |s| s.waiting.len())
    }
}

impl std::fmt::Debug for FetchThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let classes = lock(&self.shared.classes);
        let mut d = f.debug_map();
        for (k, s) in classes.iter() {
            d.entry(k, &(s.in_flight, s.waiting.len()));
        }
        d.finish()
    }
}

/// Admission slot; releasing it lets the next waiter of the same class in.
///
/// Owns its handle to the throttle so it can be moved onto a worker thread.
pub struct Permit {
    shared: Arc<Shared>,
    class: String,
}

impl Permit {
    pub fn class(&self) -> &str {
        &self.class
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        {
            let mut classes = lock(&self.shared.classes);
            if let Some(state) = classes.get_mut(&self.class) {
                state.in_flight = state.in_flight.saturating_sub(1);
                if state.is_idle() {
                    classes.remove(&self.class);
                }
            }
        }
        self.shared.admitted.notify_all();
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit").field("class", &self.class).finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fetch/throttle.rs"]
mod tests;
