//! User-facing notifications raised by background image work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Somewhere to show a titled message to the user.
///
/// `show` may block until the user dismisses the message.
pub trait MessageSink: Send + Sync {
    fn show(&self, title: &str, body: &str);
}

/// Writes messages to the log instead of a dialog.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMessages;

impl MessageSink for LogMessages {
    fn show(&self, title: &str, body: &str) {
        tracing::warn!(title, "{body}");
    }
}

impl<S: MessageSink + ?Sized> MessageSink for Arc<S> {
    fn show(&self, title: &str, body: &str) {
        (**self).show(title, body);
    }
}

pub const NETWORK_ERROR_TITLE: &str = "Network Error";

/// Reports network failures, dropping new ones while an earlier one is still on screen.
pub struct NetworkReporter {
    sink: Arc<dyn MessageSink>,
    showing: AtomicBool,
}

impl NetworkReporter {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            sink,
            showing: AtomicBool::new(false),
        }
    }

    /// Show `body` unless another network message is outstanding. Returns whether it was shown.
    pub fn report(&self, body: &str) -> bool {
        if self
            .showing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("suppressed network message: {body}");
            return false;
        }
        self.sink.show(NETWORK_ERROR_TITLE, body);
        self.showing.store(false, Ordering::Release);
        true
    }

    /// Always shown, regardless of outstanding messages.
    pub fn report_now(&self, body: &str) {
        self.sink.show(NETWORK_ERROR_TITLE, body);
    }
}

impl Default for NetworkReporter {
    fn default() -> Self {
        Self::new(Arc::new(LogMessages))
    }
}

impl std::fmt::Debug for NetworkReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkReporter")
            .field("showing", &self.showing.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../tests/unit/messages.rs"]
mod tests;
