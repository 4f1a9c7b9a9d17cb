use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-walk context handed to every handler.
///
/// The runner never looks at it; handlers that do blocking work are expected
/// to check [`Context::is_cancelled`] themselves. Clones share one token.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
