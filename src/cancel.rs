//! The cancellation carrier threaded through the Discovery Walker (and,
//! optionally, the façade). Kept deliberately small per spec.md §9: a
//! cancellation flag plus a correlation id, not a full async context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag. Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct Signal(Arc<AtomicBool>);

impl Signal {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Carried through the walker between filesystem entries. Never required
/// for correctness — a default `Ctx` never cancels and has no correlation id.
#[derive(Debug, Clone, Default)]
pub struct Ctx {
    pub cancel: Signal,
    pub correlation_id: Option<String>,
}

impl Ctx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_correlation_id(id: impl Into<String>) -> Self {
        Self {
            cancel: Signal::new(),
            correlation_id: Some(id.into()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_never_cancelled() {
        let ctx = Ctx::new();
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn cancel_is_observed_through_clone() {
        let ctx = Ctx::new();
        let clone = ctx.clone();
        clone.cancel.cancel();
        assert!(ctx.is_cancelled());
    }
}
