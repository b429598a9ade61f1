//! Pluggable, process-wide metrics sink (spec.md §6.5, §9).
//!
//! Disabled by default — a `NoopEmitter` that does nothing. Installing a
//! sink is a one-time, one-shot operation; later calls to [`set_emitter`]
//! are ignored (first writer wins), matching spec.md's "initialize-once-
//! on-first-use, guarded by a one-shot primitive" design note.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// One completed operation's telemetry, emitted once at the end of a
/// façade call.
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    pub operation: &'static str,
    pub format: &'static str,
    pub status: &'static str,
    pub duration: Duration,
    pub bytes: u64,
    pub entries: u64,
    pub error_code: Option<&'static str>,
}

/// Capability boundary for a metrics backend (counters, a duration
/// histogram, bytes/entries counters, and an error counter by code).
pub trait MetricsEmitter: Send + Sync {
    fn record(&self, metrics: &OperationMetrics);
}

struct NoopEmitter;

impl MetricsEmitter for NoopEmitter {
    fn record(&self, _metrics: &OperationMetrics) {}
}

static EMITTER: OnceLock<Arc<dyn MetricsEmitter>> = OnceLock::new();

/// Install a process-wide metrics sink. Only the first call takes effect;
/// subsequent calls are silently ignored, same as any one-shot init.
pub fn set_emitter(emitter: Arc<dyn MetricsEmitter>) {
    let _ = EMITTER.set(emitter);
}

fn emitter() -> &'static Arc<dyn MetricsEmitter> {
    EMITTER.get_or_init(|| Arc::new(NoopEmitter))
}

pub(crate) fn record(metrics: OperationMetrics) {
    tracing::debug!(
        operation = metrics.operation,
        format = metrics.format,
        status = metrics.status,
        duration_ms = metrics.duration.as_millis() as u64,
        bytes = metrics.bytes,
        entries = metrics.entries,
        error_code = metrics.error_code.unwrap_or(""),
        "operation telemetry"
    );
    emitter().record(&metrics);
}
