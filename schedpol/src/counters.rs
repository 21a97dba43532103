use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
///
/// Shared by cloning; never consulted by the scheduling logic itself.
#[derive(Clone, Default)]
pub struct Counters {
    pub ticks: Arc<AtomicU64>,

    pub apps_assigned: Arc<AtomicU64>,
    pub apps_skipped: Arc<AtomicU64>,
    pub apps_failed: Arc<AtomicU64>,

    /// CPU candidates rejected before one accepted the binding.
    pub binding_retries: Arc<AtomicU64>,
    /// Controller corrections large enough to trip the underflow
    /// guard.
    pub underflow_resets: Arc<AtomicU64>,
}
