//! Per-tick snapshot of one application.

use system::app::AppRef;
use system::host::ResourceAccountant;
use system::model::{CPU_PE_PATH, WorkingMode};

/// Everything the decision engine needs to know about one application
/// this tick, in one value record.
#[derive(Clone)]
pub struct AppInfo {
    pub app: AppRef,
    /// Working mode to submit; filled by the decision engine.
    pub working_mode: Option<WorkingMode>,
    /// Quota currently charged by the accountant, in quota units.
    pub prev_quota: u64,
    /// Most recent usage sample, same units.
    pub prev_used: u64,
    /// `prev_quota - prev_used`.
    pub prev_delta: i64,
    /// Quota decided this tick.
    pub next_quota: u64,
}

impl AppInfo {
    /// Snapshot `app` from the accountant and its latest runtime
    /// profile. Has no side effects.
    pub fn collect(app: AppRef, accountant: &dyn ResourceAccountant) -> Self {
        let prev_quota = accountant.used_by(app.as_ref(), CPU_PE_PATH, 0);
        let prev_used = app.runtime_profile().cpu_usage;

        Self {
            working_mode: None,
            prev_quota,
            prev_used,
            prev_delta: prev_quota as i64 - prev_used as i64,
            next_quota: 0,
            app,
        }
    }
}
