//! Per-tick scheduling state, threaded explicitly through the
//! components so ticks stay independent.

use system::model::ViewToken;

/// Values that live exactly one `schedule()` call.
#[derive(Debug, Clone)]
pub struct TickState {
    /// Quota units still to distribute. Signed: decisions made
    /// earlier in the tick may overdraw it.
    pub available_cpu: i64,
    pub nr_run_apps: usize,
    pub nr_not_run_apps: usize,
    pub nr_apps: usize,
    /// Fair share for first-time applicants. Zero while the running
    /// pass is in progress and when nobody is left to serve.
    pub quota_not_run_apps: u64,
    /// Tentative resource view this tick commits into.
    pub sched_status_view: ViewToken,
}

impl TickState {
    pub fn new(
        available_cpu: i64,
        nr_run_apps: usize,
        nr_not_run_apps: usize,
        sched_status_view: ViewToken,
    ) -> Self {
        Self {
            available_cpu,
            nr_run_apps,
            nr_not_run_apps,
            nr_apps: nr_run_apps + nr_not_run_apps,
            quota_not_run_apps: 0,
            sched_status_view,
        }
    }

    /// Fix the newcomer share from whatever budget the running pass
    /// left over. Called exactly once per tick, between the running
    /// pass and the first of the remaining passes.
    pub fn freeze_not_run_share(&mut self) {
        self.quota_not_run_apps = if self.nr_not_run_apps == 0 {
            0
        } else {
            self.available_cpu.max(0) as u64 / self.nr_not_run_apps as u64
        };
    }
}
