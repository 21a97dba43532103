//! The feedback controller that decides each application's next CPU
//! quota.
//!
//! Running applications get a PID update driven by the gap between
//! their assigned quota and their observed usage; applications not
//! yet running get an initial share of whatever the running pass left
//! over. Controller state (`ierr`, `derr`) persists across ticks as
//! decimal-text attributes on the application itself.

use tracing::{debug, error, info};

use system::app::Application;
use system::model::WorkingMode;

use crate::app_info::AppInfo;
use crate::params::ControllerParams;
use crate::state::TickState;
use crate::{ADMISSIBLE_DELTA, INITIAL_DEFAULT_QUOTA, SATURATION_THRESHOLD};

/// Attribute key of the accumulated integral error.
pub const ATTR_IERR: &str = "ierr";
/// Attribute key of the last tick's error.
pub const ATTR_DERR: &str = "derr";

/// Which branch a decision took; doubles as the description of the
/// working mode it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// First scheduling of a not-yet-running application.
    Default,
    /// Feedback update of a running application.
    Adaptation,
}

impl Branch {
    pub fn description(&self) -> &'static str {
        match self {
            Branch::Default => "Default",
            Branch::Adaptation => "Adaptation",
        }
    }
}

/// Outcome details of one `compute_quota` call, for logs and
/// telemetry.
#[derive(Debug, Clone, Copy)]
pub struct QuotaDecision {
    pub branch: Branch,
    pub error: i64,
    pub cv: i64,
    pub underflow_reset: bool,
}

/// Decide `ainfo.next_quota`, build the new working mode, persist the
/// controller state and charge the shared tick budget.
pub fn compute_quota(
    ainfo: &mut AppInfo,
    params: &ControllerParams,
    tick: &mut TickState,
) -> QuotaDecision {
    info!(app = %ainfo.app.str_id(), "computing quota");

    if !ainfo.app.running() {
        first_schedule(ainfo, tick)
    } else {
        adapt(ainfo, params, tick)
    }
}

/// Initial assignment for an application without live telemetry: its
/// share of the leftover budget, capped at the initial default.
///
/// Also taken when a previously seen application is re-queued, which
/// restarts its controller from scratch.
fn first_schedule(ainfo: &mut AppInfo, tick: &mut TickState) -> QuotaDecision {
    info!("computing quota first round");

    ainfo.next_quota = tick.quota_not_run_apps.min(INITIAL_DEFAULT_QUOTA);

    ainfo.working_mode = Some(WorkingMode::new(
        ainfo.app.working_mode_count(),
        Branch::Default.description(),
        1,
        ainfo.app.str_id(),
    ));

    ainfo.app.set_attr(ATTR_IERR, "0");
    ainfo.app.set_attr(ATTR_DERR, "0");

    tick.available_cpu -= ainfo.next_quota as i64;

    info!(
        next_quota = ainfo.next_quota,
        prev_quota = ainfo.prev_quota,
        prev_used = ainfo.prev_used,
        prev_delta = ainfo.prev_delta,
        available_cpu = tick.available_cpu,
        "initial settings"
    );

    QuotaDecision {
        branch: Branch::Default,
        error: 0,
        cv: 0,
        underflow_reset: false,
    }
}

/// PID update for a running application.
fn adapt(ainfo: &mut AppInfo, params: &ControllerParams, tick: &mut TickState) -> QuotaDecision {
    // Usage pressed against its ceiling: telemetry cannot report
    // "would have used more", so push a forfait delta instead.
    if ainfo.prev_used as i64 >= ainfo.prev_quota as i64 - SATURATION_THRESHOLD {
        ainfo.prev_delta = params.neg_delta;
    }

    let set_point = ADMISSIBLE_DELTA / 2;

    let mut error = set_point - ainfo.prev_delta;
    if error.abs() < set_point {
        error = 0;
    }

    let pvar = (params.kp * error as f32) as i64;

    let ierr = parse_attr(ainfo.app.as_ref(), ATTR_IERR) + error;
    let ivar = (params.ki * ierr as f32) as i64;

    let derr = error - parse_attr(ainfo.app.as_ref(), ATTR_DERR);
    let dvar = (params.kd * derr as f32) as i64;

    debug!(pvar, ivar, dvar, "controller terms");

    let mut cv = pvar + ivar + dvar;
    if cv > 0 {
        cv = cv.min(tick.available_cpu);
    }

    let mut underflow_reset = false;
    if cv < 0 && cv.unsigned_abs() > ainfo.prev_quota {
        error!(
            app = %ainfo.app.str_id(),
            cv,
            prev_quota = ainfo.prev_quota,
            "required quota lower than zero, resetting to initial default"
        );
        ainfo.next_quota = tick.available_cpu.clamp(0, INITIAL_DEFAULT_QUOTA as i64) as u64;
        underflow_reset = true;
    } else {
        ainfo.next_quota = (ainfo.prev_quota as i64 + cv) as u64;
    }

    // A committed working mode is never reused, even for a running
    // application.
    ainfo.working_mode = Some(WorkingMode::new(
        ainfo.app.working_mode_count(),
        Branch::Adaptation.description(),
        1,
        ainfo.app.str_id(),
    ));

    ainfo.app.set_attr(ATTR_IERR, &ierr.to_string());
    // derr keeps this tick's error; the next tick differentiates
    // against it.
    ainfo.app.set_attr(ATTR_DERR, &error.to_string());

    tick.available_cpu -= ainfo.next_quota as i64 - ainfo.prev_quota as i64;

    info!(
        error,
        cv,
        next_quota = ainfo.next_quota,
        prev_quota = ainfo.prev_quota,
        prev_used = ainfo.prev_used,
        prev_delta = ainfo.prev_delta,
        available_cpu = tick.available_cpu,
        "new settings"
    );

    QuotaDecision {
        branch: Branch::Adaptation,
        error,
        cv,
        underflow_reset,
    }
}

/// Decimal-text attribute read; anything missing or unparseable
/// counts as zero.
fn parse_attr(app: &dyn Application, key: &str) -> i64 {
    app.get_attr(key)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use system::app::AppRef;
    use system::model::{RuntimeProfile, SchedulableState, ViewToken};

    use super::*;

    struct FakeApp {
        id: String,
        state: SchedulableState,
        cpu_usage: u64,
        attrs: Mutex<HashMap<String, String>>,
    }

    impl FakeApp {
        fn new(state: SchedulableState, cpu_usage: u64) -> Arc<Self> {
            Arc::new(Self {
                id: "app1:0001".to_string(),
                state,
                cpu_usage,
                attrs: Mutex::new(HashMap::new()),
            })
        }

        fn with_attrs(state: SchedulableState, cpu_usage: u64, ierr: &str, derr: &str) -> Arc<Self> {
            let app = Self::new(state, cpu_usage);
            app.set_attr(ATTR_IERR, ierr);
            app.set_attr(ATTR_DERR, derr);
            app
        }

        fn attr(&self, key: &str) -> Option<String> {
            self.attrs.lock().unwrap().get(key).cloned()
        }
    }

    impl Application for FakeApp {
        fn str_id(&self) -> String {
            self.id.clone()
        }

        fn state(&self) -> SchedulableState {
            self.state
        }

        fn runtime_profile(&self) -> RuntimeProfile {
            RuntimeProfile {
                cpu_usage: self.cpu_usage,
                ctime_ms: 0,
                ggap_percent: 0,
                is_valid: true,
            }
        }

        fn current_working_mode(&self) -> Option<WorkingMode> {
            None
        }

        fn working_mode_count(&self) -> usize {
            0
        }

        fn get_attr(&self, key: &str) -> Option<String> {
            self.attrs.lock().unwrap().get(key).cloned()
        }

        fn set_attr(&self, key: &str, value: &str) {
            self.attrs
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }
    }

    fn mk_info(app: AppRef, prev_quota: u64, prev_used: u64) -> AppInfo {
        AppInfo {
            working_mode: None,
            prev_quota,
            prev_used,
            prev_delta: prev_quota as i64 - prev_used as i64,
            next_quota: 0,
            app,
        }
    }

    fn mk_tick(available_cpu: i64, quota_not_run_apps: u64) -> TickState {
        let mut tick = TickState::new(available_cpu, 1, 1, ViewToken(7));
        tick.quota_not_run_apps = quota_not_run_apps;
        tick
    }

    fn unit_gains() -> ControllerParams {
        ControllerParams::default()
    }

    #[test]
    fn first_round_caps_at_initial_default() {
        let app = FakeApp::new(SchedulableState::Ready, 0);
        let mut info = mk_info(app.clone(), 0, 0);
        let mut tick = mk_tick(400, 400);

        let decision = compute_quota(&mut info, &unit_gains(), &mut tick);

        assert_eq!(decision.branch, Branch::Default);
        assert_eq!(info.next_quota, 150);
        assert_eq!(tick.available_cpu, 250);
        assert_eq!(app.attr(ATTR_IERR).as_deref(), Some("0"));
        assert_eq!(app.attr(ATTR_DERR).as_deref(), Some("0"));
        assert_eq!(
            info.working_mode.as_ref().map(|awm| awm.name.as_str()),
            Some("Default")
        );
    }

    #[test]
    fn first_round_takes_share_when_tight() {
        let app = FakeApp::new(SchedulableState::Ready, 0);
        let mut info = mk_info(app, 0, 0);
        let mut tick = mk_tick(40, 20);

        compute_quota(&mut info, &unit_gains(), &mut tick);

        assert_eq!(info.next_quota, 20);
        assert_eq!(tick.available_cpu, 20);
    }

    #[test]
    fn dead_band_keeps_quota() {
        let app = FakeApp::with_attrs(SchedulableState::Running, 95, "0", "0");
        let mut info = mk_info(app.clone(), 100, 95);
        let mut tick = mk_tick(50, 0);

        let decision = compute_quota(&mut info, &unit_gains(), &mut tick);

        assert_eq!(decision.branch, Branch::Adaptation);
        assert_eq!(decision.error, 0);
        assert_eq!(decision.cv, 0);
        assert_eq!(info.next_quota, 100);
        assert_eq!(tick.available_cpu, 50);
        assert_eq!(app.attr(ATTR_IERR).as_deref(), Some("0"));
        assert_eq!(app.attr(ATTR_DERR).as_deref(), Some("0"));
        assert_eq!(
            info.working_mode.as_ref().map(|awm| awm.name.as_str()),
            Some("Adaptation")
        );
    }

    #[test]
    fn saturation_pushes_forfait_delta() {
        let app = FakeApp::with_attrs(SchedulableState::Running, 100, "0", "0");
        let mut info = mk_info(app.clone(), 100, 100);
        let mut tick = mk_tick(50, 0);

        let decision = compute_quota(&mut info, &unit_gains(), &mut tick);

        // prev_delta overridden to -5; error = 5 - (-5) = 10; each
        // term contributes 10.
        assert_eq!(decision.error, 10);
        assert_eq!(decision.cv, 30);
        assert_eq!(info.next_quota, 130);
        assert_eq!(tick.available_cpu, 20);
        assert_eq!(app.attr(ATTR_IERR).as_deref(), Some("10"));
        assert_eq!(app.attr(ATTR_DERR).as_deref(), Some("10"));
    }

    #[test]
    fn positive_correction_clamps_to_budget() {
        let app = FakeApp::with_attrs(SchedulableState::Running, 100, "0", "0");
        let mut info = mk_info(app, 100, 100);
        let mut tick = mk_tick(12, 0);

        let decision = compute_quota(&mut info, &unit_gains(), &mut tick);

        assert_eq!(decision.cv, 12);
        assert_eq!(info.next_quota, 112);
        assert_eq!(tick.available_cpu, 0);
    }

    #[test]
    fn underflow_resets_to_initial_default() {
        let app = FakeApp::with_attrs(SchedulableState::Running, 0, "-1000", "0");
        let mut info = mk_info(app.clone(), 20, 0);
        let mut tick = mk_tick(300, 0);

        let decision = compute_quota(&mut info, &unit_gains(), &mut tick);

        // error = 5 - 20 = -15; cv = -15 + (-1015) + (-15) = -1045.
        assert!(decision.underflow_reset);
        assert_eq!(decision.cv, -1045);
        assert_eq!(info.next_quota, 150);
        // Budget charged with the reset value: 300 - (150 - 20).
        assert_eq!(tick.available_cpu, 170);
        assert_eq!(app.attr(ATTR_IERR).as_deref(), Some("-1015"));
        assert_eq!(app.attr(ATTR_DERR).as_deref(), Some("-15"));
    }

    #[test]
    fn moderate_negative_correction_shrinks_quota() {
        let app = FakeApp::with_attrs(SchedulableState::Running, 88, "0", "0");
        let mut info = mk_info(app, 100, 88);
        let mut tick = mk_tick(0, 0);

        let decision = compute_quota(&mut info, &unit_gains(), &mut tick);

        // delta 12 -> error -7; cv = -21; shrink frees budget.
        assert_eq!(decision.cv, -21);
        assert_eq!(info.next_quota, 79);
        assert_eq!(tick.available_cpu, 21);
    }

    #[test]
    fn integral_error_accumulates_across_ticks() {
        let app = FakeApp::with_attrs(SchedulableState::Running, 100, "10", "2");
        let mut info = mk_info(app.clone(), 120, 100);
        let mut tick = mk_tick(200, 0);

        compute_quota(&mut info, &unit_gains(), &mut tick);

        // delta 20 -> error -15; ierr = 10 - 15 = -5; derr = -15 - 2.
        assert_eq!(app.attr(ATTR_IERR).as_deref(), Some("-5"));
        assert_eq!(app.attr(ATTR_DERR).as_deref(), Some("-15"));
        // cv = -15 + (-5) + (-17) = -37.
        assert_eq!(info.next_quota, 83);
    }

    #[test]
    fn corrupt_attributes_count_as_zero() {
        let app = FakeApp::with_attrs(SchedulableState::Running, 80, "garbage", "");
        let mut info = mk_info(app.clone(), 100, 80);
        let mut tick = mk_tick(200, 0);

        let decision = compute_quota(&mut info, &unit_gains(), &mut tick);

        // delta 20 -> error -15, with both stored errors read as 0.
        assert_eq!(decision.cv, -45);
        assert_eq!(info.next_quota, 55);
        assert_eq!(app.attr(ATTR_IERR).as_deref(), Some("-15"));
    }

    #[test]
    fn fractional_gains_truncate_toward_zero() {
        let params = ControllerParams {
            neg_delta: -5,
            kp: 0.4,
            ki: 0.4,
            kd: 0.4,
        };
        let app = FakeApp::with_attrs(SchedulableState::Running, 100, "0", "0");
        let mut info = mk_info(app, 100, 100);
        let mut tick = mk_tick(500, 0);

        let decision = compute_quota(&mut info, &params, &mut tick);

        // error = 10; each term 0.4 * 10 = 4.0 -> 4.
        assert_eq!(decision.cv, 12);
        assert_eq!(info.next_quota, 112);
    }
}
