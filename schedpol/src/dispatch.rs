//! Turns a quota decision into a host-level schedule request.
//!
//! Builds the application snapshot, runs the decision engine, then
//! walks the CPU binding domains first-fit: the first CPU that
//! accepts both the binding and the schedule request wins.

use std::sync::atomic::Ordering;

use tracing::{debug, error, info};

use system::app::AppRef;
use system::host::Host;
use system::model::{AllocPolicy, CPU_PE_PATH, ResourceKind};

use crate::app_info::AppInfo;
use crate::counters::Counters;
use crate::error::DispatchError;
use crate::params::ControllerParams;
use crate::quota::compute_quota;
use crate::state::TickState;
use crate::telemetry::{QuotaSample, TelemetrySink};

/// Per-application verdict of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned,
    /// Not enough budget to admit a newcomer this tick.
    Skipped,
}

/// Assign a working mode to one application within the current tick.
///
/// Mutates the shared tick budget through the decision engine; a
/// failure after that point leaves the budget charged, exactly like a
/// successful submission the host later rejects at commit.
pub fn assign_working_mode(
    papp: Option<AppRef>,
    host: &dyn Host,
    params: &ControllerParams,
    tick: &mut TickState,
    counters: &Counters,
    sink: &mut dyn TelemetrySink,
) -> Result<AssignOutcome, DispatchError> {
    let Some(app) = papp else {
        error!("null application descriptor");
        return Err(DispatchError::NullApplication);
    };

    if app.running() {
        let prof = app.runtime_profile();
        info!(
            app = %app.str_id(),
            cpu_usage = prof.cpu_usage,
            ctime_ms = prof.ctime_ms,
            ggap_percent = prof.ggap_percent,
            valid = prof.is_valid,
            "runtime profile"
        );
    }

    let mut ainfo = AppInfo::collect(app, host.accountant());

    debug!(
        app = %ainfo.app.str_id(),
        prev_quota = ainfo.prev_quota,
        prev_used = ainfo.prev_used,
        prev_delta = ainfo.prev_delta,
        available_cpu = tick.available_cpu,
        "app info initialized"
    );

    if tick.quota_not_run_apps == 0 && !ainfo.app.running() {
        info!(app = %ainfo.app.str_id(), "not enough available resources to schedule");
        return Ok(AssignOutcome::Skipped);
    }

    let decision = compute_quota(&mut ainfo, params, tick);
    if decision.underflow_reset {
        counters.underflow_resets.fetch_add(1, Ordering::Relaxed);
    }

    sink.record(&QuotaSample {
        app: ainfo.app.str_id(),
        branch: decision.branch.description(),
        prev_quota: ainfo.prev_quota,
        prev_used: ainfo.prev_used,
        prev_delta: ainfo.prev_delta,
        error: decision.error,
        cv: decision.cv,
        next_quota: ainfo.next_quota,
        available_cpu: tick.available_cpu,
    });

    let mut awm = ainfo
        .working_mode
        .take()
        .expect("compute_quota fills the working mode on every branch");

    awm.add_resource_request(CPU_PE_PATH, ainfo.next_quota, AllocPolicy::Sequential);

    // First-fit over the CPU binding domains; no attempt to pick an
    // optimum CPU.
    let domains = host.binding_domains();
    for &cpu_id in domains.r_ids(ResourceKind::Cpu) {
        info!(app = %ainfo.app.str_id(), cpu_id, "binding attempt");

        let ref_num = host.bind_resource(&mut awm, ResourceKind::Cpu, None, cpu_id, -1);
        if ref_num < 0 {
            error!(app = %ainfo.app.str_id(), cpu_id, "CPU binding failed");
            counters.binding_retries.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        if let Err(e) =
            host.schedule_request(ainfo.app.as_ref(), &awm, tick.sched_status_view, ref_num)
        {
            error!(app = %ainfo.app.str_id(), cpu_id, error = %e, "schedule request failed");
            counters.binding_retries.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        return Ok(AssignOutcome::Assigned);
    }

    Err(DispatchError::NoBindingAccepted {
        app: ainfo.app.str_id(),
    })
}
