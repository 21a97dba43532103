//! The tick controller: drives one scheduling tick end-to-end.
//!
//! Running applications are serviced first, so their potentially
//! reduced quotas liberate capacity before the leftovers are divided
//! among first-time applicants. Then the ready, thawed and restoring
//! passes run, in that strict order; within each pass the host
//! enumeration order is adopted verbatim.

use std::sync::atomic::Ordering;

use tracing::{debug, error, info};

use common::TickId;
use system::app::AppRef;
use system::host::{ConfigSource, Host};
use system::model::{CPU_PE_PATH, ResourceKind, SchedulableState, ViewToken};

use crate::POLICY_NAME;
use crate::counters::Counters;
use crate::dispatch::{self, AssignOutcome};
use crate::error::PolicyError;
use crate::params::ControllerParams;
use crate::state::TickState;
use crate::telemetry::{NullSink, TelemetrySink};

/// The adaptive CPU bandwidth policy.
///
/// One instance lives as long as the plug-in registration; everything
/// per-tick is rebuilt inside [`schedule`](Self::schedule).
pub struct AdaptiveCpuPolicy {
    params: ControllerParams,
    counters: Counters,
    sink: Box<dyn TelemetrySink>,
}

impl AdaptiveCpuPolicy {
    pub fn new(cfg: &dyn ConfigSource) -> Self {
        let params = ControllerParams::load(cfg);
        info!(policy = POLICY_NAME, "policy created");

        Self {
            params,
            counters: Counters::default(),
            sink: Box::new(NullSink),
        }
    }

    /// Replace the telemetry side-channel (a no-op sink by default).
    pub fn with_sink(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn params(&self) -> &ControllerParams {
        &self.params
    }

    /// Handle to the policy counters, shared with the caller.
    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    /// Run one scheduling tick over `host`.
    ///
    /// Returns the resource view the host should commit. Individual
    /// application failures are contained to the application; the
    /// tick itself only fails when the host has nothing to schedule
    /// on.
    pub fn schedule(&mut self, host: &dyn Host) -> Result<ViewToken, PolicyError> {
        let tick_id = TickId::new();
        let span = common::tick_span(&tick_id);
        let _guard = span.enter();

        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        let mut tick = self.init_tick(host)?;

        for app in host.applications(SchedulableState::Running) {
            self.dispatch_one(app, host, &mut tick);
        }

        // The newcomer share is fixed exactly once per tick, from
        // whatever the running pass left over.
        tick.freeze_not_run_share();
        debug!(
            quota_not_run_apps = tick.quota_not_run_apps,
            available_cpu = tick.available_cpu,
            "newcomer share fixed"
        );

        for state in SchedulableState::NOT_RUNNING {
            for app in host.applications(state) {
                self.dispatch_one(app, host, &mut tick);
            }
        }

        debug!(status_view = %tick.sched_status_view, "schedule: done");
        Ok(tick.sched_status_view)
    }

    fn init_tick(&self, host: &dyn Host) -> Result<TickState, PolicyError> {
        let resource_types = host.resource_types();
        let pe_count = resource_types
            .get(&ResourceKind::ProcElement)
            .map_or(0, |ids| ids.len());

        info!(pe_count, "init: processing elements available");
        if pe_count == 0 {
            error!("init: no CPU cores available");
            return Err(PolicyError::ResourceUnavailable);
        }

        let nr_run_apps = host.schedulables_count(SchedulableState::Running);
        let nr_not_run_apps: usize = SchedulableState::NOT_RUNNING
            .iter()
            .map(|s| host.schedulables_count(*s))
            .sum();

        let available_cpu = host.accountant().available(CPU_PE_PATH) as i64;
        let view = host.new_resource_view();

        info!(
            nr_apps = nr_run_apps + nr_not_run_apps,
            nr_run_apps,
            nr_not_run_apps,
            available_cpu,
            status_view = %view,
            "init: active applications"
        );

        Ok(TickState::new(available_cpu, nr_run_apps, nr_not_run_apps, view))
    }

    fn dispatch_one(&mut self, app: AppRef, host: &dyn Host, tick: &mut TickState) {
        let span = common::app_span(&app.str_id());
        let _guard = span.enter();

        match dispatch::assign_working_mode(
            Some(app),
            host,
            &self.params,
            tick,
            &self.counters,
            self.sink.as_mut(),
        ) {
            Ok(AssignOutcome::Assigned) => {
                self.counters.apps_assigned.fetch_add(1, Ordering::Relaxed);
            }
            Ok(AssignOutcome::Skipped) => {
                self.counters.apps_skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                // One application's failure never aborts the tick.
                error!(error = %e, "application left unscheduled");
                self.counters.apps_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
