//! Drives the adaptive CPU policy through a synthetic workload.
//!
//! Three applications with fixed CPU demands start READY; each tick
//! the policy assigns quotas, then the workload model reports back a
//! usage of min(demand, quota). Per-decision telemetry lands in a
//! gain-stamped CSV in the current directory.

use std::sync::Arc;

use tracing::info;

use harness::host::{InMemoryHost, SimApp};
use schedpol::engine::AdaptiveCpuPolicy;
use schedpol::telemetry::CsvSink;
use system::app::Application;
use system::model::SchedulableState;

const TICKS: u32 = 20;

struct Workload {
    app: Arc<SimApp>,
    /// Quota units this application would consume if unconstrained.
    demand: u64,
}

fn main() -> anyhow::Result<()> {
    common::init_tracing(false);

    let host = InMemoryHost::new(4);

    let workloads = [
        Workload {
            app: SimApp::new("video:0001"),
            demand: 120,
        },
        Workload {
            app: SimApp::new("audio:0002"),
            demand: 60,
        },
        Workload {
            app: SimApp::new("batch:0003"),
            demand: 300,
        },
    ];
    for w in &workloads {
        host.add_app(w.app.clone());
    }

    let mut policy = AdaptiveCpuPolicy::new(&host);
    let sink = CsvSink::create(".", policy.params())?;
    policy = policy.with_sink(Box::new(sink));
    let counters = policy.counters();

    for tick in 0..TICKS {
        info!(tick, "simulation tick");
        policy.schedule(&host)?;
        settle(&host, &workloads);
    }

    for w in &workloads {
        let quota = host.allocated(&w.app.str_id());
        let awm = w.app.current_working_mode();
        info!(
            app = %w.app.str_id(),
            demand = w.demand,
            quota,
            working_mode = awm.as_ref().map(|m| m.name.as_str()).unwrap_or("-"),
            "final assignment"
        );
    }

    info!(
        ticks = counters.ticks.load(std::sync::atomic::Ordering::Relaxed),
        assigned = counters.apps_assigned.load(std::sync::atomic::Ordering::Relaxed),
        skipped = counters.apps_skipped.load(std::sync::atomic::Ordering::Relaxed),
        failed = counters.apps_failed.load(std::sync::atomic::Ordering::Relaxed),
        "simulation finished"
    );

    Ok(())
}

/// Feed assigned quotas back into the workload model: every scheduled
/// app starts running and consumes as much of its quota as its demand
/// allows.
fn settle(host: &InMemoryHost, workloads: &[Workload]) {
    for w in workloads {
        let quota = host.allocated(&w.app.str_id());
        if quota == 0 {
            continue;
        }
        w.app.set_state(SchedulableState::Running);
        w.app.set_usage(w.demand.min(quota), 100);
    }
}
