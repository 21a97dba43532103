//! Adaptive CPU bandwidth scheduling policy.
//!
//! A feedback-driven allocation policy: on every scheduling tick it
//! assigns each managed application a share of the available CPU
//! bandwidth, derived from the application's recent usage through a
//! per-application PID controller. The policy is consumed as a
//! plug-in by an external resource manager; the narrow host interface
//! it talks to lives in the `system` crate.
//!
//! Per tick:
//!   1. `engine` gathers counts and the CPU budget and opens a fresh
//!      resource view.
//!   2. For each application, `app_info` snapshots its prior quota
//!      and usage.
//!   3. `quota` decides the next quota and charges the shared budget.
//!   4. `dispatch` binds the resulting working mode to the first CPU
//!      that accepts it and submits the schedule request.

pub mod app_info;
pub mod counters;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod params;
pub mod quota;
pub mod state;
pub mod telemetry;

/// Name under which the policy registers with the host.
pub const POLICY_NAME: &str = "adaptive_cpu";

/// Quota handed to an application the first time it is scheduled,
/// budget permitting. 100 units = one whole processing element.
pub const INITIAL_DEFAULT_QUOTA: u64 = 150;

/// Smallest quota share worth assigning to a newcomer.
pub const MIN_ASSIGNABLE_QUOTA: u64 = 10;

/// Width of the controller dead-band; the set-point sits at half of
/// it.
pub const ADMISSIBLE_DELTA: i64 = 10;

/// `prev_used` within this distance of `prev_quota` counts as
/// saturated.
pub const SATURATION_THRESHOLD: i64 = 1;
