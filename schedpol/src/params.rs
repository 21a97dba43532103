//! Controller gains, loaded once from the host configuration.

use std::str::FromStr;

use tracing::{info, warn};

use system::host::ConfigSource;

/// Configuration namespace recognized by this policy.
pub const CONFIG_NAMESPACE: &str = "AdaptiveCPUSchedPol";

pub const DEFAULT_NEG_DELTA: i64 = -5;
pub const DEFAULT_KP: f32 = 1.0;
pub const DEFAULT_KI: f32 = 1.0;
pub const DEFAULT_KD: f32 = 1.0;

/// Gains of the per-application quota controller.
///
/// Read-only after the policy is constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerParams {
    /// Forfait delta pushed when observed usage saturates its quota.
    pub neg_delta: i64,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            neg_delta: DEFAULT_NEG_DELTA,
            kp: DEFAULT_KP,
            ki: DEFAULT_KI,
            kd: DEFAULT_KD,
        }
    }
}

impl ControllerParams {
    /// Read the `AdaptiveCPUSchedPol.*` options from the host
    /// configuration. Missing or unparseable options keep their
    /// defaults.
    pub fn load(cfg: &dyn ConfigSource) -> Self {
        let mut params = Self::default();
        read_option(cfg, "neg_delta", &mut params.neg_delta);
        read_option(cfg, "kp", &mut params.kp);
        read_option(cfg, "ki", &mut params.ki);
        read_option(cfg, "kd", &mut params.kd);

        info!(
            neg_delta = params.neg_delta,
            kp = params.kp,
            ki = params.ki,
            kd = params.kd,
            "running with controller parameters"
        );
        params
    }
}

fn read_option<T: FromStr>(cfg: &dyn ConfigSource, name: &str, slot: &mut T) {
    let key = format!("{CONFIG_NAMESPACE}.{name}");
    let Some(raw) = cfg.option(&key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key = %key, value = %raw, "unparseable option, keeping default"),
    }
}
