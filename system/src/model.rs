//! Value types shared between the resource-manager host and its
//! scheduling policies.

use std::fmt;

/// Resource path of the CPU processing-element bandwidth pool.
///
/// Quota amounts under this path are expressed in hundredths of one
/// processing element: 100 units = one whole PE.
pub const CPU_PE_PATH: &str = "sys.cpu.pe";

/// Host-level identifier for a concrete resource (CPU die, processing
/// element).
pub type ResourceId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Cpu,
    ProcElement,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::ProcElement => "pe",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of a schedulable application, as reported by the
/// host registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulableState {
    Ready,
    Running,
    Thawed,
    Restoring,
    Finished,
}

impl SchedulableState {
    /// States that are schedulable but not yet running, in the order
    /// the host services them after the running pass.
    pub const NOT_RUNNING: [SchedulableState; 3] = [
        SchedulableState::Ready,
        SchedulableState::Thawed,
        SchedulableState::Restoring,
    ];
}

impl fmt::Display for SchedulableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulableState::Ready => "Ready",
            SchedulableState::Running => "Running",
            SchedulableState::Thawed => "Thawed",
            SchedulableState::Restoring => "Restoring",
            SchedulableState::Finished => "Finished",
        };
        f.write_str(s)
    }
}

/// Runtime usage sample collected by the host for one application.
///
/// `cpu_usage` is in quota units (hundredths of one PE).
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeProfile {
    pub cpu_usage: u64,
    pub ctime_ms: u32,
    pub ggap_percent: i32,
    pub is_valid: bool,
}

/// Token identifying a tentative resource-status view under
/// construction. Committed atomically by the host when the tick ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewToken(pub u64);

impl fmt::Display for ViewToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the host should spread a quota request across concrete
/// resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocPolicy {
    /// Prefer contiguous processing elements.
    Sequential,
    /// Spread evenly across processing elements.
    Balanced,
}

/// One abstract resource demand attached to a working mode.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub path: &'static str,
    pub amount: u64,
    pub policy: AllocPolicy,
}

/// A resolved binding of a working mode's requests onto one concrete
/// resource.
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub kind: ResourceKind,
    pub target: ResourceId,
    pub ref_num: i32,
}

/// Resource assignment proposed for one application in one tick.
///
/// A fresh descriptor is built every tick; a committed one is never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct WorkingMode {
    /// Index of this mode in the owner's working-mode list.
    pub awm_id: usize,
    pub name: String,
    pub value: u32,
    /// `str_id` of the owning application.
    pub owner: String,
    pub requests: Vec<ResourceRequest>,
    pub bindings: Vec<Binding>,
}

impl WorkingMode {
    pub fn new(awm_id: usize, name: impl Into<String>, value: u32, owner: impl Into<String>) -> Self {
        Self {
            awm_id,
            name: name.into(),
            value,
            owner: owner.into(),
            requests: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn add_resource_request(&mut self, path: &'static str, amount: u64, policy: AllocPolicy) {
        self.requests.push(ResourceRequest {
            path,
            amount,
            policy,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_mode_collects_requests() {
        let mut awm = WorkingMode::new(0, "Default", 1, "app1:0001");
        awm.add_resource_request(CPU_PE_PATH, 150, AllocPolicy::Sequential);

        assert_eq!(awm.requests.len(), 1);
        assert_eq!(awm.requests[0].amount, 150);
        assert_eq!(awm.requests[0].path, CPU_PE_PATH);
        assert!(awm.bindings.is_empty());
    }
}
