use std::sync::Arc;

use crate::model::{RuntimeProfile, SchedulableState, WorkingMode};

/// Shared handle to one application registered in the host.
pub type AppRef = Arc<dyn Application>;

/// Host-side view of one managed application.
///
/// The attribute store is string-typed and lives as long as the
/// application does in the host registry; policies use it to persist
/// per-application controller state across ticks.
pub trait Application: Send + Sync {
    /// Printable short identifier.
    fn str_id(&self) -> String;

    fn state(&self) -> SchedulableState;

    /// True iff the application is currently running.
    fn running(&self) -> bool {
        self.state() == SchedulableState::Running
    }

    /// Most recent runtime telemetry sample.
    fn runtime_profile(&self) -> RuntimeProfile;

    /// Working mode currently committed for this application, if any.
    fn current_working_mode(&self) -> Option<WorkingMode>;

    /// Number of working modes the host already knows for this
    /// application. Used as the index of the next one.
    fn working_mode_count(&self) -> usize;

    fn get_attr(&self, key: &str) -> Option<String>;

    fn set_attr(&self, key: &str, value: &str);
}
