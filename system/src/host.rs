//! The narrow host interface consumed by scheduling policies.
//!
//! The host resource manager owns the application registry, the
//! resource accountant, the working-mode catalog and the binding
//! machinery; a policy only ever talks to it through these traits.

use std::collections::{BTreeSet, HashMap};

use crate::app::{AppRef, Application};
use crate::model::{ResourceId, ResourceKind, SchedulableState, ViewToken, WorkingMode};

/// Read side of the host resource accountant.
pub trait ResourceAccountant: Send + Sync {
    /// Quota units currently unassigned under `path`.
    fn available(&self, path: &str) -> u64;

    /// Quota units currently charged to `app` under `path` in the
    /// given status view.
    fn used_by(&self, app: &dyn Application, path: &str, view_index: usize) -> u64;
}

/// Query surface of the host resource manager.
pub trait SystemView: Send + Sync {
    /// All resource identifiers known to the host, by kind.
    fn resource_types(&self) -> HashMap<ResourceKind, BTreeSet<ResourceId>>;

    /// Number of applications currently in `state`.
    fn schedulables_count(&self, state: SchedulableState) -> usize;

    /// Applications currently in `state`, in host enumeration order.
    /// The order is stable for the duration of one tick.
    fn applications(&self, state: SchedulableState) -> Vec<AppRef>;

    fn accountant(&self) -> &dyn ResourceAccountant;

    /// Open a fresh tentative resource-status view for this tick.
    fn new_resource_view(&self) -> ViewToken;
}

/// Ordered binding-domain identifiers, one list per resource kind.
#[derive(Debug, Clone, Default)]
pub struct BindingDomains {
    inner: HashMap<ResourceKind, Vec<ResourceId>>,
}

impl BindingDomains {
    pub fn insert(&mut self, kind: ResourceKind, r_ids: Vec<ResourceId>) {
        self.inner.insert(kind, r_ids);
    }

    /// Candidate identifiers for `kind`, in host iteration order.
    pub fn r_ids(&self, kind: ResourceKind) -> &[ResourceId] {
        self.inner.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Binding surface of the host.
pub trait BindingManager: Send + Sync {
    fn binding_domains(&self) -> BindingDomains;

    /// Bind `awm`'s requests onto the concrete resource `target`.
    ///
    /// `source` narrows which unbound identifier to rebind; `None`
    /// means any. Returns a nonnegative reference number on success,
    /// negative on failure. On success the binding is recorded on
    /// `awm`.
    fn bind_resource(
        &self,
        awm: &mut WorkingMode,
        kind: ResourceKind,
        source: Option<ResourceId>,
        target: ResourceId,
        ref_num: i32,
    ) -> i32;
}

/// Commit surface of the host application manager.
pub trait ApplicationManager: Send + Sync {
    /// Submit `awm` for `app` into the tentative view `view`, using
    /// the binding identified by `ref_num`.
    fn schedule_request(
        &self,
        app: &dyn Application,
        awm: &WorkingMode,
        view: ViewToken,
        ref_num: i32,
    ) -> anyhow::Result<()>;
}

/// Key/value configuration the host exposes to its plug-ins.
pub trait ConfigSource {
    fn option(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn option(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Everything a scheduling policy needs from the host, in one object.
pub trait Host: SystemView + BindingManager + ApplicationManager {}

impl<T: SystemView + BindingManager + ApplicationManager> Host for T {}
