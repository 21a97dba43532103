//! A complete in-memory implementation of the host interface.
//!
//! Working modes submitted through `schedule_request` are committed
//! immediately: the accountant's per-app charge and the app's
//! working-mode catalog reflect them on the next tick.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use system::app::{AppRef, Application};
use system::host::{
    ApplicationManager, BindingDomains, BindingManager, ConfigSource, ResourceAccountant,
    SystemView,
};
use system::model::{
    Binding, CPU_PE_PATH, ResourceId, ResourceKind, RuntimeProfile, SchedulableState, ViewToken,
    WorkingMode,
};

pub struct SimApp {
    id: String,
    state: Mutex<SchedulableState>,
    profile: Mutex<RuntimeProfile>,
    working_modes: Mutex<Vec<WorkingMode>>,
    attrs: Mutex<HashMap<String, String>>,
}

impl SimApp {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            state: Mutex::new(SchedulableState::Ready),
            profile: Mutex::new(RuntimeProfile::default()),
            working_modes: Mutex::new(Vec::new()),
            attrs: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_state(&self, state: SchedulableState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn set_usage(&self, cpu_usage: u64, ctime_ms: u32) {
        *self.profile.lock().unwrap() = RuntimeProfile {
            cpu_usage,
            ctime_ms,
            ggap_percent: 0,
            is_valid: true,
        };
    }
}

impl Application for SimApp {
    fn str_id(&self) -> String {
        self.id.clone()
    }

    fn state(&self) -> SchedulableState {
        *self.state.lock().unwrap()
    }

    fn runtime_profile(&self) -> RuntimeProfile {
        *self.profile.lock().unwrap()
    }

    fn current_working_mode(&self) -> Option<WorkingMode> {
        self.working_modes.lock().unwrap().last().cloned()
    }

    fn working_mode_count(&self) -> usize {
        self.working_modes.lock().unwrap().len()
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

pub struct InMemoryHost {
    apps: Mutex<Vec<Arc<SimApp>>>,
    pe_ids: BTreeSet<ResourceId>,
    cpu_ids: Vec<ResourceId>,
    total_cpu: u64,
    allocations: Mutex<HashMap<String, u64>>,
    next_view: AtomicU64,
    options: HashMap<String, String>,
}

impl InMemoryHost {
    /// Host with `pe_count` processing elements on one CPU domain.
    /// The budget is 100 quota units per processing element.
    pub fn new(pe_count: u16) -> Self {
        Self {
            apps: Mutex::new(Vec::new()),
            pe_ids: (0..pe_count).collect(),
            cpu_ids: vec![0],
            total_cpu: pe_count as u64 * 100,
            allocations: Mutex::new(HashMap::new()),
            next_view: AtomicU64::new(1),
            options: HashMap::new(),
        }
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn add_app(&self, app: Arc<SimApp>) {
        self.apps.lock().unwrap().push(app);
    }

    /// Quota currently committed for `app_id`.
    pub fn allocated(&self, app_id: &str) -> u64 {
        self.allocations
            .lock()
            .unwrap()
            .get(app_id)
            .copied()
            .unwrap_or(0)
    }
}

impl SystemView for InMemoryHost {
    fn resource_types(&self) -> HashMap<ResourceKind, BTreeSet<ResourceId>> {
        let mut map = HashMap::new();
        map.insert(ResourceKind::ProcElement, self.pe_ids.clone());
        map.insert(ResourceKind::Cpu, self.cpu_ids.iter().copied().collect());
        map
    }

    fn schedulables_count(&self, state: SchedulableState) -> usize {
        self.apps
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.state() == state)
            .count()
    }

    fn applications(&self, state: SchedulableState) -> Vec<AppRef> {
        self.apps
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.state() == state)
            .map(|a| a.clone() as AppRef)
            .collect()
    }

    fn accountant(&self) -> &dyn ResourceAccountant {
        self
    }

    fn new_resource_view(&self) -> ViewToken {
        ViewToken(self.next_view.fetch_add(1, Ordering::Relaxed))
    }
}

impl ResourceAccountant for InMemoryHost {
    fn available(&self, path: &str) -> u64 {
        if path != CPU_PE_PATH {
            return 0;
        }
        let allocated: u64 = self.allocations.lock().unwrap().values().sum();
        self.total_cpu.saturating_sub(allocated)
    }

    fn used_by(&self, app: &dyn Application, path: &str, _view_index: usize) -> u64 {
        if path != CPU_PE_PATH {
            return 0;
        }
        self.allocated(&app.str_id())
    }
}

impl BindingManager for InMemoryHost {
    fn binding_domains(&self) -> BindingDomains {
        let mut domains = BindingDomains::default();
        domains.insert(ResourceKind::Cpu, self.cpu_ids.clone());
        domains
    }

    fn bind_resource(
        &self,
        awm: &mut WorkingMode,
        kind: ResourceKind,
        _source: Option<ResourceId>,
        target: ResourceId,
        _ref_num: i32,
    ) -> i32 {
        if !self.cpu_ids.contains(&target) {
            return -1;
        }
        let ref_num = awm.bindings.len() as i32;
        awm.bindings.push(Binding {
            kind,
            target,
            ref_num,
        });
        ref_num
    }
}

impl ApplicationManager for InMemoryHost {
    fn schedule_request(
        &self,
        app: &dyn Application,
        awm: &WorkingMode,
        _view: ViewToken,
        ref_num: i32,
    ) -> anyhow::Result<()> {
        if !awm.bindings.iter().any(|b| b.ref_num == ref_num) {
            anyhow::bail!("unknown binding reference {ref_num}");
        }

        let amount = awm.requests.first().map(|r| r.amount).unwrap_or(0);

        self.allocations
            .lock()
            .unwrap()
            .insert(app.str_id(), amount);

        let apps = self.apps.lock().unwrap();
        if let Some(a) = apps.iter().find(|a| a.str_id() == app.str_id()) {
            a.working_modes.lock().unwrap().push(awm.clone());
        }

        Ok(())
    }
}

impl ConfigSource for InMemoryHost {
    fn option(&self, key: &str) -> Option<String> {
        self.options.get(key).cloned()
    }
}
