//! Tool lifecycle orchestration.
//!
//! The [`PluginManager`] owns every tool instance, tracks which tools are
//! active and cascades committed mode changes into deactivation of tools
//! that cannot stay active in the new mode.
//!
//! Tool hooks run while the manager is marked busy. A hook that calls back
//! into a mutating operation is rejected with [`PluginError::Reentrant`];
//! mode changes delivered while busy are parked and cascaded once the
//! running operation finishes. [`ToolEvent`]s are queued during an
//! operation and handed to observers afterwards. A tool that is borrowed
//! elsewhere while a mode change cascades is reconciled with the current
//! mode the next time the manager settles.

mod cache;

use std::cell::{Cell, RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use stagehand_config::DEFAULT_EVENT_HISTORY;
use stagehand_modes::{Mode, ModeChange, ModeObserver, SubscriptionId};
use tracing::{debug, info, warn};

use self::cache::InstanceCache;
use crate::PLUGIN_TARGET;
use crate::catalog::{ToolCatalog, ToolContext};
use crate::contract::{SharedTool, Tool};
use crate::error::PluginError;
use crate::events::{EventLog, ToolEvent, ToolEventObserver};
use crate::metadata::{ToolCategory, ToolDescriptor, ToolMetadata};
use crate::registry::ToolRegistry;
use crate::validator::{ValidationReport, validate_descriptor};

struct PluginState {
    registry: ToolRegistry,
    cache: InstanceCache,
    active: BTreeMap<String, Weak<RefCell<dyn Tool>>>,
    mode: Mode,
}

/// Resets a flag when dropped.
struct FlagGuard<'a>(&'a Cell<bool>);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn raise(flag: &Cell<bool>) -> Option<FlagGuard<'_>> {
    if flag.replace(true) {
        None
    } else {
        Some(FlagGuard(flag))
    }
}

/// Loads, activates and deactivates tools on behalf of the host.
pub struct PluginManager {
    context: ToolContext,
    catalog: ToolCatalog,
    state: RefCell<PluginState>,
    busy: Cell<bool>,
    settling: Cell<bool>,
    parked_modes: RefCell<VecDeque<Mode>>,
    unreconciled: RefCell<BTreeSet<String>>,
    pending_events: RefCell<Vec<ToolEvent>>,
    observers: RefCell<Vec<Rc<dyn ToolEventObserver>>>,
    history: RefCell<EventLog>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl PluginManager {
    /// Starts a manager keeping the default number of events.
    ///
    /// See [`PluginManager::with_history`].
    #[must_use]
    pub fn initialize(context: ToolContext, catalog: ToolCatalog, registry: ToolRegistry) -> Rc<Self> {
        Self::with_history(context, catalog, registry, DEFAULT_EVENT_HISTORY)
    }

    /// Starts a manager over `registry`.
    ///
    /// The manager subscribes to the context's mode manager, adopts its
    /// current mode and instantiates every enabled descriptor marked for
    /// auto-loading. Instantiation failures are logged and skipped.
    #[must_use]
    pub fn with_history(
        context: ToolContext,
        catalog: ToolCatalog,
        registry: ToolRegistry,
        history: usize,
    ) -> Rc<Self> {
        let mode = context.modes().current_mode();
        let auto_load: Vec<String> = registry
            .iter()
            .filter(|tool| tool.enabled && tool.auto_load)
            .map(|tool| tool.id.clone())
            .collect();
        let registered = registry.len();
        let manager = Rc::new(Self {
            context,
            catalog,
            state: RefCell::new(PluginState {
                registry,
                cache: InstanceCache::default(),
                active: BTreeMap::new(),
                mode,
            }),
            busy: Cell::new(false),
            settling: Cell::new(false),
            parked_modes: RefCell::new(VecDeque::new()),
            unreconciled: RefCell::new(BTreeSet::new()),
            pending_events: RefCell::new(Vec::new()),
            observers: RefCell::new(Vec::new()),
            history: RefCell::new(EventLog::with_capacity(history)),
            subscription: Cell::new(None),
        });

        let listener = Rc::new(ModeListener {
            manager: Rc::downgrade(&manager),
        });
        let subscription = manager.context.modes().subscribe(listener);
        manager.subscription.set(Some(subscription));

        for id in &auto_load {
            if manager.create_tool(id).is_none() {
                warn!(target: PLUGIN_TARGET, event = "tool_auto_load_failed", tool = %id);
            }
        }
        info!(
            target: PLUGIN_TARGET,
            event = "plugin_manager_started",
            mode = %mode,
            registered,
            auto_loaded = auto_load.len(),
            "plugin manager started"
        );
        manager
    }

    /// Collaborators handed to tool factories.
    #[must_use]
    pub const fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Factories available for instantiation.
    #[must_use]
    pub const fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Returns `true` while an operation or cascade is running.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy.get()
    }

    // -- registration --------------------------------------------------------

    /// Registers or replaces a tool, enabled and loaded on demand.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EmptyId`] for an empty id,
    /// [`PluginError::ContractViolation`] when `class` has no catalogued
    /// factory, and [`PluginError::Reentrant`] when called from a tool hook.
    pub fn register_tool(
        &self,
        id: &str,
        class: &str,
        metadata: ToolMetadata,
    ) -> Result<(), PluginError> {
        self.guarded("register_tool", || {
            if id.is_empty() {
                return Err(PluginError::EmptyId);
            }
            if !self.catalog.contains(class) {
                return Err(PluginError::ContractViolation {
                    id: id.to_owned(),
                    class: class.to_owned(),
                });
            }
            let replaced = self
                .state
                .borrow_mut()
                .registry
                .register_tool(ToolDescriptor::new(id, class, metadata));
            info!(target: PLUGIN_TARGET, event = "tool_registered", tool = id, class, replaced);
            self.emit(ToolEvent::Registered { id: id.to_owned() });
            Ok(())
        })
    }

    /// Deactivates, releases and forgets the tool registered as `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownTool`] when `id` is not registered and
    /// [`PluginError::Reentrant`] when called from a tool hook.
    pub fn unregister_tool(&self, id: &str) -> Result<(), PluginError> {
        self.guarded("unregister_tool", || {
            if !self.state.borrow().registry.contains(id) {
                return Err(PluginError::UnknownTool { id: id.to_owned() });
            }
            self.deactivate(id)?;
            let evicted = self.state.borrow_mut().cache.remove(id);
            if let Some(tool) = evicted {
                Self::release(id, &tool);
            }
            self.state.borrow_mut().registry.unregister_tool(id);
            info!(target: PLUGIN_TARGET, event = "tool_unregistered", tool = id);
            self.emit(ToolEvent::Unregistered { id: id.to_owned() });
            Ok(())
        })
    }

    // -- lifecycle -----------------------------------------------------------

    /// Returns the cached instance for `id`, instantiating and initialising
    /// it on first use.
    ///
    /// Returns `None` when the tool is unknown or disabled, when its factory
    /// fails, or when called from a tool hook. A tool whose initialisation
    /// fails is still cached and returned.
    #[must_use]
    pub fn create_tool(&self, id: &str) -> Option<SharedTool> {
        self.guarded("create_tool", || self.instantiate(id)).ok()
    }

    /// Activates `id`. Activating an active tool is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the instantiation error when the tool cannot be created,
    /// [`PluginError::Activation`] when its hook fails and
    /// [`PluginError::Reentrant`] when called from a tool hook.
    pub fn activate_tool(&self, id: &str) -> Result<(), PluginError> {
        self.guarded("activate_tool", || self.activate(id))
    }

    /// Deactivates `id`. Returns `false` when it was not active or when
    /// called from a tool hook.
    pub fn deactivate_tool(&self, id: &str) -> bool {
        self.guarded("deactivate_tool", || self.deactivate(id))
            .unwrap_or(false)
    }

    /// Deactivates every active tool once. Returns how many were active.
    pub fn deactivate_all_tools(&self) -> usize {
        self.guarded("deactivate_all_tools", || Ok(self.deactivate_every()))
            .unwrap_or(0)
    }

    /// Deactivates every tool, shuts down every cached instance and stops
    /// following mode changes. Later calls only repeat the (empty) cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Reentrant`] when called from a tool hook.
    pub fn shutdown(&self) -> Result<(), PluginError> {
        self.guarded("shutdown", || {
            let deactivated = self.deactivate_every();
            let instances = self.state.borrow_mut().cache.drain();
            for (id, tool) in &instances {
                Self::release(id, tool);
            }
            if let Some(subscription) = self.subscription.take() {
                self.context.modes().unsubscribe(subscription);
            }
            info!(
                target: PLUGIN_TARGET,
                event = "plugin_manager_shutdown",
                deactivated,
                released = instances.len(),
                "plugin manager shut down"
            );
            Ok(())
        })
    }

    /// Applies a committed mode change to the active tools.
    ///
    /// Every active tool is told about the new mode first; then each tool
    /// that cannot stay active in `mode` is deactivated. When the manager
    /// is busy the change is parked and applied after the running
    /// operation.
    pub fn on_mode_changed(&self, mode: Mode) {
        let Some(guard) = raise(&self.busy) else {
            debug!(target: PLUGIN_TARGET, event = "mode_change_parked", mode = %mode);
            self.parked_modes.borrow_mut().push_back(mode);
            return;
        };
        self.cascade(mode);
        drop(guard);
        self.settle();
    }

    // -- events --------------------------------------------------------------

    /// Registers an observer for subsequent tool events.
    pub fn subscribe_events(&self, observer: Rc<dyn ToolEventObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Recently dispatched events, oldest first.
    #[must_use]
    pub fn event_history(&self) -> Vec<ToolEvent> {
        self.history.borrow().entries()
    }

    // -- queries -------------------------------------------------------------

    /// Mode most recently cascaded.
    #[must_use]
    pub fn current_mode(&self) -> Mode {
        self.state.borrow().mode
    }

    /// Ids of enabled tools, in registration order.
    #[must_use]
    pub fn available_tools(&self) -> Vec<String> {
        self.enabled_ids(|_| true)
    }

    /// Ids of active tools, sorted.
    #[must_use]
    pub fn active_tools(&self) -> Vec<String> {
        self.state
            .borrow()
            .active
            .iter()
            .filter(|(_, handle)| handle.strong_count() > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids of enabled tools in `category`.
    #[must_use]
    pub fn tools_by_category(&self, category: ToolCategory) -> Vec<String> {
        self.enabled_ids(|tool| tool.metadata.category == category)
    }

    /// Ids of enabled tools usable in the current mode.
    #[must_use]
    pub fn tools_for_current_mode(&self) -> Vec<String> {
        let mode = self.current_mode();
        self.enabled_ids(|tool| tool.metadata.supports_mode(mode))
    }

    /// Returns `true` when `id` is active.
    #[must_use]
    pub fn is_tool_active(&self, id: &str) -> bool {
        self.state
            .borrow()
            .active
            .get(id)
            .is_some_and(|handle| handle.strong_count() > 0)
    }

    /// Returns `true` when `id` is registered and enabled.
    #[must_use]
    pub fn is_tool_available(&self, id: &str) -> bool {
        self.state
            .borrow()
            .registry
            .find_tool(id)
            .is_some_and(|tool| tool.enabled)
    }

    /// Registered metadata for `id`.
    #[must_use]
    pub fn tool_metadata(&self, id: &str) -> Option<ToolMetadata> {
        self.find_tool(id).map(|tool| tool.metadata)
    }

    /// Registered descriptor for `id`.
    #[must_use]
    pub fn find_tool(&self, id: &str) -> Option<ToolDescriptor> {
        self.state.borrow().registry.find_tool(id).cloned()
    }

    /// Instance of the active tool `id`.
    #[must_use]
    pub fn active_tool(&self, id: &str) -> Option<SharedTool> {
        self.state.borrow().active.get(id).and_then(Weak::upgrade)
    }

    /// Number of cached instances.
    #[must_use]
    pub fn cached_tools(&self) -> usize {
        self.state.borrow().cache.len()
    }

    /// Runs `run` against the active tool `id` when it is a `T`.
    ///
    /// The manager counts as busy while `run` executes: mode changes it
    /// commits are cascaded once the tool is released. Returns `None` when
    /// the tool is inactive, of another type, or already borrowed, and when
    /// called from a tool hook.
    pub fn with_active_tool<T, R>(&self, id: &str, run: impl FnOnce(&mut T) -> R) -> Option<R>
    where
        T: Tool,
    {
        let tool = self.active_tool(id)?;
        self.guarded("with_active_tool", || {
            let mut borrowed = Self::borrow(id, &tool)?;
            Ok(borrowed.as_any_mut().downcast_mut::<T>().map(run))
        })
        .ok()
        .flatten()
    }

    /// Checks the descriptor registered as `id` against the catalog and
    /// registry.
    #[must_use]
    pub fn validate_tool(&self, id: &str) -> Option<ValidationReport> {
        let state = self.state.borrow();
        let descriptor = state.registry.find_tool(id)?;
        Some(validate_descriptor(descriptor, &self.catalog, &state.registry))
    }

    // -- internals -----------------------------------------------------------

    fn guarded<T>(
        &self,
        operation: &'static str,
        run: impl FnOnce() -> Result<T, PluginError>,
    ) -> Result<T, PluginError> {
        let Some(guard) = raise(&self.busy) else {
            warn!(
                target: PLUGIN_TARGET,
                event = "plugin_reentrant_call",
                operation,
                "operation rejected while another is running"
            );
            return Err(PluginError::Reentrant { operation });
        };
        let result = run();
        drop(guard);
        if let Err(error) = &result {
            warn!(target: PLUGIN_TARGET, event = "plugin_operation_failed", operation, error = %error);
        }
        self.settle();
        result
    }

    /// Cascades parked modes, then dispatches queued events, until both
    /// queues are empty.
    fn settle(&self) {
        let Some(_settling) = raise(&self.settling) else {
            return;
        };
        let mut reconciled = false;
        loop {
            let parked = self.parked_modes.borrow_mut().pop_front();
            if let Some(mode) = parked {
                let Some(guard) = raise(&self.busy) else {
                    self.parked_modes.borrow_mut().push_front(mode);
                    return;
                };
                self.cascade(mode);
                drop(guard);
                continue;
            }
            // Once per settle: a tool still borrowed elsewhere waits for the next.
            if !reconciled {
                reconciled = true;
                self.reconcile();
                continue;
            }
            let events = std::mem::take(&mut *self.pending_events.borrow_mut());
            if events.is_empty() {
                return;
            }
            self.dispatch(&events);
        }
    }

    fn dispatch(&self, events: &[ToolEvent]) {
        for event in events {
            self.history.borrow_mut().record(event.clone());
            let observers: Vec<_> = self.observers.borrow().iter().map(Rc::clone).collect();
            for observer in observers {
                observer.on_tool_event(event);
            }
        }
    }

    fn emit(&self, event: ToolEvent) {
        self.pending_events.borrow_mut().push(event);
    }

    fn cascade(&self, mode: Mode) {
        let previous = std::mem::replace(&mut self.state.borrow_mut().mode, mode);
        let active = self.active_snapshot();
        info!(
            target: PLUGIN_TARGET,
            event = "plugin_mode_changed",
            from = %previous,
            to = %mode,
            active = active.len(),
            "cascading mode change"
        );
        for (id, tool) in &active {
            if let Err(error) = Self::with_tool(id, tool, |instance| instance.on_mode_changed(mode)) {
                self.defer_reconcile(id, &error);
            }
        }
        for (id, tool) in &active {
            if !self.is_tool_active(id) || self.unreconciled.borrow().contains(id) {
                continue;
            }
            match Self::with_tool(id, tool, |instance| instance.can_activate_in_mode(mode)) {
                Ok(true) => {}
                Ok(false) => self.retire(id, mode),
                Err(error) => self.defer_reconcile(id, &error),
            }
        }
    }

    /// Brings tools that were borrowed during a cascade up to the current
    /// mode.
    fn reconcile(&self) {
        let pending = std::mem::take(&mut *self.unreconciled.borrow_mut());
        if pending.is_empty() {
            return;
        }
        let Some(guard) = raise(&self.busy) else {
            self.unreconciled.borrow_mut().extend(pending);
            return;
        };
        let mode = self.current_mode();
        for id in &pending {
            let Some(tool) = self.active_tool(id) else {
                continue;
            };
            let allowed = Self::with_tool(id, &tool, |instance| {
                instance.on_mode_changed(mode);
                instance.can_activate_in_mode(mode)
            });
            match allowed {
                Ok(true) => {
                    debug!(target: PLUGIN_TARGET, event = "tool_reconciled", tool = %id, mode = %mode);
                }
                Ok(false) => self.retire(id, mode),
                Err(error) => self.defer_reconcile(id, &error),
            }
        }
        drop(guard);
    }

    fn defer_reconcile(&self, id: &str, error: &PluginError) {
        warn!(
            target: PLUGIN_TARGET,
            event = "mode_change_deferred",
            tool = %id,
            error = %error,
            "tool will be reconciled with the mode once released"
        );
        self.unreconciled.borrow_mut().insert(id.to_owned());
    }

    fn retire(&self, id: &str, mode: Mode) {
        info!(
            target: PLUGIN_TARGET,
            event = "tool_mode_unsupported",
            tool = %id,
            mode = %mode,
            "deactivating tool unsupported in new mode"
        );
        if let Err(error) = self.deactivate(id) {
            self.defer_reconcile(id, &error);
        }
    }

    fn instantiate(&self, id: &str) -> Result<SharedTool, PluginError> {
        let (found, cached) = {
            let state = self.state.borrow();
            (state.registry.find_tool(id).cloned(), state.cache.get(id))
        };
        let descriptor = found.ok_or_else(|| PluginError::UnknownTool { id: id.to_owned() })?;
        if !descriptor.enabled {
            return Err(PluginError::Disabled { id: id.to_owned() });
        }
        if let Some(tool) = cached {
            return Ok(tool);
        }
        let factory = self.catalog.factory(&descriptor.class).ok_or_else(|| {
            PluginError::ContractViolation {
                id: id.to_owned(),
                class: descriptor.class.clone(),
            }
        })?;
        let tool = factory
            .create(&self.context, &descriptor)
            .map_err(|source| PluginError::Instantiation {
                id: id.to_owned(),
                source,
            })?;
        self.state.borrow_mut().cache.insert(id, &tool);
        match Self::with_tool(id, &tool, |instance| instance.initialize()) {
            Ok(Ok(())) => {
                info!(target: PLUGIN_TARGET, event = "tool_created", tool = id, class = %descriptor.class);
            }
            Ok(Err(error)) => {
                warn!(
                    target: PLUGIN_TARGET,
                    event = "tool_initialize_failed",
                    tool = id,
                    error = %error,
                    "tool cached despite failed initialisation"
                );
            }
            Err(error) => {
                warn!(target: PLUGIN_TARGET, event = "tool_initialize_skipped", tool = id, error = %error);
            }
        }
        Ok(tool)
    }

    fn activate(&self, id: &str) -> Result<(), PluginError> {
        if self.is_tool_active(id) {
            debug!(target: PLUGIN_TARGET, event = "tool_already_active", tool = id);
            return Ok(());
        }
        let tool = self.instantiate(id)?;
        Self::with_tool(id, &tool, |instance| instance.activate())?.map_err(|source| {
            PluginError::Activation {
                id: id.to_owned(),
                source,
            }
        })?;
        self.state
            .borrow_mut()
            .active
            .insert(id.to_owned(), Rc::downgrade(&tool));
        info!(target: PLUGIN_TARGET, event = "tool_activated", tool = id, "tool activated");
        self.emit(ToolEvent::Activated { id: id.to_owned() });
        Ok(())
    }

    /// Runs the deactivation hook and forgets the tool. A tool borrowed
    /// elsewhere stays active and yields [`PluginError::ToolBusy`].
    fn deactivate(&self, id: &str) -> Result<bool, PluginError> {
        let entry = self.state.borrow().active.get(id).cloned();
        let Some(handle) = entry else {
            debug!(target: PLUGIN_TARGET, event = "tool_not_active", tool = id);
            return Ok(false);
        };
        if let Some(tool) = handle.upgrade() {
            Self::with_tool(id, &tool, |instance| instance.deactivate())?;
        }
        self.state.borrow_mut().active.remove(id);
        self.unreconciled.borrow_mut().remove(id);
        info!(target: PLUGIN_TARGET, event = "tool_deactivated", tool = id, "tool deactivated");
        self.emit(ToolEvent::Deactivated { id: id.to_owned() });
        Ok(true)
    }

    fn deactivate_every(&self) -> usize {
        let ids: Vec<String> = self.state.borrow().active.keys().cloned().collect();
        ids.iter()
            .filter(|id| {
                self.deactivate(id).unwrap_or_else(|error| {
                    warn!(target: PLUGIN_TARGET, event = "tool_deactivate_skipped", tool = %id, error = %error);
                    false
                })
            })
            .count()
    }

    fn release(id: &str, tool: &SharedTool) {
        if let Err(error) = Self::with_tool(id, tool, |instance| instance.shutdown()) {
            warn!(target: PLUGIN_TARGET, event = "tool_shutdown_skipped", tool = id, error = %error);
        }
    }

    fn active_snapshot(&self) -> Vec<(String, SharedTool)> {
        self.state
            .borrow()
            .active
            .iter()
            .filter_map(|(id, handle)| handle.upgrade().map(|tool| (id.clone(), tool)))
            .collect()
    }

    fn enabled_ids(&self, keep: impl Fn(&ToolDescriptor) -> bool) -> Vec<String> {
        self.state
            .borrow()
            .registry
            .iter()
            .filter(|tool| tool.enabled && keep(tool))
            .map(|tool| tool.id.clone())
            .collect()
    }

    fn borrow<'t>(id: &str, tool: &'t SharedTool) -> Result<RefMut<'t, dyn Tool>, PluginError> {
        tool.try_borrow_mut()
            .map_err(|_| PluginError::ToolBusy { id: id.to_owned() })
    }

    fn with_tool<R>(
        id: &str,
        tool: &SharedTool,
        run: impl FnOnce(&mut dyn Tool) -> R,
    ) -> Result<R, PluginError> {
        let mut borrowed = Self::borrow(id, tool)?;
        Ok(run(&mut *borrowed))
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("PluginManager")
            .field("mode", &state.mode)
            .field("registered", &state.registry.len())
            .field("cached", &state.cache.len())
            .field("active", &state.active.keys().collect::<Vec<_>>())
            .field("busy", &self.busy.get())
            .finish_non_exhaustive()
    }
}

/// Forwards committed mode changes to a [`PluginManager`] that is still
/// alive.
struct ModeListener {
    manager: Weak<PluginManager>,
}

impl ModeObserver for ModeListener {
    fn on_mode_changed(&self, change: ModeChange) {
        if let Some(manager) = self.manager.upgrade() {
            manager.on_mode_changed(change.to);
        }
    }
}
