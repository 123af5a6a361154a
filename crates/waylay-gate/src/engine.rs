//! [`Engine`] – the embedder-facing entry point.
//!
//! Owns the hook registry and field store shared across lifecycle events,
//! and wires the crash safety net in ahead of catalog activation on
//! privileged-process load, so the safety hooks are in place before any
//! module can make the host crash.

use std::sync::Arc;

use tracing::{debug, info};
use waylay_hook::{HookInstaller, HookRegistry};
use waylay_host::{FieldStore, HostModel, Resolver};
use waylay_safety::{CrashGuard, CrashObserver, CrashPolicy, EscalationGuard, SettingsStore};
use waylay_types::Environment;

use crate::catalog::ModuleCatalog;
use crate::gate::{ActivationGate, ActivationReport, ALLOW_HOOK_KEY};
use crate::prefs::Preferences;

/// Collaborators and environment the engine is constructed with.
pub struct EngineConfig {
    pub env: Environment,
    /// The module's own recovery-UI package, exempted from
    /// background-start aborts.
    pub helper_package: String,
    pub observer: Arc<dyn CrashObserver>,
    pub policy: Arc<dyn CrashPolicy>,
    pub settings: Arc<dyn SettingsStore>,
}

/// One engine instance per attached process.
pub struct Engine {
    gate: ActivationGate,
    prefs: Preferences,
    env: Environment,
    registry: HookRegistry,
    fields: Arc<FieldStore>,
    crash_guard: CrashGuard,
    escalation_guard: EscalationGuard,
}

impl Engine {
    pub fn new(config: EngineConfig, catalog: ModuleCatalog, prefs: Preferences) -> Self {
        Self {
            gate: ActivationGate::new(catalog, config.env, prefs.clone()),
            env: config.env,
            registry: HookRegistry::new(),
            fields: Arc::new(FieldStore::new()),
            crash_guard: CrashGuard::new(config.observer, config.helper_package),
            escalation_guard: EscalationGuard::new(config.policy, config.settings),
            prefs,
        }
    }

    /// The registry the attach layer routes intercepted calls through.
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// The annotation store; the attach layer also reports object disposal
    /// here.
    pub fn field_store(&self) -> &Arc<FieldStore> {
        &self.fields
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    fn installer_for(&self, model: &Arc<HostModel>) -> HookInstaller {
        HookInstaller::new(Arc::new(Resolver::new(Arc::clone(model))), self.registry.clone())
    }

    /// Privileged-process load: install the crash safety net, then activate
    /// the wildcard catalog entries.
    pub fn on_privileged_load(&self, model: &Arc<HostModel>) -> ActivationReport {
        if !self.prefs.get_bool(ALLOW_HOOK_KEY, false) {
            debug!("hooking disabled; privileged load ignored");
            return ActivationReport::default();
        }
        info!(
            sdk = self.env.sdk_version,
            os = self.env.os_version,
            "privileged process loaded"
        );

        let installer = self.installer_for(model);
        self.crash_guard.install(&installer);
        self.escalation_guard.install(&installer, &self.fields);
        self.gate.on_privileged_load(&installer, &self.fields)
    }

    /// Application-process load for `package`.
    pub fn on_package_load(&self, package: &str, model: &Arc<HostModel>) -> ActivationReport {
        debug!(package, "package loaded");
        let installer = self.installer_for(model);
        self.gate.on_package_load(package, &installer, &self.fields)
    }
}
