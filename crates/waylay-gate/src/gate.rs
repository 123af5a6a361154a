//! [`ActivationGate`] – filters the catalog against the runtime environment
//! on the two lifecycle events and drives per-module initialization.

use std::sync::Arc;

use tracing::{debug, info, warn};
use waylay_hook::HookInstaller;
use waylay_host::FieldStore;
use waylay_types::{CoreError, Environment};

use crate::catalog::{CatalogEntry, ModuleCatalog, ModuleContext, ModuleKind};
use crate::prefs::Preferences;

/// Preference key globally gating both lifecycle events. Unset means zero
/// activations.
pub const ALLOW_HOOK_KEY: &str = "allow_hook";

// Sensitive system packages that are never hooked, regardless of catalog
// contents.
const DENY_LIST: [&str; 3] = ["webview", "content-catcher", "catcher-patch"];

/// Whether `package` is on the fixed deny list.
pub fn is_denied(package: &str) -> bool {
    DENY_LIST.contains(&package)
}

/// Per-package safe-mode preference key; set by the recovery flow after
/// repeated crashes to keep that package unhooked.
pub fn safe_mode_key(package: &str) -> String {
    format!("safe_mode::{package}")
}

/// Outcome of one lifecycle event, for logs and tests.
#[derive(Debug, Default)]
pub struct ActivationReport {
    pub activated: Vec<ModuleKind>,
    pub failures: Vec<(ModuleKind, CoreError)>,
    /// Whether the fallback generic-handling path ran instead of
    /// per-package modules.
    pub fallback: bool,
}

impl ActivationReport {
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty() && self.failures.is_empty() && !self.fallback
    }
}

/// Evaluates catalog entries against the environment and initializes the
/// matching modules. One module's failure never blocks its siblings.
pub struct ActivationGate {
    catalog: ModuleCatalog,
    env: Environment,
    prefs: Preferences,
}

impl ActivationGate {
    pub fn new(catalog: ModuleCatalog, env: Environment, prefs: Preferences) -> Self {
        Self { catalog, env, prefs }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    fn enabled(&self) -> bool {
        self.prefs.get_bool(ALLOW_HOOK_KEY, false)
    }

    /// Privileged-process load: every wildcard-target entry whose
    /// environment predicate matches is initialized.
    pub fn on_privileged_load(
        &self,
        installer: &HookInstaller,
        fields: &Arc<FieldStore>,
    ) -> ActivationReport {
        let mut report = ActivationReport::default();
        if !self.enabled() {
            debug!("hooking disabled; skipping privileged-process activation");
            return report;
        }

        for entry in self.catalog.entries() {
            if entry.descriptor.target_package.is_some() {
                continue;
            }
            if !entry.descriptor.matches(&self.env) {
                debug!(module = entry.kind.qualified_name(), "environment predicate not met");
                continue;
            }
            self.run_module(entry, None, installer, fields, &mut report);
        }
        report
    }

    /// Application-process load: deny list, safe mode, then exact-name
    /// target matching; unmatched packages route to the fallback path.
    pub fn on_package_load(
        &self,
        package: &str,
        installer: &HookInstaller,
        fields: &Arc<FieldStore>,
    ) -> ActivationReport {
        let mut report = ActivationReport::default();
        if !self.enabled() {
            debug!(package, "hooking disabled; skipping package activation");
            return report;
        }
        if is_denied(package) {
            info!(package, "deny-listed package; never hooked");
            return report;
        }
        if self.prefs.get_bool(&safe_mode_key(package), false) {
            warn!(package, "safe mode active; modules withheld");
            return report;
        }

        let matching: Vec<&CatalogEntry> = self
            .catalog
            .entries()
            .iter()
            .filter(|entry| entry.descriptor.target_package.as_deref() == Some(package))
            .collect();

        if matching.is_empty() {
            report.fallback = true;
            let fallback = CatalogEntry::builtin(ModuleKind::ThirdAppFallback);
            self.run_module(&fallback, Some(package), installer, fields, &mut report);
            return report;
        }

        for entry in matching {
            if !entry.descriptor.matches(&self.env) {
                debug!(
                    module = entry.kind.qualified_name(),
                    package, "environment predicate not met"
                );
                continue;
            }
            self.run_module(entry, Some(package), installer, fields, &mut report);
        }
        report
    }

    fn run_module(
        &self,
        entry: &CatalogEntry,
        package: Option<&str>,
        installer: &HookInstaller,
        fields: &Arc<FieldStore>,
        report: &mut ActivationReport,
    ) {
        let ctx = ModuleContext {
            package: package.map(str::to_string),
            installer: installer.clone(),
            fields: Arc::clone(fields),
            prefs: self.prefs.clone(),
            env: self.env,
        };
        let mut module = entry.kind.construct();
        match module.init(&ctx) {
            Ok(()) => {
                info!(module = entry.kind.qualified_name(), package, "module activated");
                report.activated.push(entry.kind);
            }
            Err(error) => {
                warn!(
                    module = entry.kind.qualified_name(),
                    package,
                    %error,
                    "module init failed; continuing with remaining catalog"
                );
                report.failures.push((
                    entry.kind,
                    CoreError::ModuleInit {
                        module: entry.kind.qualified_name().to_string(),
                        reason: error.to_string(),
                    },
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waylay_hook::HookRegistry;
    use waylay_host::{HostClass, HostModel, Resolver};
    use waylay_types::{DeviceClass, DeviceClassConstraint, ModuleDescriptor};

    fn test_env() -> Environment {
        Environment {
            sdk_version: 35,
            os_version: 2.0,
            device_class: DeviceClass::Phone,
        }
    }

    fn enabled_prefs() -> Preferences {
        let prefs = Preferences::new();
        prefs.set(ALLOW_HOOK_KEY, json!(true));
        prefs
    }

    fn installer_with_verifier() -> HookInstaller {
        let model = Arc::new(HostModel::new());
        let mut class = HostClass::new("SignatureVerifier", None);
        class.add_method(
            "verifySignatures",
            &["package", "package", "boolean"],
            "boolean",
            Arc::new(|_| Ok(json!(false))),
        );
        model.register_class(class);
        HookInstaller::new(Arc::new(Resolver::new(model)), HookRegistry::new())
    }

    fn bare_installer() -> HookInstaller {
        HookInstaller::new(
            Arc::new(Resolver::new(Arc::new(HostModel::new()))),
            HookRegistry::new(),
        )
    }

    fn fields() -> Arc<FieldStore> {
        Arc::new(FieldStore::new())
    }

    #[test]
    fn disabled_guard_means_zero_activations_on_both_events() {
        let gate = ActivationGate::new(ModuleCatalog::builtin(), test_env(), Preferences::new());
        assert!(gate.on_privileged_load(&installer_with_verifier(), &fields()).is_empty());
        assert!(gate.on_package_load("system-ui", &installer_with_verifier(), &fields()).is_empty());
    }

    #[test]
    fn privileged_load_activates_matching_wildcard_entries_only() {
        let gate = ActivationGate::new(ModuleCatalog::builtin(), test_env(), enabled_prefs());
        let report = gate.on_privileged_load(&installer_with_verifier(), &fields());
        // FrameworkPatch is the only wildcard entry; SystemUiTweaks is
        // package-targeted and must not run here.
        assert_eq!(report.activated, vec![ModuleKind::FrameworkPatch]);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn failing_module_does_not_block_siblings() {
        // No SignatureVerifier in the model: FrameworkPatch init fails.
        let catalog = ModuleCatalog::from_entries(vec![
            CatalogEntry::builtin(ModuleKind::FrameworkPatch),
            CatalogEntry {
                kind: ModuleKind::ThirdAppFallback,
                descriptor: ModuleDescriptor::unconstrained("waylay.module.third-app-fallback"),
            },
        ]);
        let gate = ActivationGate::new(catalog, test_env(), enabled_prefs());
        let report = gate.on_privileged_load(&bare_installer(), &fields());

        assert_eq!(report.activated, vec![ModuleKind::ThirdAppFallback]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, ModuleKind::FrameworkPatch);
        assert!(matches!(report.failures[0].1, CoreError::ModuleInit { .. }));
    }

    #[test]
    fn environment_predicate_filters_wildcard_entries() {
        let mut desc = ModuleKind::FrameworkPatch.descriptor();
        desc.min_sdk = 99;
        let catalog = ModuleCatalog::from_entries(vec![CatalogEntry {
            kind: ModuleKind::FrameworkPatch,
            descriptor: desc,
        }]);
        let gate = ActivationGate::new(catalog, test_env(), enabled_prefs());
        assert!(gate.on_privileged_load(&installer_with_verifier(), &fields()).is_empty());
    }

    #[test]
    fn package_load_matches_exact_name_only() {
        let gate = ActivationGate::new(ModuleCatalog::builtin(), test_env(), enabled_prefs());

        let report = gate.on_package_load("system-ui", &bare_installer(), &fields());
        assert_eq!(report.activated, vec![ModuleKind::SystemUiTweaks]);
        assert!(!report.fallback);

        // A prefix of the target is not a match; the fallback runs instead.
        let report = gate.on_package_load("system-ui.plugin", &bare_installer(), &fields());
        assert!(report.fallback);
        assert_eq!(report.activated, vec![ModuleKind::ThirdAppFallback]);
    }

    #[test]
    fn unmatched_package_routes_to_fallback() {
        let gate = ActivationGate::new(ModuleCatalog::builtin(), test_env(), enabled_prefs());
        let report = gate.on_package_load("com.example.mail", &bare_installer(), &fields());
        assert!(report.fallback);
        assert_eq!(report.activated, vec![ModuleKind::ThirdAppFallback]);
    }

    #[test]
    fn deny_listed_package_is_never_matched() {
        // Even a catalog entry explicitly targeting the denied package is
        // ignored.
        let catalog = ModuleCatalog::from_entries(vec![CatalogEntry {
            kind: ModuleKind::SystemUiTweaks,
            descriptor: ModuleDescriptor::for_package("waylay.module.system-ui-tweaks", "webview"),
        }]);
        let gate = ActivationGate::new(catalog, test_env(), enabled_prefs());
        let report = gate.on_package_load("webview", &bare_installer(), &fields());
        assert!(report.is_empty());
    }

    #[test]
    fn safe_mode_withholds_modules_for_that_package() {
        let prefs = enabled_prefs();
        prefs.set(safe_mode_key("system-ui"), json!(true));
        let gate = ActivationGate::new(ModuleCatalog::builtin(), test_env(), prefs);
        assert!(gate.on_package_load("system-ui", &bare_installer(), &fields()).is_empty());
    }

    #[test]
    fn package_entry_still_respects_environment_predicate() {
        let catalog = ModuleCatalog::from_entries(vec![CatalogEntry {
            kind: ModuleKind::SystemUiTweaks,
            descriptor: ModuleDescriptor {
                device_class: DeviceClassConstraint::PadOnly,
                ..ModuleDescriptor::for_package("waylay.module.system-ui-tweaks", "system-ui")
            },
        }]);
        let gate = ActivationGate::new(catalog, test_env(), enabled_prefs());
        // Matched by name, excluded by device class; the fallback does NOT
        // run because a target match existed.
        let report = gate.on_package_load("system-ui", &bare_installer(), &fields());
        assert!(report.activated.is_empty());
        assert!(!report.fallback);
    }
}
