//! Module catalog: the compile-time enumerated set of behavior units.
//!
//! Modules known at build time are a tagged union, not a string-keyed
//! registry; only host member names stay stringly typed, because the host
//! is not under our control. Each [`ModuleKind`] maps to a built-in
//! [`ModuleDescriptor`] and a constructor; a [`ModuleCatalog`] pairs kinds
//! with (possibly customized) descriptors and is loaded once.

use std::sync::Arc;

use waylay_hook::HookInstaller;
use waylay_host::FieldStore;
use waylay_types::{CoreError, Environment, ModuleDescriptor};

use crate::modules::{FrameworkPatch, SystemUiTweaks, ThirdAppFallback};
use crate::prefs::Preferences;

/// Everything a module gets to work with during `init`.
pub struct ModuleContext {
    /// The loading package on application-process load; `None` on
    /// privileged-process load.
    pub package: Option<String>,
    pub installer: HookInstaller,
    pub fields: Arc<FieldStore>,
    pub prefs: Preferences,
    pub env: Environment,
}

/// A conditionally-activated behavior unit. `init` installs the module's
/// hooks; it runs synchronously on the host's load-callback thread.
pub trait HookModule {
    fn init(&mut self, ctx: &ModuleContext) -> Result<(), CoreError>;
}

/// The build-time module set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// Preference-gated constant-result hooks on framework verification
    /// members. Wildcard target, privileged-process load.
    FrameworkPatch,
    /// Package-scoped tweaks for the system UI.
    SystemUiTweaks,
    /// The fallback generic-handling path for packages no catalog entry
    /// targets. Only ever invoked via the fallback route.
    ThirdAppFallback,
}

impl ModuleKind {
    pub fn qualified_name(&self) -> &'static str {
        match self {
            ModuleKind::FrameworkPatch => "waylay.module.framework-patch",
            ModuleKind::SystemUiTweaks => "waylay.module.system-ui-tweaks",
            ModuleKind::ThirdAppFallback => "waylay.module.third-app-fallback",
        }
    }

    /// The descriptor this kind ships with.
    pub fn descriptor(&self) -> ModuleDescriptor {
        match self {
            ModuleKind::FrameworkPatch => ModuleDescriptor::unconstrained(self.qualified_name()),
            ModuleKind::SystemUiTweaks => {
                ModuleDescriptor::for_package(self.qualified_name(), "system-ui")
            }
            ModuleKind::ThirdAppFallback => ModuleDescriptor::unconstrained(self.qualified_name()),
        }
    }

    /// Instantiate the module. Construction itself cannot fail; failures
    /// surface from `init`.
    pub fn construct(&self) -> Box<dyn HookModule> {
        match self {
            ModuleKind::FrameworkPatch => Box::new(FrameworkPatch),
            ModuleKind::SystemUiTweaks => Box::new(SystemUiTweaks),
            ModuleKind::ThirdAppFallback => Box::new(ThirdAppFallback),
        }
    }
}

/// One catalog row: a kind plus the descriptor it is evaluated under.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub kind: ModuleKind,
    pub descriptor: ModuleDescriptor,
}

impl CatalogEntry {
    /// Entry using the kind's built-in descriptor.
    pub fn builtin(kind: ModuleKind) -> Self {
        Self {
            descriptor: kind.descriptor(),
            kind,
        }
    }
}

/// Read-only, enumerated once at engine construction.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    entries: Vec<CatalogEntry>,
}

impl ModuleCatalog {
    /// The shipped catalog. The fallback module is constructed directly by
    /// the gate, never matched by package, so it is not listed here.
    pub fn builtin() -> Self {
        Self::from_entries(vec![
            CatalogEntry::builtin(ModuleKind::FrameworkPatch),
            CatalogEntry::builtin(ModuleKind::SystemUiTweaks),
        ])
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_lists_known_kinds() {
        let catalog = ModuleCatalog::builtin();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.entries().iter().any(|e| e.kind == ModuleKind::FrameworkPatch));
        assert!(catalog.entries().iter().any(|e| e.kind == ModuleKind::SystemUiTweaks));
    }

    #[test]
    fn framework_patch_is_a_wildcard_entry() {
        let desc = ModuleKind::FrameworkPatch.descriptor();
        assert!(desc.target_package.is_none());
    }

    #[test]
    fn system_ui_tweaks_targets_its_package() {
        let desc = ModuleKind::SystemUiTweaks.descriptor();
        assert_eq!(desc.target_package.as_deref(), Some("system-ui"));
    }

    #[test]
    fn entries_can_carry_customized_descriptors() {
        let mut desc = ModuleKind::SystemUiTweaks.descriptor();
        desc.min_sdk = 34;
        let catalog = ModuleCatalog::from_entries(vec![CatalogEntry {
            kind: ModuleKind::SystemUiTweaks,
            descriptor: desc,
        }]);
        assert_eq!(catalog.entries()[0].descriptor.min_sdk, 34);
    }
}
