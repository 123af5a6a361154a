//! [`HookInstaller`] – resolve-and-hook convenience call sites.
//!
//! Wraps a [`Resolver`] and a [`HookRegistry`] behind the call-site surface
//! modules actually use. Every failing path maps into
//! [`CoreError::HookInstall`]; the "silent" variants swallow it and report
//! absence instead, for members that legitimately vary across host builds.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;
use waylay_host::Resolver;
use waylay_types::CoreError;

use crate::hooks::{MethodHook, PRIORITY_DEFAULT, ReplaceHook};
use crate::registry::{HookRegistry, InstalledHook};

/// Declarative form of one hook registration: the target member's
/// coordinates plus a priority. Kept as data so module tables can list
/// their intercepts up front.
#[derive(Debug, Clone, PartialEq)]
pub struct HookSpec {
    pub class: String,
    pub member: String,
    pub param_types: Vec<String>,
    pub priority: i32,
}

impl HookSpec {
    pub fn new(class: impl Into<String>, member: impl Into<String>, param_types: &[&str]) -> Self {
        Self {
            class: class.into(),
            member: member.into(),
            param_types: param_types.iter().map(|t| t.to_string()).collect(),
            priority: PRIORITY_DEFAULT,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn param_refs(&self) -> Vec<&str> {
        self.param_types.iter().map(String::as_str).collect()
    }
}

/// Per-model installer handed to modules at activation time.
#[derive(Clone)]
pub struct HookInstaller {
    resolver: Arc<Resolver>,
    registry: HookRegistry,
}

impl HookInstaller {
    pub fn new(resolver: Arc<Resolver>, registry: HookRegistry) -> Self {
        Self { resolver, registry }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Install `hook` per a declarative [`HookSpec`].
    pub fn hook(
        &self,
        spec: &HookSpec,
        hook: Arc<dyn MethodHook>,
    ) -> Result<InstalledHook, CoreError> {
        self.find_and_hook_method(&spec.class, &spec.member, &spec.param_refs(), hook, spec.priority)
    }

    /// [`HookInstaller::hook`], reporting absence instead of failing.
    pub fn hook_if_exists(&self, spec: &HookSpec, hook: Arc<dyn MethodHook>) -> Option<InstalledHook> {
        self.find_and_hook_method_if_exists(
            &spec.class,
            &spec.member,
            &spec.param_refs(),
            hook,
            spec.priority,
        )
    }

    /// Resolve `class::name(param_types)` and install `hook`.
    pub fn find_and_hook_method(
        &self,
        class: &str,
        name: &str,
        param_types: &[&str],
        hook: Arc<dyn MethodHook>,
        priority: i32,
    ) -> Result<InstalledHook, CoreError> {
        let member = self
            .resolver
            .resolve_method(class, name, param_types)
            .map_err(|error| install_failure(class, name, error))?;
        Ok(self.registry.install(&member, hook, priority))
    }

    /// Silent variant: absence or failure is logged and reported as `None`.
    pub fn find_and_hook_method_if_exists(
        &self,
        class: &str,
        name: &str,
        param_types: &[&str],
        hook: Arc<dyn MethodHook>,
        priority: i32,
    ) -> Option<InstalledHook> {
        match self.find_and_hook_method(class, name, param_types, hook, priority) {
            Ok(handle) => Some(handle),
            Err(error) => {
                warn!(class, member = name, %error, "hook skipped");
                None
            }
        }
    }

    /// Silent variant reporting only whether the hook went in.
    pub fn find_and_hook_method_silently(
        &self,
        class: &str,
        name: &str,
        param_types: &[&str],
        hook: Arc<dyn MethodHook>,
        priority: i32,
    ) -> bool {
        self.find_and_hook_method_if_exists(class, name, param_types, hook, priority)
            .is_some()
    }

    /// Resolve a constructor and install `hook`.
    pub fn find_and_hook_constructor(
        &self,
        class: &str,
        param_types: &[&str],
        hook: Arc<dyn MethodHook>,
        priority: i32,
    ) -> Result<InstalledHook, CoreError> {
        let ctor = self
            .resolver
            .resolve_constructor(class, param_types)
            .map_err(|error| install_failure(class, "<init>", error))?;
        Ok(self.registry.install(&ctor, hook, priority))
    }

    /// Resolve and fully replace `class::name(param_types)`.
    pub fn find_and_hook_replace(
        &self,
        class: &str,
        name: &str,
        param_types: &[&str],
        hook: Box<dyn ReplaceHook>,
        priority: i32,
    ) -> Result<InstalledHook, CoreError> {
        let member = self
            .resolver
            .resolve_method(class, name, param_types)
            .map_err(|error| install_failure(class, name, error))?;
        Ok(self.registry.install_replace(&member, hook, priority))
    }

    /// Force a constant result on `class::name(param_types)`, above every
    /// ordinary hook.
    pub fn return_constant(
        &self,
        class: &str,
        name: &str,
        param_types: &[&str],
        value: Value,
    ) -> Result<InstalledHook, CoreError> {
        let member = self
            .resolver
            .resolve_method(class, name, param_types)
            .map_err(|error| install_failure(class, name, error))?;
        Ok(self.registry.install_constant(&member, value))
    }

    /// Hook every declared overload of `class::name`, any arity. Absent
    /// class or name hooks nothing and returns an empty vec.
    pub fn hook_all_methods(
        &self,
        class: &str,
        name: &str,
        hook: Arc<dyn MethodHook>,
        priority: i32,
    ) -> Vec<InstalledHook> {
        let Some(declaring) = self.resolver.resolve_class_if_exists(class) else {
            return Vec::new();
        };
        declaring
            .declared_methods_named(name)
            .iter()
            .map(|member| self.registry.install(member, Arc::clone(&hook), priority))
            .collect()
    }

    /// Whether [`HookInstaller::hook_all_methods`] hooked anything.
    pub fn hook_all_methods_any(
        &self,
        class: &str,
        name: &str,
        hook: Arc<dyn MethodHook>,
        priority: i32,
    ) -> bool {
        !self.hook_all_methods(class, name, hook, priority).is_empty()
    }

    /// Hook every declared constructor of `class`.
    pub fn hook_all_constructors(
        &self,
        class: &str,
        hook: Arc<dyn MethodHook>,
        priority: i32,
    ) -> Vec<InstalledHook> {
        let Some(declaring) = self.resolver.resolve_class_if_exists(class) else {
            return Vec::new();
        };
        declaring
            .declared_constructors()
            .iter()
            .map(|ctor| self.registry.install(ctor, Arc::clone(&hook), priority))
            .collect()
    }
}

fn install_failure(class: &str, member: &str, error: CoreError) -> CoreError {
    CoreError::HookInstall {
        target: format!("{class}::{member}"),
        reason: error.to_string(),
    }
}
