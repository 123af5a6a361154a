//! `waylay-hook` – the hook registry, the single interception point every
//! routed call must pass through.
//!
//! # Modules
//!
//! - [`hooks`] – the [`MethodHook`][hooks::MethodHook] and
//!   [`ReplaceHook`][hooks::ReplaceHook] trait seams, priority constants,
//!   and the constant-result conveniences
//!   ([`ReturnConstant`][hooks::ReturnConstant], [`DoNothing`][hooks::DoNothing]).
//! - [`registry`] – [`HookRegistry`][registry::HookRegistry]:
//!   install/unhook/dispatch with ordered before/after/replace semantics and
//!   per-hook fault isolation, plus the reversible
//!   [`InstalledHook`][registry::InstalledHook] handle.
//! - [`install`] – [`HookInstaller`][install::HookInstaller]: resolve-and-hook
//!   convenience call sites, including the silent variants that report
//!   absence instead of failing.

pub mod hooks;
pub mod install;
pub mod registry;

pub use hooks::{
    DoNothing, MethodHook, PRIORITY_DEFAULT, PRIORITY_FORCED, PRIORITY_HIGHEST, PRIORITY_LOWEST,
    ReplaceHook, ReturnConstant,
};
pub use install::{HookInstaller, HookSpec};
pub use registry::{HookRegistry, InstalledHook};
