//! [`HookRegistry`] – install, reverse, and dispatch hooks.
//!
//! The attach layer routes every intercepted call into
//! [`HookRegistry::dispatch`]. Dispatch snapshots the member's hook list
//! under a short read lock and releases it before any body runs, so hook
//! bodies may themselves install or reverse hooks, and concurrent dispatches
//! of the same member never contend beyond the snapshot.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;
use waylay_host::{CallFrame, HostMember};
use waylay_types::CoreError;

use crate::hooks::{
    DoNothing, MethodHook, PRIORITY_FORCED, PRIORITY_HIGHEST, PRIORITY_LOWEST, ReplaceAdapter,
    ReplaceHook, ReturnConstant,
};

#[derive(Clone)]
struct HookEntry {
    id: Uuid,
    priority: i32,
    hook: Arc<dyn MethodHook>,
}

#[derive(Default)]
struct RegistryInner {
    // member id → entries ordered by (priority desc, installation order).
    hooks: RwLock<HashMap<u64, Vec<HookEntry>>>,
}

/// Live handle correlating one registration to an active intercept.
///
/// The intercept persists until [`InstalledHook::unhook`] is called or the
/// process ends; dropping the handle does not reverse it.
#[derive(Debug)]
pub struct InstalledHook {
    id: Uuid,
    member_id: u64,
    registry: Weak<RegistryInner>,
}

impl InstalledHook {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn member_id(&self) -> u64 {
        self.member_id
    }

    /// Reverse the intercept. Returns `false` when it was already gone.
    pub fn unhook(self) -> bool {
        let Some(inner) = self.registry.upgrade() else {
            return false;
        };
        let mut hooks = inner.hooks.write();
        let Some(entries) = hooks.get_mut(&self.member_id) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != self.id);
        let removed = entries.len() < before;
        if entries.is_empty() {
            hooks.remove(&self.member_id);
        }
        removed
    }
}

/// Registry of active hooks, shared by clone (all clones see one table).
#[derive(Clone, Default)]
pub struct HookRegistry {
    inner: Arc<RegistryInner>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `hook` on `member` at `priority`.
    ///
    /// Ordinary priorities are clamped to
    /// [`PRIORITY_LOWEST`]..=[`PRIORITY_HIGHEST`]; the band above is
    /// reserved for constant-result hooks so they always outrank.
    pub fn install(
        &self,
        member: &Arc<HostMember>,
        hook: Arc<dyn MethodHook>,
        priority: i32,
    ) -> InstalledHook {
        let clamped = priority.clamp(PRIORITY_LOWEST, PRIORITY_HIGHEST);
        self.install_at(member, hook, clamped)
    }

    /// Install a full replacement for `member` at `priority`.
    pub fn install_replace(
        &self,
        member: &Arc<HostMember>,
        hook: Box<dyn ReplaceHook>,
        priority: i32,
    ) -> InstalledHook {
        self.install(member, Arc::new(ReplaceAdapter { inner: hook }), priority)
    }

    /// Install a constant-result hook at [`PRIORITY_FORCED`], above every
    /// ordinary hook.
    pub fn install_constant(&self, member: &Arc<HostMember>, value: Value) -> InstalledHook {
        self.install_at(member, Arc::new(ReturnConstant::new(value)), PRIORITY_FORCED)
    }

    /// Suppress `member` entirely: forces a null result, above every
    /// ordinary hook.
    pub fn install_suppress(&self, member: &Arc<HostMember>) -> InstalledHook {
        self.install_at(member, Arc::new(DoNothing), PRIORITY_FORCED)
    }

    fn install_at(
        &self,
        member: &Arc<HostMember>,
        hook: Arc<dyn MethodHook>,
        priority: i32,
    ) -> InstalledHook {
        let entry = HookEntry {
            id: Uuid::new_v4(),
            priority,
            hook,
        };
        let handle = InstalledHook {
            id: entry.id,
            member_id: member.id(),
            registry: Arc::downgrade(&self.inner),
        };

        let mut hooks = self.inner.hooks.write();
        let entries = hooks.entry(member.id()).or_default();
        // Descending priority; equal priorities keep installation order.
        let position = entries
            .iter()
            .position(|existing| existing.priority < entry.priority)
            .unwrap_or(entries.len());
        entries.insert(position, entry);
        handle
    }

    /// Number of hooks currently installed on `member`.
    pub fn hook_count(&self, member: &Arc<HostMember>) -> usize {
        self.inner
            .hooks
            .read()
            .get(&member.id())
            .map_or(0, Vec::len)
    }

    /// Run one intercepted call through its hook chain.
    ///
    /// Before hooks run in descending priority; the original body runs
    /// unless a before forced an outcome; after hooks run in the reverse
    /// (ascending) order, LIFO-nested around the original. Before/after
    /// faults are logged and discarded; a forced error (the Replace fault
    /// path) or an original-body error is the call's outcome.
    pub fn dispatch(
        &self,
        member: &Arc<HostMember>,
        mut frame: CallFrame,
    ) -> Result<Value, CoreError> {
        let snapshot: Vec<HookEntry> = self
            .inner
            .hooks
            .read()
            .get(&member.id())
            .cloned()
            .unwrap_or_default();

        for entry in &snapshot {
            if let Err(error) = entry.hook.before(&mut frame) {
                warn!(
                    member = %member.qualified_name(),
                    hook = %entry.id,
                    %error,
                    "before hook fault isolated"
                );
            }
        }

        if !frame.has_outcome() {
            match member.call_original(&mut frame) {
                Ok(value) => frame.set_result(value),
                Err(error) => frame.set_error(error),
            }
        }

        for entry in snapshot.iter().rev() {
            if let Err(error) = entry.hook.after(&mut frame) {
                warn!(
                    member = %member.qualified_name(),
                    hook = %entry.id,
                    %error,
                    "after hook fault isolated"
                );
            }
        }

        frame.take_outcome().unwrap_or(Ok(Value::Null))
    }
}
