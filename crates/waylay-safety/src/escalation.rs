//! [`EscalationGuard`] – suppresses watchdog escalation for critical
//! surfaces.
//!
//! Two intercepts on the host's `PackageWatchdog` drive a per-target state
//! machine: {no record → escalation intercepted → cleared}. The escalation
//! suppressor tags the watchdog instance with the target identity when it
//! forces an escalation to report success; the mitigation-step intercept
//! takes the tag and completes the suppression. No timers: a step that
//! never arrives leaves a stale tag, overwritten on the next escalation
//! attempt for that target.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{error, warn};
use waylay_hook::{HookInstaller, MethodHook, PRIORITY_DEFAULT};
use waylay_host::{CallFrame, FieldStore, Resolver};
use waylay_types::CoreError;

use crate::collaborators::{CrashPolicy, SettingsStore};

pub(crate) const WATCHDOG_CLASS: &str = "PackageWatchdog";
pub(crate) const SET_LEVEL_MEMBER: &str = "setMitigationLevel";
pub(crate) const STEP_MEMBER: &str = "doMitigationStep";
pub(crate) const STEP_MEMBER_NEW: &str = "doMitigationStepNew";
pub(crate) const REMOVE_MESSAGE_MEMBER: &str = "removeMessage";

/// Host property that disables escalation suppression entirely.
pub const KILL_SWITCH_PROP: &str = "persist.sys.mitigation_rescue.disable";

const RESET_FLAG_PROP: &str = "sys.mitigation_level.reset";
const TAG_KEY: &str = "flag";
const STEP_SIGNATURE: [&str; 3] = ["int", "package", "context"];

// Queued mitigation messages are indexed up to 7; later counts clamp.
const MAX_MESSAGE_INDEX: i64 = 7;

// The fixed set of critical system surfaces whose escalation may be
// suppressed, with the mitigation-level settings each resets to baseline.
struct CriticalSurface {
    identity: &'static str,
    level_keys: &'static [&'static str],
}

const CRITICAL_SURFACES: [CriticalSurface; 2] = [
    CriticalSurface {
        identity: "system-ui",
        level_keys: &[
            "sys.rescueparty.systemui.level",
            "sys.anr.rescue.systemui.level",
        ],
    },
    CriticalSurface {
        identity: "home",
        level_keys: &["sys.rescueparty.home.level"],
    },
];

fn surface_for(target: &str) -> Option<&'static CriticalSurface> {
    CRITICAL_SURFACES.iter().find(|s| s.identity == target)
}

/// Installs the escalation suppressor and the mitigation-step intercept.
pub struct EscalationGuard {
    policy: Arc<dyn CrashPolicy>,
    settings: Arc<dyn SettingsStore>,
}

impl EscalationGuard {
    pub fn new(policy: Arc<dyn CrashPolicy>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { policy, settings }
    }

    /// Hook the watchdog call sites. The escalation entry point is
    /// required; the step members are hooked as available (host builds ship
    /// either or both).
    pub fn install(&self, installer: &HookInstaller, fields: &Arc<FieldStore>) {
        let suppressor = Arc::new(EscalationSuppressor {
            policy: Arc::clone(&self.policy),
            settings: Arc::clone(&self.settings),
            fields: Arc::clone(fields),
        });
        if let Err(err) = installer.find_and_hook_method(
            WATCHDOG_CLASS,
            SET_LEVEL_MEMBER,
            &STEP_SIGNATURE,
            suppressor,
            PRIORITY_DEFAULT,
        ) {
            error!(error = %err, "escalation suppressor not installed");
            return;
        }

        let step: Arc<dyn MethodHook> = Arc::new(MitigationStepHook {
            fields: Arc::clone(fields),
            resolver: Arc::clone(installer.resolver()),
        });
        installer.find_and_hook_method_if_exists(
            WATCHDOG_CLASS,
            STEP_MEMBER_NEW,
            &STEP_SIGNATURE,
            Arc::clone(&step),
            PRIORITY_DEFAULT,
        );
        installer.find_and_hook_method_if_exists(
            WATCHDOG_CLASS,
            STEP_MEMBER,
            &STEP_SIGNATURE,
            step,
            PRIORITY_DEFAULT,
        );
    }
}

// Before-hook on setMitigationLevel(count, target, context).
struct EscalationSuppressor {
    policy: Arc<dyn CrashPolicy>,
    settings: Arc<dyn SettingsStore>,
    fields: Arc<FieldStore>,
}

impl MethodHook for EscalationSuppressor {
    fn before(&self, call: &mut CallFrame) -> Result<(), CoreError> {
        let (count, target_arg, context) = {
            let args = call.args();
            if args.len() < 3 {
                return Ok(());
            }
            (
                args[0].as_i64(),
                args[1].clone(),
                args[2].as_u64().map(waylay_host::ObjectHandle),
            )
        };
        let Some(count) = count else {
            return Ok(());
        };

        if self.settings.get_flag(KILL_SWITCH_PROP) || target_arg.is_null() {
            call.set_result(Value::Bool(false));
            return Ok(());
        }
        let Some(target) = target_arg.as_str() else {
            return Ok(());
        };
        let Some(surface) = surface_for(target) else {
            return Ok(());
        };

        if self.policy.on_handle_crash(context, target, count) {
            for key in surface.level_keys {
                self.settings.put_int(key, 0);
            }
            self.settings.set_property(RESET_FLAG_PROP, "true");
            if let Some(watchdog) = call.this() {
                self.fields
                    .set(watchdog, TAG_KEY, Value::String(target.to_string()));
            }
            call.set_result(Value::Bool(true));
        }
        Ok(())
    }
}

// Before-hook on doMitigationStep(count, target, context). The tag is taken
// as soon as it is read; a mismatched target therefore clears it too, and
// the next escalation attempt re-derives it fresh.
struct MitigationStepHook {
    fields: Arc<FieldStore>,
    resolver: Arc<Resolver>,
}

impl MethodHook for MitigationStepHook {
    fn before(&self, call: &mut CallFrame) -> Result<(), CoreError> {
        let Some(watchdog) = call.this() else {
            return Ok(());
        };
        let Some(tag) = self
            .fields
            .take(watchdog, TAG_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
        else {
            return Ok(());
        };

        let (count, target_arg) = {
            let args = call.args();
            if args.len() < 3 {
                return Ok(());
            }
            (args[0].as_i64().unwrap_or(0), args[1].clone())
        };
        if target_arg.is_null() {
            call.set_result(Value::Bool(false));
            return Ok(());
        }
        let Some(target) = target_arg.as_str() else {
            return Ok(());
        };
        if target != tag {
            return Ok(());
        }

        if count > 1 {
            let what = (count - 1).min(MAX_MESSAGE_INDEX);
            match self.resolver.resolve_method_if_exists(
                WATCHDOG_CLASS,
                REMOVE_MESSAGE_MEMBER,
                &["int", "package"],
            ) {
                Some(remove) => {
                    if let Err(err) = remove.invoke(Some(watchdog), vec![json!(what), json!(target)]) {
                        error!(error = %err, target, "queued-mitigation removal failed");
                    }
                }
                None => warn!(target, "removeMessage not resolvable; queued mitigation left in place"),
            }
        }
        call.set_result(Value::Bool(true));
        Ok(())
    }
}
