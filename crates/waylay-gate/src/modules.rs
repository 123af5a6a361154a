//! Built-in module implementations.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;
use waylay_hook::{HookSpec, MethodHook, PRIORITY_DEFAULT};
use waylay_host::CallFrame;
use waylay_types::CoreError;

use crate::catalog::{HookModule, ModuleContext};
use crate::prefs::Preferences;

/// Forces a fixed result only while its preference key is enabled; the
/// preference is consulted on every call, so toggling it takes effect
/// without re-hooking.
pub struct PrefGatedConstant {
    prefs: Preferences,
    key: String,
    default: bool,
    value: Value,
}

impl PrefGatedConstant {
    pub fn new(prefs: Preferences, key: impl Into<String>, default: bool, value: Value) -> Self {
        Self {
            prefs,
            key: key.into(),
            default,
            value,
        }
    }
}

impl MethodHook for PrefGatedConstant {
    fn before(&self, call: &mut CallFrame) -> Result<(), CoreError> {
        if self.prefs.get_bool(&self.key, self.default) {
            call.set_result(self.value.clone());
        }
        Ok(())
    }
}

/// Preference-gated constant-result hooks on framework verification
/// members. The signature-check hook is required; the verification toggle
/// varies across host builds and is installed as available.
pub struct FrameworkPatch;

impl HookModule for FrameworkPatch {
    fn init(&mut self, ctx: &ModuleContext) -> Result<(), CoreError> {
        ctx.installer.hook(
            &HookSpec::new(
                "SignatureVerifier",
                "verifySignatures",
                &["package", "package", "boolean"],
            ),
            Arc::new(PrefGatedConstant::new(
                ctx.prefs.clone(),
                "framework_skip_signature_check",
                false,
                json!(true),
            )),
        )?;

        ctx.installer.hook_if_exists(
            &HookSpec::new("SignatureVerifier", "isVerificationEnabled", &["int"]),
            Arc::new(PrefGatedConstant::new(
                ctx.prefs.clone(),
                "framework_relax_verification",
                false,
                json!(false),
            )),
        );
        Ok(())
    }
}

/// Package-scoped tweaks for the system UI process.
pub struct SystemUiTweaks;

impl HookModule for SystemUiTweaks {
    fn init(&mut self, ctx: &ModuleContext) -> Result<(), CoreError> {
        ctx.installer.hook_if_exists(
            &HookSpec::new("NotificationThrottler", "shouldThrottle", &["text"]),
            Arc::new(PrefGatedConstant::new(
                ctx.prefs.clone(),
                "systemui_disable_notification_throttle",
                false,
                json!(false),
            )),
        );
        Ok(())
    }
}

/// Generic handling for packages no catalog entry targets.
pub struct ThirdAppFallback;

impl HookModule for ThirdAppFallback {
    fn init(&mut self, ctx: &ModuleContext) -> Result<(), CoreError> {
        let package = ctx.package.as_deref().unwrap_or("<unknown>");
        debug!(package, "generic third-app handling");

        if ctx.prefs.get_bool("force_app_debuggable", false) {
            ctx.installer.hook_all_methods(
                "BuildProperties",
                "isDebuggable",
                Arc::new(PrefGatedConstant::new(
                    ctx.prefs.clone(),
                    "force_app_debuggable",
                    false,
                    json!(true),
                )),
                PRIORITY_DEFAULT,
            );
        }
        Ok(())
    }
}
