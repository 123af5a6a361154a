//! [`CrashGuard`] – crash interception and recovery-UI exemption.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};
use waylay_hook::{HookInstaller, MethodHook, PRIORITY_DEFAULT};
use waylay_host::CallFrame;
use waylay_types::{CoreError, CrashRecord};

use crate::collaborators::CrashObserver;

pub(crate) const APP_ERRORS_CLASS: &str = "AppErrors";
pub(crate) const CRASH_MEMBER: &str = "handleApplicationCrash";
pub(crate) const ACTIVITY_STARTER_CLASS: &str = "ActivityStarter";
pub(crate) const BACKGROUND_START_MEMBER: &str = "shouldAbortBackgroundActivityStart";

// shouldAbortBackgroundActivityStart carries the requester package here.
const REQUESTER_ARG: usize = 2;

/// Installs the crash interceptor and the background-start suppressor.
///
/// The two installs are independent: a failure in one is logged and does
/// not block the other.
pub struct CrashGuard {
    observer: Arc<dyn CrashObserver>,
    helper_package: String,
}

impl CrashGuard {
    /// `helper_package` is the module's own recovery-UI package; its
    /// background starts are never aborted.
    pub fn new(observer: Arc<dyn CrashObserver>, helper_package: impl Into<String>) -> Self {
        Self {
            observer,
            helper_package: helper_package.into(),
        }
    }

    pub fn install(&self, installer: &HookInstaller) {
        if let Err(err) = self.install_background_exemption(installer) {
            error!(error = %err, "background-start exemption not installed");
        }
        if let Err(err) = self.install_crash_interceptor(installer) {
            error!(error = %err, "crash interceptor not installed");
        }
    }

    // The crash entry point is selected by name and boolean return type;
    // its parameter list drifts across host builds.
    fn install_crash_interceptor(&self, installer: &HookInstaller) -> Result<(), CoreError> {
        let class = installer.resolver().resolve_class(APP_ERRORS_CLASS)?;
        let member = class
            .members()
            .iter()
            .find(|m| m.name() == CRASH_MEMBER && m.return_type() == "boolean")
            .cloned()
            .ok_or_else(|| CoreError::HookInstall {
                target: format!("{APP_ERRORS_CLASS}::{CRASH_MEMBER}"),
                reason: "no boolean-returning overload".to_string(),
            })?;

        installer.registry().install(
            &member,
            Arc::new(CrashRecordHook {
                observer: Arc::clone(&self.observer),
            }),
            PRIORITY_DEFAULT,
        );
        Ok(())
    }

    // Signature drift on this one is expected: absence is tolerated and the
    // crash interceptor still goes in.
    fn install_background_exemption(&self, installer: &HookInstaller) -> Result<(), CoreError> {
        let class = installer.resolver().resolve_class(ACTIVITY_STARTER_CLASS)?;
        let member = class.members().iter().find(|m| {
            m.name() == BACKGROUND_START_MEMBER
                && m.arity() == 10
                && m.param_types().get(REQUESTER_ARG).map(String::as_str) == Some("text")
        });
        let Some(member) = member else {
            debug!(
                class = ACTIVITY_STARTER_CLASS,
                member = BACKGROUND_START_MEMBER,
                "expected signature absent; skipping exemption"
            );
            return Ok(());
        };

        installer.registry().install(
            member,
            Arc::new(BackgroundStartHook {
                helper_package: self.helper_package.clone(),
            }),
            PRIORITY_DEFAULT,
        );
        Ok(())
    }
}

// After-hook: runs once the host has decided the crash's disposition and
// never alters it.
struct CrashRecordHook {
    observer: Arc<dyn CrashObserver>,
}

impl MethodHook for CrashRecordHook {
    fn after(&self, call: &mut CallFrame) -> Result<(), CoreError> {
        let args = call.args();
        if args.len() < 2 {
            return Ok(());
        }
        let Some(info) = args[1].as_object() else {
            debug!("crash info argument is not an object; nothing to extract");
            return Ok(());
        };

        let record = CrashRecord::new(
            args.get(3).and_then(Value::as_str).unwrap_or(""),
            args.get(4).and_then(Value::as_str).unwrap_or(""),
            info.get("exception_class").and_then(Value::as_str).unwrap_or(""),
            info.get("file").and_then(Value::as_str).unwrap_or(""),
            info.get("line").and_then(Value::as_i64).unwrap_or(0),
            info.get("method").and_then(Value::as_str).unwrap_or(""),
        );
        self.observer.on_crash(&record);
        Ok(())
    }
}

// Before-hook: forces "not aborted" for the module's own helper package;
// every other requester passes unmodified.
struct BackgroundStartHook {
    helper_package: String,
}

impl MethodHook for BackgroundStartHook {
    fn before(&self, call: &mut CallFrame) -> Result<(), CoreError> {
        let requester = call
            .arg(REQUESTER_ARG)
            .and_then(Value::as_str)
            .map(str::to_string);
        if requester.as_deref() == Some(self.helper_package.as_str()) {
            call.set_result(Value::Bool(false));
        }
        Ok(())
    }
}
