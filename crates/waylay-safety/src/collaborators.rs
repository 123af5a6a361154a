//! Collaborator interfaces consumed by the safety net.
//!
//! All three are implemented outside the core: the engine only calls them.
//! Logging-adjacent calls (`CrashObserver`, `SettingsStore` writes) are
//! fire-and-forget and must not block or panic.

use waylay_host::ObjectHandle;
use waylay_types::CrashRecord;

/// External crash-analysis collaborator. Receives every crash the
/// interceptor observes, read-only; the crash's disposition is never
/// altered on its behalf.
pub trait CrashObserver: Send + Sync {
    fn on_crash(&self, record: &CrashRecord);
}

/// External crash-policy collaborator consulted before suppressing a
/// watchdog escalation. `true` approves lenient handling for this crash.
pub trait CrashPolicy: Send + Sync {
    fn on_handle_crash(
        &self,
        context: Option<ObjectHandle>,
        target: &str,
        mitigation_count: i64,
    ) -> bool;
}

/// Host settings and properties, as consumed by the escalation suppressor:
/// integer settings writes for the mitigation-level keys, a string property
/// write for the reset marker, and a boolean property read for the
/// kill-switch flag.
pub trait SettingsStore: Send + Sync {
    fn put_int(&self, key: &str, value: i64);
    fn set_property(&self, key: &str, value: &str);
    fn get_flag(&self, key: &str) -> bool;
}
