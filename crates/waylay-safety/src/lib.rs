//! `waylay-safety` – the crash safety net.
//!
//! Hook modules can destabilize the host they inject into; this crate
//! installs the intercepts that keep a crashing host recoverable:
//!
//! - [`crash_guard`] – [`CrashGuard`][crash_guard::CrashGuard]: observes the
//!   moment the host records an application crash (read-only, forwarded to a
//!   [`CrashObserver`][collaborators::CrashObserver]) and exempts the
//!   module's own recovery UI from background-start aborts.
//! - [`escalation`] – [`EscalationGuard`][escalation::EscalationGuard]:
//!   suppresses the watchdog's mitigation-level escalation for a small fixed
//!   set of critical system surfaces when the crash-policy collaborator
//!   approves lenient handling, and completes the two-call-site state
//!   machine on the follow-up mitigation step.
//! - [`collaborators`] – the narrow interfaces consumed from outside the
//!   core ([`CrashObserver`][collaborators::CrashObserver],
//!   [`CrashPolicy`][collaborators::CrashPolicy],
//!   [`SettingsStore`][collaborators::SettingsStore]).
//!
//! # Host surface contract
//!
//! The attach layer registers these names: class `AppErrors` with
//! `handleApplicationCrash` (bool-returning), class `ActivityStarter` with
//! `shouldAbortBackgroundActivityStart` (arity 10, requester package at
//! index 2), and class `PackageWatchdog` with
//! `setMitigationLevel(int, package, context)`,
//! `doMitigationStep`/`doMitigationStepNew` (same signature) and
//! `removeMessage(int, package)`. Absent optional members are tolerated.

pub mod collaborators;
pub mod crash_guard;
pub mod escalation;

pub use collaborators::{CrashObserver, CrashPolicy, SettingsStore};
pub use crash_guard::CrashGuard;
pub use escalation::EscalationGuard;
