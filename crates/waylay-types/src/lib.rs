use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Sentinel for an unbounded SDK bound on a [`ModuleDescriptor`].
pub const UNBOUNDED_SDK: i32 = -1;

/// Sentinel for an unbounded OS-version bound on a [`ModuleDescriptor`].
pub const UNBOUNDED_OS: f32 = -1.0;

/// Form factor of the device the host process is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    Phone,
    Pad,
}

/// Device-class constraint carried by a [`ModuleDescriptor`].
///
/// At most one constraint is active per descriptor; [`DeviceClassConstraint::Any`]
/// never excludes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClassConstraint {
    #[default]
    Any,
    PhoneOnly,
    PadOnly,
}

impl DeviceClassConstraint {
    /// Whether a device of `class` satisfies this constraint.
    pub fn allows(&self, class: DeviceClass) -> bool {
        match self {
            DeviceClassConstraint::Any => true,
            DeviceClassConstraint::PhoneOnly => class == DeviceClass::Phone,
            DeviceClassConstraint::PadOnly => class == DeviceClass::Pad,
        }
    }
}

/// Snapshot of the runtime environment a module catalog is evaluated against.
///
/// Captured once by the embedder at load time and handed to the activation
/// gate; the engine never reads ambient global state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub sdk_version: i32,
    pub os_version: f32,
    pub device_class: DeviceClass,
}

/// Immutable catalog entry describing when a module applies.
///
/// `target_package == None` means the module targets every package
/// (a "wildcard" entry, evaluated on privileged-process load). SDK and OS
/// bounds use `-1` / `-1.0` as the "unbounded" sentinel; an unbounded side
/// never excludes a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub qualified_name: String,
    pub target_package: Option<String>,
    pub min_sdk: i32,
    pub max_sdk: i32,
    pub min_os_version: f32,
    pub max_os_version: f32,
    pub device_class: DeviceClassConstraint,
}

impl ModuleDescriptor {
    /// An unconstrained descriptor for `qualified_name`: wildcard target,
    /// unbounded versions, any device class.
    pub fn unconstrained(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            target_package: None,
            min_sdk: UNBOUNDED_SDK,
            max_sdk: UNBOUNDED_SDK,
            min_os_version: UNBOUNDED_OS,
            max_os_version: UNBOUNDED_OS,
            device_class: DeviceClassConstraint::Any,
        }
    }

    /// Same as [`ModuleDescriptor::unconstrained`] but scoped to one package.
    pub fn for_package(qualified_name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            target_package: Some(package.into()),
            ..Self::unconstrained(qualified_name)
        }
    }

    /// Evaluate the full {sdk, os, device} predicate against `env`.
    ///
    /// Every configured bound must be satisfied; an unbounded sentinel is
    /// always satisfied. The target package is *not* part of this check;
    /// package matching is the activation gate's concern.
    pub fn matches(&self, env: &Environment) -> bool {
        if self.min_sdk != UNBOUNDED_SDK && env.sdk_version < self.min_sdk {
            return false;
        }
        if self.max_sdk != UNBOUNDED_SDK && env.sdk_version > self.max_sdk {
            return false;
        }
        if self.min_os_version != UNBOUNDED_OS && env.os_version < self.min_os_version {
            return false;
        }
        if self.max_os_version != UNBOUNDED_OS && env.os_version > self.max_os_version {
            return false;
        }
        self.device_class.allows(env.device_class)
    }
}

/// Read-only record of an application crash, extracted at the moment the
/// host records it and forwarded to an external crash-analysis collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashRecord {
    pub id: Uuid,
    pub observed_at: DateTime<Utc>,
    pub message: String,
    pub stack_trace: String,
    pub exception_class: String,
    pub file: String,
    pub line: i64,
    pub method: String,
}

impl CrashRecord {
    /// Build a record stamped with a fresh id and the current time.
    pub fn new(
        message: impl Into<String>,
        stack_trace: impl Into<String>,
        exception_class: impl Into<String>,
        file: impl Into<String>,
        line: i64,
        method: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            observed_at: Utc::now(),
            message: message.into(),
            stack_trace: stack_trace.into(),
            exception_class: exception_class.into(),
            file: file.into(),
            line,
            method: method.into(),
        }
    }
}

/// Global error type spanning resolution failures, hook faults, and module
/// initialization failures.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum CoreError {
    /// The named class is absent from the host model the lookup ran against.
    #[error("class not found: {0}")]
    ClassNotFound(String),

    /// No member matched by exact signature or by name + arity anywhere in
    /// the class hierarchy.
    #[error("member not found: {class}::{member}/{arity}")]
    MemberNotFound {
        class: String,
        member: String,
        arity: usize,
    },

    /// Wraps a resolution or installation failure at a hook call site.
    /// Silent installer variants swallow this and report absence instead.
    #[error("hook install failed on {target}: {reason}")]
    HookInstall { target: String, reason: String },

    /// A Before/After hook body failed. Always caught at the registry
    /// boundary and logged; never propagated to the intercepted call.
    #[error("hook body fault: {0}")]
    HookFault(String),

    /// A Replace hook body failed. The one fault type that surfaces as the
    /// intercepted call's outcome, since Replace fully owns the result.
    #[error("replacement fault: {0}")]
    ReplaceFault(String),

    /// The original member body failed; surfaced as the call outcome.
    #[error("host call failed: {0}")]
    HostCall(String),

    /// One module's initialization failed; caught and logged by the
    /// activation gate so sibling modules keep initializing.
    #[error("module {module} failed to initialize: {reason}")]
    ModuleInit { module: String, reason: String },
}
