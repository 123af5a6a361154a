//! Host model: classes, members, object handles, and call frames.
//!
//! The attach layer registers one [`HostModel`] per loaded scope (the
//! class-loader analog) and supplies each member's original body as a
//! closure. Hook dispatch and module code only ever see this model; the
//! real instrumentation plumbing stays outside the engine.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use waylay_types::CoreError;

// Member ids are process-global so one hook registry can span models.
static NEXT_MEMBER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a live host object.
///
/// Handles are minted by the attach layer and never extend the owner's
/// lifetime; when the host reclaims the object, the attach layer calls
/// [`FieldStore::dispose_owner`][crate::FieldStore::dispose_owner].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u64);

/// Whether a member is an ordinary method or a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Constructor,
}

/// The original implementation of a member, supplied by the attach layer.
pub type MemberBody = Arc<dyn Fn(&mut CallFrame) -> Result<Value, CoreError> + Send + Sync>;

/// One intercepted call: receiver, arguments, and the pending outcome slot.
///
/// A Before hook that calls [`CallFrame::set_result`] (or `set_error`) forces
/// the outcome and skips the original body; an After hook may override
/// whatever outcome is pending.
pub struct CallFrame {
    this: Option<ObjectHandle>,
    args: Vec<Value>,
    outcome: Option<Result<Value, CoreError>>,
}

impl CallFrame {
    pub fn new(this: Option<ObjectHandle>, args: Vec<Value>) -> Self {
        Self {
            this,
            args,
            outcome: None,
        }
    }

    /// The receiver of the call, absent for static members and constructors
    /// whose instance does not exist yet.
    pub fn this(&self) -> Option<ObjectHandle> {
        self.this
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut [Value] {
        &mut self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Force `value` as the call's result. In the before phase this skips
    /// the original body.
    pub fn set_result(&mut self, value: Value) {
        self.outcome = Some(Ok(value));
    }

    /// Force `error` as the call's outcome (the Replace-fault path).
    pub fn set_error(&mut self, error: CoreError) {
        self.outcome = Some(Err(error));
    }

    /// Whether a result or error is already pending.
    pub fn has_outcome(&self) -> bool {
        self.outcome.is_some()
    }

    /// The pending result value, if any (and not an error).
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Some(Ok(value)) => Some(value),
            _ => None,
        }
    }

    /// Consume the pending outcome. Used by the dispatcher once all hooks
    /// have run.
    pub fn take_outcome(&mut self) -> Option<Result<Value, CoreError>> {
        self.outcome.take()
    }
}

impl fmt::Debug for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFrame")
            .field("this", &self.this)
            .field("args", &self.args)
            .field("has_outcome", &self.outcome.is_some())
            .finish()
    }
}

/// A resolvable, invocable member of a host class.
pub struct HostMember {
    id: u64,
    class_name: String,
    name: String,
    kind: MemberKind,
    param_types: Vec<String>,
    return_type: String,
    body: MemberBody,
}

impl HostMember {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn param_types(&self) -> &[String] {
        &self.param_types
    }

    pub fn arity(&self) -> usize {
        self.param_types.len()
    }

    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// `Class::member/arity`, for logs.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}/{}", self.class_name, self.name, self.arity())
    }

    /// Run the original body against an in-flight frame. Hooks on this
    /// member are NOT consulted; the hook registry is the only caller during
    /// dispatch.
    pub fn call_original(&self, frame: &mut CallFrame) -> Result<Value, CoreError> {
        (self.body)(frame)
    }

    /// Invoke the member directly with a fresh frame, bypassing any hooks.
    pub fn invoke(&self, this: Option<ObjectHandle>, args: Vec<Value>) -> Result<Value, CoreError> {
        let mut frame = CallFrame::new(this, args);
        self.call_original(&mut frame)
    }
}

impl fmt::Debug for HostMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMember")
            .field("id", &self.id)
            .field("class", &self.class_name)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("param_types", &self.param_types)
            .field("return_type", &self.return_type)
            .finish()
    }
}

/// One host class: name, optional superclass, and members in declaration
/// order. Declaration order is load-bearing: the resolver's fallback
/// tie-break depends on it.
#[derive(Debug)]
pub struct HostClass {
    name: String,
    superclass: Option<String>,
    members: Vec<Arc<HostMember>>,
}

impl HostClass {
    pub fn new(name: impl Into<String>, superclass: Option<&str>) -> Self {
        Self {
            name: name.into(),
            superclass: superclass.map(str::to_string),
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Declared members, in declaration order.
    pub fn members(&self) -> &[Arc<HostMember>] {
        &self.members
    }

    /// Declare a method. Returns the member handle so the attach layer can
    /// route calls to it.
    pub fn add_method(
        &mut self,
        name: impl Into<String>,
        param_types: &[&str],
        return_type: impl Into<String>,
        body: MemberBody,
    ) -> Arc<HostMember> {
        self.add_member(MemberKind::Method, name.into(), param_types, return_type.into(), body)
    }

    /// Declare a constructor. Constructors resolve against the declaring
    /// class only; they are not inherited.
    pub fn add_constructor(&mut self, param_types: &[&str], body: MemberBody) -> Arc<HostMember> {
        self.add_member(
            MemberKind::Constructor,
            "<init>".to_string(),
            param_types,
            self.name.clone(),
            body,
        )
    }

    fn add_member(
        &mut self,
        kind: MemberKind,
        name: String,
        param_types: &[&str],
        return_type: String,
        body: MemberBody,
    ) -> Arc<HostMember> {
        let member = Arc::new(HostMember {
            id: NEXT_MEMBER_ID.fetch_add(1, Ordering::Relaxed),
            class_name: self.name.clone(),
            name,
            kind,
            param_types: param_types.iter().map(|t| t.to_string()).collect(),
            return_type,
            body,
        });
        self.members.push(Arc::clone(&member));
        member
    }

    /// All declared methods with `name`, any arity, declaration order.
    pub fn declared_methods_named(&self, name: &str) -> Vec<Arc<HostMember>> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Method && m.name == name)
            .cloned()
            .collect()
    }

    /// All declared constructors, declaration order.
    pub fn declared_constructors(&self) -> Vec<Arc<HostMember>> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Constructor)
            .cloned()
            .collect()
    }
}

/// Registry of the host classes reachable from one loaded scope.
///
/// The class-loader analog: each lifecycle event carries its own model, and
/// lookups never cross models. Registering a class with an existing name
/// replaces the old entry, mirroring a reloaded definition.
#[derive(Debug, Default)]
pub struct HostModel {
    classes: DashMap<String, Arc<HostClass>>,
}

impl HostModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_class(&self, class: HostClass) -> Arc<HostClass> {
        let class = Arc::new(class);
        self.classes.insert(class.name.clone(), Arc::clone(&class));
        class
    }

    pub fn class(&self, name: &str) -> Option<Arc<HostClass>> {
        self.classes.get(name).map(|entry| Arc::clone(&entry))
    }

    pub fn contains_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }
}
