//! `waylay-host` – the host-process model.
//!
//! The engine does not own the attach/instrumentation mechanism; the attach
//! layer registers the reachable slice of the host here and routes
//! intercepted calls through the hook registry. This crate provides:
//!
//! - [`model`] – [`HostModel`][model::HostModel], [`HostClass`][model::HostClass]
//!   and [`HostMember`][model::HostMember]: a class-loader-like registry of
//!   classes and invocable members, plus [`CallFrame`][model::CallFrame] and
//!   the opaque [`ObjectHandle`][model::ObjectHandle] standing in for live
//!   host objects.
//! - [`resolver`] – [`Resolver`][resolver::Resolver]: name-based class and
//!   member resolution with the exact-signature-then-arity fallback walk over
//!   the class hierarchy, memoized per (class, name, arity).
//! - [`field_store`] – [`FieldStore`][field_store::FieldStore]: non-owning
//!   key/value annotations on host objects, keyed by handle identity, used
//!   for cross-callback correlation.

pub mod field_store;
pub mod model;
pub mod resolver;

pub use field_store::FieldStore;
pub use model::{CallFrame, HostClass, HostMember, HostModel, MemberKind, ObjectHandle};
pub use resolver::Resolver;

/// Dynamic value passed through intercepted calls.
pub use serde_json::Value;
