//! Hook trait seams and the constant-result conveniences.

use serde_json::Value;
use waylay_host::CallFrame;
use waylay_types::CoreError;

/// Lowest ordinary hook priority.
pub const PRIORITY_LOWEST: i32 = -10_000;
/// Default priority for hooks that do not care about ordering.
pub const PRIORITY_DEFAULT: i32 = 50;
/// Highest ordinary hook priority.
pub const PRIORITY_HIGHEST: i32 = 10_000;
/// Reserved priority for constant-result hooks. Ordinary installs are
/// clamped to [`PRIORITY_LOWEST`]..=[`PRIORITY_HIGHEST`], so a forced hook
/// always outranks them.
pub const PRIORITY_FORCED: i32 = 2 * PRIORITY_HIGHEST;

/// A before/after intercept on one member.
///
/// Both phases default to doing nothing, so implementors override only the
/// side they need. Bodies run on whatever thread the host dispatches the
/// intercepted call on and must be non-blocking.
///
/// An `Err` from either phase is caught at the registry boundary, logged,
/// and discarded; it never aborts the original call or sibling hooks. Any
/// frame mutation made before the failure (including a forced result)
/// stands.
pub trait MethodHook: Send + Sync {
    fn before(&self, _call: &mut CallFrame) -> Result<(), CoreError> {
        Ok(())
    }

    fn after(&self, _call: &mut CallFrame) -> Result<(), CoreError> {
        Ok(())
    }
}

/// A full substitution for the original body.
///
/// Exactly one of {original, replacement} executes per call. The returned
/// value becomes the call's result; an `Err` becomes the call's outcome
/// (surfaced as [`CoreError::ReplaceFault`]), the one fault type allowed to
/// escape to the caller, since Replace fully owns the result.
pub trait ReplaceHook: Send + Sync {
    fn replace(&self, call: &mut CallFrame) -> Result<Value, CoreError>;
}

// Runs a replacement in the before phase: forcing the result (or the error)
// is what skips the original.
pub(crate) struct ReplaceAdapter {
    pub(crate) inner: Box<dyn ReplaceHook>,
}

impl MethodHook for ReplaceAdapter {
    fn before(&self, call: &mut CallFrame) -> Result<(), CoreError> {
        match self.inner.replace(call) {
            Ok(value) => call.set_result(value),
            Err(error) => call.set_error(CoreError::ReplaceFault(error.to_string())),
        }
        Ok(())
    }
}

/// Forces a fixed result, skipping the original. Installed at
/// [`PRIORITY_FORCED`] by [`HookRegistry::install_constant`][crate::HookRegistry::install_constant],
/// so it outranks every ordinary hook.
pub struct ReturnConstant {
    value: Value,
}

impl ReturnConstant {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl MethodHook for ReturnConstant {
    fn before(&self, call: &mut CallFrame) -> Result<(), CoreError> {
        call.set_result(self.value.clone());
        Ok(())
    }
}

/// Suppresses the original entirely, forcing a null result.
pub struct DoNothing;

impl MethodHook for DoNothing {
    fn before(&self, call: &mut CallFrame) -> Result<(), CoreError> {
        call.set_result(Value::Null);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_phases_do_nothing() {
        struct Inert;
        impl MethodHook for Inert {}

        let hook = Inert;
        let mut frame = CallFrame::new(None, vec![]);
        hook.before(&mut frame).unwrap();
        hook.after(&mut frame).unwrap();
        assert!(!frame.has_outcome());
    }

    #[test]
    fn return_constant_forces_result() {
        let hook = ReturnConstant::new(json!(42));
        let mut frame = CallFrame::new(None, vec![json!("ignored")]);
        hook.before(&mut frame).unwrap();
        assert_eq!(frame.result(), Some(&json!(42)));
    }

    #[test]
    fn do_nothing_forces_null() {
        let mut frame = CallFrame::new(None, vec![]);
        DoNothing.before(&mut frame).unwrap();
        assert_eq!(frame.result(), Some(&Value::Null));
    }

    #[test]
    fn replace_adapter_records_fault_as_outcome() {
        struct Failing;
        impl ReplaceHook for Failing {
            fn replace(&self, _call: &mut CallFrame) -> Result<Value, CoreError> {
                Err(CoreError::HostCall("no backing service".to_string()))
            }
        }

        let adapter = ReplaceAdapter { inner: Box::new(Failing) };
        let mut frame = CallFrame::new(None, vec![]);
        adapter.before(&mut frame).unwrap();
        match frame.take_outcome() {
            Some(Err(CoreError::ReplaceFault(msg))) => assert!(msg.contains("no backing service")),
            other => panic!("expected ReplaceFault, got {other:?}"),
        }
    }
}
