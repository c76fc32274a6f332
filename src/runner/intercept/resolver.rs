//! Turns a dispatch miss into a loaded class and a forwarded call, or a diagnostic.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::runner::api::EvalContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::value::Value;
use crate::runner::intercept::diagnostic::Diagnostic;
use crate::runner::intercept::{is_reserved_meta_name, PendingCall};

/// Load the unit for the call's type, probe for the method, then forward the call.
///
/// The type's load lock is held from the load through the probe so that concurrent
/// first calls wait for one load instead of racing. It is released before forwarding.
pub fn resolve(ctx: &mut EvalContext, call: PendingCall) -> Result<Value, RuntimeError> {
    if is_reserved_meta_name(&call.method) {
        return Ok(Value::Nil);
    }

    let runtime = Arc::clone(ctx.runtime());
    let lock = runtime.guards().lock_for(&call.type_name);
    let probed = {
        let _held = lock.lock();
        probe(ctx, &call)
    };
    runtime.guards().release(&call.type_name, lock);
    if let Err(diagnostic) = probed {
        warn!(
            code = %diagnostic.code(),
            class = %diagnostic.type_name(),
            method = %diagnostic.method(),
            "Call could not be resolved"
        );
        return Err(diagnostic.into());
    }

    debug!(class = %call.type_name, method = %call.method, "Forwarding resolved call");
    ctx.forward(call.receiver, &call.method, call.args)
}

/// Require the call's unit, then check the method is there.
fn probe(ctx: &mut EvalContext, call: &PendingCall) -> Result<(), Diagnostic> {
    if let Err(e) = ctx.require(&call.type_name) {
        return Err(Diagnostic::load_failed(
            call.type_name.clone(),
            &call.method,
            &e,
            ctx.backtrace(),
        ));
    }
    if !ctx.can(&call.type_name, &call.method) {
        return Err(Diagnostic::method_missing(
            call.type_name.clone(),
            &call.method,
            ctx.backtrace(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::api::Runtime;
    use crate::runner::config::RuntimeConfig;
    use crate::runner::ds::type_name::TypeName;

    #[test]
    fn test_reserved_names_ignored_when_called_directly() {
        let runtime = Runtime::from_config(RuntimeConfig::new().with_env_path(false));
        let mut ctx = runtime.context();
        for method in ["DESTROY", "AUTOLOAD", "CLONE"] {
            let call = PendingCall {
                type_name: TypeName::parse("Nowhere").unwrap(),
                method: method.to_string(),
                args: vec![],
                receiver: Value::from("Nowhere"),
            };
            assert_eq!(resolve(&mut ctx, call).unwrap(), Value::Nil);
        }
        let stats = runtime.stats();
        assert_eq!((stats.loads, stats.load_failures), (0, 0));
        assert!(runtime.guards().is_empty());
    }

    #[test]
    fn test_unresolved_call_releases_its_lock() {
        let runtime = Runtime::from_config(RuntimeConfig::new().with_env_path(false));
        let mut ctx = runtime.context();
        let call = PendingCall {
            type_name: TypeName::parse("Nowhere").unwrap(),
            method: "go".to_string(),
            args: vec![],
            receiver: Value::from("Nowhere"),
        };
        assert!(resolve(&mut ctx, call).is_err());
        assert!(runtime.guards().is_empty());
    }
}
