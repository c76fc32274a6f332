//! Method activation.

use crate::runner::api::EvalContext;
use crate::runner::ds::class::ScriptMethod;
use crate::runner::ds::value::Value;

use super::statement::execute_block;
use super::types::{EvalResult, Scope};

/// Run a script method. The caller has already pushed the method's frame.
///
/// Missing arguments are bound to nil and extra ones are dropped.
pub fn invoke_method(
    ctx: &mut EvalContext,
    method: &ScriptMethod,
    this: Value,
    args: Vec<Value>,
) -> EvalResult<Value> {
    let mut scope = Scope::new(this, method.file.clone());
    let mut args = args.into_iter();
    for param in &method.decl.params {
        scope.bind(param, args.next().unwrap_or(Value::Nil));
    }
    Ok(execute_block(&method.decl.body, &mut scope, ctx)?.into_value())
}
