//! Statement execution.

use crate::parser::ast::{Stmt, StmtKind};
use crate::runner::api::EvalContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::value::Value;

use super::expression::evaluate_expression;
use super::types::{EvalResult, Flow, Scope};

/// Execute a statement and return how it finished.
pub fn execute_statement(stmt: &Stmt, scope: &mut Scope, ctx: &mut EvalContext) -> EvalResult {
    ctx.set_pos(scope.pos(stmt.line));
    match &stmt.kind {
        StmtKind::Let(name, value) => {
            let value = evaluate_expression(value, scope, ctx)?;
            scope.bind(name, value);
            Ok(Flow::Normal(Value::Nil))
        }

        StmtKind::Return(value) => {
            let value = match value {
                Some(e) => evaluate_expression(e, scope, ctx)?,
                None => Value::Nil,
            };
            Ok(Flow::Return(value))
        }

        StmtKind::Die(message) => {
            let message = evaluate_expression(message, scope, ctx)?.to_string();
            // A message ending in a newline is reported as is, without a location.
            match message.strip_suffix('\n') {
                Some(bare) => Err(RuntimeError::died(bare, None)),
                None => Err(RuntimeError::died(message, Some(scope.pos(stmt.line)))),
            }
        }

        StmtKind::Require(unit) => {
            ctx.require(unit)?;
            Ok(Flow::Normal(Value::Nil))
        }

        StmtKind::Print(value) => {
            let value = evaluate_expression(value, scope, ctx)?;
            writeln!(ctx.output(), "{}", value)?;
            Ok(Flow::Normal(Value::Nil))
        }

        StmtKind::Expr(e) => Ok(Flow::Normal(evaluate_expression(e, scope, ctx)?)),
    }
}

/// Run statements in order. The block's value is the last statement's, unless a
/// `return` cuts it short.
pub fn execute_block(stmts: &[Stmt], scope: &mut Scope, ctx: &mut EvalContext) -> EvalResult {
    let mut last = Flow::Normal(Value::Nil);
    for stmt in stmts {
        last = execute_statement(stmt, scope, ctx)?;
        if let Flow::Return(_) = last {
            break;
        }
    }
    Ok(last)
}
