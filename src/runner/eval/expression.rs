//! Expression evaluation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::parser::ast::{BinOp, Expr, ExprKind};
use crate::runner::api::EvalContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::value::{Instance, Value};

use super::types::{EvalResult, Scope};

pub fn evaluate_expression(
    expr: &Expr,
    scope: &mut Scope,
    ctx: &mut EvalContext,
) -> EvalResult<Value> {
    match &expr.kind {
        ExprKind::Nil => Ok(Value::Nil),
        ExprKind::Bool(b) => Ok(Value::Bool(*b)),
        ExprKind::Int(i) => Ok(Value::Int(*i)),
        ExprKind::Str(s) => Ok(Value::Str(s.clone())),

        ExprKind::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(evaluate_expression(item, scope, ctx)?);
            }
            Ok(Value::List(values))
        }

        ExprKind::Local(name) => match scope.lookup(name) {
            Some(v) => Ok(v.clone()),
            None => Err(RuntimeError::UndefinedName {
                name: name.clone(),
                location: Some(scope.pos(expr.line)),
            }),
        },

        ExprKind::SelfRef => Ok(scope.this().clone()),

        ExprKind::Type(t) => Ok(Value::Class(t.clone())),

        ExprKind::New(fields) => evaluate_new(fields, expr.line, scope, ctx),

        ExprKind::Field(target, name) => {
            let target = evaluate_expression(target, scope, ctx)?;
            match target.as_object() {
                Some(obj) => Ok(obj.field(name).cloned().unwrap_or(Value::Nil)),
                None => Err(RuntimeError::type_error(
                    format!("Can't read field \"{}\" of {} value", name, target.kind()),
                    Some(scope.pos(expr.line)),
                )),
            }
        }

        ExprKind::Call {
            receiver,
            method,
            args,
        } => {
            let receiver = evaluate_expression(receiver, scope, ctx)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate_expression(arg, scope, ctx)?);
            }
            ctx.call_at(receiver, method, values, scope.pos(expr.line))
        }

        ExprKind::Binary(op, left, right) => {
            let left = evaluate_expression(left, scope, ctx)?;
            let right = evaluate_expression(right, scope, ctx)?;
            apply_binary(*op, left, right, scope, expr.line)
        }
    }
}

/// `new { ... }` builds an instance of the invocant's class.
fn evaluate_new(
    fields: &[(String, Expr)],
    line: u32,
    scope: &mut Scope,
    ctx: &mut EvalContext,
) -> EvalResult<Value> {
    let class = match scope.this().type_of() {
        Some(t) => t.clone(),
        None => {
            return Err(RuntimeError::type_error(
                "Can't construct an object outside a method",
                Some(scope.pos(line)),
            ))
        }
    };
    let mut values = BTreeMap::new();
    for (name, value) in fields {
        let value = evaluate_expression(value, scope, ctx)?;
        values.insert(name.clone(), value);
    }
    Ok(Value::Object(Arc::new(Instance::new(class, values))))
}

fn apply_binary(
    op: BinOp,
    left: Value,
    right: Value,
    scope: &Scope,
    line: u32,
) -> EvalResult<Value> {
    match op {
        BinOp::Eq => Ok(Value::Bool(left == right)),
        BinOp::Ne => Ok(Value::Bool(left != right)),
        BinOp::Concat => Ok(Value::Str(format!("{}{}", left, right))),
        BinOp::Add | BinOp::Sub => {
            let (a, b) = match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => (*a, *b),
                _ => {
                    return Err(RuntimeError::type_error(
                        format!(
                            "Can't do arithmetic on {} and {} values",
                            left.kind(),
                            right.kind()
                        ),
                        Some(scope.pos(line)),
                    ))
                }
            };
            let result = if op == BinOp::Add {
                a.checked_add(b)
            } else {
                a.checked_sub(b)
            };
            result
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::type_error("Integer overflow", Some(scope.pos(line))))
        }
    }
}
