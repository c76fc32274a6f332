//! Evaluation of unit files and scripts.
//!
//! A unit body runs once, at load time, in an `(eval)` frame: its classes are defined
//! first (after their parents are required), then its top-level statements run in
//! order. Scripts run the same way outside any unit.

use std::sync::Arc;

use crate::parser::ast::{ClassDecl, Unit};
use crate::runner::api::EvalContext;
use crate::runner::ds::class::{ClassDef, ScriptMethod};
use crate::runner::ds::error::LoadError;
use crate::runner::ds::frame::{Frame, SourcePos};
use crate::runner::ds::type_name::TypeName;
use crate::runner::ds::value::Value;

pub mod expression;
pub mod function;
pub mod statement;
pub mod types;

pub use function::invoke_method;
pub use types::{EvalResult, Flow, Scope};

/// Define the classes of `unit` and run its load-time code.
pub fn load_unit(
    ctx: &mut EvalContext,
    name: &TypeName,
    unit: &Unit,
    file: Arc<str>,
) -> Result<(), LoadError> {
    ctx.push_frame(Frame::eval(SourcePos::new(Arc::clone(&file), 1), false));
    let result = load_unit_body(ctx, name, unit, file);
    ctx.pop_frame();
    result
}

fn load_unit_body(
    ctx: &mut EvalContext,
    name: &TypeName,
    unit: &Unit,
    file: Arc<str>,
) -> Result<(), LoadError> {
    for decl in unit.classes() {
        ctx.set_pos(SourcePos::new(Arc::clone(&file), decl.line));
        for parent in &decl.parents {
            ctx.require_base(&decl.name, parent)?;
        }
        ctx.define_class(class_from_decl(decl, &file));
    }

    let mut scope = Scope::new(Value::Class(name.clone()), file);
    for stmt in unit.statements() {
        statement::execute_statement(stmt, &mut scope, ctx).map_err(|e| LoadError::Init {
            unit: name.clone(),
            source: Box::new(e),
        })?;
    }
    Ok(())
}

/// Run a top-level script. Returns the value of its last statement.
pub fn run_script(ctx: &mut EvalContext, script: &Unit, file: Arc<str>) -> EvalResult<Value> {
    ctx.push_frame(Frame::eval(SourcePos::new(Arc::clone(&file), 1), false));
    let result = run_script_body(ctx, script, file);
    ctx.pop_frame();
    result
}

fn run_script_body(ctx: &mut EvalContext, script: &Unit, file: Arc<str>) -> EvalResult<Value> {
    for decl in script.classes() {
        ctx.set_pos(SourcePos::new(Arc::clone(&file), decl.line));
        for parent in &decl.parents {
            ctx.require(parent)?;
        }
        ctx.define_class(class_from_decl(decl, &file));
    }

    let mut scope = Scope::new(Value::Nil, file);
    let mut last = Value::Nil;
    for stmt in script.statements() {
        match statement::execute_statement(stmt, &mut scope, ctx)? {
            Flow::Normal(v) => last = v,
            Flow::Return(v) => return Ok(v),
        }
    }
    Ok(last)
}

fn class_from_decl(decl: &ClassDecl, file: &Arc<str>) -> ClassDef {
    let mut class = ClassDef::new(decl.name.clone());
    for parent in &decl.parents {
        class = class.extends(parent.clone());
    }
    for method in &decl.methods {
        class = class.add_script(ScriptMethod {
            class: decl.name.clone(),
            decl: method.clone(),
            file: Arc::clone(file),
        });
    }
    class
}

