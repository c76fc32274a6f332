//! Core types for the evaluation engine.

use std::collections::HashMap;
use std::sync::Arc;

use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::frame::SourcePos;
use crate::runner::ds::value::Value;

pub type EvalResult<T = Flow> = Result<T, RuntimeError>;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Execution continues with the next statement. Carries the statement's value.
    Normal(Value),
    /// `return` was executed.
    Return(Value),
}

impl Flow {
    pub fn into_value(self) -> Value {
        match self {
            Flow::Normal(v) | Flow::Return(v) => v,
        }
    }
}

/// Locals of one method activation or one top-level body.
pub struct Scope {
    locals: HashMap<String, Value>,
    this: Value,
    file: Arc<str>,
}

impl Scope {
    pub fn new(this: Value, file: Arc<str>) -> Self {
        Scope {
            locals: HashMap::new(),
            this,
            file,
        }
    }

    pub fn bind(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    pub fn this(&self) -> &Value {
        &self.this
    }

    pub fn pos(&self, line: u32) -> SourcePos {
        SourcePos::new(Arc::clone(&self.file), line)
    }
}
