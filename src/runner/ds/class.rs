//! Class definitions and the methods they carry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::parser::ast::MethodDecl;
use crate::runner::api::EvalContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::type_name::TypeName;
use crate::runner::ds::value::Value;
use crate::runner::eval;

/// Function signature for methods implemented in Rust.
/// They receive the evaluation context, the invocant and the arguments.
pub type NativeFn =
    fn(ctx: &mut EvalContext, this: Value, args: Vec<Value>) -> Result<Value, RuntimeError>;

pub type ClosureFn =
    dyn Fn(&mut EvalContext, Value, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync;

/// A method body parsed from a unit file.
pub struct ScriptMethod {
    pub class: TypeName,
    pub decl: MethodDecl,
    pub file: Arc<str>,
}

pub enum Method {
    /// Direct function pointer.
    Native(NativeFn),

    /// Capturing closure, used by units registered from Rust that need state.
    Plugin(Box<ClosureFn>),

    /// Method written in a unit file, run by the evaluator.
    Script(Arc<ScriptMethod>),
}

impl Method {
    pub fn call(
        &self,
        ctx: &mut EvalContext,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match self {
            Method::Native(f) => f(ctx, this, args),
            Method::Plugin(f) => f(ctx, this, args),
            Method::Script(m) => eval::invoke_method(ctx, m, this, args),
        }
    }

    /// Script methods track their own line numbers; the others report Rust call sites.
    pub fn is_native(&self) -> bool {
        !matches!(self, Method::Script(_))
    }

    pub fn script(&self) -> Option<&Arc<ScriptMethod>> {
        match self {
            Method::Script(m) => Some(m),
            _ => None,
        }
    }
}

pub struct ClassDef {
    name: TypeName,
    parents: Vec<TypeName>,
    methods: HashMap<String, Arc<Method>>,
}

impl ClassDef {
    pub fn new(name: TypeName) -> Self {
        ClassDef {
            name,
            parents: Vec::new(),
            methods: HashMap::new(),
        }
    }

    /// Append a parent class. Parents are searched in declaration order.
    pub fn extends(mut self, parent: TypeName) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn add_method(mut self, name: impl Into<String>, func: NativeFn) -> Self {
        self.methods.insert(name.into(), Arc::new(Method::Native(func)));
        self
    }

    pub fn add_closure<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut EvalContext, Value, Vec<Value>) -> Result<Value, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.methods
            .insert(name.into(), Arc::new(Method::Plugin(Box::new(func))));
        self
    }

    pub fn add_script(mut self, method: ScriptMethod) -> Self {
        self.methods
            .insert(method.decl.name.clone(), Arc::new(Method::Script(Arc::new(method))));
        self
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn parents(&self) -> &[TypeName] {
        &self.parents
    }

    pub fn own_method(&self, name: &str) -> Option<&Arc<Method>> {
        self.methods.get(name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &String> {
        self.methods.keys()
    }
}
