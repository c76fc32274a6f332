//! The dispatch-miss interceptor.
//!
//! Every call goes through the runtime's class table first. Only when that lookup misses
//! does control reach [`Interceptor::on_miss`], which hands the call to the
//! [`resolver`]. Once a type's unit is loaded its methods resolve from the table
//! directly, so steady-state calls never come back here.
//!
//! ```text
//! ctx.call(Present, "new", args)
//!      ↓
//! 1. Class table: Present::new known? → call it, done
//! 2. Miss → Interceptor::on_miss
//! 3. Reserved meta name (DESTROY, AUTOLOAD, ...)? → no-op, return nil
//! 4. Resolver: require Present → probe `can` → forward the call
//! 5. Load failure → CLASSLOADER-00001, still missing → CLASSLOADER-00002
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::runner::api::EvalContext;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::type_name::TypeName;
use crate::runner::ds::value::Value;

pub mod diagnostic;
pub mod resolver;

pub use diagnostic::{Diagnostic, ErrorCode};

/// One intercepted call. Lives only for the duration of that call.
pub struct PendingCall {
    pub type_name: TypeName,
    pub method: String,
    pub args: Vec<Value>,
    pub receiver: Value,
}

/// Fallback resolver shared by every type of one runtime.
///
/// A runtime creates exactly one interceptor when it is built and never replaces it.
#[derive(Default)]
pub struct Interceptor {
    misses: AtomicU64,
    resolutions: AtomicU64,
}

impl Interceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_miss(
        &self,
        ctx: &mut EvalContext,
        call: PendingCall,
    ) -> Result<Value, RuntimeError> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        if is_reserved_meta_name(&call.method) {
            trace!(class = %call.type_name, method = %call.method, "Ignoring reserved method");
            return Ok(Value::Nil);
        }

        self.resolutions.fetch_add(1, Ordering::Relaxed);
        debug!(class = %call.type_name, method = %call.method, "Dispatch miss, resolving");
        resolver::resolve(ctx, call)
    }

    /// Dispatch misses seen, reserved names included.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Misses handed to the resolver.
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }
}

/// Names of the all-uppercase shape (`DESTROY`, `AUTOLOAD`, `TO_JSON`) are reserved for
/// the object protocol and never trigger a load.
pub fn is_reserved_meta_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
