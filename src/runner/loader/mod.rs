//! The host module system: loaders, the loaded-units registry and load locks.
//!
//! ## Loading Flow
//!
//! When a unit is required (by the resolver after a dispatch miss, by an `extends`
//! clause, or by an explicit `require` statement):
//!
//! 1. **Check the registry**: an already-loaded unit is a no-op
//! 2. **Take the unit's load lock**: concurrent first loads of one unit wait here
//! 3. **Query loaders**: ask each [`ModuleLoader`] in registration order
//! 4. **Load**: the first loader that provides the unit defines its classes and runs
//!    its load-time code
//! 5. **Record or roll back**: success marks the unit loaded, failure forgets any class
//!    the unit managed to define
//!
//! ## Example: Native Units
//!
//! ```
//! use classloader::runner::api::Runtime;
//! use classloader::runner::ds::class::ClassDef;
//! use classloader::runner::ds::type_name::TypeName;
//! use classloader::runner::ds::value::Value;
//! use classloader::runner::loader::native::NativeUnits;
//!
//! let greeter = TypeName::parse("Greeter").unwrap();
//! let units = NativeUnits::new().class(greeter.clone(), move || {
//!     ClassDef::new(greeter.clone())
//!         .add_method("hello", |_ctx, _this, _args| Ok(Value::from("hello")))
//! });
//! let runtime = Runtime::builder().loader(Box::new(units)).build();
//! let mut ctx = runtime.context();
//!
//! // Nothing is loaded until the first call.
//! let greeting = ctx.call_class("Greeter", "hello", vec![]).unwrap();
//! assert_eq!(greeting, Value::from("hello"));
//! ```

use crate::runner::api::EvalContext;
use crate::runner::ds::error::LoadError;
use crate::runner::ds::type_name::TypeName;

pub mod guard;
pub mod native;
pub mod registry;
pub mod source;

pub use guard::LoadGuards;
pub use native::NativeUnits;
pub use registry::{ClassTable, LoadedUnit, ResolvedMethod, UnitSource};
pub use source::SourceLoader;

/// Something that can turn a unit name into defined classes.
///
/// Loaders are queried in registration order; the first one whose `provides` returns
/// `true` is asked to load the unit.
pub trait ModuleLoader: Send + Sync {
    /// Can this loader load `unit`?
    ///
    /// This should be a cheap check (a map lookup or a file existence test).
    fn provides(&self, unit: &TypeName) -> bool;

    /// Load `unit`: define its classes through `ctx` and run any load-time code.
    ///
    /// Called only after `provides` returned `true`, and at most once per unit unless a
    /// previous attempt failed.
    fn load(&self, unit: &TypeName, ctx: &mut EvalContext) -> Result<UnitSource, LoadError>;

    /// Entries shown in "search path contains" messages.
    fn search_entries(&self) -> Vec<String>;

    /// Human-readable name for this loader (for logging).
    fn name(&self) -> &str;
}
