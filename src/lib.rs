//! # classloader - On-demand class resolution for a dynamic runtime
//!
//! Classes are not loaded up front. The first time code calls a method on a type the
//! runtime has never seen, the call misses the class table and lands in a single
//! process-wide fallback, the **interceptor**, which:
//! - loads the unit that defines the type through the host module loaders
//! - checks that the method now exists
//! - forwards the original call with its original arguments
//!
//! Failures surface as structured diagnostics (`CLASSLOADER-00001` when the unit
//! cannot be loaded, `CLASSLOADER-00002` when the method is still missing) carrying the
//! call stack at the point of failure.
//!
//! ## Quick Start
//!
//! ### Running a Script
//!
//! ```
//! use classloader::runner::api::{CapturedOutput, Runtime};
//!
//! let runtime = Runtime::builder().build();
//! let out = CapturedOutput::new();
//! let mut ctx = runtime.context().with_output(Box::new(out.clone()));
//!
//! let script = r#"
//! class Greeter {
//!     method new(name) { return new { name: name }; }
//!     method hello() { return "hello " ~ self.name; }
//! }
//! print Greeter->new("world")->hello;
//! "#;
//! ctx.run_script(script, "main.script").unwrap();
//! assert_eq!(out.contents(), "hello world\n");
//! ```
//!
//! ### Loading Units Lazily
//!
//! A unit named `Shop::Cart` lives in `Shop/Cart.unit` under one of the search
//! directories. Nothing on the search path is read until a call needs it.
//!
//! ```
//! use std::fs;
//! use classloader::runner::api::Runtime;
//! use classloader::runner::ds::value::Value;
//!
//! let dir = tempfile::tempdir().unwrap();
//! fs::write(
//!     dir.path().join("Present.unit"),
//!     "class Present { method new() { return new { }; } method name() { return \"present\"; } }\n",
//! )
//! .unwrap();
//!
//! let runtime = Runtime::builder().search_dir(dir.path()).build();
//! let mut ctx = runtime.context();
//! let present = ctx.call_class("Present", "new", vec![]).unwrap();
//! assert_eq!(ctx.call(present, "name", vec![]).unwrap(), Value::from("present"));
//! ```
//!
//! ## How Resolution Works
//!
//! 1. **Normal dispatch**: the class table is always consulted first. Loaded classes
//!    never go near the interceptor again.
//!
//! 2. **Reserved names**: all-uppercase names such as `DESTROY` are part of the object
//!    protocol. A miss on one is a silent no-op returning nil and never loads anything.
//!
//! 3. **Load, probe, forward**: the resolver requires the type's unit under a per-type
//!    lock, asks the class table whether the method exists, and re-issues the call.
//!
//! 4. **Process-wide install**: [`install`] registers one runtime for the process. It
//!    happens once at startup; a second attempt is refused.
//!
//! ## Architecture
//!
//! - **[`parser`]** - PEG grammar and syntax tree for units and scripts
//! - **[`runner`]** - The runtime
//!   - **[`runner::api`]** - Runtime, call contexts, process-wide install
//!   - **[`runner::intercept`]** - Dispatch-miss interceptor, resolver and diagnostics
//!   - **[`runner::loader`]** - Module loaders and the class table
//!   - **[`runner::ds`]** - Values, classes, frames and errors
//!   - **[`runner::eval`]** - Tree-walking evaluator for unit code
//!   - **[`runner::config`]** - TOML configuration
//! - **[`logging`]** - `tracing` subscriber setup

#[macro_use]
extern crate lazy_static;

pub mod logging;
pub mod parser;
pub mod runner;

pub use runner::api::{global, install, EvalContext, InstallError, Runtime, RuntimeStats};
pub use runner::ds::error::{LoadError, RuntimeError};
pub use runner::intercept::{Diagnostic, ErrorCode};
