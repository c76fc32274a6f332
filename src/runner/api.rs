//! Runtime entry points: building a runtime, installing it process-wide, and calling
//! methods through it.

use std::io::{self, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::parser::UnitParser;
use crate::runner::config::RuntimeConfig;
use crate::runner::ds::class::ClassDef;
use crate::runner::ds::error::{LoadError, RuntimeError};
use crate::runner::ds::frame::{Frame, SourcePos};
use crate::runner::ds::type_name::TypeName;
use crate::runner::ds::value::Value;
use crate::runner::eval;
use crate::runner::intercept::{Diagnostic, Interceptor, PendingCall};
use crate::runner::loader::{
    ClassTable, LoadGuards, LoadedUnit, ModuleLoader, ResolvedMethod, SourceLoader,
};

static GLOBAL_RUNTIME: OnceLock<Arc<Runtime>> = OnceLock::new();

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InstallError {
    #[error("a runtime is already installed for this process")]
    AlreadyInstalled,
}

/// Install `runtime` as the process-wide runtime.
///
/// This happens once, at startup, before any code runs through [`global`]. A second
/// install is refused and leaves the first runtime in place.
pub fn install(runtime: Arc<Runtime>) -> Result<Arc<Runtime>, InstallError> {
    GLOBAL_RUNTIME
        .set(Arc::clone(&runtime))
        .map_err(|_| InstallError::AlreadyInstalled)?;
    info!(loaders = runtime.loaders.len(), "Runtime installed");
    Ok(runtime)
}

/// The process-wide runtime, if one has been installed.
pub fn global() -> Option<&'static Arc<Runtime>> {
    GLOBAL_RUNTIME.get()
}

/// Counters for one runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Calls that went through dispatch.
    pub dispatches: u64,
    /// Dispatches that missed the class table and reached the interceptor.
    pub misses: u64,
    /// Misses handed to the resolver (reserved names excluded).
    pub resolutions: u64,
    /// Units loaded successfully.
    pub loads: u64,
    /// Unit load attempts that failed.
    pub load_failures: u64,
}

pub struct RuntimeBuilder {
    config: RuntimeConfig,
    loaders: Vec<Box<dyn ModuleLoader>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        RuntimeBuilder {
            config: RuntimeConfig::default(),
            loaders: Vec::new(),
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a loader. Loaders are queried in registration order, before the
    /// configured search path.
    pub fn loader(mut self, loader: Box<dyn ModuleLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    pub fn search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config = self.config.with_search_dir(dir);
        self
    }

    pub fn build(self) -> Arc<Runtime> {
        let mut loaders = self.loaders;
        let search_path = self.config.effective_search_path();
        if !search_path.is_empty() {
            loaders.push(Box::new(
                SourceLoader::new(search_path).with_extension(self.config.loader.extension.clone()),
            ));
        }
        Arc::new(Runtime {
            config: self.config,
            classes: ClassTable::new(),
            loaders,
            guards: LoadGuards::new(),
            interceptor: Interceptor::new(),
            dispatches: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the class table, the loaders and the interceptor. Shared by every
/// [`EvalContext`] created from it, across threads.
pub struct Runtime {
    config: RuntimeConfig,
    classes: ClassTable,
    loaders: Vec<Box<dyn ModuleLoader>>,
    guards: LoadGuards,
    interceptor: Interceptor,
    dispatches: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn from_config(config: RuntimeConfig) -> Arc<Runtime> {
        RuntimeBuilder::new().config(config).build()
    }

    /// A fresh call chain on this runtime.
    pub fn context(self: &Arc<Self>) -> EvalContext {
        EvalContext::new(Arc::clone(self))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn loaders(&self) -> &[Box<dyn ModuleLoader>] {
        &self.loaders
    }

    pub fn guards(&self) -> &LoadGuards {
        &self.guards
    }

    pub fn loaded_units(&self) -> Vec<LoadedUnit> {
        self.classes.loaded_units()
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            misses: self.interceptor.misses(),
            resolutions: self.interceptor.resolutions(),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
        }
    }

    fn search_entries(&self) -> String {
        self.loaders
            .iter()
            .flat_map(|l| l.search_entries())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// In-memory sink for `print` output, handy in tests.
#[derive(Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// State of one call chain: its frames, the units it is in the middle of loading and
/// where `print` goes.
///
/// Not shared between threads; each thread makes its own from the shared [`Runtime`].
pub struct EvalContext {
    runtime: Arc<Runtime>,
    frames: Vec<Frame>,
    loading: Vec<TypeName>,
    output: Box<dyn Write + Send>,
}

impl EvalContext {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        EvalContext {
            runtime,
            frames: Vec::new(),
            loading: Vec::new(),
            output: Box::new(io::stdout()),
        }
    }

    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = output;
        self
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    /// Call `method` on `receiver`.
    ///
    /// This is the trigger surface: if the receiver's class is not loaded yet, or does
    /// not know `method`, the interceptor loads it on the spot. The Rust call site is
    /// recorded as the calling frame.
    #[track_caller]
    pub fn call(
        &mut self,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let here = SourcePos::from_location(Location::caller());
        let pushed = match self.frames.last_mut() {
            None => {
                self.frames.push(Frame::eval(here, true));
                true
            }
            Some(top) => {
                if top.native {
                    top.pos = here;
                }
                false
            }
        };
        let result = self.dispatch(receiver, method, args);
        if pushed {
            self.frames.pop();
        }
        result
    }

    /// Class-level call by name, as in `Present->new(...)`.
    #[track_caller]
    pub fn call_class(
        &mut self,
        class: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let class = TypeName::parse(class)?;
        self.call(Value::Class(class), method, args)
    }

    /// Call made by evaluated code at `pos`.
    pub(crate) fn call_at(
        &mut self,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
        pos: SourcePos,
    ) -> Result<Value, RuntimeError> {
        self.set_pos(pos);
        self.dispatch(receiver, method, args)
    }

    fn dispatch(
        &mut self,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        self.runtime.dispatches.fetch_add(1, Ordering::Relaxed);
        let class = self.invocant_class(&receiver, method)?;
        if let Some(resolved) = self.find_method(&class, method) {
            return self.invoke(resolved, method, receiver, args);
        }

        let runtime = Arc::clone(&self.runtime);
        runtime.interceptor.on_miss(
            self,
            PendingCall {
                type_name: class,
                method: method.to_string(),
                args,
                receiver,
            },
        )
    }

    /// Re-issue a resolved call. Used by the resolver once the unit is loaded.
    pub(crate) fn forward(
        &mut self,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let class = self.invocant_class(&receiver, method)?;
        match self.find_method(&class, method) {
            Some(resolved) => self.invoke(resolved, method, receiver, args),
            None => Err(Diagnostic::method_missing(class, method, self.backtrace()).into()),
        }
    }

    fn find_method(&self, class: &TypeName, method: &str) -> Option<ResolvedMethod> {
        self.runtime
            .classes
            .find_method_in(class, method, &self.loading)
    }

    /// Capability probe as seen from this call chain: published classes plus the
    /// classes of units this chain is in the middle of loading.
    pub fn can(&self, class: &TypeName, method: &str) -> bool {
        self.find_method(class, method).is_some()
    }

    fn invocant_class(&self, receiver: &Value, method: &str) -> Result<TypeName, RuntimeError> {
        match receiver {
            Value::Class(t) => Ok(t.clone()),
            Value::Object(o) => Ok(o.class().clone()),
            Value::Str(s) => TypeName::parse(s).map_err(|_| RuntimeError::NotAnInvocant {
                method: method.to_string(),
                kind: receiver.kind(),
                location: self.current_pos(),
            }),
            other => Err(RuntimeError::NotAnInvocant {
                method: method.to_string(),
                kind: other.kind(),
                location: self.current_pos(),
            }),
        }
    }

    fn invoke(
        &mut self,
        resolved: ResolvedMethod,
        name: &str,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let limit = self.runtime.config.runtime.max_call_depth;
        if self.frames.len() >= limit {
            return Err(RuntimeError::DeepRecursion {
                limit,
                location: self.current_pos(),
            });
        }
        let method = resolved.method;
        let frame = match method.script() {
            Some(script) => Frame::method(
                resolved.owner,
                name,
                SourcePos::new(Arc::clone(&script.file), script.decl.line),
                false,
            ),
            None => Frame::method(resolved.owner, name, SourcePos::new("<native>", 0), true),
        };
        self.frames.push(frame);
        let result = method.call(self, this, args);
        self.frames.pop();
        result
    }

    /// The host's module-load primitive.
    ///
    /// Loads `unit` through the first loader that provides it. Loading an already
    /// loaded unit, or one this call chain is in the middle of loading, does nothing.
    pub fn require(&mut self, unit: &TypeName) -> Result<(), LoadError> {
        let runtime = Arc::clone(&self.runtime);
        if runtime.classes.is_loaded(unit) || self.loading.contains(unit) {
            return Ok(());
        }

        let lock = runtime.guards.lock_for(unit);
        let result = {
            let _held = lock.lock();
            self.require_locked(&runtime, unit)
        };
        runtime.guards.release(unit, lock);
        result
    }

    fn require_locked(&mut self, runtime: &Runtime, unit: &TypeName) -> Result<(), LoadError> {
        if runtime.classes.is_loaded(unit) {
            return Ok(());
        }

        let loader = match runtime.loaders.iter().find(|l| l.provides(unit)) {
            Some(loader) => loader,
            None => {
                runtime.load_failures.fetch_add(1, Ordering::Relaxed);
                return Err(LoadError::NotFound {
                    path: unit.unit_display_path(&runtime.config.loader.extension),
                    searched: runtime.search_entries(),
                    location: self.current_pos(),
                });
            }
        };

        debug!(unit = %unit, loader = loader.name(), "Loading unit");
        self.loading.push(unit.clone());
        let result = loader.load(unit, self);
        self.loading.pop();

        match result {
            Ok(source) => {
                runtime.loads.fetch_add(1, Ordering::Relaxed);
                info!(unit = %unit, loader = loader.name(), "Unit loaded");
                runtime.classes.mark_loaded(LoadedUnit {
                    name: unit.clone(),
                    loader: loader.name().to_string(),
                    source,
                });
                Ok(())
            }
            Err(e) => {
                runtime.load_failures.fetch_add(1, Ordering::Relaxed);
                warn!(unit = %unit, loader = loader.name(), error = %e, "Unit failed to load");
                runtime.classes.forget_unit(unit);
                Err(e)
            }
        }
    }

    /// Require `base` on behalf of `unit`, reporting failures as a dependency error.
    pub fn require_base(&mut self, unit: &TypeName, base: &TypeName) -> Result<(), LoadError> {
        self.require(base).map_err(|e| LoadError::Dependency {
            unit: unit.clone(),
            base: base.clone(),
            source: Box::new(e),
        })
    }

    /// Define a class. While a unit is loading, the class belongs to that unit and only
    /// this call chain sees it until the unit finishes loading.
    pub fn define_class(&mut self, class: ClassDef) {
        self.runtime.classes.define(class, self.loading.last());
    }

    /// Snapshot of the call chain, outermost first.
    pub fn backtrace(&self) -> Vec<Frame> {
        self.frames.clone()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Position of the innermost frame.
    pub fn current_pos(&self) -> Option<SourcePos> {
        self.frames.last().map(|f| f.pos.clone())
    }

    pub(crate) fn set_pos(&mut self, pos: SourcePos) {
        if let Some(top) = self.frames.last_mut() {
            top.pos = pos;
        }
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Parse and run `source` as a top-level script named `file`.
    pub fn run_script(&mut self, source: &str, file: &str) -> Result<Value, RuntimeError> {
        let ast = UnitParser::parse_to_ast(source).map_err(|e| {
            RuntimeError::Load(LoadError::Syntax {
                path: file.to_string(),
                message: e.message,
                line: e.line,
            })
        })?;
        eval::run_script(self, &ast, Arc::from(file))
    }

    pub fn run_file(&mut self, path: &Path) -> Result<Value, RuntimeError> {
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: display.clone(),
            source: e,
        })?;
        self.run_script(&source, &display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::loader::NativeUnits;

    fn t(name: &str) -> TypeName {
        TypeName::parse(name).unwrap()
    }

    fn native(units: NativeUnits) -> Arc<Runtime> {
        Runtime::builder()
            .config(RuntimeConfig::new().with_env_path(false))
            .loader(Box::new(units))
            .build()
    }

    #[test]
    fn test_circular_require_is_a_no_op() {
        let units = NativeUnits::new()
            .unit(t("Ping"), |ctx| {
                ctx.require(&t("Pong"))?;
                ctx.define_class(ClassDef::new(t("Ping")));
                Ok(())
            })
            .unit(t("Pong"), |ctx| {
                ctx.require(&t("Ping"))?;
                ctx.define_class(ClassDef::new(t("Pong")));
                Ok(())
            });
        let runtime = native(units);
        let mut ctx = runtime.context();

        ctx.require(&t("Ping")).unwrap();
        let names: Vec<String> = runtime
            .loaded_units()
            .iter()
            .map(|u| u.name.to_string())
            .collect();
        assert_eq!(names, vec!["Pong", "Ping"]);
    }

    #[test]
    fn test_failed_load_rolls_back_classes() {
        let units = NativeUnits::new().unit(t("Half"), |ctx| {
            ctx.define_class(ClassDef::new(t("Half")));
            ctx.define_class(ClassDef::new(t("Half::Helper")));
            Err(LoadError::native("gave up"))
        });
        let runtime = native(units);
        let mut ctx = runtime.context();

        assert!(ctx.require(&t("Half")).is_err());
        assert!(!runtime.classes().has_class(&t("Half")));
        assert!(!runtime.classes().has_class(&t("Half::Helper")));
        assert!(!runtime.classes().is_loaded(&t("Half")));
        assert_eq!(runtime.stats().load_failures, 1);
    }

    #[test]
    fn test_not_found_lists_search_entries() {
        let runtime = Runtime::builder()
            .config(RuntimeConfig::new().with_env_path(false))
            .search_dir("lib")
            .search_dir("vendor")
            .build();
        let mut ctx = runtime.context();
        let err = ctx.require(&t("A::B")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can't locate A/B.unit in search path (search path contains: lib vendor)"
        );
    }

    #[test]
    fn test_string_receiver_names_a_class() {
        let units = NativeUnits::new().class(t("Named"), || {
            ClassDef::new(t("Named")).add_method("me", |_ctx, this, _args| Ok(this))
        });
        let runtime = native(units);
        let mut ctx = runtime.context();
        let got = ctx.call(Value::from("Named"), "me", vec![]).unwrap();
        assert_eq!(got, Value::from("Named"));

        let err = ctx.call(Value::from("not a class"), "me", vec![]).unwrap_err();
        assert!(matches!(err, RuntimeError::NotAnInvocant { kind: "string", .. }));
    }

    #[test]
    fn test_captured_output_is_shared() {
        let runtime = native(NativeUnits::new());
        let out = CapturedOutput::new();
        let mut ctx = runtime.context().with_output(Box::new(out.clone()));
        writeln!(ctx.output(), "hello").unwrap();
        assert_eq!(out.contents(), "hello\n");
    }
}
