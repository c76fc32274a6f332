//! Units compiled into the host.
//!
//! A native unit is a closure run at load time. Registering one does not load it; the
//! closure runs the first time something requires the unit, exactly like a unit file
//! found on the search path.

use std::collections::HashMap;

use crate::runner::api::EvalContext;
use crate::runner::ds::class::ClassDef;
use crate::runner::ds::error::LoadError;
use crate::runner::ds::type_name::TypeName;
use crate::runner::loader::registry::UnitSource;
use crate::runner::loader::ModuleLoader;

pub type UnitInit = dyn Fn(&mut EvalContext) -> Result<(), LoadError> + Send + Sync;

pub struct NativeUnits {
    units: HashMap<TypeName, Box<UnitInit>>,
}

impl NativeUnits {
    pub fn new() -> Self {
        NativeUnits {
            units: HashMap::new(),
        }
    }

    /// Register a unit whose load-time code is `init`.
    pub fn unit<F>(mut self, name: TypeName, init: F) -> Self
    where
        F: Fn(&mut EvalContext) -> Result<(), LoadError> + Send + Sync + 'static,
    {
        self.units.insert(name, Box::new(init));
        self
    }

    /// Register a unit that defines a single class built by `build`, requiring the
    /// class's parents first.
    pub fn class<F>(self, name: TypeName, build: F) -> Self
    where
        F: Fn() -> ClassDef + Send + Sync + 'static,
    {
        self.unit(name, move |ctx| {
            let class = build();
            for parent in class.parents().to_vec() {
                ctx.require_base(class.name(), &parent)?;
            }
            ctx.define_class(class);
            Ok(())
        })
    }

    pub fn unit_names(&self) -> Vec<&TypeName> {
        self.units.keys().collect()
    }
}

impl Default for NativeUnits {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for NativeUnits {
    fn provides(&self, unit: &TypeName) -> bool {
        self.units.contains_key(unit)
    }

    fn load(&self, unit: &TypeName, ctx: &mut EvalContext) -> Result<UnitSource, LoadError> {
        let init = self
            .units
            .get(unit)
            .ok_or_else(|| LoadError::native(format!("no native unit {}", unit)))?;
        init(ctx)?;
        Ok(UnitSource::Native)
    }

    fn search_entries(&self) -> Vec<String> {
        vec!["(native)".to_string()]
    }

    fn name(&self) -> &str {
        "native"
    }
}
