//! Host-owned record of loaded units and the classes they define.
//!
//! This is the runtime's normal dispatch table. Once a unit has been loaded its classes
//! live here and every later call on them resolves through [`ClassTable::find_method`]
//! without going near the interceptor.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::runner::ds::class::{ClassDef, Method};
use crate::runner::ds::type_name::TypeName;

/// Where a loaded unit came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitSource {
    /// Compiled into the host and registered with [`NativeUnits`](super::native::NativeUnits).
    Native,
    /// A unit file found on the search path.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedUnit {
    pub name: TypeName,
    pub loader: String,
    pub source: UnitSource,
}

/// A method found for a class, together with the class that actually defines it.
#[derive(Clone)]
pub struct ResolvedMethod {
    pub owner: TypeName,
    pub method: Arc<Method>,
}

pub struct ClassTable {
    classes: RwLock<HashMap<TypeName, Arc<ClassDef>>>,

    /// Classes defined by units still loading, keyed by unit. Only the call chain doing
    /// the load sees them; they move into `classes` when the unit finishes loading.
    staged: RwLock<HashMap<TypeName, HashMap<TypeName, Arc<ClassDef>>>>,

    /// Loaded units in load order.
    units: RwLock<Vec<LoadedUnit>>,

    /// Resolution cache (class, method) -> method over published classes only. Cleared
    /// under the `classes` write lock whenever a published class changes.
    method_cache: RwLock<HashMap<(TypeName, String), ResolvedMethod>>,
}

impl ClassTable {
    pub fn new() -> Self {
        ClassTable {
            classes: RwLock::new(HashMap::new()),
            staged: RwLock::new(HashMap::new()),
            units: RwLock::new(Vec::new()),
            method_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Define (or redefine) a class.
    ///
    /// `unit` is the unit being loaded at the time, if any. Such a class stays staged
    /// until [`ClassTable::mark_loaded`] publishes the unit or
    /// [`ClassTable::forget_unit`] drops it.
    pub fn define(&self, class: ClassDef, unit: Option<&TypeName>) {
        let name = class.name().clone();
        match unit {
            Some(unit) => {
                self.staged
                    .write()
                    .entry(unit.clone())
                    .or_default()
                    .insert(name, Arc::new(class));
            }
            None => {
                let mut classes = self.classes.write();
                classes.insert(name, Arc::new(class));
                self.method_cache.write().clear();
            }
        }
    }

    /// Drop every class defined while `unit` was loading.
    pub fn forget_unit(&self, unit: &TypeName) {
        self.staged.write().remove(unit);
    }

    pub fn class(&self, name: &TypeName) -> Option<Arc<ClassDef>> {
        self.classes.read().get(name).cloned()
    }

    /// Whether `name` is published. Classes of a unit still loading do not count.
    pub fn has_class(&self, name: &TypeName) -> bool {
        self.classes.read().contains_key(name)
    }

    /// Find `method` on `class` or its ancestors, depth-first in declaration order,
    /// among published classes.
    pub fn find_method(&self, class: &TypeName, method: &str) -> Option<ResolvedMethod> {
        let key = (class.clone(), method.to_string());
        if let Some(hit) = self.method_cache.read().get(&key) {
            return Some(hit.clone());
        }

        // The read guard stays held across the insert so a concurrent define or publish
        // cannot clear the cache between the lookup and the insert.
        let classes = self.classes.read();
        let view = View {
            classes: &*classes,
            staged: vec![],
        };
        let resolved = lookup(&view, class, method, &mut HashSet::new())?;
        self.method_cache.write().insert(key, resolved.clone());
        Some(resolved)
    }

    /// Like [`ClassTable::find_method`], but also sees the classes staged by `loading`,
    /// the units the calling chain is in the middle of loading (outermost first).
    pub fn find_method_in(
        &self,
        class: &TypeName,
        method: &str,
        loading: &[TypeName],
    ) -> Option<ResolvedMethod> {
        let staged = self.staged.read();
        let visible: Vec<_> = loading.iter().filter_map(|u| staged.get(u)).collect();
        if visible.is_empty() {
            drop(staged);
            return self.find_method(class, method);
        }
        let classes = self.classes.read();
        let view = View {
            classes: &*classes,
            staged: visible,
        };
        lookup(&view, class, method, &mut HashSet::new())
    }

    /// Capability probe: does `class` currently support `method`?
    pub fn can(&self, class: &TypeName, method: &str) -> bool {
        self.find_method(class, method).is_some()
    }

    /// Linearised ancestry of `class`, itself first.
    pub fn ancestors(&self, class: &TypeName) -> Vec<TypeName> {
        let classes = self.classes.read();
        let mut order = vec![];
        let mut stack = vec![class.clone()];
        let mut seen = HashSet::new();
        while let Some(next) = stack.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(def) = classes.get(&next) {
                stack.extend(def.parents().iter().rev().cloned());
            }
            order.push(next);
        }
        order
    }

    pub fn is_loaded(&self, unit: &TypeName) -> bool {
        self.units.read().iter().any(|u| &u.name == unit)
    }

    /// Record `unit` as loaded and publish the classes it defined.
    pub fn mark_loaded(&self, unit: LoadedUnit) {
        if let Some(defined) = self.staged.write().remove(&unit.name) {
            let mut classes = self.classes.write();
            classes.extend(defined);
            self.method_cache.write().clear();
        }
        let mut units = self.units.write();
        if !units.iter().any(|u| u.name == unit.name) {
            units.push(unit);
        }
    }

    pub fn loaded_units(&self) -> Vec<LoadedUnit> {
        self.units.read().clone()
    }
}

/// Published classes overlaid with the staged classes of the loads in progress.
struct View<'a> {
    classes: &'a HashMap<TypeName, Arc<ClassDef>>,
    staged: Vec<&'a HashMap<TypeName, Arc<ClassDef>>>,
}

impl View<'_> {
    fn get(&self, name: &TypeName) -> Option<&Arc<ClassDef>> {
        self.staged
            .iter()
            .rev()
            .find_map(|s| s.get(name))
            .or_else(|| self.classes.get(name))
    }
}

fn lookup(
    view: &View<'_>,
    class: &TypeName,
    method: &str,
    seen: &mut HashSet<TypeName>,
) -> Option<ResolvedMethod> {
    if !seen.insert(class.clone()) {
        return None;
    }
    let def = view.get(class)?;
    if let Some(m) = def.own_method(method) {
        return Some(ResolvedMethod {
            owner: class.clone(),
            method: Arc::clone(m),
        });
    }
    def.parents()
        .iter()
        .find_map(|parent| lookup(view, parent, method, seen))
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}
