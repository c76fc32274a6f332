//! Units loaded from files on a search path.
//!
//! `Shop::Cart` is looked up as `<dir>/Shop/Cart.unit` in each search directory in order.
//! The first existing file wins. A file whose declared classes do not match the unit
//! name is loaded as written; what the requested type then resolves to is undefined.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::parser::UnitParser;
use crate::runner::api::EvalContext;
use crate::runner::ds::error::LoadError;
use crate::runner::ds::type_name::{TypeName, DEFAULT_UNIT_EXTENSION};
use crate::runner::eval;
use crate::runner::loader::registry::UnitSource;
use crate::runner::loader::ModuleLoader;

pub struct SourceLoader {
    search_path: Vec<PathBuf>,
    extension: String,
}

impl SourceLoader {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        SourceLoader {
            search_path,
            extension: DEFAULT_UNIT_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// First file on the search path that would define `unit`.
    pub fn locate(&self, unit: &TypeName) -> Option<PathBuf> {
        let relative = unit.unit_path(&self.extension);
        self.search_path
            .iter()
            .map(|dir| dir.join(&relative))
            .find(|candidate| candidate.is_file())
    }
}

impl ModuleLoader for SourceLoader {
    fn provides(&self, unit: &TypeName) -> bool {
        self.locate(unit).is_some()
    }

    fn load(&self, unit: &TypeName, ctx: &mut EvalContext) -> Result<UnitSource, LoadError> {
        let path = self.locate(unit).ok_or_else(|| LoadError::NotFound {
            path: unit.unit_display_path(&self.extension),
            searched: self.search_entries().join(" "),
            location: ctx.current_pos(),
        })?;
        let shown = path.display().to_string();
        debug!(unit = %unit, path = %shown, "Reading unit file");

        let source = fs::read_to_string(&path).map_err(|e| LoadError::Io {
            path: shown.clone(),
            source: e,
        })?;
        let ast = UnitParser::parse_to_ast(&source).map_err(|e| LoadError::Syntax {
            path: shown.clone(),
            message: e.message,
            line: e.line,
        })?;

        let file: Arc<str> = Arc::from(shown.as_str());
        eval::load_unit(ctx, unit, &ast, file)?;
        Ok(UnitSource::File(path))
    }

    fn search_entries(&self) -> Vec<String> {
        self.search_path
            .iter()
            .map(|p| p.display().to_string())
            .collect()
    }

    fn name(&self) -> &str {
        "source"
    }
}
