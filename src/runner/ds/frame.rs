//! Call frames recorded while code runs, used to render diagnostic stacks.

use std::fmt;
use std::fmt::{Display, Formatter};
use std::panic::Location;
use std::sync::Arc;

use crate::runner::ds::type_name::TypeName;

/// A file and line, rendered Perl-style as `file line N` in error suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePos {
    pub file: Arc<str>,
    pub line: u32,
}

impl SourcePos {
    pub fn new(file: impl Into<Arc<str>>, line: u32) -> Self {
        SourcePos {
            file: file.into(),
            line,
        }
    }

    pub fn from_location(location: &Location<'_>) -> Self {
        SourcePos::new(location.file(), location.line())
    }
}

impl Display for SourcePos {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} line {}", self.file, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routine {
    /// Top-level code: a script, a unit body running at load time, or a host call.
    Eval,
    Method { class: TypeName, method: String },
}

impl Display for Routine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Routine::Eval => write!(f, "(eval)"),
            Routine::Method { class, method } => write!(f, "{}::{}()", class, method),
        }
    }
}

/// One activation on the call chain. `pos` tracks the line currently executing in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub routine: Routine,
    pub pos: SourcePos,
    /// Frames whose position is reported by Rust call sites rather than by the evaluator.
    pub native: bool,
}

impl Frame {
    pub fn eval(pos: SourcePos, native: bool) -> Self {
        Frame {
            routine: Routine::Eval,
            pos,
            native,
        }
    }

    pub fn method(class: TypeName, method: &str, pos: SourcePos, native: bool) -> Self {
        Frame {
            routine: Routine::Method {
                class,
                method: method.to_string(),
            },
            pos,
            native,
        }
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}:{}]", self.routine, self.pos.file, self.pos.line)
    }
}
