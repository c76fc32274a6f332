use crate::runner::ds::frame::SourcePos;
use crate::runner::ds::type_name::{TypeName, TypeNameError};
use crate::runner::intercept::diagnostic::Diagnostic;

/// Perl-style trailing location, `" at <file> line <n>."`, or nothing.
pub(crate) fn at_suffix(location: &Option<SourcePos>) -> String {
    match location {
        Some(pos) => format!(" at {}.", pos),
        None => String::new(),
    }
}

/// Errors raised while running code on the host runtime.
///
/// Only [`RuntimeError::ClassLoader`] is produced by the lazy resolution path; the other
/// variants belong to the evaluator and pass through dispatch untouched.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("{0}")]
    ClassLoader(Box<Diagnostic>),

    #[error("{message}{}", at_suffix(.location))]
    Died {
        message: String,
        location: Option<SourcePos>,
    },

    #[error("{message}{}", at_suffix(.location))]
    TypeError {
        message: String,
        location: Option<SourcePos>,
    },

    #[error("Undefined name \"{name}\"{}", at_suffix(.location))]
    UndefinedName {
        name: String,
        location: Option<SourcePos>,
    },

    #[error("Can't call method \"{method}\" on {kind} value{}", at_suffix(.location))]
    NotAnInvocant {
        method: String,
        kind: &'static str,
        location: Option<SourcePos>,
    },

    #[error("Deep recursion: more than {limit} nested calls{}", at_suffix(.location))]
    DeepRecursion {
        limit: usize,
        location: Option<SourcePos>,
    },

    #[error("Can't write output: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    TypeName(#[from] TypeNameError),
}

impl RuntimeError {
    pub fn died(message: impl Into<String>, location: Option<SourcePos>) -> Self {
        RuntimeError::Died {
            message: message.into(),
            location,
        }
    }

    pub fn type_error(message: impl Into<String>, location: Option<SourcePos>) -> Self {
        RuntimeError::TypeError {
            message: message.into(),
            location,
        }
    }

    /// The classloader diagnostic carried by this error, if it is one.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            RuntimeError::ClassLoader(d) => Some(d),
            _ => None,
        }
    }
}

impl From<Diagnostic> for RuntimeError {
    fn from(d: Diagnostic) -> Self {
        RuntimeError::ClassLoader(Box::new(d))
    }
}

/// Why a unit could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(
        "Can't locate {path} in search path (search path contains: {searched}){}",
        at_suffix(.location)
    )]
    NotFound {
        path: String,
        searched: String,
        location: Option<SourcePos>,
    },

    #[error("Can't read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error: {message} at {path} line {line}.")]
    Syntax {
        path: String,
        message: String,
        line: u32,
    },

    #[error("Can't load base {base} of {unit}: {source}")]
    Dependency {
        unit: TypeName,
        base: TypeName,
        #[source]
        source: Box<LoadError>,
    },

    /// The unit's own load-time code raised an error.
    #[error("{source}")]
    Init {
        unit: TypeName,
        #[source]
        source: Box<RuntimeError>,
    },

    #[error("{message}")]
    Native { message: String },
}

impl LoadError {
    pub fn native(message: impl Into<String>) -> Self {
        LoadError::Native {
            message: message.into(),
        }
    }
}
