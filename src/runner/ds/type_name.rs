//! Hierarchical type names and their unit paths.
//!
//! A type name such as `Shop::Cart` maps to the unit `Shop/Cart.unit`. The mapping is
//! purely syntactic: no lookup table sits between the name and the path.

use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

pub const SEPARATOR: &str = "::";
pub const DEFAULT_UNIT_EXTENSION: &str = "unit";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypeNameError {
    #[error("type name is empty")]
    Empty,

    #[error("invalid segment {segment:?} in type name {name:?}")]
    InvalidSegment { name: String, segment: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName {
    name: String,
}

impl TypeName {
    pub fn parse(name: &str) -> Result<Self, TypeNameError> {
        if name.is_empty() {
            return Err(TypeNameError::Empty);
        }
        for segment in name.split(SEPARATOR) {
            if !is_identifier(segment) {
                return Err(TypeNameError::InvalidSegment {
                    name: name.to_string(),
                    segment: segment.to_string(),
                });
            }
        }
        Ok(TypeName {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.name.split(SEPARATOR)
    }

    /// Relative path of the unit expected to define this type, e.g. `A::B` -> `A/B.unit`.
    pub fn unit_path(&self, extension: &str) -> PathBuf {
        let mut path: PathBuf = self.segments().collect();
        path.set_extension(extension);
        path
    }

    /// Same as [`TypeName::unit_path`] but always `/`-separated, for messages.
    pub fn unit_display_path(&self, extension: &str) -> String {
        format!("{}.{}", self.segments().collect::<Vec<_>>().join("/"), extension)
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for TypeName {
    type Err = TypeNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeName::parse(s)
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
