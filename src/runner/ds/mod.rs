//! Data structures of the host object model: type names, values, classes, frames, errors.

pub mod class;
pub mod error;
pub mod frame;
pub mod type_name;
pub mod value;
