use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use uuid::Uuid;

use crate::runner::ds::type_name::TypeName;

pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    /// A class used as an invocant, as in `Present->new`.
    Class(TypeName),
    Object(Arc<Instance>),
}

impl Value {
    /// The class this value dispatches through, if it can be an invocant.
    pub fn type_of(&self) -> Option<&TypeName> {
        match self {
            Value::Class(t) => Some(t),
            Value::Object(o) => Some(&o.class),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Class(_) | Value::Object(_) => true,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Class(_) => "class",
            Value::Object(_) => "object",
        }
    }

    pub fn as_object(&self) -> Option<&Arc<Instance>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Nil => Value::Nil,
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(i) => Value::Int(*i),
            Value::Str(s) => Value::Str(s.to_string()),
            Value::List(l) => Value::List(l.clone()),
            Value::Class(t) => Value::Class(t.clone()),
            Value::Object(o) => Value::Object(Arc::clone(o)),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, ""),
            Value::Bool(b) => write!(f, "{}", if *b { 1 } else { 0 }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(l) => {
                let items: Vec<String> = l.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Class(t) => write!(f, "{}", t),
            Value::Object(o) => write!(f, "{}=OBJECT({})", o.class, o.id),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Value::Nil"),
            Value::Bool(b) => write!(f, "Value::Bool({})", b),
            Value::Int(i) => write!(f, "Value::Int({})", i),
            Value::Str(s) => write!(f, "Value::Str({:?})", s),
            Value::List(l) => write!(f, "Value::List({:?})", l),
            Value::Class(t) => write!(f, "Value::Class({})", t),
            Value::Object(o) => write!(f, "Value::Object({}, {})", o.class, o.id),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<TypeName> for Value {
    fn from(t: TypeName) -> Self {
        Value::Class(t)
    }
}

/// An object: a class tag plus fields fixed at construction.
pub struct Instance {
    id: Uuid,
    class: TypeName,
    fields: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new(class: TypeName, fields: BTreeMap<String, Value>) -> Self {
        Instance {
            id: Uuid::new_v4(),
            class,
            fields,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn class(&self) -> &TypeName {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}
