//! Values as the machine sees them
//!
//! Immediates are held inline; everything else is a handle into the
//! heap. Type checks and downcasts go through the heap so that a
//! stale handle is reported rather than reinterpreted.

use std::fmt::{self, Display, Formatter};

use super::{
    error::ExecutionError,
    memory::{
        heap::Heap,
        object::{ObjRef, ObjType, Object},
        string::{ObjString, StrRef},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    Obj(ObjRef),
}

impl Value {
    /// Name of the value's kind for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Obj(_) => "object",
        }
    }

    pub fn is_obj(&self) -> bool {
        matches!(self, Value::Obj(_))
    }

    pub fn as_obj(&self) -> Option<ObjRef> {
        match self {
            Value::Obj(obj) => Some(*obj),
            _ => None,
        }
    }

    /// Whether this is a live heap object tagged `tag`
    pub fn is_of_type(&self, heap: &Heap, tag: ObjType) -> bool {
        self.as_obj()
            .and_then(|obj| heap.get(obj))
            .map_or(false, |o| o.obj_type() == tag)
    }

    pub fn is_string(&self, heap: &Heap) -> bool {
        self.is_of_type(heap, ObjType::String)
    }

    /// Checked downcast to a specific object kind
    pub fn as_a<'heap, T: Object>(&self, heap: &'heap Heap) -> Result<&'heap T, ExecutionError> {
        match self {
            Value::Obj(obj) => heap.as_a(*obj),
            other => Err(ExecutionError::NotAnObject(T::TAG, other.kind())),
        }
    }

    pub fn as_string<'heap>(&self, heap: &'heap Heap) -> Result<&'heap ObjString, ExecutionError> {
        self.as_a(heap)
    }

    /// Checked conversion to a typed string handle
    pub fn as_str_ref(&self, heap: &Heap) -> Result<StrRef, ExecutionError> {
        match self {
            Value::Obj(obj) => {
                heap.as_a::<ObjString>(*obj)?;
                Ok(StrRef::new(*obj))
            }
            other => Err(ExecutionError::NotAnObject(ObjType::String, other.kind())),
        }
    }

    /// Render with the heap resolving object references
    pub fn display<'a>(&'a self, heap: &'a Heap) -> ValueDisplay<'a> {
        ValueDisplay { value: self, heap }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<ObjRef> for Value {
    fn from(obj: ObjRef) -> Self {
        Value::Obj(obj)
    }
}

impl From<StrRef> for Value {
    fn from(s: StrRef) -> Self {
        Value::Obj(s.as_obj())
    }
}

/// A value paired with the heap that can resolve it
pub struct ValueDisplay<'a> {
    value: &'a Value,
    heap: &'a Heap,
}

impl Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.value {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Obj(obj) => match self.heap.get(*obj) {
                Some(o) => write!(f, "{}", o),
                None => write!(f, "<freed {}>", obj),
            },
        }
    }
}
