//! Heap object model
//!
//! Every heap object is an [`Obj`]: a header plus a [`HeapObject`]
//! body. Object kinds form a closed sum type so that each dispatch
//! (free, print, downcast) is an exhaustive match; adding a kind is a
//! compile error until every dispatch site handles it.

use std::fmt::{self, Display, Formatter};
use std::mem::size_of;

use super::{header::ObjHeader, string::ObjString};

/// Type tag of a heap object
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjType {
    String,
}

impl Display for ObjType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ObjType::String => write!(f, "string"),
        }
    }
}

/// Handle to an object in a [`Heap`][super::heap::Heap]
///
/// The generation distinguishes successive occupants of the same
/// slot, so a handle to a freed object never resolves to whatever is
/// allocated there later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    index: u32,
    generation: u32,
}

impl ObjRef {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        ObjRef { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn raw_index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl Display for ObjRef {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "obj#{}.{}", self.index, self.generation)
    }
}

/// Body of a heap object
#[derive(Debug, PartialEq)]
pub enum HeapObject {
    String(ObjString),
}

impl HeapObject {
    pub fn obj_type(&self) -> ObjType {
        match self {
            HeapObject::String(_) => ObjType::String,
        }
    }

    /// Bytes owned outside the object record itself
    pub fn payload_bytes(&self) -> usize {
        match self {
            HeapObject::String(s) => s.len(),
        }
    }

    /// Bytes charged to the heap for this object
    pub fn alloc_size(&self) -> usize {
        size_of::<Obj>() + self.payload_bytes()
    }

    pub fn as_a<T: Object>(&self) -> Option<&T> {
        T::downcast(self)
    }
}

impl Display for HeapObject {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            HeapObject::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<ObjString> for HeapObject {
    fn from(s: ObjString) -> Self {
        HeapObject::String(s)
    }
}

/// A header and body as held by the heap
#[derive(Debug)]
pub struct Obj {
    pub(crate) header: ObjHeader,
    pub(crate) body: HeapObject,
}

impl Obj {
    pub fn obj_type(&self) -> ObjType {
        self.body.obj_type()
    }

    pub fn header(&self) -> &ObjHeader {
        &self.header
    }

    pub fn body(&self) -> &HeapObject {
        &self.body
    }

    pub fn as_a<T: Object>(&self) -> Option<&T> {
        self.body.as_a()
    }
}

impl Display for Obj {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&self.body, f)
    }
}

/// A specific kind of heap object
pub trait Object: Sized {
    const TAG: ObjType;

    /// Checked downcast from the generic body
    fn downcast(object: &HeapObject) -> Option<&Self>;
}

impl Object for ObjString {
    const TAG: ObjType = ObjType::String;

    fn downcast(object: &HeapObject) -> Option<&Self> {
        match object {
            HeapObject::String(s) => Some(s),
        }
    }
}
