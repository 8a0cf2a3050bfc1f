//! Immutable heap string storage

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

use super::{hash::hash_bytes, object::ObjRef};

/// String data owned by the heap
///
/// The buffer is fixed at construction and never mutated, so the
/// cached hash and the length (the buffer length) always agree with
/// the content.
#[derive(Debug)]
pub struct ObjString {
    hash: u32,
    chars: Box<[u8]>,
}

impl ObjString {
    /// Adopt `chars` as the string's storage, hashing it
    pub fn from_buffer(chars: Box<[u8]>) -> Self {
        let hash = hash_bytes(&chars);
        ObjString { hash, chars }
    }

    /// Adopt `chars` with a hash the caller has already computed
    pub(crate) fn with_hash(chars: Box<[u8]>, hash: u32) -> Self {
        debug_assert_eq!(hash, hash_bytes(&chars));
        ObjString { hash, chars }
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.chars
    }

    /// The content as a `str` if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.chars).ok()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.chars)
    }

    /// Whether this string holds exactly `bytes` (hash checked first)
    pub fn content_eq(&self, hash: u32, bytes: &[u8]) -> bool {
        self.hash == hash && *self.chars == *bytes
    }
}

impl PartialEq for ObjString {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other.hash, &other.chars)
    }
}

impl Eq for ObjString {}

impl Display for ObjString {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

/// Handle to an object that was allocated as a string
///
/// Only the string table hands these out. The tag check is implied;
/// liveness is still checked on every access.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrRef(ObjRef);

impl StrRef {
    pub(crate) fn new(obj: ObjRef) -> Self {
        StrRef(obj)
    }

    pub fn as_obj(self) -> ObjRef {
        self.0
    }
}

impl From<StrRef> for ObjRef {
    fn from(s: StrRef) -> Self {
        s.0
    }
}

impl Display for StrRef {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
