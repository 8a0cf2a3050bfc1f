//! String interning table
//!
//! Each distinct byte sequence is represented by at most one live
//! heap string. The table maps content (by FNV-1a hash, then by
//! bytes) to that canonical string but does not own it: the heap
//! does. Whoever frees strings must purge them here too, which
//! [`Runtime`][crate::eval::runtime::Runtime] does.

use std::collections::HashMap;

use super::{
    hash::hash_bytes,
    heap::{Heap, HeapError},
    object::{HeapObject, ObjRef, ObjType},
    string::{ObjString, StrRef},
};

/// Counters accumulated over the table's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternStats {
    /// Lookups answered by an existing string
    pub hits: u64,
    /// Lookups that allocated a new string
    pub misses: u64,
    /// Caller buffers dropped because the content was already interned
    pub transfers_released: u64,
    /// Entries removed because their string was freed
    pub purged: u64,
}

/// Content-addressed table of canonical strings
#[derive(Debug, Default)]
pub struct StringTable {
    /// Canonical strings bucketed by content hash
    entries: HashMap<u32, Vec<StrRef>>,
    count: usize,
    stats: InternStats,
}

impl StringTable {
    pub fn new() -> Self {
        StringTable::default()
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn stats(&self) -> InternStats {
        self.stats.clone()
    }

    /// Find the canonical string holding `bytes`
    pub fn find(&self, heap: &Heap, bytes: &[u8], hash: u32) -> Option<StrRef> {
        self.entries.get(&hash)?.iter().copied().find(|s| {
            heap.string(*s)
                .map_or(false, |obj| obj.content_eq(hash, bytes))
        })
    }

    /// Intern a copy of `bytes`
    ///
    /// Returns the existing canonical string if there is one, without
    /// allocating. Otherwise duplicates `bytes` into a new heap string.
    pub fn intern_by_copy(&mut self, heap: &mut Heap, bytes: &[u8]) -> Result<StrRef, HeapError> {
        let hash = hash_bytes(bytes);
        if let Some(interned) = self.find(heap, bytes, hash) {
            self.stats.hits += 1;
            return Ok(interned);
        }

        let mut chars = Vec::new();
        if chars.try_reserve_exact(bytes.len()).is_err() {
            return Err(heap.out_of_memory(bytes.len(), ObjType::String));
        }
        chars.extend_from_slice(bytes);

        self.insert(heap, chars.into_boxed_slice(), hash)
    }

    /// Intern `bytes`, taking ownership of the buffer
    ///
    /// If the content is already interned the buffer is dropped and
    /// the canonical string returned. Otherwise the buffer becomes the
    /// new string's storage. The allocation is adopted as is only when
    /// its capacity equals its length; spare capacity is shrunk away
    /// first, which may reallocate.
    pub fn intern_by_transfer(
        &mut self,
        heap: &mut Heap,
        bytes: Vec<u8>,
    ) -> Result<StrRef, HeapError> {
        let hash = hash_bytes(&bytes);
        if let Some(interned) = self.find(heap, &bytes, hash) {
            self.stats.hits += 1;
            self.stats.transfers_released += 1;
            drop(bytes);
            return Ok(interned);
        }

        self.insert(heap, bytes.into_boxed_slice(), hash)
    }

    /// Remove the entry for a string that is about to be freed
    ///
    /// Must be called while the object is still live, as the entry is
    /// located by the string's hash.
    pub fn remove(&mut self, heap: &Heap, obj: ObjRef) -> bool {
        let hash = match heap.as_a::<ObjString>(obj) {
            Ok(s) => s.hash(),
            Err(_) => return false,
        };

        let removed = match self.entries.get_mut(&hash) {
            Some(bucket) => {
                let before = bucket.len();
                bucket.retain(|s| s.as_obj() != obj);
                let removed = bucket.len() < before;
                if bucket.is_empty() {
                    self.entries.remove(&hash);
                }
                removed
            }
            None => false,
        };

        if removed {
            self.count -= 1;
            self.stats.purged += 1;
        }
        removed
    }

    /// Drop every entry whose string is no longer live
    ///
    /// Returns the number of entries removed.
    pub fn retain_live(&mut self, heap: &Heap) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|s| heap.contains(s.as_obj()));
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        self.count -= removed;
        self.stats.purged += removed as u64;
        removed
    }

    /// Forget every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }

    /// Every interned string, in no particular order
    pub fn strings(&self) -> impl Iterator<Item = StrRef> + '_ {
        self.entries.values().flatten().copied()
    }

    fn insert(&mut self, heap: &mut Heap, chars: Box<[u8]>, hash: u32) -> Result<StrRef, HeapError> {
        let obj = heap.allocate(HeapObject::String(ObjString::with_hash(chars, hash)))?;
        let interned = StrRef::new(obj);
        self.entries.entry(hash).or_default().push(interned);
        self.count += 1;
        self.stats.misses += 1;
        Ok(interned)
    }
}
