//! The runtime context
//!
//! Owns the heap and the string table and keeps them consistent: any
//! string the heap frees is first purged from the table, so the table
//! never refers to a dead object.

use std::io::Write;

use super::{
    error::ExecutionError,
    memory::{
        heap::{Heap, HeapSettings, HeapStats},
        intern::{InternStats, StringTable},
        object::{ObjRef, ObjType},
        string::{ObjString, StrRef},
    },
    value::Value,
};

/// Snapshot of heap and table counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub heap: HeapStats,
    pub strings: InternStats,
    pub interned: usize,
}

#[derive(Debug, Default)]
pub struct Runtime {
    heap: Heap,
    strings: StringTable,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime::default()
    }

    pub fn with_settings(settings: HeapSettings) -> Self {
        Runtime {
            heap: Heap::with_settings(settings),
            strings: StringTable::new(),
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            heap: self.heap.stats(),
            strings: self.strings.stats(),
            interned: self.strings.len(),
        }
    }

    /// Canonical string for a copy of `bytes`
    pub fn intern_by_copy(&mut self, bytes: &[u8]) -> Result<StrRef, ExecutionError> {
        Ok(self.strings.intern_by_copy(&mut self.heap, bytes)?)
    }

    /// Canonical string for `bytes`, consuming the buffer
    pub fn intern_by_transfer(&mut self, bytes: Vec<u8>) -> Result<StrRef, ExecutionError> {
        Ok(self.strings.intern_by_transfer(&mut self.heap, bytes)?)
    }

    pub fn intern_str(&mut self, s: &str) -> Result<StrRef, ExecutionError> {
        self.intern_by_copy(s.as_bytes())
    }

    pub fn string(&self, s: StrRef) -> Result<&ObjString, ExecutionError> {
        self.heap.string(s)
    }

    /// Concatenate two strings, interning the result
    pub fn concatenate(&mut self, lhs: StrRef, rhs: StrRef) -> Result<StrRef, ExecutionError> {
        let l = self.heap.string(lhs)?.as_bytes();
        let r = self.heap.string(rhs)?.as_bytes();

        let mut buf = Vec::new();
        if buf.try_reserve_exact(l.len() + r.len()).is_err() {
            return Err(self.heap.out_of_memory(l.len() + r.len(), ObjType::String).into());
        }
        buf.extend_from_slice(l);
        buf.extend_from_slice(r);

        self.intern_by_transfer(buf)
    }

    pub fn is_of_type(&self, value: &Value, tag: ObjType) -> bool {
        value.is_of_type(&self.heap, tag)
    }

    /// Write the printed form of an object
    pub fn print<W: Write>(&self, obj: ObjRef, out: &mut W) -> Result<(), ExecutionError> {
        self.heap.print(obj, out)
    }

    /// The printed form of a value
    pub fn render(&self, value: &Value) -> String {
        value.display(&self.heap).to_string()
    }

    /// Free one object, purging it from the string table first
    pub fn free(&mut self, obj: ObjRef) -> Result<(), ExecutionError> {
        self.strings.remove(&self.heap, obj);
        Ok(self.heap.free(obj)?)
    }

    /// Mark an object as reachable for the next sweep
    pub fn mark(&mut self, obj: ObjRef) -> Result<(), ExecutionError> {
        Ok(self.heap.mark(obj)?)
    }

    /// Free every unmarked object and purge the freed strings
    pub fn sweep(&mut self) -> Vec<ObjRef> {
        let freed = self.heap.sweep();
        let purged = self.strings.retain_live(&self.heap);
        if self.heap.settings().log_gc {
            eprintln!("sweep purged {} interned strings", purged);
        }
        freed
    }

    /// Free every object
    ///
    /// Returns the number of objects freed. The runtime remains usable.
    pub fn teardown(&mut self) -> usize {
        self.strings.clear();
        self.heap.free_all()
    }
}
