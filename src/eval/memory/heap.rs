//! The object heap
//!
//! Objects live in a slot arena and are addressed by generational
//! [`ObjRef`] handles. Every live object is threaded onto a tracking
//! list through its header (newest first) which is what teardown and
//! sweep walk.

use std::fmt::{self, Display};
use std::io::Write;

use super::{
    header::ObjHeader,
    object::{HeapObject, Obj, ObjRef, ObjType, Object},
    string::{ObjString, StrRef},
};
use crate::eval::error::ExecutionError;

/// Heap configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeapSettings {
    /// Maximum live bytes before allocation fails
    pub limit_bytes: Option<usize>,
    /// Log allocations, frees and sweeps to stderr
    pub log_gc: bool,
}

impl HeapSettings {
    pub fn with_limit_mib(mut self, limit_mib: usize) -> Self {
        self.limit_bytes = Some(limit_mib.saturating_mul(1_048_576));
        self
    }

    pub fn with_limit_bytes(mut self, limit_bytes: usize) -> Self {
        self.limit_bytes = Some(limit_bytes);
        self
    }

    pub fn with_log_gc(mut self, log_gc: bool) -> Self {
        self.log_gc = log_gc;
        self
    }
}

/// Counters accumulated over the heap's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Objects allocated since creation
    pub objects_allocated: u64,
    /// Objects freed since creation
    pub objects_freed: u64,
    /// Owned payload buffers released by free
    pub buffers_released: u64,
    /// Bytes charged by allocation since creation
    pub bytes_allocated: u64,
    /// Bytes returned by free since creation
    pub bytes_freed: u64,
    /// Sweeps run
    pub collections: u64,
    /// Objects currently on the tracking list
    pub live_objects: usize,
    /// Bytes currently charged
    pub live_bytes: usize,
}

impl Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Objects Allocated : {:10}", self.objects_allocated)?;
        writeln!(f, "Objects Freed     : {:10}", self.objects_freed)?;
        writeln!(f, "Objects Live      : {:10}", self.live_objects)?;
        writeln!(f, "Buffers Released  : {:10}", self.buffers_released)?;
        writeln!(f, "Bytes Allocated   : {:10}", self.bytes_allocated)?;
        writeln!(f, "Bytes Freed       : {:10}", self.bytes_freed)?;
        writeln!(f, "Bytes Live        : {:10}", self.live_bytes)?;
        writeln!(f, "Collections       : {:10}", self.collections)
    }
}

/// Heap state at the point of a failed allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapContext {
    /// Bytes the failed allocation asked for
    pub requested_size: usize,
    /// Kind of object being allocated
    pub obj_type: ObjType,
    /// Objects live at the time
    pub live_objects: usize,
    /// Bytes live at the time
    pub live_bytes: usize,
    /// Configured limit, if any
    pub heap_limit: Option<usize>,
}

/// Heap-level errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// The underlying allocator could not provide storage
    OutOfMemory { context: HeapContext },
    /// The allocation would take the heap past its configured limit
    LimitExceeded { context: HeapContext },
    /// The handle refers to an object that has been freed
    DanglingReference(ObjRef),
}

impl Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::OutOfMemory { context } => write!(
                f,
                "out of memory: failed to allocate {} bytes ({}) | heap: {} objects, {} bytes live",
                context.requested_size, context.obj_type, context.live_objects, context.live_bytes
            ),
            HeapError::LimitExceeded { context } => write!(
                f,
                "heap limit exceeded: failed to allocate {} bytes ({}) | heap: {} objects, {} bytes live{}",
                context.requested_size,
                context.obj_type,
                context.live_objects,
                context.live_bytes,
                if let Some(limit) = context.heap_limit {
                    format!(" | limit: {} bytes", limit)
                } else {
                    " | no limit".to_string()
                }
            ),
            HeapError::DanglingReference(obj) => {
                write!(f, "dangling reference: {} has been freed", obj)
            }
        }
    }
}

impl std::error::Error for HeapError {}

/// An arena slot; `generation` advances each time the slot is vacated
#[derive(Debug)]
struct Slot {
    generation: u32,
    obj: Option<Obj>,
}

/// The object heap
///
/// Sole owner of every object. Nothing else constructs or destroys
/// objects and a freed object's handle is never valid again.
#[derive(Debug)]
pub struct Heap {
    slots: Vec<Slot>,
    /// Vacated slot indices available for reuse
    free_slots: Vec<u32>,
    /// Most recently allocated live object
    head: Option<ObjRef>,
    settings: HeapSettings,
    stats: HeapStats,
}

impl Heap {
    pub fn new() -> Self {
        Heap::with_settings(HeapSettings::default())
    }

    pub fn with_settings(settings: HeapSettings) -> Self {
        Heap {
            slots: vec![],
            free_slots: vec![],
            head: None,
            settings,
            stats: HeapStats::default(),
        }
    }

    pub fn settings(&self) -> &HeapSettings {
        &self.settings
    }

    pub fn stats(&self) -> HeapStats {
        self.stats.clone()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.stats.live_objects
    }

    pub fn is_empty(&self) -> bool {
        self.stats.live_objects == 0
    }

    /// Head of the tracking list
    pub fn head(&self) -> Option<ObjRef> {
        self.head
    }

    /// Allocate an object and prepend it to the tracking list
    pub fn allocate(&mut self, object: HeapObject) -> Result<ObjRef, HeapError> {
        let size = object.alloc_size();
        let obj_type = object.obj_type();

        if let Some(limit) = self.settings.limit_bytes {
            if self.stats.live_bytes.saturating_add(size) > limit {
                return Err(HeapError::LimitExceeded {
                    context: self.context(size, obj_type),
                });
            }
        }

        let obj = Obj {
            header: ObjHeader::new(self.head),
            body: object,
        };

        let handle = match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.obj.is_none());
                slot.obj = Some(obj);
                ObjRef::new(index, slot.generation)
            }
            None => {
                let reserved = self.slots.try_reserve(1).is_ok();
                let index = match u32::try_from(self.slots.len()) {
                    Ok(index) if reserved => index,
                    _ => return Err(self.out_of_memory(size, obj_type)),
                };
                self.slots.push(Slot {
                    generation: 0,
                    obj: Some(obj),
                });
                ObjRef::new(index, 0)
            }
        };

        self.head = Some(handle);
        self.stats.objects_allocated += 1;
        self.stats.bytes_allocated += size as u64;
        self.stats.live_objects += 1;
        self.stats.live_bytes += size;

        if self.settings.log_gc {
            eprintln!("{} allocate {} bytes for {}", handle, size, obj_type);
        }

        Ok(handle)
    }

    /// Free a single object, unlinking it from the tracking list
    ///
    /// Unlinking walks the list to find the predecessor; bulk
    /// reclamation should use [`Heap::sweep`] or [`Heap::free_all`].
    pub fn free(&mut self, obj: ObjRef) -> Result<(), HeapError> {
        let next = self
            .get(obj)
            .map(|o| o.header.next())
            .ok_or(HeapError::DanglingReference(obj))?;

        if self.head == Some(obj) {
            self.head = next;
        } else {
            let mut cursor = self.head;
            while let Some(current) = cursor {
                let following = self.get(current).and_then(|o| o.header.next());
                if following == Some(obj) {
                    self.set_next(current, next);
                    break;
                }
                cursor = following;
            }
        }

        self.release(obj);
        Ok(())
    }

    /// Free every object on the tracking list
    ///
    /// Returns the number of objects freed.
    pub fn free_all(&mut self) -> usize {
        let mut cursor = self.head.take();
        let mut count = 0;
        while let Some(current) = cursor {
            cursor = self.get(current).and_then(|o| o.header.next());
            if self.release(current) {
                count += 1;
            }
        }
        debug_assert_eq!(self.stats.live_objects, 0);
        count
    }

    /// Set the mark bit of a live object
    pub fn mark(&mut self, obj: ObjRef) -> Result<(), HeapError> {
        self.get_mut(obj)
            .map(|o| o.header.mark())
            .ok_or(HeapError::DanglingReference(obj))
    }

    pub fn is_marked(&self, obj: ObjRef) -> bool {
        self.get(obj).map_or(false, |o| o.header.is_marked())
    }

    /// Clear the mark bit of every live object
    pub fn unmark_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(obj) = slot.obj.as_mut() {
                obj.header.unmark();
            }
        }
    }

    /// Free every unmarked object and clear marks on the survivors
    ///
    /// Returns the handles of the freed objects so that holders of
    /// weak references can purge them.
    pub fn sweep(&mut self) -> Vec<ObjRef> {
        let mut freed = vec![];
        let mut prev: Option<ObjRef> = None;
        let mut cursor = self.head;

        while let Some(current) = cursor {
            let (next, marked) = match self.get(current) {
                Some(o) => (o.header.next(), o.header.is_marked()),
                None => break,
            };

            if marked {
                if let Some(o) = self.get_mut(current) {
                    o.header.unmark();
                }
                prev = Some(current);
            } else {
                match prev {
                    Some(p) => self.set_next(p, next),
                    None => self.head = next,
                }
                self.release(current);
                freed.push(current);
            }

            cursor = next;
        }

        self.stats.collections += 1;

        if self.settings.log_gc {
            eprintln!(
                "sweep freed {} objects, {} live ({} bytes)",
                freed.len(),
                self.stats.live_objects,
                self.stats.live_bytes
            );
        }

        freed
    }

    /// Whether the handle refers to a live object
    pub fn contains(&self, obj: ObjRef) -> bool {
        self.get(obj).is_some()
    }

    pub fn get(&self, obj: ObjRef) -> Option<&Obj> {
        self.slots
            .get(obj.index())
            .filter(|slot| slot.generation == obj.generation())
            .and_then(|slot| slot.obj.as_ref())
    }

    fn get_mut(&mut self, obj: ObjRef) -> Option<&mut Obj> {
        self.slots
            .get_mut(obj.index())
            .filter(|slot| slot.generation == obj.generation())
            .and_then(|slot| slot.obj.as_mut())
    }

    /// Walk the tracking list from the head
    pub fn objects(&self) -> Objects<'_> {
        Objects {
            heap: self,
            cursor: self.head,
        }
    }

    /// Checked downcast of a live object
    pub fn as_a<T: Object>(&self, obj: ObjRef) -> Result<&T, ExecutionError> {
        let object = self.get(obj).ok_or(HeapError::DanglingReference(obj))?;
        object.as_a::<T>().ok_or(ExecutionError::TypeMismatch {
            expected: T::TAG,
            found: object.obj_type(),
        })
    }

    /// Resolve a string handle
    pub fn string(&self, s: StrRef) -> Result<&ObjString, ExecutionError> {
        self.as_a(s.as_obj())
    }

    /// Write the printed form of an object
    pub fn print<W: Write>(&self, obj: ObjRef, out: &mut W) -> Result<(), ExecutionError> {
        let object = self.get(obj).ok_or(HeapError::DanglingReference(obj))?;
        match object.body() {
            HeapObject::String(s) => out.write_all(s.as_bytes())?,
        }
        Ok(())
    }

    /// The printed form of an object as a `String`
    pub fn render(&self, obj: ObjRef) -> Result<String, ExecutionError> {
        let object = self.get(obj).ok_or(HeapError::DanglingReference(obj))?;
        Ok(object.to_string())
    }

    fn set_next(&mut self, obj: ObjRef, next: Option<ObjRef>) {
        if let Some(o) = self.get_mut(obj) {
            o.header.set_next(next);
        }
    }

    /// Destroy an object already unlinked from the tracking list
    ///
    /// The slot's generation advances so outstanding handles dangle
    /// detectably rather than alias the slot's next occupant.
    fn release(&mut self, obj: ObjRef) -> bool {
        let taken = match self.slots.get_mut(obj.index()) {
            Some(slot) if slot.generation == obj.generation() => {
                let taken = slot.obj.take();
                if taken.is_some() {
                    slot.generation = slot.generation.wrapping_add(1);
                }
                taken
            }
            _ => None,
        };

        let Some(Obj { header: _, body }) = taken else {
            return false;
        };

        let size = body.alloc_size();
        let obj_type = body.obj_type();

        match body {
            HeapObject::String(s) => {
                self.stats.buffers_released += 1;
                drop(s);
            }
        }

        self.free_slots.push(obj.raw_index());
        self.stats.objects_freed += 1;
        self.stats.bytes_freed += size as u64;
        self.stats.live_objects -= 1;
        self.stats.live_bytes -= size;

        if self.settings.log_gc {
            eprintln!("{} free {} ({} bytes)", obj, obj_type, size);
        }

        true
    }

    /// An out of memory error describing the current heap state
    pub(crate) fn out_of_memory(&self, requested_size: usize, obj_type: ObjType) -> HeapError {
        HeapError::OutOfMemory {
            context: self.context(requested_size, obj_type),
        }
    }

    fn context(&self, requested_size: usize, obj_type: ObjType) -> HeapContext {
        HeapContext {
            requested_size,
            obj_type,
            live_objects: self.stats.live_objects,
            live_bytes: self.stats.live_bytes,
            heap_limit: self.settings.limit_bytes,
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        self.free_all();
    }
}

/// Iterator over the tracking list, newest first
pub struct Objects<'heap> {
    heap: &'heap Heap,
    cursor: Option<ObjRef>,
}

impl<'heap> Iterator for Objects<'heap> {
    type Item = (ObjRef, &'heap Obj);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        let obj = self.heap.get(current)?;
        self.cursor = obj.header.next();
        Some((current, obj))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn string(content: &str) -> HeapObject {
        HeapObject::from(ObjString::from_buffer(content.as_bytes().into()))
    }

    #[test]
    pub fn test_allocate_prepends_to_tracking_list() {
        let mut heap = Heap::new();
        let a = heap.allocate(string("a")).unwrap();
        let b = heap.allocate(string("b")).unwrap();

        assert_eq!(heap.head(), Some(b));
        assert_eq!(heap.get(b).unwrap().header().next(), Some(a));
        assert_eq!(heap.get(a).unwrap().header().next(), None);
    }

    #[test]
    pub fn test_tracking_list_holds_every_allocation() {
        let mut heap = Heap::new();
        let n = 1000;
        let handles: Vec<ObjRef> = (0..n)
            .map(|i| heap.allocate(string(&i.to_string())).unwrap())
            .collect();

        let walked: Vec<ObjRef> = heap.objects().map(|(h, _)| h).collect();
        assert_eq!(walked.len(), n);
        assert_eq!(heap.len(), n);

        let distinct: HashSet<ObjRef> = walked.iter().copied().collect();
        assert_eq!(distinct.len(), n);

        let mut newest_first = handles;
        newest_first.reverse();
        assert_eq!(walked, newest_first);
    }

    #[test]
    pub fn test_free_releases_buffer_and_record() {
        let mut heap = Heap::new();
        let obj = heap.allocate(string("hi")).unwrap();
        let size = heap.get(obj).unwrap().body().alloc_size();

        heap.free(obj).unwrap();

        let stats = heap.stats();
        assert_eq!(stats.objects_freed, 1);
        assert_eq!(stats.buffers_released, 1);
        assert_eq!(stats.bytes_freed, size as u64);
        assert_eq!(stats.live_objects, 0);
        assert_eq!(stats.live_bytes, 0);
        assert!(!heap.contains(obj));
        assert_eq!(heap.head(), None);
    }

    #[test]
    pub fn test_double_free_is_an_error() {
        let mut heap = Heap::new();
        let obj = heap.allocate(string("once")).unwrap();
        heap.free(obj).unwrap();
        assert_eq!(heap.free(obj), Err(HeapError::DanglingReference(obj)));
        assert_eq!(heap.stats().objects_freed, 1);
    }

    #[test]
    pub fn test_free_unlinks_from_middle_of_list() {
        let mut heap = Heap::new();
        let a = heap.allocate(string("a")).unwrap();
        let b = heap.allocate(string("b")).unwrap();
        let c = heap.allocate(string("c")).unwrap();

        heap.free(b).unwrap();

        let walked: Vec<ObjRef> = heap.objects().map(|(h, _)| h).collect();
        assert_eq!(walked, vec![c, a]);
    }

    #[test]
    pub fn test_stale_handle_does_not_alias_reused_slot() {
        let mut heap = Heap::new();
        let old = heap.allocate(string("old")).unwrap();
        heap.free(old).unwrap();
        let new = heap.allocate(string("new")).unwrap();

        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(heap.get(old).is_none());
        assert_eq!(heap.render(new).unwrap(), "new");
    }

    #[test]
    pub fn test_limit_exceeded() {
        let one = string("x").alloc_size();
        let mut heap = Heap::with_settings(HeapSettings::default().with_limit_bytes(one));

        heap.allocate(string("x")).unwrap();
        match heap.allocate(string("y")) {
            Err(HeapError::LimitExceeded { context }) => {
                assert_eq!(context.requested_size, one);
                assert_eq!(context.live_objects, 1);
                assert_eq!(context.heap_limit, Some(one));
            }
            other => panic!("expected limit error, got {:?}", other),
        }
        assert_eq!(heap.len(), 1);
    }

    #[test]
    pub fn test_sweep_frees_unmarked() {
        let mut heap = Heap::new();
        let a = heap.allocate(string("a")).unwrap();
        let b = heap.allocate(string("b")).unwrap();
        let c = heap.allocate(string("c")).unwrap();

        heap.mark(b).unwrap();
        let mut freed = heap.sweep();
        freed.sort();

        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(freed, expected);
        assert_eq!(heap.objects().map(|(h, _)| h).collect::<Vec<_>>(), vec![b]);
        assert!(!heap.is_marked(b));
        assert_eq!(heap.stats().collections, 1);
    }

    #[test]
    pub fn test_unmark_all_clears_marks() {
        let mut heap = Heap::new();
        let a = heap.allocate(string("a")).unwrap();
        let b = heap.allocate(string("b")).unwrap();
        heap.mark(a).unwrap();
        heap.mark(b).unwrap();

        heap.unmark_all();
        assert!(!heap.is_marked(a));
        assert!(!heap.is_marked(b));
        assert_eq!(heap.sweep().len(), 2);
    }

    #[test]
    pub fn test_free_all_walks_whole_list() {
        let mut heap = Heap::new();
        for i in 0..10 {
            heap.allocate(string(&format!("s{i}"))).unwrap();
        }
        assert_eq!(heap.free_all(), 10);
        assert!(heap.is_empty());
        assert_eq!(heap.head(), None);
        assert_eq!(heap.stats().buffers_released, 10);
    }

    #[test]
    pub fn test_print_and_downcast() {
        let mut heap = Heap::new();
        let obj = heap.allocate(string("hello")).unwrap();

        let mut out = vec![];
        heap.print(obj, &mut out).unwrap();
        assert_eq!(out, b"hello");

        let s: &ObjString = heap.as_a(obj).unwrap();
        assert_eq!(s.len(), 5);
    }

    #[test]
    pub fn test_error_display() {
        let err = HeapError::LimitExceeded {
            context: HeapContext {
                requested_size: 64,
                obj_type: ObjType::String,
                live_objects: 2,
                live_bytes: 128,
                heap_limit: Some(128),
            },
        };
        assert_eq!(
            err.to_string(),
            "heap limit exceeded: failed to allocate 64 bytes (string) | heap: 2 objects, 128 bytes live | limit: 128 bytes"
        );
    }
}
