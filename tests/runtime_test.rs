//! End to end tests of heap allocation and interning through the runtime
use lox_heap::eval::{
    memory::{
        hash::hash_bytes,
        heap::HeapSettings,
        object::ObjType,
    },
    runtime::Runtime,
    value::Value,
};

#[test]
pub fn test_copy_interning_is_idempotent() {
    let mut rt = Runtime::new();
    let first = rt.intern_by_copy(b"lox").unwrap();
    let second = rt.intern_by_copy(b"lox").unwrap();

    assert_eq!(first, second);
    assert_eq!(rt.heap().len(), 1);
    assert_eq!(rt.strings().len(), 1);
    assert_eq!(rt.stats().strings.hits, 1);
    assert_eq!(rt.stats().strings.misses, 1);
}

#[test]
pub fn test_transfer_of_interned_content_releases_buffer() {
    let mut rt = Runtime::new();
    let canonical = rt.intern_str("shared").unwrap();
    let before = rt.stats();

    let transferred = rt.intern_by_transfer(b"shared".to_vec()).unwrap();

    let after = rt.stats();
    assert_eq!(transferred, canonical);
    assert_eq!(after.strings.transfers_released, 1);
    assert_eq!(after.heap.objects_allocated, before.heap.objects_allocated);
    assert_eq!(rt.heap().len(), 1);
}

#[test]
pub fn test_known_hashes() {
    assert_eq!(hash_bytes(b""), 2166136261);
    assert_eq!(hash_bytes(b"a"), 0xe40c292c);

    let mut rt = Runtime::new();
    let empty = rt.intern_str("").unwrap();
    let s = rt.string(empty).unwrap();
    assert_eq!(s.hash(), 2166136261);
    assert!(s.is_empty());
}

#[test]
pub fn test_tracking_list_counts_every_allocation() {
    let mut rt = Runtime::new();
    for n in 0..500 {
        rt.intern_str(&format!("s{n}")).unwrap();
    }

    let walked: Vec<_> = rt.heap().objects().collect();
    assert_eq!(walked.len(), 500);
    assert_eq!(walked.first().map(|(r, _)| *r), rt.heap().head());
    assert!(walked
        .iter()
        .all(|(_, obj)| obj.obj_type() == ObjType::String));
}

#[test]
pub fn test_free_releases_once() {
    let mut rt = Runtime::new();
    let s = rt.intern_str("transient").unwrap();

    rt.free(s.as_obj()).unwrap();
    let stats = rt.stats();
    assert_eq!(stats.heap.objects_freed, 1);
    assert_eq!(stats.heap.buffers_released, 1);
    assert_eq!(stats.interned, 0);

    let err = rt.free(s.as_obj()).unwrap_err();
    assert_eq!(err.dangling_reference(), Some(s.as_obj()));
    let stats = rt.stats();
    assert_eq!(stats.heap.objects_freed, 1);
    assert_eq!(stats.heap.buffers_released, 1);
}

#[test]
pub fn test_hi_end_to_end() {
    let mut rt = Runtime::new();
    let first = rt.intern_by_copy(b"hi").unwrap();
    let second = rt.intern_by_copy(b"hi").unwrap();
    assert_eq!(first, second);

    let owned = String::from("hi").into_bytes();
    let third = rt.intern_by_transfer(owned).unwrap();
    assert_eq!(third, first);

    let stats = rt.stats();
    assert_eq!(stats.heap.objects_allocated, 1);
    assert_eq!(stats.strings.transfers_released, 1);
    assert_eq!(rt.string(first).unwrap().hash(), 0x683af69a);
    assert_eq!(rt.render(&Value::from(first)), "hi");

    assert_eq!(rt.teardown(), 1);
    assert_eq!(rt.stats().heap.buffers_released, 1);
}

#[test]
pub fn test_sweep_then_reintern() {
    let mut rt = Runtime::new();
    let kept = rt.intern_str("kept").unwrap();
    let dropped = rt.intern_str("dropped").unwrap();

    rt.mark(kept.as_obj()).unwrap();
    let freed = rt.sweep();
    assert_eq!(freed, vec![dropped.as_obj()]);
    assert!(!rt.heap().is_marked(kept.as_obj()));

    let again = rt.intern_str("dropped").unwrap();
    assert_ne!(again, dropped);
    assert!(rt.heap().contains(again.as_obj()));
    assert_eq!(rt.render(&Value::from(dropped.as_obj())), format!("<freed {}>", dropped));
}

#[test]
pub fn test_heap_limit_fails_allocation() {
    let mut rt = Runtime::with_settings(HeapSettings::default().with_limit_bytes(256));
    let small = rt.intern_str("fits").unwrap();

    let err = rt.intern_by_transfer(vec![b'x'; 1024]).unwrap_err();
    assert!(err.is_allocation_error());
    assert_eq!(rt.heap().len(), 1);
    assert_eq!(rt.strings().len(), 1);
    assert_eq!(rt.intern_str("fits").unwrap(), small);
}

#[test]
pub fn test_concatenation_and_type_checks() {
    let mut rt = Runtime::new();
    let a = rt.intern_str("foo").unwrap();
    let b = rt.intern_str("bar").unwrap();
    let joined = rt.concatenate(a, b).unwrap();

    let value = Value::from(joined);
    assert!(rt.is_of_type(&value, ObjType::String));
    assert!(!rt.is_of_type(&Value::Number(1.0), ObjType::String));
    assert_eq!(rt.string(joined).unwrap().hash(), 0xbf9cf968);

    let mut out = vec![];
    rt.print(joined.as_obj(), &mut out).unwrap();
    assert_eq!(out, b"foobar");
}
