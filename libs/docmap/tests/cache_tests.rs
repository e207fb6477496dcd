//! Codec cache: one build per type, shared across threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use docmap::{CacheStats, CodecCache, Document, FieldDescriptor, Record};

static PROBE_FIELD_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Counts how often the engine inspects it. Only used by one test.
#[derive(Debug, Default)]
struct Probe {
    hits: u32,
}

impl Record for Probe {
    fn fields() -> Vec<FieldDescriptor<Self>> {
        PROBE_FIELD_CALLS.fetch_add(1, Ordering::SeqCst);
        vec![FieldDescriptor::<Probe>::new::<u32>("hits", |p| &p.hits, |p| &mut p.hits)]
    }
}

/// Registered by hand instead of derived.
#[derive(Debug, Default, PartialEq)]
struct Account {
    id: u64,
    label: String,
}

impl Record for Account {
    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![
            FieldDescriptor::<Account>::new::<u64>("Id", |a| &a.id, |a| &mut a.id).member("id"),
            FieldDescriptor::<Account>::new::<String>("Label", |a| &a.label, |a| &mut a.label)
                .member("label"),
        ]
    }

    fn type_name() -> &'static str {
        "Account"
    }
}

#[derive(Record, Debug, Default, PartialEq)]
struct Inner {
    value: i32,
}

#[derive(Record, Debug, Default, PartialEq)]
struct Outer {
    first: Inner,
    rest: Vec<Inner>,
}

#[derive(Record, Debug, Default)]
struct Looping {
    again: Option<Box<Looping>>,
}

#[test]
fn test_concurrent_first_use_builds_once() {
    const THREADS: usize = 8;

    let cache = CodecCache::new();
    let barrier = Barrier::new(THREADS);

    let codecs: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache.codec::<Probe>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for codec in &codecs[1..] {
        assert!(Arc::ptr_eq(&codecs[0], codec));
    }
    assert_eq!(
        cache.stats(),
        CacheStats {
            descriptor_builds: 1,
            codec_builds: 1,
            field_codec_builds: 1,
            cached: 3,
        }
    );

    // Later lookups never inspect the type again.
    let inspected = PROBE_FIELD_CALLS.load(Ordering::SeqCst);
    for _ in 0..100 {
        let codec = cache.codec::<Probe>().unwrap();
        assert!(Arc::ptr_eq(&codecs[0], &codec));
    }
    cache.descriptor::<Probe>().unwrap();
    assert_eq!(PROBE_FIELD_CALLS.load(Ordering::SeqCst), inspected);
    assert_eq!(cache.stats().codec_builds, 1);
}

#[test]
fn test_concurrent_conversions_share_codec() {
    let cache = Arc::new(CodecCache::new());

    let handles: Vec<_> = (0..4u64)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let value = Account {
                    id: i,
                    label: format!("worker-{i}"),
                };
                let doc = cache.to_document(&value).unwrap();
                let back: Account = cache.from_document(&doc).unwrap();
                assert_eq!(back, value);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.stats().codec_builds, 1);
}

#[test]
fn test_manual_registration_uses_declared_names() {
    let cache = CodecCache::new();
    let doc = cache
        .to_document(&Account {
            id: 5,
            label: "five".to_string(),
        })
        .unwrap();
    assert_eq!(doc, Document::new().with("Id", 5u64).with("Label", "five"));

    let descriptor = cache.descriptor::<Account>().unwrap();
    assert_eq!(descriptor.type_name(), "Account");
    assert_eq!(descriptor.field("Label").unwrap().member_name(), "label");
}

#[test]
fn test_nested_codecs_come_from_the_cache() {
    let cache = CodecCache::new();
    cache.codec::<Outer>().unwrap();
    assert_eq!(cache.stats().codec_builds, 2);

    // Inner was built while building Outer.
    cache.codec::<Inner>().unwrap();
    assert_eq!(cache.stats().codec_builds, 2);
    assert_eq!(cache.stats().descriptor_builds, 2);
}

#[test]
fn test_failed_builds_are_memoized() {
    let cache = CodecCache::new();

    let first = cache.codec::<Looping>().unwrap_err();
    let second = cache.codec::<Looping>().unwrap_err();
    assert_eq!(first, second);
    assert_eq!(cache.stats().codec_builds, 1);
}

#[test]
fn test_field_codec_shared_with_record_codec() {
    let cache = CodecCache::new();
    let codec = cache.codec::<Outer>().unwrap();
    let field = cache.field_codec::<Outer>("first").unwrap();

    let from_codec = codec.fields().iter().find(|f| f.name() == "first").unwrap();
    assert!(Arc::ptr_eq(from_codec, &field));
}

#[test]
fn test_caches_are_independent() {
    let a = CodecCache::new();
    let b = CodecCache::new();

    let from_a = a.codec::<Inner>().unwrap();
    let from_b = b.codec::<Inner>().unwrap();
    assert!(!Arc::ptr_eq(&from_a, &from_b));

    assert!(std::ptr::eq(CodecCache::global(), CodecCache::global()));
}
