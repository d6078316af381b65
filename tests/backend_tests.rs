//! Integration tests for the object store backends
//!
//! The same contract is exercised against both implementations; a few
//! tests below pin behavior only observable on the local store.

use backup_walker::backend::{Backend, Kind, LocalBackend, MemoryBackend};
use backup_walker::cancel::cancellation;
use backup_walker::error::BackendError;
use std::io::{Read, Write};

fn put(backend: &dyn Backend, kind: Kind, name: &str, data: &[u8]) {
    let mut blob = backend.create().expect("create blob");
    blob.write_all(data).expect("write blob");
    blob.finalize(kind, name).expect("finalize blob");
}

fn read_all(backend: &dyn Backend, kind: Kind, name: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    backend
        .get(kind, name)
        .expect("get")
        .read_to_end(&mut buf)
        .expect("read");
    buf
}

fn list_all(backend: &dyn Backend, kind: Kind) -> Vec<String> {
    let (_token, cancel) = cancellation();
    backend.list(kind, cancel).iter().collect()
}

fn contract(backend: &dyn Backend) {
    // Write-once round trip.
    put(backend, Kind::Data, "one", b"hello world");
    assert!(backend.test(Kind::Data, "one").expect("test"));
    assert_eq!(read_all(backend, Kind::Data, "one"), b"hello world");

    // Ranged reads: offset view, limited view, zero length means to end.
    let mut tail = String::new();
    backend
        .get_ranged(Kind::Data, "one", 6, 0)
        .expect("ranged")
        .read_to_string(&mut tail)
        .expect("read");
    assert_eq!(tail, "world");

    let mut head = String::new();
    backend
        .get_ranged(Kind::Data, "one", 0, 5)
        .expect("ranged")
        .read_to_string(&mut head)
        .expect("read");
    assert_eq!(head, "hello");

    assert!(matches!(
        backend.get_ranged(Kind::Data, "one", 100, 0),
        Err(BackendError::InvalidRange { .. })
    ));

    // Names are never overwritten.
    let mut blob = backend.create().expect("create blob");
    blob.write_all(b"other data").expect("write blob");
    assert!(matches!(
        blob.finalize(Kind::Data, "one"),
        Err(BackendError::AlreadyExists { .. })
    ));
    assert_eq!(read_all(backend, Kind::Data, "one"), b"hello world");

    // Missing objects: get and remove fail, test says confirmed absent.
    assert!(matches!(
        backend.get(Kind::Data, "missing"),
        Err(BackendError::NotFound { .. })
    ));
    assert!(!backend.test(Kind::Data, "missing").expect("test"));
    assert!(matches!(
        backend.remove(Kind::Data, "missing"),
        Err(BackendError::NotFound { .. })
    ));

    // Remove, then the object is gone.
    backend.remove(Kind::Data, "one").expect("remove");
    assert!(!backend.test(Kind::Data, "one").expect("test"));

    // Listing is sorted and kind-scoped.
    put(backend, Kind::Snapshot, "b-snap", b"1");
    put(backend, Kind::Snapshot, "a-snap", b"2");
    put(backend, Kind::Index, "idx", b"3");
    assert_eq!(list_all(backend, Kind::Snapshot), ["a-snap", "b-snap"]);
    assert_eq!(list_all(backend, Kind::Index), ["idx"]);
    assert_eq!(list_all(backend, Kind::Data), Vec::<String>::new());

    // Config is addressed by kind alone.
    put(backend, Kind::Config, "", b"cfg");
    assert!(backend.test(Kind::Config, "").expect("test"));
    assert_eq!(read_all(backend, Kind::Config, ""), b"cfg");
    assert_eq!(list_all(backend, Kind::Config), Vec::<String>::new());
}

#[test]
fn test_memory_backend_contract() {
    contract(&MemoryBackend::new());
}

#[test]
fn test_local_backend_contract() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = LocalBackend::open(dir.path()).expect("open");
    contract(&backend);
}

#[test]
fn test_list_stops_on_cancel() {
    let backend = MemoryBackend::new();
    for i in 0..500 {
        put(&backend, Kind::Data, &format!("obj{:04}", i), b"x");
    }

    let (token, cancel) = cancellation();
    let stream = backend.list(Kind::Data, cancel);

    let first = stream.recv().expect("first name");
    assert_eq!(first, "obj0000");

    token.cancel();

    // The producer stops; whatever was already buffered may still drain,
    // but the stream must terminate well short of the full listing.
    let rest: Vec<String> = stream.iter().collect();
    assert!(rest.len() < 500);
}

/// Every kind's own listing drives removal, so kinds with disjoint name
/// sets all end up empty.
#[test]
fn test_delete_all_clears_each_kind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let local = LocalBackend::open(dir.path()).expect("open");
    let memory = MemoryBackend::new();

    for backend in [&memory as &dyn Backend, &local] {
        put(backend, Kind::Data, "d1", b"x");
        put(backend, Kind::Data, "d2", b"x");
        put(backend, Kind::Key, "k1", b"x");
        put(backend, Kind::Lock, "l1", b"x");
        put(backend, Kind::Snapshot, "s1", b"x");
        put(backend, Kind::Index, "i1", b"x");
        put(backend, Kind::Config, "", b"x");

        backend.delete_all().expect("delete_all");

        for kind in [Kind::Data, Kind::Key, Kind::Lock, Kind::Snapshot, Kind::Index] {
            assert_eq!(
                list_all(backend, kind),
                Vec::<String>::new(),
                "{} should be empty",
                kind
            );
        }
        assert!(!backend.test(Kind::Config, "").expect("test"));
    }
}

/// A transport failure must surface as an error, not report the object
/// as absent.
#[test]
fn test_existence_check_reports_transport_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = LocalBackend::open(dir.path()).expect("open");

    put(&backend, Kind::Data, "plain", b"x");

    // "plain" is a file, so probing a path through it fails with
    // ENOTDIR, a transport error distinct from absence.
    let err = backend
        .test(Kind::Data, "plain/child")
        .expect_err("probe through a file must error");
    assert!(matches!(err, BackendError::Io(_)));

    // A genuinely absent name is still a clean false.
    assert!(!backend.test(Kind::Data, "absent").expect("test"));
}
