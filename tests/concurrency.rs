//! Concurrency Integration Tests
//!
//! Direct mode is last-writer-wins for the whole document; atomic mode
//! serializes read-modify-write cycles so no update is lost.

use std::sync::{Arc, Barrier};
use std::thread;

use assetbank::library::{Entry, EntryId, Registry, WriteMode};
use tempfile::TempDir;

fn entry(name: &str) -> (EntryId, Entry) {
    let source = format!("/lib/{}.blend", name);
    (EntryId::derive(name, &source), Entry::new(name, source))
}

#[test]
fn test_direct_mode_interleaved_writers_lose_an_update() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("main.json");
    let registry = Registry::new(WriteMode::Direct);
    registry.ensure_library(&path).unwrap();

    // Two writers both read before either writes
    let mut first = registry.load_document(&path).unwrap();
    let mut second = registry.load_document(&path).unwrap();

    let (id_a, entry_a) = entry("A");
    let (id_b, entry_b) = entry("B");
    first.insert(id_a.clone(), entry_a);
    second.insert(id_b.clone(), entry_b);

    registry.store_document(&path, &first).unwrap();
    registry.store_document(&path, &second).unwrap();

    let document = registry.load_document(&path).unwrap();
    assert!(!document.contains(&id_a), "first writer's update is lost");
    assert!(document.contains(&id_b));
}

#[test]
fn test_atomic_mode_concurrent_adds_all_survive() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 10;

    let temp = TempDir::new().unwrap();
    let path = Arc::new(temp.path().join("main.json"));
    let registry = Registry::new(WriteMode::Atomic);
    registry.ensure_library(&path).unwrap();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for n in 0..PER_WRITER {
                    let (id, entry) = entry(&format!("w{}_{}", writer, n));
                    registry.add_entry(&path, &id, entry, true).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let entries = registry.list_entries(&path).unwrap();
    assert_eq!(entries.len(), WRITERS * PER_WRITER);
}

#[test]
fn test_atomic_mode_readers_never_see_partial_documents() {
    let temp = TempDir::new().unwrap();
    let path = Arc::new(temp.path().join("main.json"));
    let registry = Registry::new(WriteMode::Atomic);
    registry.ensure_library(&path).unwrap();

    let writer = {
        let path = Arc::clone(&path);
        thread::spawn(move || {
            for n in 0..50 {
                let (id, entry) = entry(&format!("asset_{}", n));
                registry.add_entry(&path, &id, entry, false).unwrap();
            }
        })
    };

    let reader = {
        let path = Arc::clone(&path);
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..200 {
                let count = registry.list_entries(&path).unwrap().len();
                assert!(count >= last, "entries never disappear");
                last = count;
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(registry.list_entries(&path).unwrap().len(), 50);
}
