//! Transaction Isolation Tests
//!
//! Writes made inside a transaction:
//! - Are visible through the transactional view only
//! - Vanish completely on rollback
//! - Land exactly as buffered on commit

use chunkdb::chunk::ChunkErrorCode;
use chunkdb::source::{ByteSource, MemorySource};
use chunkdb::transaction::TxSource;
use chunkdb::{Store, StoreConfig};

fn eight_bytes() -> TxSource<MemorySource> {
    TxSource::new(MemorySource::from_bytes((0u8..8).collect()))
}

// =============================================================================
// Overlay Tests
// =============================================================================

/// A pending byte is seen through the overlay but not through the raw source.
#[test]
fn test_pending_write_is_isolated() {
    let mut source = eight_bytes();
    let token = source.begin().unwrap();
    source.write_byte(5, 0xAA).unwrap();

    assert_eq!(source.read_byte(5).unwrap(), 0xAA);
    assert_eq!(source.raw().as_bytes()[5], 5);
    source.rollback(token).unwrap();
}

/// Rollback leaves the source byte-identical.
#[test]
fn test_rollback_restores_bytes() {
    let mut source = eight_bytes();
    let token = source.begin().unwrap();
    source.write_byte(5, 0xAA).unwrap();
    source.resize(32).unwrap();
    source.write_range(20, b"tail").unwrap();
    source.rollback(token).unwrap();

    assert_eq!(source.raw().as_bytes(), &[0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(source.read_byte(5).unwrap(), 5);
    assert_eq!(source.length().unwrap(), 8);
}

/// Commit applies exactly the buffered writes.
#[test]
fn test_commit_applies_writes() {
    let mut source = eight_bytes();
    let token = source.begin().unwrap();
    source.write_byte(5, 0xAA).unwrap();
    let summary = source.commit(token).unwrap();

    assert_eq!(summary.ranges, 1);
    assert_eq!(summary.bytes, 1);
    assert_eq!(source.raw().as_bytes(), &[0, 1, 2, 3, 4, 0xAA, 6, 7]);
    assert!(!source.is_in_transaction());
}

/// Only one transaction may be open at a time.
#[test]
fn test_nested_begin_rejected() {
    let mut source = eight_bytes();
    let token = source.begin().unwrap();
    assert!(source.begin().is_err());
    source.commit(token).unwrap();
    let again = source.begin().unwrap();
    source.rollback(again).unwrap();
}

// =============================================================================
// Store Transaction Tests
// =============================================================================

/// Chain edits inside a rolled back transaction leave no trace.
#[test]
fn test_store_rollback_discards_chain_edits() {
    let mut store = Store::in_memory(StoreConfig::strict()).unwrap();
    let head = store.new_chain(8).unwrap();
    store.io(head).unwrap().write(b"before").unwrap();
    let snapshot = store.source().as_bytes().to_vec();
    let free_before: Vec<_> = store.free_list().iter().collect();

    {
        let mut tx = store.transaction().unwrap();
        let mut io = tx.io(head).unwrap();
        io.set_capacity(2).unwrap();
        io.seek(0).unwrap();
        io.write(&[b'!'; 300]).unwrap();
        drop(io);
        let other = tx.new_chain(64).unwrap();
        tx.io(other).unwrap().write(b"scratch").unwrap();
        // dropped without commit
    }

    assert_eq!(store.source().as_bytes(), &snapshot[..]);
    let free_after: Vec<_> = store.free_list().iter().collect();
    assert_eq!(free_before, free_after);
    let mut io = store.io(head).unwrap();
    assert_eq!(io.read_to_vec().unwrap(), b"before");
    store.validate_cache().unwrap();
}

/// Committed chain edits survive a reopen.
#[test]
fn test_store_commit_survives_reopen() {
    let mut store = Store::in_memory(StoreConfig::strict()).unwrap();
    let head = store.new_chain(8).unwrap();

    let mut tx = store.transaction().unwrap();
    tx.io(head).unwrap().write(&[7u8; 500]).unwrap();
    tx.commit().unwrap();

    let mut store = Store::open(store.into_source(), StoreConfig::strict()).unwrap();
    let mut io = store.io(head).unwrap();
    assert_eq!(io.read_to_vec().unwrap(), vec![7u8; 500]);
}

/// A token from an earlier transaction cannot close a newer one.
#[test]
fn test_stale_token_rejected() {
    let mut store = Store::in_memory(StoreConfig::default()).unwrap();
    let first = store.begin_transaction().unwrap();
    assert_eq!(first.id(), 1);
    store.rollback(first).unwrap();
    let second = store.begin_transaction().unwrap();

    // a second store hands out the same id sequence
    let mut other = Store::in_memory(StoreConfig::default()).unwrap();
    let stale = other.begin_transaction().unwrap();
    assert_eq!(stale.id(), 1);

    let err = store.commit(stale).unwrap_err();
    assert_eq!(err.code(), ChunkErrorCode::NoTransaction);
    assert!(store.is_in_transaction());
    store.commit(second).unwrap();
}

/// Commit with no transaction open reports NoTransaction.
#[test]
fn test_commit_without_transaction() {
    let mut store = Store::in_memory(StoreConfig::default()).unwrap();
    let mut other = Store::in_memory(StoreConfig::default()).unwrap();
    let foreign = other.begin_transaction().unwrap();

    let err = store.commit(foreign).unwrap_err();
    assert_eq!(err.code(), ChunkErrorCode::NoTransaction);
    assert!(!store.is_in_transaction());
}

/// Writes through the stream commit with the stream's own token.
#[test]
fn test_stream_commit() {
    let mut store = Store::in_memory(StoreConfig::strict()).unwrap();
    let root = store.root();
    let mut io = store.io(root).unwrap();
    let token = io.open_transaction().unwrap();
    io.write(b"root data").unwrap();
    let summary = io.commit(token).unwrap();
    assert!(summary.bytes >= 9);
    assert!(!io.is_in_transaction());

    io.seek(0).unwrap();
    assert_eq!(io.read_to_vec().unwrap(), b"root data");
}
