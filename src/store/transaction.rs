//! Scoped transaction over a store

use std::ops::{Deref, DerefMut};

use super::Store;
use crate::chunk::ChunkResult;
use crate::observability::Logger;
use crate::source::ByteSource;
use crate::transaction::{CommitSummary, TransactionToken};

/// An open transaction that rolls back when dropped uncommitted.
///
/// Derefs to the store, so all chunk operations run inside the transaction.
pub struct Transaction<'a, S: ByteSource> {
    store: &'a mut Store<S>,
    token: Option<TransactionToken>,
}

impl<'a, S: ByteSource> Transaction<'a, S> {
    pub(super) fn begin(store: &'a mut Store<S>) -> ChunkResult<Self> {
        let token = store.begin_transaction()?;
        Ok(Self {
            store,
            token: Some(token),
        })
    }

    pub fn id(&self) -> u64 {
        self.token.as_ref().map_or(0, TransactionToken::id)
    }

    pub fn commit(mut self) -> ChunkResult<CommitSummary> {
        match self.token.take() {
            Some(token) => self.store.commit(token),
            None => Ok(CommitSummary::default()),
        }
    }

    pub fn rollback(mut self) -> ChunkResult<()> {
        match self.token.take() {
            Some(token) => self.store.rollback(token),
            None => Ok(()),
        }
    }
}

impl<S: ByteSource> Deref for Transaction<'_, S> {
    type Target = Store<S>;

    fn deref(&self) -> &Store<S> {
        self.store
    }
}

impl<S: ByteSource> DerefMut for Transaction<'_, S> {
    fn deref_mut(&mut self) -> &mut Store<S> {
        self.store
    }
}

impl<S: ByteSource> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            let id = token.id().to_string();
            if let Err(err) = self.store.rollback(token) {
                Logger::error(
                    "TRANSACTION_DROP_ROLLBACK_FAILED",
                    &[("transaction_id", id.as_str()), ("reason", err.message())],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StoreConfig;
    use crate::source::MemorySource;
    use crate::store::Store;

    fn store() -> Store<MemorySource> {
        Store::in_memory(StoreConfig::strict()).unwrap()
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut store = store();
        let mut tx = store.transaction().unwrap();
        let ptr = tx.allocate_exact(20).unwrap().ptr();
        tx.commit().unwrap();

        assert!(!store.is_in_transaction());
        assert!(store.chunk(ptr).unwrap().is_used());
        assert_eq!(store.source().as_bytes().len() as u64, store.length().unwrap());
    }

    #[test]
    fn test_drop_rolls_back() {
        let mut store = store();
        let before = store.source().as_bytes().to_vec();
        {
            let mut tx = store.transaction().unwrap();
            tx.allocate_exact(20).unwrap();
            assert!(tx.is_in_transaction());
        }
        assert!(!store.is_in_transaction());
        assert_eq!(store.source().as_bytes(), &before[..]);
        assert_eq!(store.length().unwrap(), before.len() as u64);
    }

    #[test]
    fn test_second_transaction_rejected() {
        let mut store = store();
        let mut tx = store.transaction().unwrap();
        let err = tx.begin_transaction().unwrap_err();
        assert_eq!(err.code(), crate::chunk::ChunkErrorCode::TransactionAlreadyOpen);
        tx.rollback().unwrap();
    }
}
