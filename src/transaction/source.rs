//! Transactional overlay around a byte source
//!
//! While a transaction is open every write lands in [`PendingWrites`] and
//! every read sees the pending bytes on top of the untouched source. Commit
//! applies the buffer to the source; rollback drops it.

use std::sync::atomic::{AtomicBool, Ordering};

use super::overlay::PendingWrites;
use crate::source::{check_range, ByteSource, SourceError, SourceResult};

/// Proof that the holder opened the current transaction.
///
/// Consumed by commit or rollback.
#[must_use = "an open transaction must be committed or rolled back"]
#[derive(Debug, PartialEq, Eq)]
pub struct TransactionToken {
    id: u64,
}

impl TransactionToken {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// What a commit wrote to the underlying source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub ranges: usize,
    pub bytes: u64,
    pub resized_to: Option<u64>,
}

/// A byte source with an optional open transaction.
///
/// With no transaction open all calls pass straight through.
#[derive(Debug)]
pub struct TxSource<S> {
    inner: S,
    active: AtomicBool,
    last_id: u64,
    open_id: Option<u64>,
    pending: PendingWrites,
}

impl<S: ByteSource> TxSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            active: AtomicBool::new(false),
            last_id: 0,
            open_id: None,
            pending: PendingWrites::new(),
        }
    }

    /// The underlying source, bypassing any pending writes.
    pub fn raw(&self) -> &S {
        &self.inner
    }

    /// Unwraps the source. Pending writes of an open transaction are discarded.
    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn is_in_transaction(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> &PendingWrites {
        &self.pending
    }

    /// Opens a transaction. Fails with `TransactionAlreadyOpen` if one is open.
    pub fn begin(&mut self) -> SourceResult<TransactionToken> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SourceError::TransactionAlreadyOpen)?;
        self.last_id += 1;
        self.open_id = Some(self.last_id);
        self.pending.clear();
        Ok(TransactionToken { id: self.last_id })
    }

    /// Applies every pending write and the capacity override to the source.
    ///
    /// The transaction is closed even when applying fails part way.
    pub fn commit(&mut self, token: TransactionToken) -> SourceResult<CommitSummary> {
        self.check_token(&token)?;
        let pending = std::mem::take(&mut self.pending);
        self.close();

        let mut summary = CommitSummary::default();
        let inner_len = self.inner.length()?;
        if let Some(floor) = pending.truncate_floor() {
            if floor < inner_len {
                self.inner.resize(floor)?;
            }
        }
        if let Some(capacity) = pending.capacity_override() {
            if capacity != self.inner.length()? {
                self.inner.resize(capacity)?;
            }
            summary.resized_to = Some(capacity);
        }
        for (offset, bytes) in pending.ranges() {
            self.inner.write_range(offset, bytes)?;
            summary.ranges += 1;
            summary.bytes += bytes.len() as u64;
        }
        Ok(summary)
    }

    /// Discards the open transaction; the source is left untouched.
    pub fn rollback(&mut self, token: TransactionToken) -> SourceResult<()> {
        self.check_token(&token)?;
        self.pending.clear();
        self.close();
        Ok(())
    }

    fn check_token(&self, token: &TransactionToken) -> SourceResult<()> {
        if self.is_in_transaction() && self.open_id == Some(token.id) {
            Ok(())
        } else {
            Err(SourceError::NoTransaction(token.id))
        }
    }

    fn close(&mut self) {
        self.open_id = None;
        self.active.store(false, Ordering::Release);
    }

    /// End of the region still backed by the underlying source.
    fn readable_inner_end(&self) -> SourceResult<u64> {
        let inner_len = self.inner.length()?;
        Ok(match self.pending.truncate_floor() {
            Some(floor) => floor.min(inner_len),
            None => inner_len,
        })
    }
}

impl<S: ByteSource> ByteSource for TxSource<S> {
    fn length(&self) -> SourceResult<u64> {
        match self.pending.capacity_override() {
            Some(capacity) if self.is_in_transaction() => Ok(capacity),
            _ => self.inner.length(),
        }
    }

    fn resize(&mut self, new_length: u64) -> SourceResult<()> {
        if self.is_in_transaction() {
            self.pending.set_capacity(new_length);
            Ok(())
        } else {
            self.inner.resize(new_length)
        }
    }

    fn read_range(&mut self, offset: u64, buf: &mut [u8]) -> SourceResult<()> {
        if !self.is_in_transaction() {
            return self.inner.read_range(offset, buf);
        }
        check_range(offset, buf.len(), self.length()?)?;

        let inner_end = self.readable_inner_end()?;
        let end = offset + buf.len() as u64;
        let backed_end = end.min(inner_end).max(offset);
        let split = (backed_end - offset) as usize;

        let (backed, fresh) = buf.split_at_mut(split);
        if !backed.is_empty() {
            self.inner.read_range(offset, backed)?;
        }
        fresh.fill(0);
        self.pending.overlay_onto(offset, buf);
        Ok(())
    }

    fn write_range(&mut self, offset: u64, data: &[u8]) -> SourceResult<()> {
        if !self.is_in_transaction() {
            return self.inner.write_range(offset, data);
        }
        check_range(offset, data.len(), self.length()?)?;
        self.pending.insert(offset, data);
        Ok(())
    }

    fn flush(&mut self) -> SourceResult<()> {
        if self.is_in_transaction() {
            // nothing durable until commit
            return Ok(());
        }
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::word::WordWidth;

    fn eight_bytes() -> TxSource<MemorySource> {
        TxSource::new(MemorySource::from_bytes((0u8..8).collect()))
    }

    #[test]
    fn test_rollback_leaves_source_untouched() {
        let mut source = eight_bytes();
        let token = source.begin().unwrap();
        source.write_byte(5, 0xAA).unwrap();
        assert_eq!(source.read_byte(5).unwrap(), 0xAA);
        assert_eq!(source.raw().as_bytes()[5], 5);
        source.rollback(token).unwrap();
        assert_eq!(source.raw().as_bytes(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(source.read_byte(5).unwrap(), 5);
    }

    #[test]
    fn test_commit_applies_only_buffered_bytes() {
        let mut source = eight_bytes();
        let token = source.begin().unwrap();
        source.write_byte(5, 0xAA).unwrap();
        let summary = source.commit(token).unwrap();
        assert_eq!(summary.ranges, 1);
        assert_eq!(summary.bytes, 1);
        assert_eq!(source.raw().as_bytes(), &[0, 1, 2, 3, 4, 0xAA, 6, 7]);
        assert!(!source.is_in_transaction());
    }

    #[test]
    fn test_nested_begin_fails() {
        let mut source = eight_bytes();
        let token = source.begin().unwrap();
        assert!(matches!(source.begin(), Err(SourceError::TransactionAlreadyOpen)));
        source.rollback(token).unwrap();
        let token = source.begin().unwrap();
        source.rollback(token).unwrap();
    }

    #[test]
    fn test_stale_token_rejected() {
        let mut source = eight_bytes();
        let first = source.begin().unwrap();
        let first_id = first.id();
        source.rollback(first).unwrap();
        let _second = source.begin().unwrap();
        let forged = TransactionToken { id: first_id };
        assert!(matches!(source.commit(forged), Err(SourceError::NoTransaction(_))));
        assert!(source.is_in_transaction());
    }

    #[test]
    fn test_capacity_override_grow() {
        let mut source = eight_bytes();
        let token = source.begin().unwrap();
        source.resize(12).unwrap();
        assert_eq!(source.length().unwrap(), 12);
        assert_eq!(source.raw().length().unwrap(), 8);
        source.write_range(9, &[9, 9]).unwrap();
        let mut buf = [0xEEu8; 6];
        source.read_range(6, &mut buf).unwrap();
        assert_eq!(buf, [6, 7, 0, 9, 9, 0]);
        source.commit(token).unwrap();
        assert_eq!(
            source.raw().as_bytes(),
            &[0, 1, 2, 3, 4, 5, 6, 7, 0, 9, 9, 0]
        );
    }

    #[test]
    fn test_shrink_then_grow_reads_zeros() {
        let mut source = eight_bytes();
        let token = source.begin().unwrap();
        source.resize(4).unwrap();
        assert!(source.read_byte(5).is_err());
        source.resize(8).unwrap();
        let mut buf = [0xEEu8; 8];
        source.read_range(0, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 0, 0, 0, 0]);
        source.commit(token).unwrap();
        assert_eq!(source.raw().as_bytes(), &[0, 1, 2, 3, 0, 0, 0, 0]);
    }

    #[test]
    fn test_words_through_overlay() {
        let mut source = eight_bytes();
        let token = source.begin().unwrap();
        source.write_word(0, 0x0102_0304, WordWidth::Int).unwrap();
        assert_eq!(source.read_word(0, WordWidth::Int).unwrap(), 0x0102_0304);
        assert_eq!(source.raw().as_bytes()[..4], [0, 1, 2, 3]);
        source.rollback(token).unwrap();
    }

    #[test]
    fn test_write_beyond_apparent_length_fails() {
        let mut source = eight_bytes();
        let token = source.begin().unwrap();
        assert!(source.write_range(7, &[1, 2]).is_err());
        assert!(source.pending().is_empty());
        source.rollback(token).unwrap();
    }
}
