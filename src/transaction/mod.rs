//! Transactional write overlay
//!
//! States: Closed → Open → (Committed | RolledBack) → Closed.
//!
//! - Only one transaction may be open per source; a second `begin` fails
//! - Reads inside a transaction see pending writes over the source bytes
//! - Readers of [`TxSource::raw`] never see uncommitted writes
//! - Rollback leaves the source byte-identical to its state at `begin`

mod overlay;
mod source;

pub use overlay::PendingWrites;
pub use source::{CommitSummary, TransactionToken, TxSource};
