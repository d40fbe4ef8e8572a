//! Persistence seam for modelmerge.
//!
//! A merge never talks to a database directly. It reads and writes records
//! through `RecordStore`, one call per record, and relies on `TransactionOps`
//! when the caller wants the whole merge to be all-or-nothing.
//!
//! `MemoryStore` is the in-memory reference implementation.

pub mod link;
pub mod memory;

pub use link::{LinkRow, LinkTableOp};
pub use memory::MemoryStore;

use modelmerge_core::{LinkTableInfo, Record, Result, Value};

/// Record-level persistence operations.
pub trait RecordStore {
    /// Fetch a record by primary key.
    fn get(&self, model: &str, pk: &Value) -> Result<Option<Record>>;

    /// Fetch every record of `model` whose `column` equals `value`.
    fn filter(&self, model: &str, column: &str, value: &Value) -> Result<Vec<Record>>;

    /// Insert or update a record by primary key.
    fn save(&mut self, record: &Record) -> Result<()>;

    /// Delete a record by primary key, along with link rows that reference
    /// it. Returns whether a record was removed.
    fn delete(&mut self, model: &str, pk: &Value) -> Result<bool>;

    /// Link rows of `link` whose `column` equals `value`.
    fn linked(&self, link: &LinkTableInfo, column: &str, value: &Value) -> Result<Vec<LinkRow>>;

    /// Add or remove a many-to-many member.
    fn apply_link_op(&mut self, op: &LinkTableOp) -> Result<()>;

    /// Whether `row` is present in `link`.
    fn link_exists(&self, link: &LinkTableInfo, row: &LinkRow) -> Result<bool> {
        Ok(self
            .linked(link, link.local_column, &row.local)?
            .iter()
            .any(|r| r.remote == row.remote))
    }
}

/// Transaction control.
pub trait TransactionOps {
    /// Open a transaction.
    fn begin(&mut self) -> Result<()>;

    /// Make every write since `begin` permanent.
    fn commit(&mut self) -> Result<()>;

    /// Discard every write since `begin`.
    fn rollback(&mut self) -> Result<()>;

    /// Whether a transaction is open.
    fn in_transaction(&self) -> bool;
}

/// Run `f` inside a transaction: commit on success, roll back on error.
///
/// The error returned by `f` is passed through unchanged; a rollback failure
/// is logged and does not replace it.
#[tracing::instrument(level = "debug", skip(store, f))]
pub fn atomic<S, T, F>(store: &mut S, f: F) -> Result<T>
where
    S: TransactionOps + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    store.begin()?;
    match f(store) {
        Ok(value) => {
            store.commit()?;
            Ok(value)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rolling back transaction");
            if let Err(rollback_err) = store.rollback() {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}
