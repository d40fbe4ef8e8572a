//! In-memory `RecordStore`.
//!
//! Tables are vectors of records keyed by model name; link tables are
//! vectors of `LinkRow`s keyed by table name. Transactions snapshot the
//! whole data set on `begin` and restore it on `rollback`.

use crate::link::{LinkRow, LinkTableOp};
use crate::{RecordStore, TransactionOps};
use modelmerge_core::{
    Error, LinkTableInfo, ModelRegistry, Record, RelationshipKind, Result, StoreErrorKind,
    TransactionError, TransactionErrorKind, Value,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
struct Tables {
    rows: BTreeMap<String, Vec<Record>>,
    links: BTreeMap<&'static str, Vec<LinkRow>>,
}

/// A link table and the models its two columns reference.
#[derive(Debug, Clone, Copy)]
struct LinkRef {
    link: LinkTableInfo,
    local_model: &'static str,
    remote_model: &'static str,
}

/// In-memory store built from a `ModelRegistry`.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    primary_keys: HashMap<&'static str, &'static str>,
    link_refs: Vec<LinkRef>,
    data: Tables,
    snapshot: Option<Tables>,
    saves: usize,
    deletes: usize,
    link_ops: usize,
    fail_saves_after: Option<usize>,
    fail_deletes_after: Option<usize>,
    fail_link_ops_after: Option<usize>,
}

impl MemoryStore {
    /// Create an empty store for every model in `registry`.
    pub fn new(registry: &ModelRegistry) -> Self {
        let mut primary_keys = HashMap::new();
        let mut link_refs: Vec<LinkRef> = Vec::new();
        let mut data = Tables::default();

        for model in registry.models() {
            primary_keys.insert(model.name, model.primary_key);
            data.rows.insert(model.name.to_string(), Vec::new());
            for rel in model.relationships {
                if rel.kind != RelationshipKind::ManyToMany {
                    continue;
                }
                let Some(link) = rel.link_table else { continue };
                if link_refs.iter().any(|r| r.link == link) {
                    continue;
                }
                data.links.insert(link.table_name, Vec::new());
                link_refs.push(LinkRef {
                    link,
                    local_model: model.name,
                    remote_model: rel.related_model,
                });
            }
        }

        Self {
            primary_keys,
            link_refs,
            data,
            snapshot: None,
            saves: 0,
            deletes: 0,
            link_ops: 0,
            fail_saves_after: None,
            fail_deletes_after: None,
            fail_link_ops_after: None,
        }
    }

    /// Make every save after the next `n` successful ones fail.
    pub fn fail_saves_after(&mut self, n: usize) {
        self.fail_saves_after = Some(self.saves + n);
    }

    /// Make every delete after the next `n` successful ones fail.
    pub fn fail_deletes_after(&mut self, n: usize) {
        self.fail_deletes_after = Some(self.deletes + n);
    }

    /// Make every link table operation after the next `n` successful ones fail.
    pub fn fail_link_ops_after(&mut self, n: usize) {
        self.fail_link_ops_after = Some(self.link_ops + n);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    /// Number of successful deletes so far.
    pub fn delete_count(&self) -> usize {
        self.deletes
    }

    /// All records of `model`, in insertion order.
    pub fn all(&self, model: &str) -> &[Record] {
        self.data.rows.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All rows of a link table.
    pub fn links(&self, table: &str) -> &[LinkRow] {
        self.data.links.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn pk_column(&self, model: &str) -> Result<&'static str> {
        self.primary_keys.get(model).copied().ok_or_else(|| {
            Error::store(
                StoreErrorKind::NotFound,
                Some(model),
                format!("no table for model '{model}'"),
            )
        })
    }

    fn link_rows_mut(&mut self, table: &str) -> Result<&mut Vec<LinkRow>> {
        self.data.links.get_mut(table).ok_or_else(|| {
            Error::store(
                StoreErrorKind::NotFound,
                None,
                format!("no link table '{table}'"),
            )
        })
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, model: &str, pk: &Value) -> Result<Option<Record>> {
        let pk_column = self.pk_column(model)?;
        Ok(self
            .all(model)
            .iter()
            .find(|r| r.get(pk_column) == pk)
            .cloned())
    }

    fn filter(&self, model: &str, column: &str, value: &Value) -> Result<Vec<Record>> {
        self.pk_column(model)?;
        Ok(self
            .all(model)
            .iter()
            .filter(|r| r.get(column) == value)
            .cloned()
            .collect())
    }

    #[tracing::instrument(level = "trace", skip(self, record), fields(model = record.model()))]
    fn save(&mut self, record: &Record) -> Result<()> {
        let model = record.model();
        let pk_column = self.pk_column(model)?;
        let pk = record.get(pk_column);
        if pk.is_null() {
            return Err(Error::store(
                StoreErrorKind::Constraint,
                Some(model),
                format!("cannot save a record without '{pk_column}'"),
            ));
        }
        if exhausted(self.fail_saves_after, self.saves) {
            return Err(write_failed(Some(model), format!("write rejected for {pk_column}={pk}")));
        }

        let rows = self.data.rows.entry(model.to_string()).or_default();
        match rows.iter_mut().find(|r| r.get(pk_column) == pk) {
            Some(existing) => *existing = record.clone(),
            None => rows.push(record.clone()),
        }
        self.saves += 1;
        tracing::trace!(pk = %pk, "Saved record");
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn delete(&mut self, model: &str, pk: &Value) -> Result<bool> {
        let pk_column = self.pk_column(model)?;
        if exhausted(self.fail_deletes_after, self.deletes) {
            return Err(write_failed(Some(model), format!("delete rejected for {pk_column}={pk}")));
        }
        let Some(rows) = self.data.rows.get_mut(model) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| r.get(pk_column) != pk);
        if rows.len() == before {
            return Ok(false);
        }

        for link_ref in &self.link_refs {
            let Some(links) = self.data.links.get_mut(link_ref.link.table_name) else {
                continue;
            };
            let local_hit = link_ref.local_model == model;
            let remote_hit = link_ref.remote_model == model;
            links.retain(|row| !((local_hit && &row.local == pk) || (remote_hit && &row.remote == pk)));
        }

        self.deletes += 1;
        Ok(true)
    }

    fn linked(&self, link: &LinkTableInfo, column: &str, value: &Value) -> Result<Vec<LinkRow>> {
        if link.other_column(column).is_none() {
            return Err(Error::store(
                StoreErrorKind::NotFound,
                None,
                format!("link table '{}' has no column '{column}'", link.table_name),
            ));
        }
        Ok(self
            .links(link.table_name)
            .iter()
            .filter(|row| row.get(link, column) == Some(value))
            .cloned()
            .collect())
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn apply_link_op(&mut self, op: &LinkTableOp) -> Result<()> {
        if exhausted(self.fail_link_ops_after, self.link_ops) {
            return Err(write_failed(None, format!("link op rejected on '{}'", op.table())));
        }
        let rows = self.link_rows_mut(op.table())?;
        match op {
            LinkTableOp::Link { row, .. } => {
                if !rows.contains(row) {
                    rows.push(row.clone());
                }
            }
            LinkTableOp::Unlink { row, .. } => rows.retain(|r| r != row),
        }
        self.link_ops += 1;
        Ok(())
    }
}

impl TransactionOps for MemoryStore {
    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::AlreadyActive,
                message: "transaction already active".to_string(),
            }));
        }
        self.snapshot = Some(self.data.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot.take().map(|_| ()).ok_or_else(not_active)
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self.snapshot.take().ok_or_else(not_active)?;
        self.data = snapshot;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }
}

fn exhausted(limit: Option<usize>, count: usize) -> bool {
    limit.is_some_and(|limit| count >= limit)
}

fn write_failed(model: Option<&str>, message: String) -> Error {
    Error::store(StoreErrorKind::WriteFailed, model, message)
}

fn not_active() -> Error {
    Error::Transaction(TransactionError {
        kind: TransactionErrorKind::NotActive,
        message: "no active transaction".to_string(),
    })
}
