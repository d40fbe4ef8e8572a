//! Link table rows and pending link operations (many-to-many).

use modelmerge_core::{LinkTableInfo, Value};
use serde::{Deserialize, Serialize};

/// One row of a link table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRow {
    /// Value of the link table's local column.
    pub local: Value,
    /// Value of the link table's remote column.
    pub remote: Value,
}

impl LinkRow {
    pub fn new(local: impl Into<Value>, remote: impl Into<Value>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }

    /// Read the value stored under `column` of `link`.
    pub fn get(&self, link: &LinkTableInfo, column: &str) -> Option<&Value> {
        if column == link.local_column {
            Some(&self.local)
        } else if column == link.remote_column {
            Some(&self.remote)
        } else {
            None
        }
    }

    /// Build a row from a `(column, value)` pair and the value for the
    /// opposite column.
    pub fn from_sides(
        link: &LinkTableInfo,
        column: &str,
        value: Value,
        other: Value,
    ) -> Option<Self> {
        if column == link.local_column {
            Some(Self::new(value, other))
        } else if column == link.remote_column {
            Some(Self::new(other, value))
        } else {
            None
        }
    }
}

/// A pending link table operation (for many-to-many relationships).
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTableOp {
    /// Insert a link.
    Link {
        /// Link table.
        link: LinkTableInfo,
        /// Row to insert.
        row: LinkRow,
    },
    /// Delete a link.
    Unlink {
        /// Link table.
        link: LinkTableInfo,
        /// Row to delete.
        row: LinkRow,
    },
}

impl LinkTableOp {
    /// Create a link operation.
    pub fn link(link: LinkTableInfo, row: LinkRow) -> Self {
        Self::Link { link, row }
    }

    /// Create an unlink operation.
    pub fn unlink(link: LinkTableInfo, row: LinkRow) -> Self {
        Self::Unlink { link, row }
    }

    /// Get the table name.
    pub fn table(&self) -> &'static str {
        match self {
            LinkTableOp::Link { link, .. } | LinkTableOp::Unlink { link, .. } => link.table_name,
        }
    }

    /// The row this operation inserts or deletes.
    pub fn row(&self) -> &LinkRow {
        match self {
            LinkTableOp::Link { row, .. } | LinkTableOp::Unlink { row, .. } => row,
        }
    }

    /// Check if this is a link (insert) operation.
    pub fn is_link(&self) -> bool {
        matches!(self, LinkTableOp::Link { .. })
    }

    /// Check if this is an unlink (delete) operation.
    pub fn is_unlink(&self) -> bool {
        matches!(self, LinkTableOp::Unlink { .. })
    }
}
