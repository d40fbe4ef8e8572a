//! Field (column) metadata.

use crate::types::SqlType;

/// Metadata about a model field/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// Column name (may differ from field name)
    pub column_name: &'static str,
    /// Column type
    pub sql_type: SqlType,
    /// Whether this field is nullable
    pub nullable: bool,
    /// Whether this is the primary key
    pub primary_key: bool,
    /// Whether this field is generated by the backend
    pub auto_increment: bool,
    /// Whether this field has a unique constraint
    pub unique: bool,
    /// Foreign key reference (`table.column`)
    pub foreign_key: Option<&'static str>,
}

impl FieldInfo {
    /// Create a new field whose column name equals its field name.
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            column_name: name,
            sql_type,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            foreign_key: None,
        }
    }

    /// Set the column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    pub const fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }

    /// Set the foreign key reference (`table.column`).
    pub const fn foreign_key(mut self, reference: &'static str) -> Self {
        self.foreign_key = Some(reference);
        self
    }

    /// Identity fields (primary key or backend-generated) are never copied
    /// between records or re-pointed.
    pub const fn is_identity(&self) -> bool {
        self.primary_key || self.auto_increment
    }

    /// Split the foreign key reference into `(table, column)`.
    ///
    /// A reference without a dot names the table only; the column is `None`
    /// and resolves to the referenced table's primary key.
    pub fn foreign_key_target(&self) -> Option<(&'static str, Option<&'static str>)> {
        let reference = self.foreign_key?;
        Some(match reference.split_once('.') {
            Some((table, column)) => (table, Some(column)),
            None => (reference, None),
        })
    }
}
