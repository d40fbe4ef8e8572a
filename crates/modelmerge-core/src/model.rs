//! Model trait and runtime model metadata.
//!
//! The `Model` trait describes a typed struct mapped to a table. The merge
//! itself works on `ModelMeta`, a runtime copy of that static metadata, so
//! that one registry can hold every model regardless of its Rust type.

use crate::Result;
use crate::field::FieldInfo;
use crate::record::Record;
use crate::relationship::{GenericRefInfo, RelationshipInfo};

/// Model-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Whether this model maps to a concrete table. Abstract models have no
    /// rows of their own and cannot be merged.
    pub table: bool,
}

impl ModelConfig {
    /// Config for a concrete table model.
    pub const fn table() -> Self {
        Self { table: true }
    }

    /// Config for an abstract (non-table) model.
    pub const fn abstract_model() -> Self {
        Self { table: false }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::table()
    }
}

/// Trait for types that can be mapped to database tables.
///
/// # Example
///
/// ```ignore
/// impl Model for Hero {
///     const MODEL_NAME: &'static str = "hero";
///     const TABLE_NAME: &'static str = "heroes";
///     const PRIMARY_KEY: &'static str = "id";
///     const RELATIONSHIPS: &'static [RelationshipInfo] = &[
///         RelationshipInfo::new("team", "team", RelationshipKind::ManyToOne).local_key("team_id"),
///     ];
///
///     fn fields() -> &'static [FieldInfo] { HERO_FIELDS }
///     fn to_record(&self) -> Record { /* ... */ }
///     fn from_record(record: &Record) -> Result<Self> { /* ... */ }
/// }
/// ```
pub trait Model: Sized {
    /// Registry name of the model.
    const MODEL_NAME: &'static str;

    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// The primary key column name.
    const PRIMARY_KEY: &'static str;

    /// Relationships declared on this model.
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[];

    /// Polymorphic references declared on this model.
    const GENERIC_REFERENCES: &'static [GenericRefInfo] = &[];

    /// Get field metadata for all columns.
    fn fields() -> &'static [FieldInfo];

    /// Convert this instance to a dynamic record.
    fn to_record(&self) -> Record;

    /// Construct an instance from a dynamic record.
    fn from_record(record: &Record) -> Result<Self>;

    /// Get the model configuration.
    fn model_config() -> ModelConfig {
        ModelConfig::table()
    }
}

/// Runtime metadata for one registered model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMeta {
    pub name: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
    pub fields: &'static [FieldInfo],
    pub relationships: &'static [RelationshipInfo],
    pub generic_references: &'static [GenericRefInfo],
    pub config: ModelConfig,
}

impl ModelMeta {
    /// Build metadata for a model that has no Rust type of its own.
    pub const fn new(
        name: &'static str,
        table: &'static str,
        primary_key: &'static str,
        fields: &'static [FieldInfo],
    ) -> Self {
        Self {
            name,
            table,
            primary_key,
            fields,
            relationships: &[],
            generic_references: &[],
            config: ModelConfig::table(),
        }
    }

    /// Capture the static metadata of a typed model.
    pub fn of<M: Model>() -> Self {
        Self {
            name: M::MODEL_NAME,
            table: M::TABLE_NAME,
            primary_key: M::PRIMARY_KEY,
            fields: M::fields(),
            relationships: M::RELATIONSHIPS,
            generic_references: M::GENERIC_REFERENCES,
            config: M::model_config(),
        }
    }

    pub const fn relationships(mut self, relationships: &'static [RelationshipInfo]) -> Self {
        self.relationships = relationships;
        self
    }

    pub const fn generic_references(mut self, refs: &'static [GenericRefInfo]) -> Self {
        self.generic_references = refs;
        self
    }

    pub const fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Look up a field by column name.
    pub fn field(&self, column: &str) -> Option<&'static FieldInfo> {
        self.fields.iter().find(|f| f.column_name == column)
    }

    /// Whether `column` is declared on this model (the primary key always is).
    pub fn has_column(&self, column: &str) -> bool {
        column == self.primary_key || self.field(column).is_some()
    }

    /// Whether `column` is an identity column (primary key or generated).
    pub fn is_identity(&self, column: &str) -> bool {
        column == self.primary_key || self.field(column).is_some_and(FieldInfo::is_identity)
    }

    /// Columns a merge may back-fill: every non-identity field.
    pub fn fillable_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|f| !f.is_identity() && f.column_name != self.primary_key)
            .map(|f| f.column_name)
    }

    /// Whether records of this model can take part in a merge.
    pub fn is_mergeable(&self) -> bool {
        self.config.table
    }
}
