//! Core types and metadata for modelmerge.
//!
//! This crate provides the foundations a merge works on:
//!
//! - `Value` and `Record` for dynamically-typed model instances
//! - `FieldInfo` / `RelationshipInfo` static metadata
//! - `Model` trait for typed structs, `ModelMeta` for their runtime metadata
//! - `ModelRegistry` for reverse relationship introspection
//! - `Error` / `Result` shared by every modelmerge crate

pub mod error;
pub mod field;
pub mod model;
pub mod record;
pub mod registry;
pub mod relationship;
pub mod types;
pub mod value;

pub use error::{
    ConfigError, Error, Result, SchemaError, SchemaErrorKind, StoreError, StoreErrorKind,
    TransactionError, TransactionErrorKind, TypeError, TypeErrorKind,
};
pub use field::FieldInfo;
pub use model::{Model, ModelConfig, ModelMeta};
pub use record::Record;
pub use registry::{ModelRegistry, is_valid_identifier};
pub use relationship::{
    GenericRefInfo, LinkTableInfo, RelatedObject, RelationshipInfo, RelationshipKind,
};
pub use types::SqlType;
pub use value::Value;
