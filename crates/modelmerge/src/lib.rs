//! Merge duplicate ORM records into one survivor.
//!
//! `modelmerge` folds *alias* records into a *primary* record of the same
//! model. Every relationship that pointed at an alias is re-pointed at the
//! primary, blank primary fields are back-filled from the aliases, and the
//! aliases are deleted unless asked to keep them.
//!
//! # Role In The Architecture
//!
//! - **`modelmerge-core`**: values, records, model metadata and the registry
//!   that enumerates reverse relationships.
//! - **`modelmerge-store`**: the `RecordStore` persistence seam, transactions
//!   and the in-memory reference store.
//! - **`modelmerge`** (this crate): the merge procedure and its options.
//!
//! # Example
//!
//! ```ignore
//! use modelmerge::prelude::*;
//!
//! let mut registry = ModelRegistry::new();
//! registry.register::<User>()?.register::<Post>()?;
//! let mut store = MemoryStore::new(&registry);
//!
//! let primary = store.get("user", &Value::Int(1))?.unwrap();
//! let duplicate = store.get("user", &Value::Int(2))?.unwrap();
//!
//! let merged = merge_atomic(
//!     &mut store,
//!     &registry,
//!     primary,
//!     vec![duplicate],
//!     MergeOptions::new().migrate_related(true),
//! )?;
//! ```

pub mod merge;
pub mod options;

pub use merge::{Merger, merge, merge_atomic, merge_models};
pub use options::MergeOptions;

pub use modelmerge_core::{
    Error, FieldInfo, GenericRefInfo, LinkTableInfo, Model, ModelConfig, ModelMeta,
    ModelRegistry, Record, RelatedObject, RelationshipInfo, RelationshipKind, Result, SqlType,
    StoreErrorKind, TypeErrorKind, Value,
};
pub use modelmerge_store::{
    LinkRow, LinkTableOp, MemoryStore, RecordStore, TransactionOps, atomic,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Error, FieldInfo, GenericRefInfo, LinkRow, LinkTableInfo, LinkTableOp, MemoryStore,
        MergeOptions, Merger, Model, ModelConfig, ModelMeta, ModelRegistry, Record, RecordStore,
        RelationshipInfo, RelationshipKind, Result, SqlType, StoreErrorKind, TransactionOps,
        TypeErrorKind, Value, merge, merge_atomic, merge_models,
    };
}
