//! Error types for modelmerge operations.

use std::fmt;

/// The primary error type for all modelmerge operations.
#[derive(Debug)]
pub enum Error {
    /// Model type errors (unsupported model, mismatched alias, value conversion)
    Type(TypeError),
    /// Persistence errors raised by a `RecordStore`
    Store(StoreError),
    /// Model registry / metadata errors
    Schema(SchemaError),
    /// Transaction errors
    Transaction(TransactionError),
    /// Configuration errors
    Config(ConfigError),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub expected: String,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeErrorKind {
    /// The record's model is not a registered table model
    UnsupportedModel,
    /// An alias is not the same concrete model as the primary
    ModelMismatch,
    /// A record carries no primary key value
    MissingPrimaryKey,
    /// An alias is the primary record itself
    SelfMerge,
    /// A column value could not be converted
    Conversion,
}

#[derive(Debug)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub model: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Record or table not found
    NotFound,
    /// Constraint violation
    Constraint,
    /// Write rejected by the backend
    WriteFailed,
    /// Other backend error
    Backend,
}

#[derive(Debug)]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// Model name already registered
    DuplicateModel,
    /// Model not registered
    ModelNotFound,
    /// Column not declared on the model
    ColumnNotFound,
    /// Identifier is not a valid model/table/column name
    InvalidIdentifier,
    /// Inconsistent relationship declaration
    InvalidRelationship,
}

#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// `begin` called while a transaction is open
    AlreadyActive,
    /// `commit`/`rollback` called with no open transaction
    NotActive,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Build an `Error::Type` for a record whose model cannot be merged.
    pub fn unsupported_model(model: impl Into<String>) -> Self {
        Error::Type(TypeError {
            kind: TypeErrorKind::UnsupportedModel,
            expected: "registered table model".to_string(),
            actual: model.into(),
            column: None,
        })
    }

    /// Build an `Error::Type` for an alias of a different model.
    pub fn model_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::Type(TypeError {
            kind: TypeErrorKind::ModelMismatch,
            expected: expected.into(),
            actual: actual.into(),
            column: None,
        })
    }

    /// Build an `Error::Schema`.
    pub fn schema(kind: SchemaErrorKind, message: impl Into<String>) -> Self {
        Error::Schema(SchemaError {
            kind,
            message: message.into(),
        })
    }

    /// Build an `Error::Store` with no underlying source.
    pub fn store(kind: StoreErrorKind, model: Option<&str>, message: impl Into<String>) -> Self {
        Error::Store(StoreError {
            kind,
            model: model.map(str::to_string),
            message: message.into(),
            source: None,
        })
    }

    /// The type error kind, if this is a type error.
    pub fn type_kind(&self) -> Option<TypeErrorKind> {
        match self {
            Error::Type(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Is this one of the pre-mutation validation errors raised by a merge?
    pub fn is_merge_validation(&self) -> bool {
        matches!(
            self.type_kind(),
            Some(
                TypeErrorKind::UnsupportedModel
                    | TypeErrorKind::ModelMismatch
                    | TypeErrorKind::MissingPrimaryKey
                    | TypeErrorKind::SelfMerge
            )
        )
    }

    /// Is this a persistence failure?
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Type(e) => match e.kind {
                TypeErrorKind::UnsupportedModel => {
                    write!(f, "Only registered table models can be merged, got '{}'", e.actual)
                }
                TypeErrorKind::ModelMismatch => write!(
                    f,
                    "Only models of same class can be merged: expected '{}', found '{}'",
                    e.expected, e.actual
                ),
                _ => write!(f, "Type error: {}", e),
            },
            Error::Store(e) => match &e.model {
                Some(model) => write!(f, "Store error on '{}': {}", model, e.message),
                None => write!(f, "Store error: {}", e.message),
            },
            Error::Schema(e) => write!(f, "Schema error: {}", e.message),
            Error::Transaction(e) => write!(f, "Transaction error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for modelmerge operations.
pub type Result<T> = std::result::Result<T, Error>;
