//! Model registry and reverse relationship introspection.
//!
//! The registry is the schema facility a merge walks: it knows every model,
//! and for any target model it can enumerate the ways other models point at
//! it (reverse foreign keys, one-to-one links, many-to-many link tables,
//! undeclared foreign key columns and polymorphic references).

use crate::error::{Error, Result, SchemaErrorKind};
use crate::model::{Model, ModelMeta};
use crate::relationship::{GenericRefInfo, RelatedObject, RelationshipKind};
use regex::Regex;
use std::sync::OnceLock;

fn identifier_regex() -> Option<&'static Regex> {
    static IDENT: OnceLock<Option<Regex>> = OnceLock::new();
    IDENT
        .get_or_init(|| match Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$") {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(error = %e, "Identifier pattern failed to compile");
                None
            }
        })
        .as_ref()
}

/// Check that `name` is a plain SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_regex().is_some_and(|re| re.is_match(name))
}

fn check_identifier(what: &str, name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(Error::schema(
            SchemaErrorKind::InvalidIdentifier,
            format!("invalid {what} name '{name}'"),
        ))
    }
}

/// A model registry.
///
/// Models are kept in registration order; every enumeration below is
/// deterministic in that order.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelMeta>,
}

impl ModelRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Register a typed model.
    pub fn register<M: Model>(&mut self) -> Result<&mut Self> {
        self.register_meta(ModelMeta::of::<M>())
    }

    /// Register model metadata.
    ///
    /// Validates identifiers, rejects duplicate model names and relationship
    /// keys that are not declared fields of the owning model. References to
    /// models that are registered later are allowed.
    #[tracing::instrument(level = "debug", skip(self, meta), fields(model = meta.name))]
    pub fn register_meta(&mut self, meta: ModelMeta) -> Result<&mut Self> {
        check_identifier("model", meta.name)?;
        check_identifier("table", meta.table)?;
        check_identifier("column", meta.primary_key)?;
        for field in meta.fields {
            check_identifier("column", field.column_name)?;
        }

        if self.get(meta.name).is_some() {
            return Err(Error::schema(
                SchemaErrorKind::DuplicateModel,
                format!("model '{}' is already registered", meta.name),
            ));
        }

        for rel in meta.relationships {
            match rel.kind {
                RelationshipKind::ManyToOne | RelationshipKind::OneToOne => {
                    let key = rel.local_key.ok_or_else(|| {
                        Error::schema(
                            SchemaErrorKind::InvalidRelationship,
                            format!("{}.{} has no local key", meta.name, rel.name),
                        )
                    })?;
                    if !meta.has_column(key) {
                        return Err(Error::schema(
                            SchemaErrorKind::ColumnNotFound,
                            format!(
                                "{}.{} uses local key '{}' which is not a field of {}",
                                meta.name, rel.name, key, meta.name
                            ),
                        ));
                    }
                }
                RelationshipKind::OneToMany => {
                    if rel.remote_key.is_none() {
                        return Err(Error::schema(
                            SchemaErrorKind::InvalidRelationship,
                            format!("{}.{} has no remote key", meta.name, rel.name),
                        ));
                    }
                }
                RelationshipKind::ManyToMany => {
                    let link = rel.link_table.ok_or_else(|| {
                        Error::schema(
                            SchemaErrorKind::InvalidRelationship,
                            format!("{}.{} has no link table", meta.name, rel.name),
                        )
                    })?;
                    check_identifier("table", link.table_name)?;
                    check_identifier("column", link.local_column)?;
                    check_identifier("column", link.remote_column)?;
                    if link.local_column == link.remote_column {
                        return Err(Error::schema(
                            SchemaErrorKind::InvalidRelationship,
                            format!(
                                "{}.{} link table '{}' uses one column for both sides",
                                meta.name, rel.name, link.table_name
                            ),
                        ));
                    }
                    if rel.symmetrical && rel.related_model != meta.name {
                        return Err(Error::schema(
                            SchemaErrorKind::InvalidRelationship,
                            format!(
                                "{}.{} is symmetrical but targets '{}'",
                                meta.name, rel.name, rel.related_model
                            ),
                        ));
                    }
                }
            }
        }

        for generic in meta.generic_references {
            for column in [generic.type_column, generic.id_column] {
                if !meta.has_column(column) {
                    return Err(Error::schema(
                        SchemaErrorKind::ColumnNotFound,
                        format!(
                            "{}.{} uses column '{}' which is not a field of {}",
                            meta.name, generic.name, column, meta.name
                        ),
                    ));
                }
            }
        }

        tracing::debug!(
            table = meta.table,
            fields = meta.fields.len(),
            relationships = meta.relationships.len(),
            "Registered model"
        );
        self.models.push(meta);
        Ok(self)
    }

    /// Look up a model by name.
    pub fn get(&self, name: &str) -> Option<&ModelMeta> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Look up a model by name, failing with a schema error.
    pub fn require(&self, name: &str) -> Result<&ModelMeta> {
        self.get(name).ok_or_else(|| {
            Error::schema(
                SchemaErrorKind::ModelNotFound,
                format!("model '{name}' is not registered"),
            )
        })
    }

    /// Look up a model by table name.
    pub fn by_table(&self, table: &str) -> Option<&ModelMeta> {
        self.models.iter().find(|m| m.table == table)
    }

    /// All registered models, in registration order.
    pub fn models(&self) -> &[ModelMeta] {
        &self.models
    }

    /// Reverse foreign keys: records of other models that reference `target`
    /// through a many-to-one relationship (or that `target` declares as a
    /// one-to-many collection). Each `(model, column)` pair appears once.
    pub fn related_one_to_many(&self, target: &str) -> Result<Vec<RelatedObject>> {
        let target_meta = self.require(target)?;
        let mut out: Vec<RelatedObject> = Vec::new();

        for model in &self.models {
            for rel in model.relationships {
                if rel.kind != RelationshipKind::ManyToOne || rel.related_model != target {
                    continue;
                }
                let Some(column) = rel.local_key else { continue };
                push_unique(
                    &mut out,
                    RelatedObject {
                        kind: RelationshipKind::OneToMany,
                        model: model.name,
                        field: rel.name,
                        column,
                        target_column: target_meta.primary_key,
                        link: None,
                        accessor: rel.reverse_accessor(model.name),
                    },
                );
            }
        }

        for rel in target_meta.relationships {
            if rel.kind != RelationshipKind::OneToMany {
                continue;
            }
            let Some(column) = rel.remote_key else { continue };
            let child = self.require(rel.related_model)?;
            if !child.has_column(column) {
                return Err(Error::schema(
                    SchemaErrorKind::ColumnNotFound,
                    format!(
                        "{}.{} uses remote key '{}' which is not a field of {}",
                        target, rel.name, column, child.name
                    ),
                ));
            }
            push_unique(
                &mut out,
                RelatedObject {
                    kind: RelationshipKind::OneToMany,
                    model: child.name,
                    field: column,
                    column,
                    target_column: target_meta.primary_key,
                    link: None,
                    accessor: Some(rel.name.to_string()),
                },
            );
        }

        Ok(out)
    }

    /// One-to-one links from other models to `target`.
    pub fn related_one_to_one(&self, target: &str) -> Result<Vec<RelatedObject>> {
        let target_meta = self.require(target)?;
        let mut out = Vec::new();
        for model in &self.models {
            for rel in model.relationships {
                if rel.kind != RelationshipKind::OneToOne || rel.related_model != target {
                    continue;
                }
                let Some(column) = rel.local_key else { continue };
                push_unique(
                    &mut out,
                    RelatedObject {
                        kind: RelationshipKind::OneToOne,
                        model: model.name,
                        field: rel.name,
                        column,
                        target_column: target_meta.primary_key,
                        link: None,
                        accessor: rel.reverse_accessor(model.name),
                    },
                );
            }
        }
        Ok(out)
    }

    /// Many-to-many relationships that involve `target` on either side.
    ///
    /// A relationship declared on `target` yields the link column on its
    /// local side; a relationship pointing at `target` yields the remote
    /// side. Self-referential relationships yield both.
    pub fn related_many_to_many(&self, target: &str) -> Result<Vec<RelatedObject>> {
        let target_meta = self.require(target)?;
        let mut out = Vec::new();
        for model in &self.models {
            for rel in model.relationships {
                if rel.kind != RelationshipKind::ManyToMany {
                    continue;
                }
                let Some(link) = rel.link_table else { continue };
                if model.name == target {
                    push_unique(
                        &mut out,
                        RelatedObject {
                            kind: RelationshipKind::ManyToMany,
                            model: rel.related_model,
                            field: rel.name,
                            column: link.local_column,
                            target_column: target_meta.primary_key,
                            link: Some(link),
                            accessor: Some(rel.name.to_string()),
                        },
                    );
                }
                if rel.related_model == target {
                    push_unique(
                        &mut out,
                        RelatedObject {
                            kind: RelationshipKind::ManyToMany,
                            model: model.name,
                            field: rel.name,
                            column: link.remote_column,
                            target_column: target_meta.primary_key,
                            link: Some(link),
                            accessor: rel.reverse_accessor(model.name),
                        },
                    );
                }
            }
        }
        Ok(out)
    }

    /// Foreign key columns that point at `target`'s table without a declared
    /// relationship. Identity columns are skipped.
    pub fn direct_references(&self, target: &str) -> Result<Vec<RelatedObject>> {
        let target_meta = self.require(target)?;
        let mut out = Vec::new();
        for model in &self.models {
            for field in model.fields {
                let Some((table, column)) = field.foreign_key_target() else {
                    continue;
                };
                if table != target_meta.table || field.is_identity() {
                    continue;
                }
                if model.is_identity(field.column_name) || self.is_declared(model, field.column_name)
                {
                    continue;
                }
                let target_column = column.unwrap_or(target_meta.primary_key);
                if !target_meta.has_column(target_column) {
                    return Err(Error::schema(
                        SchemaErrorKind::ColumnNotFound,
                        format!(
                            "{}.{} references '{}.{}' which does not exist",
                            model.name, field.column_name, target_meta.table, target_column
                        ),
                    ));
                }
                push_unique(
                    &mut out,
                    RelatedObject {
                        kind: RelationshipKind::ManyToOne,
                        model: model.name,
                        field: field.name,
                        column: field.column_name,
                        target_column,
                        link: None,
                        accessor: None,
                    },
                );
            }
        }
        Ok(out)
    }

    /// Every polymorphic reference declared in the registry, paired with
    /// the model that declares it.
    pub fn generic_references(&self) -> Vec<(&'static str, GenericRefInfo)> {
        self.models
            .iter()
            .flat_map(|m| m.generic_references.iter().map(move |g| (m.name, *g)))
            .collect()
    }

    /// Whether `column` on `model` is covered by a declared relationship
    /// (its own many-to-one/one-to-one key, or some model's one-to-many).
    fn is_declared(&self, model: &ModelMeta, column: &str) -> bool {
        let own = model.relationships.iter().any(|r| {
            matches!(r.kind, RelationshipKind::ManyToOne | RelationshipKind::OneToOne)
                && r.local_key == Some(column)
        });
        own || self.models.iter().any(|m| {
            m.relationships.iter().any(|r| {
                r.kind == RelationshipKind::OneToMany
                    && r.related_model == model.name
                    && r.remote_key == Some(column)
            })
        })
    }
}

fn push_unique(out: &mut Vec<RelatedObject>, candidate: RelatedObject) {
    let exists = out.iter().any(|r| {
        r.model == candidate.model && r.column == candidate.column && r.link == candidate.link
    });
    if !exists {
        out.push(candidate);
    }
}
