//! The merge procedure.
//!
//! A merge folds alias records into a primary record of the same model:
//!
//! 1. validate every record before touching the store
//! 2. per alias, in order: re-point references, move many-to-many links,
//!    move a one-to-one link if the primary has none, back-fill blank
//!    primary fields, delete the alias
//! 3. save the primary once
//!
//! Every write is an individual store call. Nothing is rolled back unless the
//! caller runs the merge inside a transaction (see [`merge_atomic`]).

use crate::options::MergeOptions;
use modelmerge_core::{
    Error, GenericRefInfo, Model, ModelMeta, ModelRegistry, Record, RelatedObject, Result,
    TypeError, TypeErrorKind, Value,
};
use modelmerge_store::{LinkRow, LinkTableOp, RecordStore, TransactionOps, atomic};

/// Reverse relationships of one model, resolved once per merge.
#[derive(Debug)]
struct RelationPlan {
    direct: Vec<RelatedObject>,
    generic: Vec<(&'static str, GenericRefInfo)>,
    many_to_many: Vec<RelatedObject>,
    one_to_one: Vec<RelatedObject>,
    one_to_many: Vec<RelatedObject>,
}

/// A column of the merged model that can hold the key of another record of
/// the same model.
#[derive(Debug)]
struct SelfReference {
    column: &'static str,
    target_column: &'static str,
    /// Type column of a generic reference.
    type_column: Option<&'static str>,
    /// Key values of every alias in `target_column`.
    alias_keys: Vec<Value>,
}

impl RelationPlan {
    fn resolve(registry: &ModelRegistry, model: &str) -> Result<Self> {
        Ok(Self {
            direct: registry.direct_references(model)?,
            generic: registry.generic_references(),
            many_to_many: registry.related_many_to_many(model)?,
            one_to_one: registry.related_one_to_one(model)?,
            one_to_many: registry.related_one_to_many(model)?,
        })
    }

    /// References the merged model holds to itself, with the alias keys they
    /// may point at.
    fn self_references(
        &self,
        target: &ModelMeta,
        aliases: &[Record],
        migrate_related: bool,
    ) -> Vec<SelfReference> {
        let direct = self.direct.iter().filter(|_| migrate_related);
        let mut refs: Vec<(&'static str, &'static str, Option<&'static str>)> = self
            .one_to_many
            .iter()
            .chain(&self.one_to_one)
            .chain(direct)
            .filter(|rel| rel.model == target.name)
            .map(|rel| (rel.column, rel.target_column, None))
            .collect();
        if migrate_related {
            refs.extend(
                self.generic
                    .iter()
                    .filter(|(model, _)| *model == target.name)
                    .map(|(_, g)| (g.id_column, target.primary_key, Some(g.type_column))),
            );
        }
        refs.into_iter()
            .map(|(column, target_column, type_column)| SelfReference {
                column,
                target_column,
                type_column,
                alias_keys: aliases
                    .iter()
                    .map(|a| a.get(target_column).clone())
                    .filter(|v| !v.is_blank())
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct MergeStats {
    repointed: usize,
    relinked: usize,
    skipped_one_to_one: usize,
    filled: usize,
    deleted: usize,
}

/// Merges alias records into a primary record through a `RecordStore`.
pub struct Merger<'a, S: RecordStore + ?Sized> {
    store: &'a mut S,
    registry: &'a ModelRegistry,
    options: MergeOptions,
}

impl<'a, S: RecordStore + ?Sized> Merger<'a, S> {
    /// Create a merger with default options.
    pub fn new(store: &'a mut S, registry: &'a ModelRegistry) -> Self {
        Self {
            store,
            registry,
            options: MergeOptions::default(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Merge a single alias into `primary`.
    pub fn merge_one(&mut self, primary: Record, alias: Record) -> Result<Record> {
        self.merge(primary, vec![alias])
    }

    /// Merge `aliases` into `primary` and return the saved primary.
    #[tracing::instrument(
        level = "info",
        skip(self, primary, aliases),
        fields(model = primary.model(), aliases = aliases.len())
    )]
    pub fn merge(&mut self, mut primary: Record, aliases: Vec<Record>) -> Result<Record> {
        let meta = validate(self.registry, &primary, &aliases)?;
        let plan = RelationPlan::resolve(self.registry, meta.name)?;
        let self_refs = plan.self_references(meta, &aliases, self.options.migrate_related);
        let pk_column = meta.primary_key;
        let mut stats = MergeStats::default();

        let mut blank: Vec<&'static str> = meta
            .fillable_columns()
            .filter(|column| primary.is_blank(column))
            .collect();
        tracing::debug!(blank = ?blank, "Back-fill candidates");

        for mut alias in aliases {
            let alias_pk = alias.get(pk_column).clone();
            tracing::debug!(alias = %alias_pk, "Merging alias");

            if self.options.migrate_related {
                for rel in &plan.direct {
                    stats.repointed += self.repoint(rel, &mut primary, &mut alias)?;
                }
                for (model, generic) in &plan.generic {
                    stats.repointed +=
                        self.repoint_generic(*model, generic, meta, &mut primary, &mut alias)?;
                }
            }

            for rel in &plan.many_to_many {
                stats.relinked += self.relink(rel, meta, &primary, &alias)?;
            }

            for rel in &plan.one_to_one {
                if self.move_one_to_one(rel, &mut primary, &mut alias)? {
                    stats.repointed += 1;
                } else {
                    stats.skipped_one_to_one += 1;
                }
            }

            for rel in &plan.one_to_many {
                stats.repointed += self.repoint(rel, &mut primary, &mut alias)?;
            }

            blank.retain(|column| {
                let value = alias.get(column);
                if value.is_blank() {
                    return true;
                }
                tracing::trace!(column = *column, "Back-filled from alias");
                primary.set(*column, value.clone());
                stats.filled += 1;
                false
            });

            if !self.options.keep_aliases && self.store.delete(meta.name, &alias_pk)? {
                stats.deleted += 1;
            }
        }

        stats.repointed += redirect_self_references(&mut primary, &self_refs, meta.name);

        self.store.save(&primary)?;
        tracing::info!(
            repointed = stats.repointed,
            relinked = stats.relinked,
            skipped_one_to_one = stats.skipped_one_to_one,
            filled = stats.filled,
            deleted = stats.deleted,
            "Merge complete"
        );
        Ok(primary)
    }

    /// Point every `rel.model` record that references the alias at the
    /// primary instead.
    fn repoint(
        &mut self,
        rel: &RelatedObject,
        primary: &mut Record,
        alias: &mut Record,
    ) -> Result<usize> {
        let from = alias.get(rel.target_column).clone();
        if from.is_blank() {
            return Ok(0);
        }
        let to = primary.get(rel.target_column).clone();
        if to.is_blank() {
            // The alias value is back-filled onto the primary, so existing
            // references already match it.
            tracing::debug!(
                model = rel.model,
                column = rel.column,
                target = rel.target_column,
                "Primary has no target value; references left in place"
            );
            return Ok(0);
        }

        let referencing = self.store.filter(rel.model, rel.column, &from)?;
        let count = referencing.len();
        for mut record in referencing {
            record.set(rel.column, to.clone());
            self.store.save(&record)?;
            tracing::trace!(model = rel.model, column = rel.column, "Re-pointed reference");
            self.sync_in_memory(&record, rel.column, &to, primary, alias);
        }
        Ok(count)
    }

    /// Point polymorphic references at the alias to the primary.
    fn repoint_generic(
        &mut self,
        model: &'static str,
        generic: &GenericRefInfo,
        target: &ModelMeta,
        primary: &mut Record,
        alias: &mut Record,
    ) -> Result<usize> {
        let from = alias.get(target.primary_key).clone();
        let to = primary.get(target.primary_key).clone();
        let type_tag = Value::from(target.name);

        let referencing: Vec<Record> = self
            .store
            .filter(model, generic.id_column, &from)?
            .into_iter()
            .filter(|r| r.get(generic.type_column) == &type_tag)
            .collect();
        let count = referencing.len();
        for mut record in referencing {
            record.set(generic.id_column, to.clone());
            self.store.save(&record)?;
            tracing::trace!(model, field = generic.name, "Re-pointed generic reference");
            self.sync_in_memory(&record, generic.id_column, &to, primary, alias);
        }
        Ok(count)
    }

    /// Replace the alias with the primary in every link row of a
    /// many-to-many relationship.
    fn relink(
        &mut self,
        rel: &RelatedObject,
        target: &ModelMeta,
        primary: &Record,
        alias: &Record,
    ) -> Result<usize> {
        let (Some(link), Some(peer_column)) = (rel.link, rel.peer_column()) else {
            return Ok(0);
        };
        let alias_pk = alias.get(target.primary_key);
        let primary_pk = primary.get(target.primary_key);
        let self_referential = rel.model == target.name;

        let rows = self.store.linked(&link, rel.column, alias_pk)?;
        let mut count = 0;
        for row in rows {
            let Some(peer) = row.get(&link, peer_column).cloned() else {
                continue;
            };
            self.store
                .apply_link_op(&LinkTableOp::unlink(link, row.clone()))?;

            let peer = if self_referential && &peer == alias_pk {
                primary_pk.clone()
            } else {
                peer
            };
            if self_referential && &peer == primary_pk {
                tracing::debug!(table = link.table_name, "Dropped link to self");
                continue;
            }

            let Some(new_row) =
                LinkRow::from_sides(&link, rel.column, primary_pk.clone(), peer)
            else {
                continue;
            };
            if self.store.link_exists(&link, &new_row)? {
                tracing::trace!(table = link.table_name, "Primary already linked");
                continue;
            }
            self.store
                .apply_link_op(&LinkTableOp::link(link, new_row))?;
            tracing::trace!(
                table = link.table_name,
                accessor = rel.accessor_name().unwrap_or(rel.field_name()),
                "Moved link"
            );
            count += 1;
        }
        Ok(count)
    }

    /// Move the alias's one-to-one link to the primary unless the primary
    /// already has one. Returns whether a record was re-pointed.
    fn move_one_to_one(
        &mut self,
        rel: &RelatedObject,
        primary: &mut Record,
        alias: &mut Record,
    ) -> Result<bool> {
        let alias_key = alias.get(rel.target_column).clone();
        let primary_key = primary.get(rel.target_column).clone();
        if alias_key.is_blank() || primary_key.is_blank() {
            return Ok(false);
        }
        let Some(mut linked) = self
            .store
            .filter(rel.model, rel.column, &alias_key)?
            .into_iter()
            .next()
        else {
            return Ok(false);
        };

        if !self
            .store
            .filter(rel.model, rel.column, &primary_key)?
            .is_empty()
        {
            tracing::warn!(
                model = rel.model,
                accessor = rel.accessor_name().unwrap_or(rel.field_name()),
                "Primary already has a one-to-one link; alias link left in place"
            );
            return Ok(false);
        }

        linked.set(rel.column, primary_key.clone());
        self.store.save(&linked)?;
        tracing::trace!(model = rel.model, column = rel.column, "Moved one-to-one link");
        self.sync_in_memory(&linked, rel.column, &primary_key, primary, alias);
        Ok(true)
    }

    /// Mirror a write onto the in-memory primary or alias when the saved
    /// record is one of them, so the final save does not undo it.
    fn sync_in_memory(
        &self,
        saved: &Record,
        column: &str,
        value: &Value,
        primary: &mut Record,
        alias: &mut Record,
    ) {
        let Some(meta) = self.registry.get(saved.model()) else {
            return;
        };
        let saved_pk = saved.get(meta.primary_key);
        for record in [primary, alias] {
            if record.model() == saved.model() && record.get(meta.primary_key) == saved_pk {
                record.set(column, value.clone());
            }
        }
    }
}

/// Point the primary's own references to any alias at the primary. Covers
/// values back-filled from an alias and stale copies of aliases whose stored
/// rows were re-pointed earlier in the merge.
fn redirect_self_references(primary: &mut Record, refs: &[SelfReference], model: &str) -> usize {
    let mut count = 0;
    for r in refs {
        if let Some(type_column) = r.type_column {
            if primary.get(type_column) != &Value::from(model) {
                continue;
            }
        }
        let to = primary.get(r.target_column).clone();
        if to.is_blank() || !r.alias_keys.contains(primary.get(r.column)) {
            continue;
        }
        tracing::trace!(column = r.column, "Redirected reference to primary");
        primary.set(r.column, to);
        count += 1;
    }
    count
}

/// Check that `primary` and `aliases` can be merged. Nothing is written.
fn validate<'r>(
    registry: &'r ModelRegistry,
    primary: &Record,
    aliases: &[Record],
) -> Result<&'r ModelMeta> {
    let meta = registry
        .get(primary.model())
        .filter(|m| m.is_mergeable())
        .ok_or_else(|| Error::unsupported_model(primary.model()))?;

    let primary_pk = primary.get(meta.primary_key);
    if primary_pk.is_null() {
        return Err(missing_pk(meta));
    }

    for alias in aliases {
        if alias.model() != meta.name {
            return Err(Error::model_mismatch(meta.name, alias.model()));
        }
        let alias_pk = alias.get(meta.primary_key);
        if alias_pk.is_null() {
            return Err(missing_pk(meta));
        }
        if alias_pk == primary_pk {
            return Err(Error::Type(TypeError {
                kind: TypeErrorKind::SelfMerge,
                expected: "alias distinct from primary".to_string(),
                actual: format!("{}={}", meta.primary_key, alias_pk),
                column: Some(meta.primary_key.to_string()),
            }));
        }
    }
    Ok(meta)
}

fn missing_pk(meta: &ModelMeta) -> Error {
    Error::Type(TypeError {
        kind: TypeErrorKind::MissingPrimaryKey,
        expected: format!("saved {} record", meta.name),
        actual: "NULL".to_string(),
        column: Some(meta.primary_key.to_string()),
    })
}

/// Merge `aliases` into `primary` and return the saved primary.
///
/// See the module docs for the exact order of operations.
pub fn merge<S: RecordStore + ?Sized>(
    store: &mut S,
    registry: &ModelRegistry,
    primary: Record,
    aliases: Vec<Record>,
    options: MergeOptions,
) -> Result<Record> {
    Merger::new(store, registry)
        .options(options)
        .merge(primary, aliases)
}

/// Typed variant of [`merge`].
pub fn merge_models<M: Model, S: RecordStore + ?Sized>(
    store: &mut S,
    registry: &ModelRegistry,
    primary: &M,
    aliases: &[M],
    options: MergeOptions,
) -> Result<M> {
    let aliases = aliases.iter().map(Model::to_record).collect();
    let merged = merge(store, registry, primary.to_record(), aliases, options)?;
    M::from_record(&merged)
}

/// [`merge`] inside a transaction: any error rolls back every write made by
/// the call.
pub fn merge_atomic<S: RecordStore + TransactionOps + ?Sized>(
    store: &mut S,
    registry: &ModelRegistry,
    primary: Record,
    aliases: Vec<Record>,
    options: MergeOptions,
) -> Result<Record> {
    atomic(store, |store| merge(store, registry, primary, aliases, options))
}
