//! Relationship metadata for modelmerge.
//!
//! Relationships are declared as static metadata on the model that owns the
//! foreign key (or the link table, for many-to-many). The registry walks these
//! declarations in reverse to find every way another model can point at a
//! record, which is what a merge has to re-point.

/// The type of relationship between two models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// One-to-one: `Hero` has one `Profile`.
    OneToOne,
    /// Many-to-one: many `Hero`s belong to one `Team`.
    #[default]
    ManyToOne,
    /// One-to-many: one `Team` has many `Hero`s.
    OneToMany,
    /// Many-to-many: `Hero`s have many `Power`s via a link table.
    ManyToMany,
}

/// Information about a link/join table for many-to-many relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTableInfo {
    /// The link table name (e.g., `"hero_powers"`).
    pub table_name: &'static str,

    /// Column in link table pointing to the owning model (e.g., `"hero_id"`).
    pub local_column: &'static str,

    /// Column in link table pointing to the related model (e.g., `"power_id"`).
    pub remote_column: &'static str,
}

impl LinkTableInfo {
    /// Create a new link-table definition.
    #[must_use]
    pub const fn new(
        table_name: &'static str,
        local_column: &'static str,
        remote_column: &'static str,
    ) -> Self {
        Self {
            table_name,
            local_column,
            remote_column,
        }
    }

    /// Column opposite to `column` in this link table.
    pub fn other_column(&self, column: &str) -> Option<&'static str> {
        if column == self.local_column {
            Some(self.remote_column)
        } else if column == self.remote_column {
            Some(self.local_column)
        } else {
            None
        }
    }
}

/// Metadata about a relationship declared on a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name of the relationship field.
    pub name: &'static str,

    /// The related model's name.
    pub related_model: &'static str,

    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Local foreign key column (ManyToOne / OneToOne).
    /// e.g., `"team_id"` on `Hero`.
    pub local_key: Option<&'static str>,

    /// Remote foreign key column (OneToMany).
    /// e.g., `"team_id"` on `Hero` when declared on `Team`.
    pub remote_key: Option<&'static str>,

    /// Link table for ManyToMany relationships.
    pub link_table: Option<LinkTableInfo>,

    /// Reverse accessor name on the related model. When unset the accessor
    /// is `<model>_set` for collections and `<model>` for one-to-one.
    pub related_name: Option<&'static str>,

    /// Self-referential many-to-many with no distinct reverse accessor.
    pub symmetrical: bool,
}

impl RelationshipInfo {
    /// Create a new relationship with required fields.
    #[must_use]
    pub const fn new(
        name: &'static str,
        related_model: &'static str,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            name,
            related_model,
            kind,
            local_key: None,
            remote_key: None,
            link_table: None,
            related_name: None,
            symmetrical: false,
        }
    }

    /// Set the local foreign key column (ManyToOne / OneToOne).
    #[must_use]
    pub const fn local_key(mut self, key: &'static str) -> Self {
        self.local_key = Some(key);
        self
    }

    /// Set the remote foreign key column (OneToMany).
    #[must_use]
    pub const fn remote_key(mut self, key: &'static str) -> Self {
        self.remote_key = Some(key);
        self
    }

    /// Set the link table metadata (ManyToMany).
    #[must_use]
    pub const fn link_table(mut self, info: LinkTableInfo) -> Self {
        self.link_table = Some(info);
        self
    }

    /// Set the reverse accessor name on the related model.
    #[must_use]
    pub const fn related_name(mut self, name: &'static str) -> Self {
        self.related_name = Some(name);
        self
    }

    /// Mark a self-referential many-to-many as symmetrical.
    #[must_use]
    pub const fn symmetrical(mut self, value: bool) -> Self {
        self.symmetrical = value;
        self
    }

    /// Reverse accessor name as seen from `related_model`.
    ///
    /// Symmetrical relationships have none: both sides use `name`.
    pub fn reverse_accessor(&self, owner_model: &str) -> Option<String> {
        if self.symmetrical {
            return None;
        }
        if let Some(name) = self.related_name {
            return Some(name.to_string());
        }
        Some(match self.kind {
            RelationshipKind::OneToOne => owner_model.to_string(),
            _ => format!("{owner_model}_set"),
        })
    }
}

impl Default for RelationshipInfo {
    fn default() -> Self {
        Self::new("", "", RelationshipKind::default())
    }
}

/// A polymorphic reference: a pair of columns on the owning model that names
/// the target model and holds the target's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericRefInfo {
    /// Name of the reference field.
    pub name: &'static str,
    /// Column holding the target model name.
    pub type_column: &'static str,
    /// Column holding the target primary key.
    pub id_column: &'static str,
}

impl GenericRefInfo {
    #[must_use]
    pub const fn new(
        name: &'static str,
        type_column: &'static str,
        id_column: &'static str,
    ) -> Self {
        Self {
            name,
            type_column,
            id_column,
        }
    }
}

/// A reverse relationship descriptor: one way records of `model` point at
/// records of the model it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedObject {
    /// Kind, seen from the target side (`OneToMany`, `OneToOne`,
    /// `ManyToMany`, or `ManyToOne` for an undeclared foreign key column).
    pub kind: RelationshipKind,

    /// The referencing model.
    pub model: &'static str,

    /// Field name on the referencing side.
    pub field: &'static str,

    /// Column holding the target's key: a foreign key column on `model`, or
    /// the link table column for many-to-many.
    pub column: &'static str,

    /// Column of the target model that `column` stores.
    pub target_column: &'static str,

    /// Link table (many-to-many only).
    pub link: Option<LinkTableInfo>,

    /// Reverse accessor on the target model, if one exists.
    pub accessor: Option<String>,
}

impl RelatedObject {
    /// Reverse accessor name on the target, `None` for symmetrical links and
    /// undeclared foreign key columns.
    pub fn accessor_name(&self) -> Option<&str> {
        self.accessor.as_deref()
    }

    /// Field name on the referencing model.
    pub fn field_name(&self) -> &'static str {
        self.field
    }

    /// Link table column opposite to `column` (many-to-many only).
    pub fn peer_column(&self) -> Option<&'static str> {
        self.link.and_then(|link| link.other_column(self.column))
    }
}
