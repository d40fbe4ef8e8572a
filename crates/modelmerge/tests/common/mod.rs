//! Shared schema and seed data for merge tests.
//!
//! Seeded state:
//!
//! - users: 1 Alice (primary), 2 alice, 3 Al (duplicates), 4 Bob (referred by 2)
//! - posts: 10 by 2, 11 by 3, 12 by 1, 13 by 4
//! - profiles: 20 for user 2
//! - group_members: (30, 1), (30, 2), (31, 3)
//! - user_friends (symmetrical): 1<->2, 2<->4
//! - audit_logs: 40 actor 2, 41 actor 4
//! - comments: 50 on user 2, 51 on post 2, 52 on user 3

#![allow(dead_code)]

use modelmerge::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub age: Option<i64>,
    pub referrer_id: Option<i64>,
}

pub const USER_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", SqlType::BigInt)
        .primary_key(true)
        .auto_increment(true),
    FieldInfo::new("name", SqlType::Text),
    FieldInfo::new("email", SqlType::Text).nullable(true),
    FieldInfo::new("bio", SqlType::Text).nullable(true),
    FieldInfo::new("age", SqlType::BigInt).nullable(true),
    FieldInfo::new("referrer_id", SqlType::BigInt)
        .nullable(true)
        .foreign_key("users.id"),
];

pub const FRIENDS: LinkTableInfo =
    LinkTableInfo::new("user_friends", "from_user_id", "to_user_id");

pub const USER_RELS: &[RelationshipInfo] = &[
    RelationshipInfo::new("referrer", "user", RelationshipKind::ManyToOne)
        .local_key("referrer_id")
        .related_name("referrals"),
    RelationshipInfo::new("friends", "user", RelationshipKind::ManyToMany)
        .link_table(FRIENDS)
        .symmetrical(true),
];

impl Model for User {
    const MODEL_NAME: &'static str = "user";
    const TABLE_NAME: &'static str = "users";
    const PRIMARY_KEY: &'static str = "id";
    const RELATIONSHIPS: &'static [RelationshipInfo] = USER_RELS;

    fn fields() -> &'static [FieldInfo] {
        USER_FIELDS
    }

    fn to_record(&self) -> Record {
        Record::new(Self::MODEL_NAME)
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("email", self.email.clone())
            .with("bio", self.bio.clone())
            .with("age", self.age)
            .with("referrer_id", self.referrer_id)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get("id").clone().try_into()?,
            name: record.get("name").clone().try_into()?,
            email: record.get("email").clone().try_into()?,
            bio: record.get("bio").clone().try_into()?,
            age: record.get("age").clone().try_into()?,
            referrer_id: record.get("referrer_id").clone().try_into()?,
        })
    }
}

pub const POST_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", SqlType::BigInt).primary_key(true),
    FieldInfo::new("author_id", SqlType::BigInt)
        .nullable(true)
        .foreign_key("users.id"),
    FieldInfo::new("title", SqlType::Text),
];
pub const POST_RELS: &[RelationshipInfo] = &[RelationshipInfo::new(
    "author",
    "user",
    RelationshipKind::ManyToOne,
)
.local_key("author_id")
.related_name("posts")];

pub const PROFILE_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", SqlType::BigInt).primary_key(true),
    FieldInfo::new("user_id", SqlType::BigInt)
        .nullable(true)
        .unique(true)
        .foreign_key("users.id"),
    FieldInfo::new("handle", SqlType::Text),
];
pub const PROFILE_RELS: &[RelationshipInfo] = &[RelationshipInfo::new(
    "user",
    "user",
    RelationshipKind::OneToOne,
)
.local_key("user_id")];

pub const MEMBERS: LinkTableInfo = LinkTableInfo::new("group_members", "group_id", "user_id");
pub const GROUP_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", SqlType::BigInt).primary_key(true),
    FieldInfo::new("name", SqlType::Text),
];
pub const GROUP_RELS: &[RelationshipInfo] = &[RelationshipInfo::new(
    "members",
    "user",
    RelationshipKind::ManyToMany,
)
.link_table(MEMBERS)
.related_name("groups")];

pub const AUDIT_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", SqlType::BigInt).primary_key(true),
    FieldInfo::new("actor_id", SqlType::BigInt)
        .nullable(true)
        .foreign_key("users.id"),
    FieldInfo::new("action", SqlType::Text),
];

pub const COMMENT_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", SqlType::BigInt).primary_key(true),
    FieldInfo::new("target_type", SqlType::Text),
    FieldInfo::new("target_id", SqlType::BigInt),
    FieldInfo::new("body", SqlType::Text),
];
pub const COMMENT_REFS: &[GenericRefInfo] =
    &[GenericRefInfo::new("target", "target_type", "target_id")];

pub const ENTITY_FIELDS: &[FieldInfo] = &[FieldInfo::new("id", SqlType::BigInt).primary_key(true)];

pub fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry
        .register::<User>()
        .unwrap()
        .register_meta(ModelMeta::new("post", "posts", "id", POST_FIELDS).relationships(POST_RELS))
        .unwrap()
        .register_meta(
            ModelMeta::new("profile", "profiles", "id", PROFILE_FIELDS).relationships(PROFILE_RELS),
        )
        .unwrap()
        .register_meta(ModelMeta::new("group", "groups", "id", GROUP_FIELDS).relationships(GROUP_RELS))
        .unwrap()
        .register_meta(ModelMeta::new("audit", "audit_logs", "id", AUDIT_FIELDS))
        .unwrap()
        .register_meta(
            ModelMeta::new("comment", "comments", "id", COMMENT_FIELDS)
                .generic_references(COMMENT_REFS),
        )
        .unwrap()
        .register_meta(
            ModelMeta::new("entity", "entities", "id", ENTITY_FIELDS)
                .config(ModelConfig::abstract_model()),
        )
        .unwrap();
    registry
}

pub struct Fixture {
    pub registry: ModelRegistry,
    pub store: MemoryStore,
}

impl Fixture {
    pub fn seeded() -> Self {
        let registry = registry();
        let mut store = MemoryStore::new(&registry);

        let users = [
            Record::new("user")
                .with("id", 1_i64)
                .with("name", "Alice")
                .with("email", Value::Null)
                .with("bio", "")
                .with("age", 30_i64),
            Record::new("user")
                .with("id", 2_i64)
                .with("name", "alice")
                .with("email", "alice@example.com")
                .with("bio", "likes rust")
                .with("age", 31_i64),
            Record::new("user")
                .with("id", 3_i64)
                .with("name", "Al")
                .with("email", "al@example.com")
                .with("bio", "second bio"),
            Record::new("user")
                .with("id", 4_i64)
                .with("name", "Bob")
                .with("referrer_id", 2_i64),
        ];
        for user in &users {
            store.save(user).unwrap();
        }

        for (id, author) in [(10_i64, 2_i64), (11, 3), (12, 1), (13, 4)] {
            store
                .save(
                    &Record::new("post")
                        .with("id", id)
                        .with("author_id", author)
                        .with("title", format!("post {id}")),
                )
                .unwrap();
        }

        store
            .save(
                &Record::new("profile")
                    .with("id", 20_i64)
                    .with("user_id", 2_i64)
                    .with("handle", "alias-handle"),
            )
            .unwrap();

        for (id, name) in [(30_i64, "rustaceans"), (31, "ferris fans")] {
            store
                .save(&Record::new("group").with("id", id).with("name", name))
                .unwrap();
        }
        for (group, user) in [(30_i64, 1_i64), (30, 2), (31, 3)] {
            store
                .apply_link_op(&LinkTableOp::link(MEMBERS, LinkRow::new(group, user)))
                .unwrap();
        }
        for (a, b) in [(1_i64, 2_i64), (2, 4)] {
            store
                .apply_link_op(&LinkTableOp::link(FRIENDS, LinkRow::new(a, b)))
                .unwrap();
            store
                .apply_link_op(&LinkTableOp::link(FRIENDS, LinkRow::new(b, a)))
                .unwrap();
        }

        for (id, actor) in [(40_i64, 2_i64), (41, 4)] {
            store
                .save(
                    &Record::new("audit")
                        .with("id", id)
                        .with("actor_id", actor)
                        .with("action", "login"),
                )
                .unwrap();
        }

        for (id, target_type, target_id) in
            [(50_i64, "user", 2_i64), (51, "post", 2), (52, "user", 3)]
        {
            store
                .save(
                    &Record::new("comment")
                        .with("id", id)
                        .with("target_type", target_type)
                        .with("target_id", target_id)
                        .with("body", "hi"),
                )
                .unwrap();
        }

        Self { registry, store }
    }

    pub fn record(&self, model: &str, id: i64) -> Record {
        self.store
            .get(model, &Value::Int(id))
            .unwrap()
            .unwrap_or_else(|| panic!("{model} {id} missing"))
    }

    pub fn exists(&self, model: &str, id: i64) -> bool {
        self.store.get(model, &Value::Int(id)).unwrap().is_some()
    }

    pub fn user(&self, id: i64) -> Record {
        self.record("user", id)
    }

    pub fn int(&self, model: &str, id: i64, column: &str) -> Option<i64> {
        self.record(model, id).get(column).as_i64()
    }

    /// Every stored reference to user `id`, described as `table.column <- row`.
    pub fn references_to_user(&self, id: i64) -> Vec<String> {
        let key = Value::Int(id);
        let mut found = Vec::new();
        for (model, column) in [
            ("post", "author_id"),
            ("profile", "user_id"),
            ("audit", "actor_id"),
            ("user", "referrer_id"),
        ] {
            for record in self.store.filter(model, column, &key).unwrap() {
                found.push(format!("{model}.{column} <- {}", record.get("id")));
            }
        }
        for record in self.store.filter("comment", "target_id", &key).unwrap() {
            if record.get("target_type") == &Value::from("user") {
                found.push(format!("comment.target <- {}", record.get("id")));
            }
        }
        for row in self.store.links("group_members") {
            if row.remote == key {
                found.push(format!("group_members <- {}", row.local));
            }
        }
        for row in self.store.links("user_friends") {
            if row.local == key || row.remote == key {
                found.push(format!("user_friends {} -> {}", row.local, row.remote));
            }
        }
        found
    }

    /// Sorted `(local, remote)` integer pairs of a link table.
    pub fn link_pairs(&self, table: &str) -> Vec<(i64, i64)> {
        let mut pairs: Vec<(i64, i64)> = self
            .store
            .links(table)
            .iter()
            .filter_map(|row| Some((row.local.as_i64()?, row.remote.as_i64()?)))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Every model table and both link tables, for before/after comparisons.
    pub fn dump(&self) -> (Vec<Vec<Record>>, Vec<(i64, i64)>, Vec<(i64, i64)>) {
        let tables = self
            .registry
            .models()
            .iter()
            .map(|m| self.store.all(m.name).to_vec())
            .collect();
        (
            tables,
            self.link_pairs("group_members"),
            self.link_pairs("user_friends"),
        )
    }
}
