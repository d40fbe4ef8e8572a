//! Re-pointing of references, links and one-to-one relations during a merge.

mod common;

use common::{Fixture, MEMBERS};
use modelmerge::prelude::*;

fn migrate() -> MergeOptions {
    MergeOptions::new().migrate_related(true)
}

#[test]
fn merge_leaves_no_reference_to_deleted_aliases() {
    let mut fx = Fixture::seeded();
    let primary = fx.user(1);
    let aliases = vec![fx.user(2), fx.user(3)];

    let merged = merge(&mut fx.store, &fx.registry, primary, aliases, migrate()).unwrap();

    assert_eq!(merged.get("id"), &Value::Int(1));
    assert!(!fx.exists("user", 2));
    assert!(!fx.exists("user", 3));
    assert!(fx.references_to_user(2).is_empty(), "{:?}", fx.references_to_user(2));
    assert!(fx.references_to_user(3).is_empty(), "{:?}", fx.references_to_user(3));

    for post in [10, 11, 12] {
        assert_eq!(fx.int("post", post, "author_id"), Some(1));
    }
    assert_eq!(fx.int("post", 13, "author_id"), Some(4));
    assert_eq!(fx.int("profile", 20, "user_id"), Some(1));
    assert_eq!(fx.int("user", 4, "referrer_id"), Some(1));
    assert_eq!(fx.int("audit", 40, "actor_id"), Some(1));
    assert_eq!(fx.int("audit", 41, "actor_id"), Some(4));
    assert_eq!(fx.int("comment", 50, "target_id"), Some(1));
    assert_eq!(fx.int("comment", 52, "target_id"), Some(1));
}

#[test]
fn generic_references_match_on_model_tag() {
    let mut fx = Fixture::seeded();
    let (primary, alias) = (fx.user(1), fx.user(2));

    merge(&mut fx.store, &fx.registry, primary, vec![alias], migrate()).unwrap();

    // Comment 51 points at post 2, not user 2.
    assert_eq!(fx.int("comment", 51, "target_id"), Some(2));
    assert_eq!(
        fx.record("comment", 51).get("target_type"),
        &Value::from("post")
    );
    assert_eq!(fx.int("comment", 50, "target_id"), Some(1));
}

#[test]
fn declared_relations_move_without_migrate_related() {
    let mut fx = Fixture::seeded();
    let (primary, alias) = (fx.user(1), fx.user(2));

    merge(&mut fx.store, &fx.registry, primary, vec![alias], MergeOptions::new()).unwrap();

    assert_eq!(fx.int("post", 10, "author_id"), Some(1));
    assert_eq!(fx.int("profile", 20, "user_id"), Some(1));
    assert_eq!(fx.int("user", 4, "referrer_id"), Some(1));
    assert_eq!(fx.link_pairs("group_members"), vec![(30, 1), (31, 3)]);

    // Undeclared foreign keys and polymorphic references are left alone.
    assert_eq!(fx.int("audit", 40, "actor_id"), Some(2));
    assert_eq!(fx.int("comment", 50, "target_id"), Some(2));
}

#[test]
fn many_to_many_links_are_moved_once() {
    let mut fx = Fixture::seeded();
    let primary = fx.user(1);
    let aliases = vec![fx.user(2), fx.user(3)];

    merge(&mut fx.store, &fx.registry, primary, aliases, MergeOptions::new()).unwrap();

    // Group 30 had both 1 and 2; it keeps a single row for the primary.
    assert_eq!(fx.link_pairs("group_members"), vec![(30, 1), (31, 1)]);
    assert!(
        fx.store
            .link_exists(&MEMBERS, &LinkRow::new(31_i64, 1_i64))
            .unwrap()
    );
}

#[test]
fn symmetrical_links_never_point_the_primary_at_itself() {
    let mut fx = Fixture::seeded();
    let (primary, alias) = (fx.user(1), fx.user(2));

    merge(&mut fx.store, &fx.registry, primary, vec![alias], MergeOptions::new()).unwrap();

    // 1<->2 collapses away, 2<->4 becomes 1<->4 in both directions.
    assert_eq!(fx.link_pairs("user_friends"), vec![(1, 4), (4, 1)]);
}

#[test]
fn one_to_one_moves_when_primary_has_none() {
    let mut fx = Fixture::seeded();
    let (primary, alias) = (fx.user(1), fx.user(2));

    merge(&mut fx.store, &fx.registry, primary, vec![alias], MergeOptions::new()).unwrap();

    assert_eq!(fx.int("profile", 20, "user_id"), Some(1));
    assert_eq!(fx.store.filter("profile", "user_id", &Value::Int(1)).unwrap().len(), 1);
}

#[test]
fn one_to_one_primary_link_wins() {
    let mut fx = Fixture::seeded();
    fx.store
        .save(
            &Record::new("profile")
                .with("id", 21_i64)
                .with("user_id", 1_i64)
                .with("handle", "primary-handle"),
        )
        .unwrap();
    let (primary, alias) = (fx.user(1), fx.user(2));

    merge(&mut fx.store, &fx.registry, primary, vec![alias], MergeOptions::new()).unwrap();

    assert_eq!(fx.int("profile", 21, "user_id"), Some(1));
    assert_eq!(fx.int("profile", 20, "user_id"), Some(2));
    assert_eq!(
        fx.record("profile", 20).get("handle"),
        &Value::from("alias-handle")
    );
}

#[test]
fn keep_aliases_leaves_them_unreferenced() {
    let mut fx = Fixture::seeded();
    let (primary, alias) = (fx.user(1), fx.user(2));
    let options = migrate().keep_aliases(true);

    merge(&mut fx.store, &fx.registry, primary, vec![alias.clone()], options).unwrap();

    assert!(fx.exists("user", 2));
    assert_eq!(fx.user(2), alias);
    assert!(fx.references_to_user(2).is_empty(), "{:?}", fx.references_to_user(2));
    assert_eq!(fx.store.delete_count(), 0);
}

#[test]
fn repointing_the_primary_itself_survives_the_final_save() {
    let mut fx = Fixture::seeded();
    let primary = fx.user(1).with("referrer_id", 2_i64);
    fx.store.save(&primary).unwrap();
    let alias = fx.user(2);

    let merged = merge(&mut fx.store, &fx.registry, primary, vec![alias], MergeOptions::new()).unwrap();

    assert_eq!(merged.get("referrer_id"), &Value::Int(1));
    assert_eq!(fx.int("user", 1, "referrer_id"), Some(1));
    assert_eq!(fx.int("user", 4, "referrer_id"), Some(1));
}

#[test]
fn merger_merge_one_matches_free_function() {
    let mut fx = Fixture::seeded();
    let (primary, alias) = (fx.user(1), fx.user(3));

    let merged = Merger::new(&mut fx.store, &fx.registry)
        .options(migrate())
        .merge_one(primary, alias)
        .unwrap();

    assert_eq!(merged.get("email"), &Value::from("al@example.com"));
    assert!(!fx.exists("user", 3));
    assert_eq!(fx.int("post", 11, "author_id"), Some(1));
    assert_eq!(fx.int("comment", 52, "target_id"), Some(1));
    assert_eq!(fx.link_pairs("group_members"), vec![(30, 1), (30, 2), (31, 1)]);
}

#[test]
fn back_filled_reference_to_a_later_alias_points_at_primary() {
    let mut fx = Fixture::seeded();
    let first = fx.user(2).with("referrer_id", 3_i64);
    fx.store.save(&first).unwrap();
    let (primary, later) = (fx.user(1), fx.user(3));

    let merged = merge(&mut fx.store, &fx.registry, primary, vec![first, later], migrate()).unwrap();

    assert_eq!(merged.get("referrer_id"), &Value::Int(1));
    assert_eq!(fx.int("user", 1, "referrer_id"), Some(1));
    assert!(!fx.exists("user", 3));
    assert!(fx.references_to_user(2).is_empty(), "{:?}", fx.references_to_user(2));
    assert!(fx.references_to_user(3).is_empty(), "{:?}", fx.references_to_user(3));
}

#[test]
fn stale_reference_on_a_later_alias_is_not_back_filled() {
    let mut fx = Fixture::seeded();
    let later = fx.user(3).with("referrer_id", 2_i64);
    fx.store.save(&later).unwrap();
    let (primary, first) = (fx.user(1), fx.user(2));

    let merged = merge(&mut fx.store, &fx.registry, primary, vec![first, later], migrate()).unwrap();

    assert_eq!(merged.get("referrer_id"), &Value::Int(1));
    assert_eq!(fx.int("user", 1, "referrer_id"), Some(1));
    assert!(!fx.exists("user", 2));
    assert!(fx.references_to_user(2).is_empty(), "{:?}", fx.references_to_user(2));
}

const ACCOUNT_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", SqlType::BigInt).primary_key(true),
    FieldInfo::new("email", SqlType::Text)
        .nullable(true)
        .unique(true),
];
const NOTE_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", SqlType::BigInt).primary_key(true),
    FieldInfo::new("owner_email", SqlType::Text)
        .nullable(true)
        .foreign_key("accounts.email"),
];

fn account(id: i64, email: Option<&str>) -> Record {
    Record::new("account").with("id", id).with("email", email)
}

fn note(id: i64, owner: &str) -> Record {
    Record::new("note").with("id", id).with("owner_email", owner)
}

#[test]
fn non_key_reference_follows_back_filled_value() {
    let mut registry = ModelRegistry::new();
    registry
        .register_meta(ModelMeta::new("account", "accounts", "id", ACCOUNT_FIELDS))
        .unwrap()
        .register_meta(ModelMeta::new("note", "notes", "id", NOTE_FIELDS))
        .unwrap();
    let mut store = MemoryStore::new(&registry);
    let records = [
        account(1, None),
        account(2, Some("a@x")),
        account(3, Some("b@x")),
        note(8, "b@x"),
        note(9, "a@x"),
    ];
    for record in &records {
        store.save(record).unwrap();
    }

    let merged = merge(
        &mut store,
        &registry,
        account(1, None),
        vec![account(2, Some("a@x")), account(3, Some("b@x"))],
        migrate(),
    )
    .unwrap();

    assert_eq!(merged.get("email"), &Value::from("a@x"));
    for id in [8, 9] {
        let owner = store.get("note", &Value::Int(id)).unwrap().unwrap();
        assert_eq!(owner.get("owner_email"), &Value::from("a@x"), "note {id}");
    }
}
