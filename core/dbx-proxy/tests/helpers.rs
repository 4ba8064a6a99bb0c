// helpers 통합 테스트: seed_row / upsert / get_id / get_times

use chrono::{Duration, Utc};
use dbx_proxy::helpers::{get_id, get_times, seed_row, upsert};
use dbx_proxy::{DbxResult, Filter, Patch, Schema, SqliteStore, Store, Table, TableDef};
use std::sync::Arc;

fn schema() -> DbxResult<Schema> {
    let store = SqliteStore::open_in_memory()?;
    store.execute_batch(
        "CREATE TABLE user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP
        );
        CREATE TABLE relation (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT,
            from_id INTEGER,
            to_id INTEGER,
            weight INTEGER
        );",
    )?;
    Schema::builder(Arc::new(store))
        .table(TableDef::new("user"))
        .table(
            TableDef::new("relation")
                .relation("from", "from_id", "user")
                .relation("to", "to_id", "user"),
        )
        .build()
}

fn users(user: &Table) -> DbxResult<(i64, i64)> {
    Ok((
        get_id(user, "username", "alice")?,
        get_id(user, "username", "bob")?,
    ))
}

#[test]
fn test_seed_row_by_relation_fields() -> DbxResult<()> {
    let schema = schema()?;
    let user = schema.table("user")?;
    let relation = schema.table("relation")?;
    let (alice, bob) = users(&user)?;
    let alice = user.get(alice)?.unwrap();
    let bob = user.get(bob)?.unwrap();

    let filter = Filter::new()
        .eq("type", "follow")
        .eq("from", &alice)
        .eq("to", &bob);
    let id = seed_row(&relation, &filter, Patch::new().with("weight", 1))?;
    let again = seed_row(&relation, &filter, Patch::new().with("weight", 2))?;

    assert_eq!(id, again);
    assert_eq!(relation.len()?, 1);
    let row = relation.get(id)?.unwrap();
    assert_eq!(row.get_as::<i64>("from_id")?, Some(alice.id()));
    assert_eq!(row.get_as::<i64>("weight")?, Some(2));
    Ok(())
}

#[test]
fn test_seed_row_with_null_condition() -> DbxResult<()> {
    let schema = schema()?;
    let relation = schema.table("relation")?;

    let filter = Filter::new().eq("type", "orphan").is_null("to");
    let id = seed_row(&relation, &filter, Patch::new())?;
    assert_eq!(seed_row(&relation, &filter, Patch::new())?, id);
    assert!(relation.get(id)?.unwrap().related("to")?.is_none());
    Ok(())
}

#[test]
fn test_upsert_updates_by_key() -> DbxResult<()> {
    let schema = schema()?;
    let relation = schema.table("relation")?;

    let id = upsert(
        &relation,
        "type",
        Patch::new().with("type", "like").with("weight", 1),
    )?;
    let same = upsert(
        &relation,
        "type",
        Patch::new().with("type", "like").with("weight", 5),
    )?;
    assert_eq!(id, same);
    assert_eq!(
        relation.get(id)?.unwrap().get_as::<i64>("weight")?,
        Some(5)
    );
    Ok(())
}

#[test]
fn test_get_id_returns_existing() -> DbxResult<()> {
    let schema = schema()?;
    let user = schema.table("user")?;
    let (alice, bob) = users(&user)?;
    assert_ne!(alice, bob);
    assert_eq!(users(&user)?, (alice, bob));
    assert_eq!(user.len()?, 2);
    Ok(())
}

#[test]
fn test_get_times_parses_timestamps() -> DbxResult<()> {
    let schema = schema()?;
    let user = schema.table("user")?;
    let (alice, _) = users(&user)?;
    let row = user.get(alice)?.unwrap();

    let times = get_times(&row, None)?;
    let created = times["created_at"].unwrap();
    let age = Utc::now().signed_duration_since(created);
    assert!(age > Duration::minutes(-5) && age < Duration::minutes(5));
    // never updated, column is NULL
    assert_eq!(times["updated_at"], None);

    row.set("username", "alicia")?;
    let times = get_times(&row, Some(&["updated_at"][..]))?;
    assert!(times["updated_at"].is_some());
    Ok(())
}
