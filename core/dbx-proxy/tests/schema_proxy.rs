// 스키마 테이블 통합 테스트
//
// user / post / log / "order" 스키마로 요소 접근, 술어 연산, 관계 필드,
// 행 식별 캐시와 Statement Cache 재사용을 검증

use dbx_proxy::{
    DbxError, DbxResult, Filter, Patch, ProxyConfig, Row, RowCachePolicy, ScalarValue, Schema,
    SqliteStore, Store, TableDef, UpdateTarget,
};
use std::sync::Arc;

const DDL: &str = r#"
CREATE TABLE user (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    is_admin BOOLEAN
);
CREATE TABLE post (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    content TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remark TEXT
);
CREATE TABLE "order" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    amount REAL
);
"#;

fn open_schema(config: ProxyConfig) -> DbxResult<Schema> {
    dbx_proxy::logging::init_test();
    let store = SqliteStore::open_in_memory()?;
    store.execute_batch(DDL)?;
    Schema::builder(Arc::new(store))
        .config(config)
        .table(TableDef::new("user"))
        .table(TableDef::new("post").relation("author", "user_id", "user"))
        .table(TableDef::new("log"))
        .table(TableDef::new("order").relation("user", "user_id", "user"))
        .build()
}

fn schema() -> Schema {
    open_schema(ProxyConfig::default()).unwrap()
}

fn text(value: &str) -> Option<ScalarValue> {
    Some(ScalarValue::Text(value.to_string()))
}

// ════════════════════════════════════════════
// Element access
// ════════════════════════════════════════════

#[test]
fn test_push_then_get_by_id() -> DbxResult<()> {
    let schema = schema();
    let user = schema.table("user")?;

    let id = user.push(Patch::new().with("username", "Alice"))?;
    assert_eq!(id, 1);
    assert_eq!(user.len()?, 1);

    let record = user.get(id)?.unwrap().materialize()?.unwrap();
    assert_eq!(record.get("id"), Some(&ScalarValue::Integer(1)));
    assert_eq!(record.get("username"), text("Alice").as_ref());
    assert_eq!(record.get("is_admin"), Some(&ScalarValue::Null));
    Ok(())
}

#[test]
fn test_set_inserts_at_id_then_updates() -> DbxResult<()> {
    let schema = schema();
    let user = schema.table("user")?;

    user.set(2, Patch::new().with("username", "Bob"))?;
    let bob = user.get(2)?.unwrap();
    assert_eq!(bob.get("username")?, text("Bob"));

    bob.set("username", "Charlie")?;
    assert_eq!(bob.get("username")?, text("Charlie"));

    // whole-row assignment on an existing id only touches the given fields
    user.set(2, Patch::new().with("is_admin", true))?;
    assert_eq!(bob.get("username")?, text("Charlie"));
    assert_eq!(bob.get_as::<i64>("is_admin")?, Some(1));
    Ok(())
}

#[test]
fn test_set_with_matching_id_field() -> DbxResult<()> {
    let schema = schema();
    let user = schema.table("user")?;

    user.set(1, Patch::new().with("id", 1).with("username", "Alice"))?;
    user.set(1, Patch::new().with("id", 1).with("username", "Alicia"))?;
    assert_eq!(user.get(1)?.unwrap().get("username")?, text("Alicia"));

    let err = user
        .set(1, Patch::new().with("id", 7).with("username", "Mallory"))
        .unwrap_err();
    assert!(matches!(err, DbxError::ImmutableId { .. }));
    Ok(())
}

#[test]
fn test_row_id_is_immutable() -> DbxResult<()> {
    let schema = schema();
    let user = schema.table("user")?;
    let id = user.push(Patch::new().with("username", "Alice"))?;
    let row = user.get(id)?.unwrap();

    assert!(matches!(row.set("id", 5), Err(DbxError::ImmutableId { .. })));
    assert!(matches!(
        row.update(Patch::new().with("id", 5)),
        Err(DbxError::ImmutableId { .. })
    ));
    assert!(user.contains(id)?);
    assert!(!user.contains(5)?);
    Ok(())
}

#[test]
fn test_missing_row_is_none() -> DbxResult<()> {
    let schema = schema();
    let user = schema.table("user")?;
    assert!(user.get(42)?.is_none());
    assert!(user.find(&Filter::new().eq("username", "nobody"))?.is_none());
    assert_eq!(user.delete(42)?, 0);
    Ok(())
}

#[test]
fn test_non_positive_ids_are_never_rows() -> DbxResult<()> {
    let schema = schema();
    let log = schema.table("log")?;

    for id in [0, -3] {
        let err = log.set(id, Patch::new().with("remark", "bad")).unwrap_err();
        assert!(matches!(err, DbxError::InvalidOperation { .. }));
        assert!(log.get(id)?.is_none());
        assert!(!log.contains(id)?);
    }
    assert!(log.ids()?.is_empty());
    assert_eq!(log.len()?, 0);
    Ok(())
}

#[test]
fn test_invalid_utf8_text_surfaces_as_error() -> DbxResult<()> {
    let schema = schema();
    schema
        .store()
        .execute_batch("INSERT INTO log (id, remark) VALUES (1, CAST(X'41FF42' AS TEXT))")?;
    let log = schema.table("log")?;

    let row = log.get(1)?.unwrap();
    assert!(matches!(row.get("remark"), Err(DbxError::Sqlite { .. })));
    assert!(log.materialize_all().is_err());
    Ok(())
}

#[test]
fn test_unknown_field_is_rejected() -> DbxResult<()> {
    let schema = schema();
    let user = schema.table("user")?;
    let id = user.push(Patch::new().with("username", "Alice"))?;
    let row = user.get(id)?.unwrap();

    assert!(matches!(row.get("nickname"), Err(DbxError::UnknownColumn { .. })));
    assert!(matches!(
        user.push(Patch::new().with("nickname", "A")),
        Err(DbxError::UnknownColumn { .. })
    ));
    assert!(matches!(
        user.find(&Filter::new().eq("nickname", "A")),
        Err(DbxError::UnknownColumn { .. })
    ));
    Ok(())
}

#[test]
fn test_delete_row_by_id() -> DbxResult<()> {
    let schema = schema();
    let user = schema.table("user")?;
    user.extend([
        Patch::new().with("username", "Alice"),
        Patch::new().with("username", "Bob"),
    ])?;
    assert_eq!(user.len()?, 2);

    assert_eq!(user.delete(2)?, 1);
    assert_eq!(user.len()?, 1);
    assert!(user.get(2)?.is_none());
    Ok(())
}

#[test]
fn test_boolean_values_stored_as_integers() -> DbxResult<()> {
    let schema = schema();
    let user = schema.table("user")?;

    for (input, output) in [(None, None), (Some(true), Some(1)), (Some(false), Some(0))] {
        let id = user.push(
            Patch::new()
                .with("username", format!("admin?{input:?}"))
                .with("is_admin", input),
        )?;
        let row = user.get(id)?.unwrap();
        assert_eq!(row.get_as::<i64>("is_admin")?, output);

        let filter = Filter::new().eq("id", id).eq("is_admin", input);
        assert_eq!(user.find(&filter)?.map(|r| r.id()), Some(id));
        assert_eq!(user.filter(&filter)?.len(), 1);
    }
    Ok(())
}

// ════════════════════════════════════════════
// Length, truncate and id sequence
// ════════════════════════════════════════════

#[test]
fn test_truncate_resets_sequence() -> DbxResult<()> {
    let schema = schema();
    let user = schema.table("user")?;
    user.push(Patch::new().with("username", "Alice"))?;
    user.push(Patch::new().with("username", "Bob"))?;

    assert_eq!(user.set_len(0)?, 2);
    assert!(user.is_empty()?);
    assert!(user.get(1)?.is_none());
    assert!(user.get(2)?.is_none());

    assert_eq!(user.push(Patch::new().with("username", "Carol"))?, 1);
    Ok(())
}

#[test]
fn test_set_len_deletes_above() -> DbxResult<()> {
    let schema = schema();
    let log = schema.table("log")?;
    for i in 0..5 {
        log.push(Patch::new().with("remark", format!("entry {i}")))?;
    }

    assert_eq!(log.set_len(3)?, 2);
    assert_eq!(log.ids()?, vec![1, 2, 3]);
    // shrinking never grows the table
    assert_eq!(log.set_len(10)?, 0);
    assert_eq!(log.len()?, 3);
    Ok(())
}

#[test]
fn test_push_reuses_id_of_deleted_last_row() -> DbxResult<()> {
    // without AUTOINCREMENT sqlite reuses max(id) + 1
    let store = SqliteStore::open_in_memory()?;
    store.execute_batch("CREATE TABLE log (id INTEGER PRIMARY KEY, remark TEXT)")?;
    let schema = Schema::builder(Arc::new(store))
        .table(TableDef::new("log"))
        .build()?;
    let log = schema.table("log")?;

    let first = log.push(Patch::new().with("remark", "a"))?;
    let second = log.push(Patch::new().with("remark", "b"))?;
    log.delete(second)?;
    assert_eq!(log.push(Patch::new().with("remark", "c"))?, second);

    log.delete(first)?;
    assert_eq!(log.push(Patch::new().with("remark", "d"))?, second + 1);
    Ok(())
}

#[test]
fn test_len_counts_rows_not_max_id() -> DbxResult<()> {
    let schema = schema();
    let log = schema.table("log")?;
    log.set(1, Patch::new().with("remark", "1"))?;
    log.set(3, Patch::new().with("remark", "3"))?;
    log.set(10, Patch::new().with("remark", "10"))?;

    assert_eq!(log.len()?, 3);
    assert_eq!(log.max_id()?, Some(10));
    Ok(())
}

// ════════════════════════════════════════════
// Enumeration over a sparse table (ids 1, 3, 10)
// ════════════════════════════════════════════

fn sparse_log(schema: &Schema) -> DbxResult<dbx_proxy::Table> {
    let log = schema.table("log")?;
    for id in [1, 3, 10] {
        log.set(id, Patch::new().with("remark", id.to_string()))?;
    }
    Ok(log)
}

fn remarks(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|row| row.get_as::<String>("remark").unwrap().unwrap())
        .collect()
}

#[test]
fn test_iterate_sparse_table() -> DbxResult<()> {
    let schema = schema();
    let log = sparse_log(&schema)?;

    let ids: Vec<i64> = log.iter().map(|row| row.map(|r| r.id())).collect::<DbxResult<_>>()?;
    assert_eq!(ids, vec![1, 3, 10]);

    let mut seen = Vec::new();
    for row in &log {
        seen.push(row?.get_as::<String>("remark")?.unwrap());
    }
    assert_eq!(seen, vec!["1", "3", "10"]);
    Ok(())
}

#[test]
fn test_iterate_in_small_batches() -> DbxResult<()> {
    let schema = open_schema(ProxyConfig::default().with_iter_batch_size(1))?;
    let log = sparse_log(&schema)?;

    let rows: Vec<Row> = log.iter().collect::<DbxResult<_>>()?;
    assert_eq!(remarks(&rows), vec!["1", "3", "10"]);
    Ok(())
}

#[test]
fn test_slice_by_id_range() -> DbxResult<()> {
    let schema = schema();
    let log = sparse_log(&schema)?;

    assert_eq!(remarks(&log.slice(..)?), vec!["1", "3", "10"]);
    assert_eq!(remarks(&log.slice(2..)?), vec!["3", "10"]);
    assert_eq!(remarks(&log.slice(3..10)?), vec!["3"]);
    assert_eq!(remarks(&log.slice(3..=10)?), vec!["3", "10"]);
    assert_eq!(remarks(&log.slice(..4)?), vec!["1", "3"]);
    assert!(log.slice(4..10)?.is_empty());
    Ok(())
}

#[test]
fn test_materialize_all() -> DbxResult<()> {
    let schema = schema();
    let log = sparse_log(&schema)?;

    let records = log.materialize_all()?;
    let ids: Vec<_> = records.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![Some(1), Some(3), Some(10)]);
    Ok(())
}

// ════════════════════════════════════════════
// Predicate operations
// ════════════════════════════════════════════

fn seeded_users(schema: &Schema) -> DbxResult<dbx_proxy::Table> {
    let user = schema.table("user")?;
    user.set(1, Patch::new().with("username", "Alice").with("is_admin", true))?;
    user.set(2, Patch::new().with("username", "Bob"))?;
    user.set(3, Patch::new().with("username", "Alice").with("is_admin", false))?;
    Ok(user)
}

#[test]
fn test_find_returns_lowest_id() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;

    let alice = user.find(&Filter::new().eq("username", "Alice"))?.unwrap();
    assert_eq!(alice.id(), 1);

    let by_two = user
        .find(&Filter::new().eq("username", "Alice").eq("is_admin", false))?
        .unwrap();
    assert_eq!(by_two.id(), 3);
    Ok(())
}

#[test]
fn test_filter_and_count() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;

    let alices = user.filter(&Filter::new().eq("username", "Alice"))?;
    assert_eq!(alices.iter().map(Row::id).collect::<Vec<_>>(), vec![1, 3]);

    assert_eq!(user.count(&Filter::new().eq("username", "Alice"))?, 2);
    assert_eq!(user.count(&Filter::new().is_null("is_admin"))?, 1);
    assert_eq!(user.count(&Filter::new().not_null("is_admin"))?, 2);
    assert_eq!(user.count(&Filter::new().eq("username", "Zed"))?, 0);
    Ok(())
}

#[test]
fn test_delete_where_returns_deleted_count() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;

    assert_eq!(user.delete_where(&Filter::new().eq("username", "Alice"))?, 2);
    assert_eq!(user.delete_where(&Filter::new().eq("username", "Alice"))?, 0);
    assert_eq!(user.len()?, 1);
    Ok(())
}

#[test]
fn test_empty_filter_is_rejected() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;

    assert!(matches!(
        user.find(&Filter::new()),
        Err(DbxError::EmptyFilter { operation: "find" })
    ));
    assert!(matches!(
        user.delete_where(&Filter::new()),
        Err(DbxError::EmptyFilter { operation: "delete" })
    ));
    assert!(matches!(
        user.update(Filter::new(), Patch::new().with("username", "X")),
        Err(DbxError::EmptyFilter { operation: "update" })
    ));
    // nothing was touched
    assert_eq!(user.len()?, 3);
    Ok(())
}

#[test]
fn test_update_by_filter_returns_changed_count() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;

    let changed = user.update(
        Filter::new().eq("username", "Alice"),
        Patch::new().with("is_admin", true),
    )?;
    assert_eq!(changed, 2);
    assert_eq!(user.count(&Filter::new().eq("is_admin", true))?, 2);

    assert_eq!(
        user.update(UpdateTarget::Id(99), Patch::new().with("username", "Ghost"))?,
        0
    );
    assert_eq!(user.update(1_i64, Patch::new())?, 0);
    Ok(())
}

#[test]
fn test_pick_projects_columns() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;

    let all = user.pick(&["username"], None)?;
    let names: Vec<_> = all
        .iter()
        .map(|r| r.get_as::<String>("username").unwrap())
        .collect();
    assert_eq!(names, vec!["Alice", "Bob", "Alice"]);
    assert!(all.iter().all(|r| r.len() == 1));

    let admins = user.pick(&["id", "username"], Some(&Filter::new().eq("is_admin", true)))?;
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].id(), Some(1));

    assert!(matches!(
        user.pick(&[], None),
        Err(DbxError::InvalidOperation { .. })
    ));
    assert!(matches!(
        user.pick(&["nickname"], None),
        Err(DbxError::UnknownColumn { .. })
    ));
    Ok(())
}

#[test]
fn test_reserved_table_name() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;
    let order = schema.table("order")?;
    let alice = user.get(1)?.unwrap();

    let id = order.push(Patch::new().with("user", &alice).with("amount", 9.5))?;
    let row = order.get(id)?.unwrap();
    assert_eq!(row.get_as::<f64>("amount")?, Some(9.5));
    assert!(Row::same_handle(&row.related("user")?.unwrap(), &alice));
    Ok(())
}

// ════════════════════════════════════════════
// Relation fields
// ════════════════════════════════════════════

#[test]
fn test_related_row_resolves_through_foreign_key() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;
    let post = schema.table("post")?;

    let id = post.push(Patch::new().with("user_id", 2).with("content", "hi"))?;
    let row = post.get(id)?.unwrap();

    let author = row.related("author")?.unwrap();
    assert_eq!(author.id(), 2);
    assert!(Row::same_handle(&author, &user.get(2)?.unwrap()));
    Ok(())
}

#[test]
fn test_assign_relation_writes_foreign_key() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;
    let post = schema.table("post")?;
    let bob = user.get(2)?.unwrap();

    let id = post.push(Patch::new().with("author", &bob).with("content", "A"))?;
    let row = post.get(id)?.unwrap();
    assert_eq!(row.get_as::<i64>("user_id")?, Some(2));

    let carol = user.get(3)?.unwrap();
    row.set_related("author", Some(&carol))?;
    assert_eq!(row.get_as::<i64>("user_id")?, Some(3));

    row.update(Patch::new().with("author", &bob).with("content", "B"))?;
    assert_eq!(row.get_as::<i64>("user_id")?, Some(2));
    assert_eq!(row.get_as::<String>("content")?.as_deref(), Some("B"));

    row.set_related("author", None)?;
    assert!(row.related("author")?.is_none());
    Ok(())
}

#[test]
fn test_filter_by_relation_field() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;
    let post = schema.table("post")?;
    let alice = user.get(1)?.unwrap();
    let bob = user.get(2)?.unwrap();

    post.push(Patch::new().with("author", &alice).with("content", "a1"))?;
    post.push(Patch::new().with("author", &bob).with("content", "b1"))?;
    post.push(Patch::new().with("author", &alice).with("content", "a2"))?;

    assert_eq!(post.count(&Filter::new().eq("author", &alice))?, 2);
    let first = post.find(&Filter::new().eq("author", &bob))?.unwrap();
    assert_eq!(first.get_as::<String>("content")?.as_deref(), Some("b1"));

    // relation field and foreign key select the same statement shape
    let by_fk = post.filter(&Filter::new().eq("user_id", 1))?;
    let by_rel = post.filter(&Filter::new().eq("author", &alice))?;
    assert_eq!(by_fk.len(), by_rel.len());
    Ok(())
}

#[test]
fn test_relation_read_as_column_is_rejected() -> DbxResult<()> {
    let schema = schema();
    let post = schema.table("post")?;
    let id = post.push(Patch::new().with("content", "orphan"))?;
    let row = post.get(id)?.unwrap();

    assert!(matches!(row.get("author"), Err(DbxError::InvalidOperation { .. })));
    assert!(row.related("author")?.is_none());
    Ok(())
}

#[test]
fn test_conflicting_relation_and_foreign_key() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;
    let post = schema.table("post")?;
    let alice = user.get(1)?.unwrap();

    let err = post
        .push(Patch::new().with("author", &alice).with("user_id", 2))
        .unwrap_err();
    assert!(matches!(err, DbxError::InvalidOperation { .. }));

    // agreeing values are accepted
    post.push(Patch::new().with("author", &alice).with("user_id", 1))?;
    Ok(())
}

// ════════════════════════════════════════════
// Update timestamp
// ════════════════════════════════════════════

#[test]
fn test_update_stamps_updated_at() -> DbxResult<()> {
    let schema = schema();
    let post = schema.table("post")?;
    let id = post.push(Patch::new().with("content", "draft"))?;
    let row = post.get(id)?.unwrap();

    row.set("updated_at", "2000-01-01 00:00:00")?;
    assert_eq!(row.get("updated_at")?, text("2000-01-01 00:00:00"));

    row.set("content", "final")?;
    let stamped = row.get_as::<String>("updated_at")?.unwrap();
    assert_ne!(stamped, "2000-01-01 00:00:00");
    Ok(())
}

#[test]
fn test_update_stamp_can_be_disabled() -> DbxResult<()> {
    let schema = open_schema(ProxyConfig::default().with_auto_update_timestamp(false))?;
    let post = schema.table("post")?;
    let id = post.push(Patch::new().with("content", "draft"))?;
    let row = post.get(id)?.unwrap();

    row.set("updated_at", "2000-01-01 00:00:00")?;
    row.set("content", "final")?;
    assert_eq!(row.get("updated_at")?, text("2000-01-01 00:00:00"));
    Ok(())
}

// ════════════════════════════════════════════
// Row identity cache
// ════════════════════════════════════════════

#[test]
fn test_same_id_yields_same_handle() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;

    let a = user.get(1)?.unwrap();
    let b = user.find(&Filter::new().eq("username", "Alice"))?.unwrap();
    let c = user.iter().next().unwrap()?;
    assert!(Row::same_handle(&a, &b));
    assert!(Row::same_handle(&a, &c));
    assert!(!Row::same_handle(&a, &user.get(2)?.unwrap()));
    Ok(())
}

#[test]
fn test_clear_cache_keeps_data() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;

    let before = user.get(1)?.unwrap();
    assert!(schema.clear_cache() > 0);
    assert_eq!(user.cache_len(), 0);

    let after = user.get(1)?.unwrap();
    assert!(!Row::same_handle(&before, &after));
    // stale handles still read live data
    assert_eq!(before.get("username")?, text("Alice"));
    assert_eq!(user.len()?, 3);
    Ok(())
}

#[test]
fn test_invalidate_one_row() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;

    let alice = user.get(1)?.unwrap();
    let bob = user.get(2)?.unwrap();
    assert!(user.invalidate(1));
    assert!(!user.invalidate(1));
    assert!(!user.invalidate(99));

    let fresh = user.get(1)?.unwrap();
    assert!(!Row::same_handle(&alice, &fresh));
    assert_eq!(alice.materialize()?, fresh.materialize()?);
    assert_eq!(fresh.get("username")?, text("Alice"));
    assert!(Row::same_handle(&bob, &user.get(2)?.unwrap()));
    Ok(())
}

#[test]
fn test_bounded_row_cache() -> DbxResult<()> {
    let config = ProxyConfig::default().with_row_cache(RowCachePolicy::Lru { capacity: 8 });
    let schema = open_schema(config)?;
    let log = schema.table("log")?;

    for i in 0..100 {
        log.push(Patch::new().with("remark", i.to_string()))?;
    }
    for row in &log {
        row?;
    }
    assert!(log.cache_len() <= 8);
    assert_eq!(log.len()?, 100);
    Ok(())
}

// ════════════════════════════════════════════
// Statement cache
// ════════════════════════════════════════════

#[test]
fn test_statements_are_reused_per_shape() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;
    user.clear_statements();

    for name in ["Alice", "Bob", "Carol"] {
        user.find(&Filter::new().eq("username", name))?;
    }
    assert_eq!(user.statement_count(), 1);
    let stats = user.statement_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);

    // a new shape compiles a new statement
    user.find(&Filter::new().is_null("username"))?;
    assert_eq!(user.statement_count(), 2);
    Ok(())
}

#[test]
fn test_update_shape_includes_column_set() -> DbxResult<()> {
    let schema = schema();
    let user = seeded_users(&schema)?;
    user.clear_statements();

    user.update(1_i64, Patch::new().with("username", "A"))?;
    user.update(2_i64, Patch::new().with("username", "B"))?;
    assert_eq!(user.statement_count(), 1);

    user.update(1_i64, Patch::new().with("username", "A").with("is_admin", false))?;
    assert_eq!(user.statement_count(), 2);
    Ok(())
}

// ════════════════════════════════════════════
// Schema construction
// ════════════════════════════════════════════

#[test]
fn test_schema_rejects_undeclared_relation_target() -> DbxResult<()> {
    let store = SqliteStore::open_in_memory()?;
    store.execute_batch(DDL)?;
    let result = Schema::builder(Arc::new(store))
        .table(TableDef::new("post").relation("author", "user_id", "user"))
        .build();
    assert!(matches!(result, Err(DbxError::Schema(_))));
    Ok(())
}

#[test]
fn test_schema_rejects_missing_table() -> DbxResult<()> {
    let store = SqliteStore::open_in_memory()?;
    let result = Schema::builder(Arc::new(store))
        .table(TableDef::new("ghost"))
        .build();
    assert!(matches!(result, Err(DbxError::TableNotFound(_))));
    Ok(())
}

#[test]
fn test_schema_lookup() -> DbxResult<()> {
    let schema = schema();
    let names: Vec<_> = schema.tables().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(names, vec!["log", "order", "post", "user"]);
    assert!(matches!(schema.table("nope"), Err(DbxError::TableNotFound(_))));

    let post = schema.table("post")?;
    assert_eq!(
        post.columns(),
        &["user_id", "content", "created_at", "updated_at"]
    );
    assert_eq!(post.relation("author").unwrap().target, "user");
    Ok(())
}

#[test]
fn test_data_persists_across_file_reopen() -> DbxResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("proxy.db");
    {
        let store = SqliteStore::open(&path)?;
        store.execute_batch(DDL)?;
        let schema = Schema::builder(Arc::new(store))
            .table(TableDef::new("log"))
            .build()?;
        schema.table("log")?.set(7, Patch::new().with("remark", "kept"))?;
    }

    let store = SqliteStore::open(&path)?;
    let schema = Schema::builder(Arc::new(store))
        .table(TableDef::new("log"))
        .build()?;
    let row = schema.table("log")?.get(7)?.unwrap();
    assert_eq!(row.get("remark")?, text("kept"));
    Ok(())
}
