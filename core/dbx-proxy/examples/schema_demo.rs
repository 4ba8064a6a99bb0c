//! Users and posts over an in-memory database.
//!
//! Run with: `cargo run -p dbx-proxy --example schema_demo --features logging`

use dbx_proxy::{DbxResult, Filter, Patch, Schema, SqliteStore, Store, TableDef};
use std::sync::Arc;

fn main() -> DbxResult<()> {
    dbx_proxy::logging::init();

    let store = SqliteStore::open_in_memory()?;
    store.execute_batch(
        "CREATE TABLE user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            is_admin BOOLEAN
        );
        CREATE TABLE post (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,
            content TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP
        );",
    )?;

    let schema = Schema::builder(Arc::new(store))
        .table(TableDef::new("user"))
        .table(TableDef::new("post").relation("author", "user_id", "user"))
        .build()?;
    let user = schema.table("user")?;
    let post = schema.table("post")?;

    let alice_id = user.push(Patch::new().with("username", "alice").with("is_admin", true))?;
    user.set(10, Patch::new().with("username", "bob"))?;
    let alice = user.get(alice_id)?.expect("row was just inserted");

    post.push(Patch::new().with("author", &alice).with("content", "hello world"))?;
    post.push(Patch::new().with("user_id", 10).with("content", "hi alice"))?;

    println!("users: {} (max id {:?})", user.len()?, user.max_id()?);
    for row in &post {
        let row = row?;
        let author = row
            .related("author")?
            .map(|a| a.get_as::<String>("username"))
            .transpose()?
            .flatten();
        println!(
            "post #{} by {:?}: {:?}",
            row.id(),
            author,
            row.get_as::<String>("content")?
        );
    }

    let edited = post.update(
        Filter::new().eq("author", &alice),
        Patch::new().with("content", "hello again"),
    )?;
    println!("edited {edited} post(s)");

    let stats = post.statement_stats();
    println!(
        "post statements: {} compiled, hit ratio {:.2}",
        post.statement_count(),
        stats.hit_ratio
    );
    Ok(())
}
