//! JSON documents keyed by id.
//!
//! Run with: `cargo run -p dbx-proxy --example key_value_demo`

use dbx_proxy::{DbxResult, KeyValueStore, ProxyConfig, SqliteStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct Session {
    user: String,
    pages: Vec<String>,
}

fn main() -> DbxResult<()> {
    dbx_proxy::logging::init();

    let store = Arc::new(SqliteStore::open_in_memory()?);
    let kv = KeyValueStore::new(store, ProxyConfig::from_env()?);
    let sessions = kv.table::<Session>("session")?;

    let id = sessions.push(&Session {
        user: "alice".to_string(),
        pages: vec!["/".to_string()],
    })?;
    if let Some(mut session) = sessions.get(id)? {
        session.pages.push("/settings".to_string());
        sessions.set(id, &session)?;
    }

    for entry in sessions.iter() {
        let (id, session) = entry?;
        println!("session {id}: {session:?}");
    }
    Ok(())
}
