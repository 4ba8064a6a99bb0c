//! # DBX Proxy: Collection-style tables over SQLite
//!
//! DBX Proxy는 SQLite 테이블을 id로 인덱싱되는 가변 컬렉션처럼 다루게 해 줍니다.
//! Element access, assignment, deletion and iteration become prepared SQL
//! statements; no query text is ever written by the caller.
//!
//! ## 주요 특징
//!
//! - **Statement Cache**: 연산 형태(shape)마다 한 번만 컴파일
//! - **Row Identity Cache**: 같은 `(table, id)`는 캐시를 비울 때까지 같은 [`Row`] 핸들
//! - **Relation fields**: foreign key를 행 참조로 읽고 쓰기
//! - **Value Codec**: bool → 0/1, `DateTime<Utc>` → `YYYY-MM-DD HH:MM:SS`, JSON → text
//! - **Key-value tables**: `(id, value json)` 테이블을 타입 있는 문서 컬렉션으로
//!
//! ## 빠른 시작
//!
//! ```rust
//! use dbx_proxy::{Filter, Patch, Schema, SqliteStore, Store, TableDef};
//! use std::sync::Arc;
//!
//! # fn main() -> dbx_proxy::DbxResult<()> {
//! let store = SqliteStore::open_in_memory()?;
//! store.execute_batch(
//!     "CREATE TABLE user (id INTEGER PRIMARY KEY, username TEXT, is_admin BOOLEAN);
//!      CREATE TABLE post (id INTEGER PRIMARY KEY, user_id INTEGER, content TEXT);",
//! )?;
//!
//! let schema = Schema::builder(Arc::new(store))
//!     .table(TableDef::new("user"))
//!     .table(TableDef::new("post").relation("author", "user_id", "user"))
//!     .build()?;
//! let user = schema.table("user")?;
//! let post = schema.table("post")?;
//!
//! // 데이터 삽입
//! let alice_id = user.push(Patch::new().with("username", "Alice").with("is_admin", true))?;
//! let alice = user.get(alice_id)?.expect("just inserted");
//! post.push(Patch::new().with("author", &alice).with("content", "Hello"))?;
//!
//! // 조회
//! let first = post.find(&Filter::new().eq("author", &alice))?.expect("one post");
//! let author = first.related("author")?.expect("author set");
//! assert!(dbx_proxy::Row::same_handle(&author, &alice));
//!
//! // 불리언은 정수로 돌아온다
//! assert_eq!(alice.get_as::<i64>("is_admin")?, Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## 모듈 구조
//!
//! - [`schema`]: 테이블 선언, DDL 컬럼 탐색 ([`Schema`], [`TableDef`])
//! - [`table`]: 테이블 가상화 엔진 ([`Table`])
//! - [`row`]: 행 핸들 ([`Row`])
//! - [`statement`]: SQL 합성과 Statement Cache
//! - [`row_cache`]: Row Identity Cache
//! - [`filter`]: Filter와 캐시 키 인코딩
//! - [`store`]: 저장소 인터페이스와 SQLite 구현
//! - [`key_value`]: JSON 값 테이블
//! - [`helpers`]: `seed_row`, `upsert`, `get_id`, `get_times`

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod helpers;
pub mod key_value;
pub mod record;
pub mod row;
pub mod row_cache;
pub mod schema;
pub mod statement;
pub mod store;
pub mod table;
pub mod value;

mod relation;

// Logging utilities
pub mod logging;

// ===== Re-exports =====
pub use config::{ProxyConfig, RowCachePolicy};
pub use error::{DbxError, DbxResult};
pub use filter::{Condition, Filter};
pub use key_value::{KeyValueStore, KeyValueTable};
pub use record::{FromRecord, Patch, Record, TableSchema};
pub use row::Row;
pub use schema::{Relation, Schema, SchemaBuilder, TableDef};
pub use store::{SqliteStore, Store};
pub use table::{Table, UpdateTarget};
pub use value::{FromScalar, IntoValue, RowRef, ScalarValue, Value};

// Re-export derive macros
pub use dbx_derive::Table;
