//! SQLite tables, a small ORM and a hello-world web skeleton.
//!
//! # Intention
//!
//! - Declare tables, run typed CRUD, join and aggregate operations against
//!   file-based SQLite databases.
//! - Map `Person` and `Thing` onto `people` and `things`, with a session that
//!   stages objects and commits them in one transaction.
//! - Serve a single `GET /` route configured from the environment.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite is supported; there is no pooling and no migration engine.
//! - Database failures surface as [`StoreError`] without retries.

pub mod config;
pub mod error;
pub mod logging;
pub mod orm;
pub mod schema;
pub mod sqlite;
pub mod store;
pub mod tutorial;
pub mod web;

pub use config::Config;
pub use error::{Result, StoreError};
pub use store::{QueryResult, SqliteConfig, SqliteStore};
