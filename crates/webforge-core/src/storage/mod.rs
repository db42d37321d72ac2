//! Storage layer - SQLite-backed key-value persistence
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Schema versioning and automatic migration
//! - `kv`: The key-value store the workbench persists its state into
//!
//! # Usage
//!
//! ```ignore
//! use webforge_core::storage::{Database, SqliteStore};
//!
//! let store = SqliteStore::new(Database::open_default().await?);
//! ```

pub mod database;
pub mod kv;
pub mod migrations;

pub use database::{Database, DatabaseConfig, default_database_path};
pub use kv::{
    ACTIVE_FILE_KEY, ACTIVE_PROJECT_KEY, KeyValueStore, KeyValueStoreExt, MESSAGES_KEY,
    MemoryStore, PROJECTS_KEY, SETTINGS_KEY, SqliteStore,
};
pub use migrations::{CURRENT_VERSION, MigrationStatus, migration_status, run_migrations};
