//! citizen-store: persistence and analytics core for CitizenConnect.
//!
//! Representatives, chat transcripts, visitor sessions and usage events are
//! stored in either an embedded SQLite file or a PostgreSQL server, chosen
//! once from configuration. [`store::Store`] is the entry point.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod store;

pub use config::{Config, DatabaseConfig, DbKind};
pub use error::{ConfigError, DatabaseError};
pub use store::Store;
