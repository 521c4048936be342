//! kvrel - a small relational engine on top of key-value stores
//!
//! This library provides:
//! - Value codec and keyed table storage (memory or file backed)
//! - System catalog with foreign key metadata
//! - Statement execution: CREATE/DROP TABLE, DESC, SHOW TABLES,
//!   INSERT, DELETE, UPDATE and SELECT

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use executor::{ExecutionEngine, QueryResult};
