//! Shared primitives: storage, parsing, identity and configuration.
//!
//! Everything that touches SQLite goes through [`api`]; the operations in
//! `plugins` never issue SQL themselves.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod job_data;
pub mod manifest;
pub mod models;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
