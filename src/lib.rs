//! shelfmark: a personal bookmark shelf with categories, tags, live feeds and
//! client-side search.
//!
//! This library crate exposes all modules for use by the RPC binary and the
//! integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
