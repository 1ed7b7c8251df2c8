// shelfmark shared type definitions
// Each submodule defines types used across the application.

pub mod bookmark;
pub mod errors;
pub mod export;
pub mod filter;
pub mod settings;
pub mod timestamp;
pub mod user;
