// shelfmark services
// Stateless helpers and configuration: filtering/search, link formatting, settings.

pub mod filter_engine;
pub mod link_format;
pub mod settings_engine;
