//! Built-in source adapters.
//!
//! Site-specific scrapers live outside this crate; they are reached through
//! [`HttpJsonSource`] or registered directly as `SourceAdapter` impls.

mod http_json;

pub use http_json::HttpJsonSource;
