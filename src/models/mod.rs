//! Data models for the jokes backend.
//!
//! Field names follow the CouchDB document shape the front end already consumes.

mod joke;

pub use joke::*;
