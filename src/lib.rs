//! Builds a static snippet site: markdown sources are loaded into a SQLite
//! store, rendered into a home feed, long-form pages and tag pages, and the
//! result is checked for dangling or unused images.

pub mod config;
pub mod generator;
pub mod metadata;
mod renderer;
pub mod store;
pub mod validate;
