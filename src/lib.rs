//! Recipe catalog service: a browsable, searchable recipe collection with
//! per-user saved recipes, kept live over a path-addressed JSON store.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod live;
pub mod notice;
pub mod preload;
pub mod recipes;
pub mod saved;
pub mod state;
pub mod store;
