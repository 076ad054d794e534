//! `wrt-store` – persistent worlds.
//!
//! Keeps every world's frame graph in a local SQLite database so that each
//! short-lived `wrt` invocation can load, modify and save it.
//!
//! # Modules
//!
//! - [`sqlite`] – [`SqliteWorldStore`][sqlite::SqliteWorldStore]: a
//!   [`WorldStore`][wrt_graph::WorldStore] that stores one row per frame and
//!   replaces a world's frames atomically on save.

pub mod sqlite;

pub use sqlite::{SqliteWorldStore, StoreError, WorldSummary};
