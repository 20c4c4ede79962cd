//! SQLite backend for the Solvix engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
