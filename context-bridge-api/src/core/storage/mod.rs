//! Storage backends for the context store
//!
//! ## Available Backends
//!
//! - `memory`: In-memory storage using DashMap (default)
//! - `sqlite`: Single-file SQLite database, survives restarts

mod memory;
mod sqlite;
mod traits;

pub use memory::*;
pub use sqlite::*;
pub use traits::*;
