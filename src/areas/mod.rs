//! Storage-facing components
//!
//! - `database`: Content-addressed loose-object store
//! - `refs`: Reference reading/writing used by the command-line wrappers

pub mod database;
pub mod refs;
