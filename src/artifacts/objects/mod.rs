//! Repository object types (blob, tree, commit)
//!
//! This module contains the content-addressed object model:
//!
//! - `blob`: Opaque file payloads
//! - `commit`: History snapshots with author/committer metadata
//! - `entry_mode`: Tree entry modes (regular, executable, symlink, ...)
//! - `object`: Serialization traits shared by all object kinds
//! - `object_id`: The 20-byte content digest identifying an object
//! - `object_type`: The blob/tree/commit kind marker
//! - `tree`: Directory snapshots holding named, ordered entries
//!
//! Every object serializes to `<type> <size>\0<payload>` and is identified
//! by the SHA-1 digest of that encoding. Two objects are identical exactly
//! when their encodings are byte-identical, which is what makes the history
//! rewrites in this crate deterministic.

pub mod blob;
pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of an object ID in hexadecimal characters
pub const OBJECT_ID_HEX_LENGTH: usize = 40;

/// Length of an object ID in raw bytes (SHA-1 digest size)
pub const OBJECT_ID_RAW_LENGTH: usize = 20;
