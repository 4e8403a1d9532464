//! Tree object
//!
//! Trees are directory snapshots: ordered lists of named entries pointing
//! at blobs or further trees.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-digest>`
//!
//! ## Ordering
//!
//! Entries are serialized in the order held by the `Tree` value. Trees read
//! from a store keep their stored order; trees assembled by the rewriters
//! are sorted byte-lexicographically by name before being written, and the
//! same logical entries therefore always produce the same digest.

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::io::{BufRead, Write};

/// A single named entry of a tree
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    /// Entry name (one path segment, never containing `/`)
    pub name: String,
    /// Entry mode deciding how the entry is interpreted
    pub mode: EntryMode,
    /// Digest of the referenced blob or subtree
    pub oid: ObjectId,
}

/// Directory snapshot holding named, ordered entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Tree { entries }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sort entries into the canonical write order (byte-lexicographic by
    /// name). Reading a tree back never reorders it.
    pub fn sort_canonical(entries: &mut [TreeEntry]) {
        entries.sort_by(|l, r| l.name.cmp(&r.name));
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content_bytes = Vec::new();
        for entry in &self.entries {
            let header = format!("{} {}", entry.mode.as_octal_str(), entry.name);
            content_bytes.write_all(header.as_bytes())?;
            content_bytes.push(0);
            entry.oid.write_raw_to(&mut content_bytes)?;
        }

        let mut tree_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        tree_bytes.write_all(header.as_bytes())?;
        tree_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(tree_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = Vec::new();
        let mut reader = reader;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if *mode_bytes.last().unwrap() != b' ' {
                return Err(anyhow::anyhow!("unexpected EOF in mode"));
            }
            mode_bytes.pop(); // drop the space

            let mode_str = std::str::from_utf8(&mode_bytes)?;
            let mode = EntryMode::from_octal_str(mode_str)?;

            // Read "name\0"
            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || *name_bytes.last().unwrap() != b'\0' {
                return Err(anyhow::anyhow!("unexpected EOF in name"));
            }
            name_bytes.pop(); // drop NUL
            let name = std::str::from_utf8(&name_bytes)?.to_owned();

            let oid =
                ObjectId::read_raw_from(&mut reader).context("unexpected EOF in object id")?;

            entries.push(TreeEntry::new(name, mode, oid));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                let kind = if entry.mode.is_tree() {
                    ObjectType::Tree
                } else {
                    ObjectType::Blob
                };

                format!(
                    "{} {} {}\t{}",
                    entry.mode.as_octal_str(),
                    kind.as_str(),
                    entry.oid.as_ref(),
                    entry.name
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).expect("valid digest")
    }

    #[test]
    fn serialization_round_trips_entries_in_order() {
        let tree = Tree::new(vec![
            TreeEntry::new("README.md".to_string(), EntryMode::Regular, oid('1')),
            TreeEntry::new("src".to_string(), EntryMode::Directory, oid('2')),
            TreeEntry::new("tool".to_string(), EntryMode::Executable, oid('3')),
        ]);

        let encoded = tree.serialize().expect("serialize");
        let header_end = encoded.iter().position(|b| *b == 0).expect("header NUL");
        let decoded =
            Tree::deserialize(&encoded[header_end + 1..]).expect("deserialize");

        assert_eq!(decoded, tree);
    }

    #[test]
    fn identical_entries_produce_identical_digests() {
        let entries = vec![
            TreeEntry::new("a.txt".to_string(), EntryMode::Regular, oid('a')),
            TreeEntry::new("b.txt".to_string(), EntryMode::Regular, oid('b')),
        ];

        let first = Tree::new(entries.clone());
        let second = Tree::new(entries);

        assert_eq!(
            first.object_id().unwrap(),
            second.object_id().unwrap()
        );
    }

    #[test]
    fn canonical_sort_is_byte_lexicographic() {
        let mut entries = vec![
            TreeEntry::new("zeta".to_string(), EntryMode::Directory, oid('1')),
            TreeEntry::new("Alpha".to_string(), EntryMode::Regular, oid('2')),
            TreeEntry::new("alpha".to_string(), EntryMode::Regular, oid('3')),
        ];

        Tree::sort_canonical(&mut entries);

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "alpha", "zeta"]);
    }
}
