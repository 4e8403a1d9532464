#![allow(dead_code)]

use assert_fs::TempDir;
use bytes::Bytes;
use gitsieve::areas::database::Database;
use gitsieve::artifacts::objects::blob::Blob;
use gitsieve::artifacts::objects::commit::{Author, Commit};
use gitsieve::artifacts::objects::entry_mode::EntryMode;
use gitsieve::artifacts::objects::object::Object;
use gitsieve::artifacts::objects::object_id::ObjectId;
use gitsieve::artifacts::objects::tree::{Tree, TreeEntry};
use rstest::fixture;
use std::collections::BTreeMap;

/// A temp directory holding one loose-object store
#[fixture]
pub fn store_dir() -> TempDir {
    TempDir::new().expect("failed to create temp dir")
}

pub fn object_store(dir: &TempDir) -> Database {
    Database::new(dir.path().join("objects").into_boxed_path())
}

pub fn store_blob(db: &Database, content: &str) -> ObjectId {
    db.store(&Blob::new(Bytes::from(content.to_string())))
        .expect("failed to store blob")
}

/// Deterministic author so digests are stable across runs
pub fn author_at(seconds: i64) -> Author {
    let offset = chrono::FixedOffset::east_opt(0).expect("valid offset");
    let timestamp = chrono::DateTime::from_timestamp(1_700_000_000 + seconds, 0)
        .expect("valid timestamp")
        .with_timezone(&offset);

    Author::new(
        "Test Author".to_string(),
        "author@example.com".to_string(),
        timestamp,
    )
}

enum Node {
    File(String),
    Dir(BTreeMap<String, Node>),
}

fn insert_node(map: &mut BTreeMap<String, Node>, segments: &[&str], content: &str) {
    if segments.len() == 1 {
        map.insert(segments[0].to_string(), Node::File(content.to_string()));
        return;
    }

    let entry = map
        .entry(segments[0].to_string())
        .or_insert_with(|| Node::Dir(BTreeMap::new()));
    match entry {
        Node::Dir(children) => insert_node(children, &segments[1..], content),
        Node::File(_) => panic!("path {} conflicts with a file", segments[0]),
    }
}

fn store_node(db: &Database, map: &BTreeMap<String, Node>) -> Tree {
    let mut entries = Vec::new();
    for (name, node) in map {
        match node {
            Node::File(content) => entries.push(TreeEntry::new(
                name.clone(),
                EntryMode::Regular,
                store_blob(db, content),
            )),
            Node::Dir(children) => {
                let subtree = store_node(db, children);
                entries.push(TreeEntry::new(
                    name.clone(),
                    EntryMode::Directory,
                    subtree.object_id().expect("tree digest"),
                ));
            }
        }
    }

    Tree::sort_canonical(&mut entries);
    let tree = Tree::new(entries);
    db.store(&tree).expect("failed to store tree");
    tree
}

/// Build and store a tree from `(path, content)` pairs, creating
/// intermediate directories as needed
pub fn store_tree_of_files(db: &Database, files: &[(&str, &str)]) -> Tree {
    let mut root = BTreeMap::new();
    for (path, content) in files {
        let segments: Vec<&str> = path.split('/').collect();
        insert_node(&mut root, &segments, content);
    }

    store_node(db, &root)
}

pub fn store_commit(
    db: &Database,
    parents: Vec<ObjectId>,
    tree: &Tree,
    message: &str,
    at_seconds: i64,
) -> Commit {
    let author = author_at(at_seconds);
    let commit = Commit::new(
        parents,
        tree.object_id().expect("tree digest"),
        author.clone(),
        author,
        message.to_string(),
    );
    db.store(&commit).expect("failed to store commit");
    commit
}

/// Build a linear history where every snapshot is a full `(path, content)`
/// listing; commit messages are `commit #<idx>`
pub fn store_linear_history(db: &Database, snapshots: &[&[(&str, &str)]]) -> Vec<Commit> {
    let mut history = Vec::with_capacity(snapshots.len());

    let mut parent: Option<ObjectId> = None;
    for (idx, files) in snapshots.iter().enumerate() {
        let tree = store_tree_of_files(db, files);
        let parents = parent.iter().cloned().collect();
        let commit = store_commit(db, parents, &tree, &format!("commit #{idx}"), idx as i64);
        parent = Some(commit.object_id().expect("commit digest"));
        history.push(commit);
    }

    history
}

pub fn oids_of(history: &[Commit]) -> Vec<ObjectId> {
    history
        .iter()
        .map(|commit| commit.object_id().expect("commit digest"))
        .collect()
}

/// Collect every `(path, blob-digest)` pair reachable from a tree
pub fn list_files(db: &Database, tree: &Tree, prefix: &str) -> Vec<(String, ObjectId)> {
    let mut files = Vec::new();
    for entry in tree.entries() {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if entry.mode.is_tree() {
            let subtree = db.parse_object_as_tree(&entry.oid).expect("subtree");
            files.extend(list_files(db, &subtree, &path));
        } else {
            files.push((path, entry.oid.clone()));
        }
    }
    files
}
