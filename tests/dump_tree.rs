mod common;

use assert_fs::TempDir;
use common::{object_store, store_dir, store_tree_of_files};
use gitsieve::artifacts::filter::TrueFilter;
use gitsieve::artifacts::filter::compose::OrFilter;
use gitsieve::artifacts::rewrite::tree_dump::dump_tree;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio_util::sync::CancellationToken;

#[rstest]
fn dumps_only_paths_the_filter_keeps(store_dir: TempDir) {
    let db = object_store(&store_dir);
    let tree = store_tree_of_files(
        &db,
        &[
            ("src/a.rs", "a"),
            ("src/sub/b.rs", "b"),
            ("docs/x.md", "x"),
            ("README.md", "read"),
        ],
    );

    let cancel = CancellationToken::new();
    let filter = OrFilter::for_patterns(["src/**"]).unwrap();

    let mut listing = Vec::new();
    dump_tree(&cancel, &db, &tree, &[], &filter, &mut listing).unwrap();

    assert_eq!(
        String::from_utf8(listing).unwrap(),
        "src/a.rs\nsrc/sub/b.rs\n"
    );
}

#[rstest]
fn dumps_every_path_without_a_filter(store_dir: TempDir) {
    let db = object_store(&store_dir);
    let tree = store_tree_of_files(&db, &[("b.txt", "b"), ("a/x.txt", "x")]);

    let cancel = CancellationToken::new();

    let mut listing = Vec::new();
    dump_tree(&cancel, &db, &tree, &[], &TrueFilter, &mut listing).unwrap();

    assert_eq!(String::from_utf8(listing).unwrap(), "a/x.txt\nb.txt\n");
}
