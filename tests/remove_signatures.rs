mod common;

use assert_fs::TempDir;
use common::{object_store, oids_of, store_commit, store_dir, store_tree_of_files};
use gitsieve::artifacts::objects::commit::Commit;
use gitsieve::artifacts::objects::object::Object;
use gitsieve::artifacts::rewrite::sign_strip::remove_signatures_for_linear_history;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio_util::sync::CancellationToken;

const SIGNATURE: &str =
    "-----BEGIN PGP SIGNATURE-----\nVGhpcyBpcyBub3QgYSByZWFsIHNpZ25hdHVyZQ==\n-----END PGP SIGNATURE-----";

/// Build a chain of signed commits over distinct trees
fn signed_history(db: &gitsieve::areas::database::Database, n: usize) -> Vec<Commit> {
    let mut history = Vec::with_capacity(n);

    let mut parent = None;
    for idx in 0..n {
        let tree = store_tree_of_files(db, &[("a.txt", &format!("revision {idx}"))]);
        let author = common::author_at(idx as i64);
        let commit = Commit::new(
            parent.iter().cloned().collect(),
            tree.object_id().unwrap(),
            author.clone(),
            author,
            format!("signed commit #{idx}"),
        )
        .with_signature(SIGNATURE.to_string());
        db.store(&commit).unwrap();

        parent = Some(commit.object_id().unwrap());
        history.push(commit);
    }

    history
}

#[rstest]
fn stripping_preserves_everything_but_the_signature(store_dir: TempDir) {
    let db = object_store(&store_dir);
    let history = signed_history(&db, 3);

    let cancel = CancellationToken::new();
    let new_history = remove_signatures_for_linear_history(&cancel, &history, &db).unwrap();

    assert_eq!(new_history.len(), 3);
    for (old, new) in history.iter().zip(&new_history) {
        assert_eq!(new.tree_oid(), old.tree_oid());
        assert_eq!(new.author(), old.author());
        assert_eq!(new.committer(), old.committer());
        assert_eq!(new.message(), old.message());
        assert_eq!(new.signature(), None);
        assert_ne!(new.object_id().unwrap(), old.object_id().unwrap());
    }
}

#[rstest]
fn stripping_relinks_parents_along_the_new_chain(store_dir: TempDir) {
    let db = object_store(&store_dir);
    let history = signed_history(&db, 3);

    let cancel = CancellationToken::new();
    let new_history = remove_signatures_for_linear_history(&cancel, &history, &db).unwrap();

    assert!(new_history[0].parents().is_empty());
    assert_eq!(
        new_history[1].parent(),
        Some(&new_history[0].object_id().unwrap())
    );
    assert_eq!(
        new_history[2].parent(),
        Some(&new_history[1].object_id().unwrap())
    );
}

#[rstest]
fn stripping_keeps_the_ancestor_of_the_first_commit(store_dir: TempDir) {
    let db = object_store(&store_dir);

    // unsigned ancestor that stays outside the rewritten range
    let base_tree = store_tree_of_files(&db, &[("a.txt", "base")]);
    let ancestor = store_commit(&db, vec![], &base_tree, "ancestor", 0);

    let tree = store_tree_of_files(&db, &[("a.txt", "signed change")]);
    let author = common::author_at(1);
    let signed = Commit::new(
        vec![ancestor.object_id().unwrap()],
        tree.object_id().unwrap(),
        author.clone(),
        author,
        "signed on top".to_string(),
    )
    .with_signature(SIGNATURE.to_string());
    db.store(&signed).unwrap();

    let cancel = CancellationToken::new();
    let new_history =
        remove_signatures_for_linear_history(&cancel, &[signed], &db).unwrap();

    assert_eq!(
        new_history[0].parent(),
        Some(&ancestor.object_id().unwrap())
    );
}

#[rstest]
fn stripping_twice_is_a_no_op_by_digest(store_dir: TempDir) {
    let db = object_store(&store_dir);
    let history = signed_history(&db, 3);

    let cancel = CancellationToken::new();
    let first_pass = remove_signatures_for_linear_history(&cancel, &history, &db).unwrap();
    let second_pass =
        remove_signatures_for_linear_history(&cancel, &first_pass, &db).unwrap();

    assert_eq!(oids_of(&first_pass), oids_of(&second_pass));
}

#[rstest]
fn signed_commits_round_trip_through_the_store(store_dir: TempDir) {
    let db = object_store(&store_dir);
    let history = signed_history(&db, 1);

    let stored_oid = history[0].object_id().unwrap();
    let reloaded = db.parse_object_as_commit(&stored_oid).unwrap();

    assert_eq!(reloaded.signature(), Some(SIGNATURE));
    assert_eq!(reloaded.object_id().unwrap(), stored_oid);
}
