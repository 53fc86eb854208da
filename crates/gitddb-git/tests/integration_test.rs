use tempfile::TempDir;

use gitddb_git::{DocRepo, GixDocRepo, Identity, TreeChange};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_identity() -> Identity {
    Identity::new("GitDocumentDB", "system@gdd.localhost")
}

fn setup_repo() -> (TempDir, GixDocRepo) {
    let dir = TempDir::new().unwrap();
    let workdir = dir.path().join("db");
    let (repo, initialized) = GixDocRepo::open_or_init(&workdir).unwrap();
    assert!(initialized);
    (dir, repo)
}

fn put_blob(repo: &GixDocRepo, path: &str, data: &[u8], message: &str) -> gitddb_git::GitOid {
    let oid = repo.write_blob(data).unwrap();
    repo.commit_changes(
        &[TreeChange::Upsert {
            path: path.to_owned(),
            oid,
        }],
        message,
        &test_identity(),
    )
    .unwrap()
}

// ===========================================================================
// Open / init
// ===========================================================================

#[test]
fn init_creates_repo_with_unborn_head() {
    let (_dir, repo) = setup_repo();
    assert!(repo.workdir().join(".git").exists());
    assert_eq!(repo.head_commit().unwrap(), None);
}

#[test]
fn reopen_existing_repo() {
    let dir = TempDir::new().unwrap();
    let workdir = dir.path().join("db");

    let (repo, initialized) = GixDocRepo::open_or_init(&workdir).unwrap();
    assert!(initialized);
    put_blob(&repo, "a.json", b"{}", "first");
    drop(repo);

    let (repo, initialized) = GixDocRepo::open_or_init(&workdir).unwrap();
    assert!(!initialized);
    assert!(repo.head_commit().unwrap().is_some());
}

#[test]
fn open_creates_missing_directories() {
    let dir = TempDir::new().unwrap();
    let workdir = dir.path().join("nested").join("dirs").join("db");
    let (_repo, initialized) = GixDocRepo::open_or_init(&workdir).unwrap();
    assert!(initialized);
    assert!(workdir.join(".git").exists());
}

// ===========================================================================
// Objects
// ===========================================================================

#[test]
fn blob_roundtrip() {
    let (_dir, repo) = setup_repo();
    let data = b"{\n  \"name\": \"shirase\"\n}";
    let oid = repo.write_blob(data).unwrap();
    assert_eq!(repo.read_blob(oid).unwrap(), data);
}

#[test]
fn blob_oid_is_content_addressed() {
    let (_dir, repo_a) = setup_repo();
    let (_dir_b, repo_b) = setup_repo();
    let a = repo_a.write_blob(b"same bytes").unwrap();
    let b = repo_b.write_blob(b"same bytes").unwrap();
    assert_eq!(a, b);
}

#[test]
fn first_commit_has_no_parents() {
    let (_dir, repo) = setup_repo();
    let commit = put_blob(&repo, "a.json", b"{}", "insert: a.json(0000000)");

    assert_eq!(repo.head_commit().unwrap(), Some(commit));
    let info = repo.read_commit(commit).unwrap();
    assert!(info.parents.is_empty());
    assert_eq!(info.message.trim(), "insert: a.json(0000000)");
    assert!(info.author.contains("GitDocumentDB"));
}

#[test]
fn second_commit_chains_to_first() {
    let (_dir, repo) = setup_repo();
    let first = put_blob(&repo, "a.json", b"{}", "first");
    let second = put_blob(&repo, "b.json", b"{}", "second");

    let info = repo.read_commit(second).unwrap();
    assert_eq!(info.parents, vec![first]);
    assert_eq!(repo.head_commit().unwrap(), Some(second));
}

#[test]
fn blob_at_resolves_paths() {
    let (_dir, repo) = setup_repo();
    let blob = repo.write_blob(b"{}").unwrap();
    let commit = repo
        .commit_changes(
            &[TreeChange::Upsert {
                path: "citrus/yuzu.json".to_owned(),
                oid: blob,
            }],
            "insert",
            &test_identity(),
        )
        .unwrap();

    assert_eq!(repo.blob_at(commit, "citrus/yuzu.json").unwrap(), Some(blob));
    assert_eq!(repo.blob_at(commit, "citrus/nope.json").unwrap(), None);
    // A tree path is not a blob.
    assert_eq!(repo.blob_at(commit, "citrus").unwrap(), None);
}

#[test]
fn subtree_at_resolves_directories() {
    let (_dir, repo) = setup_repo();
    let blob = repo.write_blob(b"{}").unwrap();
    let commit = repo
        .commit_changes(
            &[TreeChange::Upsert {
                path: "citrus/yuzu.json".to_owned(),
                oid: blob,
            }],
            "insert",
            &test_identity(),
        )
        .unwrap();

    let subtree = repo.subtree_at(commit, "citrus").unwrap().unwrap();
    let entries = repo.read_tree(subtree).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "yuzu.json");
    assert_eq!(entries[0].oid, blob);

    assert_eq!(repo.subtree_at(commit, "not_exist").unwrap(), None);
    // A blob path is not a subtree.
    assert_eq!(repo.subtree_at(commit, "citrus/yuzu.json").unwrap(), None);
}

#[test]
fn remove_change_drops_entry() {
    let (_dir, repo) = setup_repo();
    put_blob(&repo, "a.json", b"{}", "insert a");
    put_blob(&repo, "b.json", b"{}", "insert b");

    let commit = repo
        .commit_changes(
            &[TreeChange::Remove {
                path: "a.json".to_owned(),
            }],
            "delete a",
            &test_identity(),
        )
        .unwrap();

    assert_eq!(repo.blob_at(commit, "a.json").unwrap(), None);
    assert!(repo.blob_at(commit, "b.json").unwrap().is_some());
}

#[test]
fn root_tree_lists_entries_sorted() {
    let (_dir, repo) = setup_repo();
    put_blob(&repo, "banana.json", b"{}", "b");
    put_blob(&repo, "apple.json", b"{}", "a");

    let head = repo.head_commit().unwrap().unwrap();
    let info = repo.read_commit(head).unwrap();
    let entries = repo.read_tree(info.tree_oid).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    // Git stores tree entries in sorted order.
    assert_eq!(names, vec!["apple.json", "banana.json"]);
}

// ===========================================================================
// Index
// ===========================================================================

#[test]
fn index_is_empty_before_first_commit() {
    let (_dir, repo) = setup_repo();
    assert_eq!(repo.index_blob("a.json").unwrap(), None);
}

#[test]
fn index_tracks_committed_blobs() {
    let (_dir, repo) = setup_repo();
    let blob = repo.write_blob(b"{\"x\": 1}").unwrap();
    repo.commit_changes(
        &[TreeChange::Upsert {
            path: "a.json".to_owned(),
            oid: blob,
        }],
        "insert",
        &test_identity(),
    )
    .unwrap();

    assert_eq!(repo.index_blob("a.json").unwrap(), Some(blob));
    assert_eq!(repo.index_blob("missing.json").unwrap(), None);
}

#[test]
fn index_drops_removed_blobs() {
    let (_dir, repo) = setup_repo();
    put_blob(&repo, "a.json", b"{}", "insert");
    repo.commit_changes(
        &[TreeChange::Remove {
            path: "a.json".to_owned(),
        }],
        "delete",
        &test_identity(),
    )
    .unwrap();

    assert_eq!(repo.index_blob("a.json").unwrap(), None);
}
