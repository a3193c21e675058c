mod common;

use common::{create_test_dir, write_file};
use webdeploy::{DirOutcome, ExclusionRules, MemoryRemote, RemoteConnector, Uploader};

#[tokio::test]
async fn test_mirror_skips_markdown_and_descends_into_subdirectories() {
    let temp_dir = create_test_dir();
    let root = temp_dir.path();
    write_file(root, "a.txt", "a").await;
    write_file(root, "notes.md", "notes").await;
    write_file(root, "sub/b.txt", "b").await;

    let remote = MemoryRemote::new();
    let mut store = remote.connect().await.expect("Should connect");
    let rules = ExclusionRules::from_patterns(["*.md"]).expect("Valid pattern");

    let report = Uploader::new(&mut store, &rules)
        .upload_directory(root, "/site")
        .await;

    assert_eq!(
        remote.files(),
        vec!["/site/a.txt".to_string(), "/site/sub/b.txt".to_string()]
    );
    assert_eq!(report.skipped, vec![root.join("notes.md")]);
    assert!(report.failed.is_empty());
    assert_eq!(remote.file("/site/sub/b.txt"), Some(b"b".to_vec()));
}

#[tokio::test]
async fn test_exact_rule_does_not_match_inside_names() {
    let temp_dir = create_test_dir();
    let root = temp_dir.path();
    write_file(root, "tests/UnitTest.php", "<?php").await;
    write_file(root, "tests.php", "<?php").await;
    write_file(root, "lib/tests/Helper.php", "<?php").await;

    let remote = MemoryRemote::new();
    let mut store = remote.connect().await.expect("Should connect");
    let rules = ExclusionRules::from_patterns(["tests"]).expect("Valid pattern");

    Uploader::new(&mut store, &rules)
        .upload_directory(root, "/site")
        .await;

    assert_eq!(remote.files(), vec!["/site/tests.php".to_string()]);
    assert!(remote.has_dir("/site/lib"));
    assert!(!remote.has_dir("/site/lib/tests"));
}

#[tokio::test]
async fn test_deep_remote_target_is_created() {
    let temp_dir = create_test_dir();
    let root = temp_dir.path();
    write_file(root, "index.php", "<?php").await;

    let remote = MemoryRemote::new();
    let mut store = remote.connect().await.expect("Should connect");
    let rules = ExclusionRules::default();

    let report = Uploader::new(&mut store, &rules)
        .upload_directory(root, "/home/user/www/site")
        .await;

    assert_eq!(
        report.directories,
        vec![("/home/user/www/site".to_string(), DirOutcome::Created)]
    );
    assert!(remote.has_file("/home/user/www/site/index.php"));
}

#[tokio::test]
async fn test_reupload_over_existing_tree() {
    let temp_dir = create_test_dir();
    let root = temp_dir.path();
    write_file(root, "sub/page.php", "v2").await;

    let remote = MemoryRemote::new();
    remote.add_dir("/site/sub");
    remote.add_file("/site/sub/page.php", b"v1".to_vec());
    let mut store = remote.connect().await.expect("Should connect");
    let rules = ExclusionRules::default();

    let report = Uploader::new(&mut store, &rules)
        .upload_directory(root, "/site")
        .await;

    assert!(report.failed_directories().is_empty());
    assert!(report
        .directories
        .iter()
        .all(|(_, outcome)| *outcome == DirOutcome::AlreadyExists));
    assert_eq!(remote.file("/site/sub/page.php"), Some(b"v2".to_vec()));
}
