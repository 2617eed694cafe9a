use super::*;
use gitdrop_test::{RemoteFixture, SEED_README, setup_test_logging_default};

fn file(path: &str, content: &[u8]) -> MaterializedFile {
    MaterializedFile {
        path: path.to_string(),
        content: content.to_vec(),
    }
}

fn author() -> Author {
    Author {
        name: "Test Author".into(),
        email: "author@example.com".into(),
    }
}

async fn ready(remote: &RemoteFixture, branch: &str) -> (Workspace, AuthContext, CloneOutcome) {
    setup_test_logging_default();
    let auth = AuthContext::anonymous(remote.url());
    let mut ws = Workspace::create(&GitSettings::default()).unwrap();
    let outcome = ws.clone_branch(&auth, branch).await.unwrap();
    ws.configure(&author(), &auth).await.unwrap();
    (ws, auth, outcome)
}

// ---------------------------------------------------------------------------
// Path safety
// ---------------------------------------------------------------------------

#[test]
fn safe_paths() {
    assert_eq!(
        safe_relative_path("src/app.js"),
        Some(PathBuf::from("src/app.js"))
    );
    assert_eq!(
        safe_relative_path("src\\win\\file.txt"),
        Some(PathBuf::from("src/win/file.txt"))
    );
    assert_eq!(
        safe_relative_path("a/./b.txt"),
        Some(PathBuf::from("a/b.txt"))
    );
}

#[test]
fn unsafe_paths() {
    for bad in [
        "",
        "  ",
        "../../etc/passwd",
        "a/../../b",
        "/etc/passwd",
        ".git/config",
        "sub/.git/hooks/pre-commit",
        "sub/.GIT/config",
        ".env",
        "./README.md",
    ] {
        assert!(safe_relative_path(bad).is_none(), "{bad:?} should be rejected");
    }
}

#[test]
fn missing_branch_markers() {
    assert!(is_missing_branch(
        "warning: Could not find remote branch feature-x to clone.\n\
         fatal: Remote branch feature-x not found in upstream origin"
    ));
    assert!(is_missing_branch("fatal: couldn't find remote ref feature-x"));
    assert!(!is_missing_branch(
        "fatal: Authentication failed for 'https://github.com/o/r.git/'"
    ));
    assert!(!is_missing_branch("fatal: repository 'x' not found"));
}

#[test]
fn status_summary_parsing() {
    let summary = StatusSummary::parse("A  new.txt\nM  changed.txt\nD  gone.txt\nR  old -> new\n?? loose\n");
    assert_eq!(
        summary,
        StatusSummary {
            added: 2,
            modified: 1,
            deleted: 1,
            renamed: 1,
        }
    );
    assert_eq!(summary.total(), 5);
    assert!(StatusSummary::parse("").is_empty());
}

// ---------------------------------------------------------------------------
// State machine against a local remote
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clones_existing_branch() {
    let remote = RemoteFixture::new();
    let (ws, _auth, outcome) = ready(&remote, "main").await;
    assert_eq!(outcome, CloneOutcome::Existing);
    assert_eq!(ws.state(), WorkspaceState::BranchReady);
    let readme = std::fs::read_to_string(ws.repo_path().join("README.md")).unwrap();
    assert_eq!(readme, SEED_README);
}

#[tokio::test]
async fn missing_branch_falls_back_to_default() {
    let remote = RemoteFixture::new();
    let (ws, _auth, outcome) = ready(&remote, "feature-x").await;
    assert_eq!(outcome, CloneOutcome::CreatedFromDefault);

    let head = ws.git_local(&["rev-parse", "--abbrev-ref", "HEAD"]).await.unwrap();
    assert_eq!(head.trim(), "feature-x");
    assert!(ws.repo_path().join("README.md").exists());
}

#[tokio::test]
async fn empty_remote_gets_a_branch() {
    let remote = RemoteFixture::empty();
    let (mut ws, auth, outcome) = ready(&remote, "main").await;
    assert_eq!(outcome, CloneOutcome::CreatedFromDefault);
    assert_eq!(ws.state(), WorkspaceState::BranchReady);

    ws.write_files(&[file("first.txt", b"first")]).await.unwrap();
    ws.stage().await.unwrap();
    ws.commit("First commit").await.unwrap();
    ws.push(&auth, "main").await.unwrap();
    assert_eq!(remote.branches(), vec!["main".to_string()]);
    assert_eq!(remote.commit_count("main"), 1);
}

#[tokio::test]
async fn unreachable_remote_is_clone_error() {
    let scratch = tempfile::tempdir().unwrap();
    let missing = format!("file://{}/nope.git", scratch.path().display());
    let mut ws = Workspace::create(&GitSettings::default()).unwrap();
    let err = ws
        .clone_branch(&AuthContext::anonymous(missing), "main")
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Clone(_)), "{err}");
    assert_eq!(ws.state(), WorkspaceState::Failed);
}

#[tokio::test]
async fn full_cycle_pushes_commit() {
    let remote = RemoteFixture::new();
    let (mut ws, auth, _) = ready(&remote, "feature-x").await;

    let written = ws
        .write_files(&[file("README.md", b"Hello"), file("src/app.js", b"console.log(1)")])
        .await
        .unwrap();
    assert_eq!(written, 2);

    let summary = ws.stage().await.unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(summary.modified, 1);

    let id = ws.commit("Add files").await.unwrap();
    assert_eq!(id.len(), 40);
    ws.push(&auth, "feature-x").await.unwrap();
    assert_eq!(ws.state(), WorkspaceState::Pushed);

    assert_eq!(
        remote.branches(),
        vec!["feature-x".to_string(), "main".to_string()]
    );
    assert_eq!(remote.read_file("feature-x", "README.md").unwrap(), b"Hello");
    assert_eq!(remote.commit_count("feature-x"), 2);
    assert_eq!(remote.last_message("feature-x"), "Add files");
    assert_eq!(
        remote.last_author("feature-x"),
        "Test Author <author@example.com>"
    );
    assert_eq!(remote.commit_count("main"), 1);
}

#[tokio::test]
async fn unsafe_paths_are_not_written() {
    let remote = RemoteFixture::new();
    let (mut ws, _auth, _) = ready(&remote, "main").await;
    let written = ws
        .write_files(&[
            file("../../etc/passwd", b"root"),
            file(".git/config", b"OVERWRITTEN"),
            file("src/app.js", b"ok"),
        ])
        .await
        .unwrap();
    assert_eq!(written, 1);
    assert!(ws.repo_path().join("src/app.js").exists());
    let config = std::fs::read_to_string(ws.repo_path().join(".git/config")).unwrap();
    assert!(!config.contains("OVERWRITTEN"));
    assert!(!ws.repo_path().parent().unwrap().join("etc").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_directories_are_not_followed() {
    let remote = RemoteFixture::new();
    let (mut ws, _auth, _) = ready(&remote, "main").await;
    let outside = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink(outside.path(), ws.repo_path().join("link")).unwrap();

    let written = ws
        .write_files(&[file("link/escaped.txt", b"nope")])
        .await
        .unwrap();
    assert_eq!(written, 0);
    assert!(!outside.path().join("escaped.txt").exists());
}

#[tokio::test]
async fn identical_content_is_no_changes() {
    let remote = RemoteFixture::new();
    let (mut ws, _auth, _) = ready(&remote, "main").await;
    ws.write_files(&[file("README.md", SEED_README.as_bytes())])
        .await
        .unwrap();
    let err = ws.stage().await.unwrap_err();
    assert!(matches!(err, UploadError::NoChanges));
    assert_eq!(ws.state(), WorkspaceState::Failed);
    assert_eq!(remote.commit_count("main"), 1);
}

#[tokio::test]
async fn steps_out_of_order_are_rejected() {
    let remote = RemoteFixture::new();
    let mut ws = Workspace::create(&GitSettings::default()).unwrap();
    let err = ws.commit("too early").await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidState { .. }));
    // A rejected call leaves the state untouched.
    assert_eq!(ws.state(), WorkspaceState::Created);

    let auth = AuthContext::anonymous(remote.url());
    ws.clone_branch(&auth, "main").await.unwrap();
    let err = ws.push(&auth, "main").await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidState { .. }));
}

#[tokio::test]
async fn push_restores_a_changed_remote() {
    let remote = RemoteFixture::new();
    let (mut ws, auth, _) = ready(&remote, "main").await;
    ws.git_local(&["remote", "set-url", "origin", "file:///nonexistent/elsewhere.git"])
        .await
        .unwrap();

    ws.write_files(&[file("new.txt", b"new")]).await.unwrap();
    ws.stage().await.unwrap();
    ws.commit("Add new.txt").await.unwrap();
    ws.push(&auth, "main").await.unwrap();
    assert_eq!(remote.read_file("main", "new.txt").unwrap(), b"new");
}

#[tokio::test]
async fn close_removes_directory() {
    let ws = Workspace::create(&GitSettings::default()).unwrap();
    let root = ws.repo_path().parent().unwrap().to_path_buf();
    assert!(root.exists());
    ws.close().unwrap();
    assert!(!root.exists());
}

#[tokio::test]
async fn temp_root_is_respected() {
    let root = tempfile::tempdir().unwrap();
    let settings = GitSettings {
        temp_root: Some(root.path().to_path_buf()),
        ..GitSettings::default()
    };
    let ws = Workspace::create(&settings).unwrap();
    assert!(ws.repo_path().starts_with(root.path()));
}
