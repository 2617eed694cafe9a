//! Local git remotes and archives.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Content of the `README.md` committed to every seeded fixture.
pub const SEED_README: &str = "initial\n";

/// A bare repository on local disk, reachable through a `file://` URL.
///
/// [`RemoteFixture::new`] seeds `main` with a single commit adding
/// `README.md`; [`RemoteFixture::empty`] has no commits at all.
#[derive(Debug)]
pub struct RemoteFixture {
    root: TempDir,
    bare: PathBuf,
    seed: PathBuf,
}

impl RemoteFixture {
    /// A remote whose `main` branch contains `README.md`.
    ///
    /// # Panics
    ///
    /// Panics if `git` is unavailable or any setup step fails.
    #[must_use]
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture.commit_files("main", &[("README.md", SEED_README.as_bytes())]);
        fixture
    }

    /// A remote with no commits.
    ///
    /// # Panics
    ///
    /// Panics if `git` is unavailable or any setup step fails.
    #[must_use]
    pub fn empty() -> Self {
        let root = TempDir::with_prefix("gitdrop-remote-").expect("Failed to create temp directory");
        let bare = root.path().join("remote.git");
        let seed = root.path().join("seed");
        git(
            root.path(),
            &["init", "--bare", "--initial-branch=main", "remote.git"],
        );
        git(root.path(), &["init", "--initial-branch=main", "seed"]);
        Self { root, bare, seed }
    }

    /// `file://` URL of the bare repository.
    #[must_use]
    pub fn url(&self) -> String {
        format!("file://{}", self.bare.display())
    }

    /// Path of the bare repository.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.bare
    }

    /// Scratch directory that is removed with the fixture.
    #[must_use]
    pub fn scratch(&self) -> &Path {
        self.root.path()
    }

    /// Commit `files` on `branch` (created from the seed's current HEAD if
    /// new) and push it to the remote.
    ///
    /// # Panics
    ///
    /// Panics if any git step fails.
    pub fn commit_files(&self, branch: &str, files: &[(&str, &[u8])]) {
        let local = format!("refs/heads/{branch}");
        if !succeeds(&self.seed, &["rev-parse", "--verify", "-q", "HEAD"]) {
            git(&self.seed, &["symbolic-ref", "HEAD", &local]);
        } else if succeeds(&self.seed, &["rev-parse", "--verify", "-q", &local]) {
            git(&self.seed, &["checkout", "-q", branch]);
        } else {
            git(&self.seed, &["checkout", "-q", "-b", branch]);
        }
        for (name, content) in files {
            let path = self.seed.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("Failed to create parent directories");
            }
            std::fs::write(&path, content).expect("Failed to write file");
        }
        git(&self.seed, &["add", "-A"]);
        git(&self.seed, &["commit", "-q", "-m", &format!("seed {branch}")]);
        let bare = self.bare.display().to_string();
        git(
            &self.seed,
            &["push", "-q", &bare, &format!("HEAD:refs/heads/{branch}")],
        );
    }

    /// Branch names on the remote, sorted.
    #[must_use]
    pub fn branches(&self) -> Vec<String> {
        let out = git(
            &self.bare,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        );
        let mut names: Vec<String> = out.lines().map(str::to_owned).collect();
        names.sort();
        names
    }

    /// Content of `path` at the tip of `branch`, if it exists.
    #[must_use]
    pub fn read_file(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let output = git_command(&self.bare)
            .args(["show", &format!("{branch}:{path}")])
            .output()
            .expect("Failed to run git");
        output.status.success().then_some(output.stdout)
    }

    /// Number of commits reachable from `branch`.
    #[must_use]
    pub fn commit_count(&self, branch: &str) -> usize {
        git(&self.bare, &["rev-list", "--count", branch])
            .trim()
            .parse()
            .expect("rev-list --count should print a number")
    }

    /// Subject of the newest commit on `branch`.
    #[must_use]
    pub fn last_message(&self, branch: &str) -> String {
        git(&self.bare, &["log", "-1", "--format=%s", branch])
            .trim()
            .to_owned()
    }

    /// `Name <email>` of the newest commit's author on `branch`.
    #[must_use]
    pub fn last_author(&self, branch: &str) -> String {
        git(&self.bare, &["log", "-1", "--format=%an <%ae>", branch])
            .trim()
            .to_owned()
    }

    /// Paths changed by the newest commit on `branch`.
    #[must_use]
    pub fn last_changed_paths(&self, branch: &str) -> Vec<String> {
        git(
            &self.bare,
            &["show", "--name-only", "--format=", branch],
        )
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
    }
}

impl Default for RemoteFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a zip archive in memory.
///
/// Names ending in `/` become directory entries; their content is ignored.
///
/// # Panics
///
/// Panics if the archive cannot be written.
#[must_use]
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, options)
                .expect("Failed to add directory entry");
        } else {
            writer
                .start_file(*name, options)
                .expect("Failed to start zip entry");
            writer.write_all(content).expect("Failed to write zip entry");
        }
    }
    writer
        .finish()
        .expect("Failed to finish zip archive")
        .into_inner()
}

fn git_command(dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_TERMINAL_PROMPT", "0")
        .args([
            "-c",
            "user.name=Fixture",
            "-c",
            "user.email=fixture@example.com",
            "-c",
            "commit.gpgsign=false",
        ]);
    cmd
}

fn succeeds(dir: &Path, args: &[&str]) -> bool {
    git_command(dir)
        .args(args)
        .output()
        .expect("Failed to run git")
        .status
        .success()
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = git_command(dir)
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}
