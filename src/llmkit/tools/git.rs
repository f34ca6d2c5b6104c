//! Git command runner.
//!
//! [`GitRunner`] shells out to the `git` binary with a timeout and captures
//! stdout and stderr separately. The commit-message workflow uses it for
//! status, diffs, staging, commits and pushes; the codebase walker uses it for
//! shallow clones.
//!
//! ```ignore
//! use llmkit::tools::GitRunner;
//!
//! let git = GitRunner::new().with_repo_dir("/path/to/repo");
//! if git.is_repo().await {
//!     println!("{}", git.status_short().await?);
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Captured result of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was killed by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
}

#[derive(Debug)]
pub enum GitError {
    /// The `git` binary is not on `PATH`.
    NotInstalled,
    NotARepository(String),
    Timeout(String),
    /// Git ran and exited non-zero.
    CommandFailed { command: String, stderr: String },
    IoError(std::io::Error),
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitError::NotInstalled => write!(f, "git not found; install it and add it to PATH"),
            GitError::NotARepository(dir) => write!(f, "Not a git repository: {}", dir),
            GitError::Timeout(msg) => write!(f, "Command timeout: {}", msg),
            GitError::CommandFailed { command, stderr } => {
                write!(f, "{} failed: {}", command, stderr.trim())
            }
            GitError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for GitError {}

#[derive(Debug, Clone)]
pub struct GitRunner {
    /// Working directory; `None` uses the process's current directory.
    repo_dir: Option<PathBuf>,
    timeout_secs: u64,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRunner {
    pub fn new() -> Self {
        Self {
            repo_dir: None,
            timeout_secs: 120,
        }
    }

    pub fn with_repo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.repo_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Run `git <args>` and capture its output. A non-zero exit is not an error here.
    pub async fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let start = Instant::now();
        let mut cmd = Command::new("git");
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.repo_dir {
            cmd.current_dir(dir);
        }

        log::debug!("GitRunner::run: git {}", args.join(" "));
        let timeout = Duration::from_secs(self.timeout_secs);
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GitError::NotInstalled)
            }
            Ok(Err(e)) => return Err(GitError::IoError(e)),
            Err(_) => {
                return Err(GitError::Timeout(format!(
                    "git {} exceeded {} second timeout",
                    args.join(" "),
                    self.timeout_secs
                )))
            }
        };

        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Run and fail on a non-zero exit; returns stdout.
    pub async fn run_checked(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args).await?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                stderr: output.stderr,
            })
        }
    }

    pub async fn is_repo(&self) -> bool {
        matches!(self.run(&["rev-parse", "--git-dir"]).await, Ok(o) if o.success)
    }

    /// Error unless the working directory is inside a repository.
    pub async fn ensure_repo(&self) -> Result<(), GitError> {
        let output = self.run(&["rev-parse", "--git-dir"]).await?;
        if output.success {
            Ok(())
        } else {
            let dir = self
                .repo_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| ".".to_string());
            Err(GitError::NotARepository(dir))
        }
    }

    /// `git status --short`, trimmed.
    pub async fn status_short(&self) -> Result<String, GitError> {
        Ok(self.run_checked(&["status", "--short"]).await?.trim().to_string())
    }

    pub async fn staged_diff(&self) -> Result<String, GitError> {
        Ok(self.run_checked(&["diff", "--cached"]).await?.trim().to_string())
    }

    pub async fn unstaged_diff(&self) -> Result<String, GitError> {
        Ok(self.run_checked(&["diff"]).await?.trim().to_string())
    }

    pub async fn add_all(&self) -> Result<(), GitError> {
        self.run_checked(&["add", "-A"]).await.map(|_| ())
    }

    pub async fn commit(&self, message: &str) -> Result<String, GitError> {
        self.run_checked(&["commit", "-m", message]).await
    }

    pub async fn push(&self) -> Result<String, GitError> {
        self.run_checked(&["push"]).await
    }

    /// `git clone --depth 1 <url> <dest>`.
    pub async fn shallow_clone(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        let dest = dest.to_string_lossy();
        log::info!("GitRunner::shallow_clone: {} -> {}", url, dest);
        self.run_checked(&["clone", "--depth", "1", url, &dest])
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn git_available() -> bool {
        GitRunner::new().run(&["--version"]).await.is_ok()
    }

    #[test]
    fn test_error_display() {
        let err = GitError::CommandFailed {
            command: "git push".into(),
            stderr: "rejected\n".into(),
        };
        assert_eq!(err.to_string(), "git push failed: rejected");
        assert!(GitError::NotInstalled.to_string().starts_with("git not found"));
    }

    #[tokio::test]
    async fn test_non_repo_is_detected() {
        if !git_available().await {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let git = GitRunner::new().with_repo_dir(tmp.path());
        assert!(!git.is_repo().await);
        match git.ensure_repo().await {
            Err(GitError::NotARepository(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_and_staged_diff() {
        if !git_available().await {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let git = GitRunner::new().with_repo_dir(tmp.path());
        git.run_checked(&["init", "-q"]).await.unwrap();
        assert!(git.is_repo().await);
        assert_eq!(git.status_short().await.unwrap(), "");

        std::fs::write(tmp.path().join("a.txt"), "hello\n").unwrap();
        assert_eq!(git.status_short().await.unwrap(), "?? a.txt");
        assert_eq!(git.staged_diff().await.unwrap(), "");

        git.add_all().await.unwrap();
        let diff = git.staged_diff().await.unwrap();
        assert!(diff.contains("+hello"));
    }
}
