//! Commit message generation from the staged diff.
//!
//! [`CommitAssistant`] inspects the working tree through [`GitRunner`], asks
//! the model for a Conventional Commits message and, once the caller has
//! confirmed, commits (and optionally pushes) with it.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::client_wrapper::{ChatOptions, ClientWrapper, Message};
use crate::tools::git::{GitError, GitRunner};

pub type CommitResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub const MAX_DIFF_CHARS: usize = 8000;
pub const TRUNCATION_SUFFIX: &str = "\n\n... (diff truncated)";

pub const COMMIT_SYSTEM_PROMPT: &str = "你是一个 Git commit message 生成专家。根据提供的 git diff 内容，生成规范的 commit message。

规则：
1. 使用 Conventional Commits 格式：<type>(<scope>): <description>
2. type 包括：feat(新功能), fix(修复), docs(文档), style(格式), refactor(重构), perf(性能), test(测试), chore(构建/工具)
3. scope 是可选的，表示影响范围（如文件名或模块名）
4. description 用英文，简洁明了，不超过 50 字符
5. 如果改动较大，可以在正文中补充说明

只输出 commit message，不要有其他解释。";

#[derive(Debug)]
pub enum CommitError {
    /// Changes exist but none are staged.
    NothingStaged,
    /// The model answered with an empty message.
    EmptyMessage,
    Git(GitError),
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::NothingStaged => write!(
                f,
                "No staged changes. Use --all to stage everything, or run git add <file> first"
            ),
            CommitError::EmptyMessage => write!(f, "Model returned an empty commit message"),
            CommitError::Git(e) => write!(f, "{}", e),
        }
    }
}

impl Error for CommitError {}

impl From<GitError> for CommitError {
    fn from(e: GitError) -> Self {
        CommitError::Git(e)
    }
}

/// What the working tree looks like before generation.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeState {
    /// `git status --short` printed nothing.
    Clean,
    /// Status lists changes but there is no diff to commit (e.g. only untracked files).
    NothingToCommit,
    Staged { status: String, diff: String },
}

/// Cut the diff to [`MAX_DIFF_CHARS`] characters.
pub fn truncate_diff(diff: &str) -> String {
    if diff.chars().count() <= MAX_DIFF_CHARS {
        return diff.to_string();
    }
    let mut cut: String = diff.chars().take(MAX_DIFF_CHARS).collect();
    cut.push_str(TRUNCATION_SUFFIX);
    cut
}

pub fn build_commit_request(diff: &str) -> Vec<Message> {
    vec![
        Message::system(COMMIT_SYSTEM_PROMPT),
        Message::user(format!(
            "请根据以下 git diff 生成 commit message:\n\n```diff\n{}\n```",
            truncate_diff(diff)
        )),
    ]
}

/// Escape double quotes for a copy-pasteable `git commit -m "..."`.
pub fn escape_for_shell(message: &str) -> String {
    message.replace('"', "\\\"")
}

pub fn suggested_command(message: &str) -> String {
    format!("git commit -m \"{}\"", escape_for_shell(message))
}

/// Empty input, `y` and `yes` confirm, case-insensitively.
pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

/// Like [`is_confirmation`], but `None` (input closed before an answer) declines.
pub fn is_confirmed(answer: Option<&str>) -> bool {
    answer.map_or(false, is_confirmation)
}

pub struct CommitAssistant {
    client: Arc<dyn ClientWrapper>,
    git: GitRunner,
}

impl CommitAssistant {
    pub fn new(client: Arc<dyn ClientWrapper>, git: GitRunner) -> Self {
        Self { client, git }
    }

    pub fn git(&self) -> &GitRunner {
        &self.git
    }

    /// Check the repository, optionally stage everything, and read the staged diff.
    pub async fn inspect(&self, stage_all: bool) -> CommitResult<TreeState> {
        self.git.ensure_repo().await.map_err(CommitError::from)?;

        let status = self.git.status_short().await.map_err(CommitError::from)?;
        if status.is_empty() {
            return Ok(TreeState::Clean);
        }

        if stage_all {
            log::info!("CommitAssistant::inspect: staging all changes");
            self.git.add_all().await.map_err(CommitError::from)?;
        }

        let diff = self.git.staged_diff().await.map_err(CommitError::from)?;
        if !diff.is_empty() {
            return Ok(TreeState::Staged { status, diff });
        }

        let unstaged = self.git.unstaged_diff().await.map_err(CommitError::from)?;
        if unstaged.is_empty() {
            Ok(TreeState::NothingToCommit)
        } else {
            Err(Box::new(CommitError::NothingStaged))
        }
    }

    /// One non-streaming call: max_tokens 256, temperature 0.3.
    pub async fn generate(&self, diff: &str) -> CommitResult<String> {
        let options = ChatOptions::new().with_max_tokens(256).with_temperature(0.3);
        let response = self
            .client
            .send_message(&build_commit_request(diff), &options)
            .await?;
        let message = response.content.trim().to_string();
        if message.is_empty() {
            return Err(Box::new(CommitError::EmptyMessage));
        }
        Ok(message)
    }

    /// Commit with `message`; returns git's stdout.
    pub async fn commit(&self, message: &str) -> CommitResult<String> {
        Ok(self.git.commit(message).await.map_err(CommitError::from)?)
    }

    pub async fn push(&self) -> CommitResult<String> {
        Ok(self.git.push().await.map_err(CommitError::from)?)
    }
}
