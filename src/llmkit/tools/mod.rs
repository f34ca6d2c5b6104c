//! Built-in tools the command-line workflows lean on.
//!
//! # Available Tools
//!
//! - **Git**: async `git` runner with timeouts and captured stdout/stderr
//!   - status, staged/unstaged diffs, staging, commit, push
//!   - shallow clones for reviewing remote repositories
//!
//! - **Codebase**: directory walker that merges a source tree into one text blob
//!   - skips VCS/build directories, lock files and binary extensions
//!   - local paths or `http(s)` git URLs (cloned into a temporary directory)
//!
//! - **News**: AI news fetchers for Hugging Face daily papers, Hacker News and arXiv
//!
//! ```ignore
//! use llmkit::tools::{collect_files, CodebaseSource, GitRunner};
//!
//! let git = GitRunner::new();
//! let source = CodebaseSource::resolve("https://github.com/user/repo", &git).await?;
//! let files = collect_files(source.path(), &[])?;
//! ```

pub mod codebase;
pub mod git;
pub mod news;

pub use codebase::{
    collect_files, merge_to_file, read_for_review, render_merged, CodeFile, CodebaseError,
    CodebaseSource,
};
pub use git::{GitError, GitOutput, GitRunner};
pub use news::{NewsFetcher, NewsItem};
