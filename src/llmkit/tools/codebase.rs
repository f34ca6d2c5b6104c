//! Codebase collection for prompts.
//!
//! Walks a source tree and turns every readable text file into a block
//! headed by its relative path, so a whole repository can be pasted into a
//! model context.
//!
//! # Rules
//!
//! - Directories such as `.git`, `node_modules` and `target` are skipped.
//! - Lock files, `LICENSE`, `.gitignore` and the output file itself are skipped.
//! - Files with a binary extension (images, archives, fonts, `.lock`...) are skipped.
//! - Empty files and files that are not valid UTF-8 are skipped and logged.
//!
//! A source may also be an `http(s)` git URL; it is shallow-cloned into a
//! temporary directory that is removed when the [`CodebaseSource`] drops.

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::tools::git::GitRunner;

pub type CodebaseResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub const IGNORE_DIRS: [&str; 12] = [
    ".git", ".idea", ".vscode", "__pycache__", "node_modules", "dist", "build", "venv", "env",
    ".DS_Store", "target", "out",
];

pub const IGNORE_FILES: [&str; 6] = [
    ".DS_Store", "package-lock.json", "yarn.lock", "pnpm-lock.yaml", "LICENSE", ".gitignore",
];

pub const BINARY_EXTENSIONS: [&str; 30] = [
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "svg", "webp", "mp4", "mp3", "wav", "pdf", "zip",
    "tar", "gz", "7z", "rar", "pyc", "exe", "dll", "so", "dylib", "class", "jar", "bin", "eot",
    "woff", "woff2", "ttf", "lock",
];

const HASH_COMMENT_EXTENSIONS: [&str; 9] =
    ["py", "sh", "yaml", "yml", "conf", "ini", "rb", "pl", "dockerfile"];

#[derive(Debug, Clone)]
pub enum CodebaseError {
    NotFound(String),
    CloneFailed(String),
    IOError(String),
    /// Nothing readable was found.
    Empty(String),
}

impl fmt::Display for CodebaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodebaseError::NotFound(p) => write!(f, "Path not found: {}", p),
            CodebaseError::CloneFailed(msg) => write!(
                f,
                "Git clone failed: {}. Check the URL and that git is installed.",
                msg
            ),
            CodebaseError::IOError(msg) => write!(f, "IO error: {}", msg),
            CodebaseError::Empty(p) => write!(f, "No readable source files in {}", p),
        }
    }
}

impl Error for CodebaseError {}

/// One collected text file.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeFile {
    /// Path relative to the walked root, `/`-separated.
    pub rel_path: String,
    pub content: String,
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

pub fn is_binary_file(path: &Path) -> bool {
    extension_lower(path)
        .map(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// `# ` for script and config files, `// ` for everything else.
pub fn comment_prefix(path: &Path) -> &'static str {
    let is_makefile = path
        .file_name()
        .map(|n| n.to_string_lossy().eq_ignore_ascii_case("makefile"))
        .unwrap_or(false);
    let hash_ext = extension_lower(path)
        .map(|ext| HASH_COMMENT_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    if is_makefile || hash_ext {
        "# "
    } else {
        "// "
    }
}

/// A tree to read: a local path, or a temporary clone removed on drop.
pub enum CodebaseSource {
    Local(PathBuf),
    Cloned { url: String, dir: TempDir },
}

impl CodebaseSource {
    /// Resolve `source`, cloning it when it is a URL.
    pub async fn resolve(source: &str, git: &GitRunner) -> CodebaseResult<Self> {
        if is_url(source) {
            let dir = TempDir::new().map_err(|e| CodebaseError::IOError(e.to_string()))?;
            git.shallow_clone(source, dir.path())
                .await
                .map_err(|e| CodebaseError::CloneFailed(e.to_string()))?;
            return Ok(CodebaseSource::Cloned {
                url: source.to_string(),
                dir,
            });
        }
        let path = PathBuf::from(source);
        if !path.exists() {
            return Err(Box::new(CodebaseError::NotFound(source.to_string())));
        }
        Ok(CodebaseSource::Local(path))
    }

    pub fn path(&self) -> &Path {
        match self {
            CodebaseSource::Local(p) => p,
            CodebaseSource::Cloned { dir, .. } => dir.path(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, CodebaseSource::Cloned { .. })
    }
}

impl fmt::Debug for CodebaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodebaseSource::Local(p) => write!(f, "Local({})", p.display()),
            CodebaseSource::Cloned { url, dir } => {
                write!(f, "Cloned({} at {})", url, dir.path().display())
            }
        }
    }
}

/// Read one file, returning `None` for empty or undecodable content.
fn read_text(path: &Path, label: &str) -> Option<String> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("codebase: failed to read {}: {}", label, e);
            return None;
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) if text.trim().is_empty() => None,
        Ok(text) => Some(text),
        Err(_) => {
            log::info!("codebase: skipping undecodable file {}", label);
            None
        }
    }
}

/// Collect every eligible file under `root`, in file-name order.
///
/// `extra_ignored` names are skipped in addition to [`IGNORE_FILES`].
pub fn collect_files(root: &Path, extra_ignored: &[&str]) -> Vec<CodeFile> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !IGNORE_DIRS
                    .iter()
                    .any(|d| entry.file_name().to_string_lossy() == *d)
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("codebase: walk error: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if IGNORE_FILES.contains(&name.as_str())
            || extra_ignored.contains(&name.as_str())
            || is_binary_file(entry.path())
        {
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");

        if let Some(content) = read_text(entry.path(), &rel_path) {
            log::debug!("codebase: collected {}", rel_path);
            files.push(CodeFile { rel_path, content });
        }
    }
    files
}

/// `<prefix><path>\n<content>\n\n` for each file, in order.
pub fn render_merged(files: &[CodeFile]) -> String {
    let mut out = String::new();
    for file in files {
        out.push_str(comment_prefix(Path::new(&file.rel_path)));
        out.push_str(&file.rel_path);
        out.push('\n');
        out.push_str(&file.content);
        out.push_str("\n\n");
    }
    out
}

/// Merge the tree at `root` into `output`; returns the number of files written.
pub fn merge_to_file(root: &Path, output: &Path) -> CodebaseResult<usize> {
    let output_name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let files = collect_files(root, &[output_name.as_str()]);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CodebaseError::IOError(e.to_string()))?;
    }
    fs::write(output, render_merged(&files)).map_err(|e| CodebaseError::IOError(e.to_string()))?;
    log::info!("merge_to_file: {} files -> {}", files.len(), output.display());
    Ok(files.len())
}

/// Review input for a single file or a whole directory, every block headed `// <path>`.
pub fn read_for_review(path: &Path) -> CodebaseResult<String> {
    if !path.exists() {
        return Err(Box::new(CodebaseError::NotFound(path.display().to_string())));
    }
    if path.is_file() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        return match read_text(path, &name) {
            Some(content) => Ok(format!("// {}\n{}", name, content)),
            None => Err(Box::new(CodebaseError::Empty(path.display().to_string()))),
        };
    }

    let files = collect_files(path, &[]);
    log::info!("read_for_review: {} files from {}", files.len(), path.display());
    if files.is_empty() {
        return Err(Box::new(CodebaseError::Empty(path.display().to_string())));
    }
    Ok(files
        .iter()
        .map(|f| format!("// {}\n{}", f.rel_path, f.content))
        .collect::<Vec<_>>()
        .join("\n\n"))
}
