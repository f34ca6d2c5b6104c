//! Flat JSON file storage.
//!
//! A [`JsonStore`] owns one directory of pretty-printed UTF-8 `.json` files
//! addressed by bare file name. Research runs and chat conversations are both
//! kept this way. Names containing path separators or `..` are rejected so a
//! store never touches files outside its directory.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub type StoreResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub enum StoreError {
    /// Name is empty, nested or escapes the store directory.
    InvalidName(String),
    NotFound(String),
    IOError(String),
    /// File exists but is not the expected JSON.
    Parse(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidName(name) => write!(f, "Invalid file name: {}", name),
            StoreError::NotFound(name) => write!(f, "File not found: {}", name),
            StoreError::IOError(msg) => write!(f, "IO error: {}", msg),
            StoreError::Parse(msg) => write!(f, "Malformed JSON: {}", msg),
        }
    }
}

impl Error for StoreError {}

#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn validate_name(&self, name: &str) -> Result<PathBuf, StoreError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.join(name)),
            _ => Err(StoreError::InvalidName(name.to_string())),
        }
    }

    /// Path a name resolves to.
    pub fn path_of(&self, name: &str) -> StoreResult<PathBuf> {
        Ok(self.validate_name(name)?)
    }

    /// Serialize `value` as pretty JSON into `name`, creating the directory.
    pub fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> StoreResult<PathBuf> {
        let path = self.validate_name(name)?;
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::IOError(e.to_string()))?;
        let json =
            serde_json::to_string_pretty(value).map_err(|e| StoreError::Parse(e.to_string()))?;
        fs::write(&path, json).map_err(|e| StoreError::IOError(e.to_string()))?;
        log::debug!("JsonStore::write: {}", path.display());
        Ok(path)
    }

    pub fn read<T: DeserializeOwned>(&self, name: &str) -> StoreResult<T> {
        let path = self.validate_name(name)?;
        if !path.is_file() {
            return Err(Box::new(StoreError::NotFound(name.to_string())));
        }
        let text = fs::read_to_string(&path).map_err(|e| StoreError::IOError(e.to_string()))?;
        let value = serde_json::from_str(&text)
            .map_err(|e| StoreError::Parse(format!("{}: {}", name, e)))?;
        Ok(value)
    }

    pub fn delete(&self, name: &str) -> StoreResult<()> {
        let path = self.validate_name(name)?;
        if !path.is_file() {
            return Err(Box::new(StoreError::NotFound(name.to_string())));
        }
        fs::remove_file(&path).map_err(|e| StoreError::IOError(e.to_string()))?;
        Ok(())
    }

    /// `.json` file names, newest name first. A missing directory lists as empty.
    pub fn list(&self, skip_empty: bool) -> StoreResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Box::new(StoreError::IOError(e.to_string()))),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter(|entry| !skip_empty || entry.metadata().map(|m| m.len() > 0).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json"))
            .collect();
        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_delete() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(tmp.path().join("nested"));

        let path = store.write("a.json", &json!({"text": "深度研究"})).unwrap();
        let raw = fs::read_to_string(path).unwrap();
        assert!(raw.contains("深度研究"));
        assert!(raw.contains("\n  \"text\""));

        let value: serde_json::Value = store.read("a.json").unwrap();
        assert_eq!(value["text"], "深度研究");

        store.delete("a.json").unwrap();
        assert!(store.read::<serde_json::Value>("a.json").is_err());
    }

    #[test]
    fn test_rejects_escaping_names() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(tmp.path());
        for bad in ["../x.json", "a/b.json", "", "..", "/etc/passwd"] {
            let err = store.write(bad, &json!(1)).unwrap_err();
            assert!(err.to_string().starts_with("Invalid file name"), "{}", bad);
        }
    }

    #[test]
    fn test_list_newest_first_and_skips_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(tmp.path());
        store.write("0101_0900_research.json", &json!({})).unwrap();
        store.write("1231_2359_research.json", &json!({})).unwrap();
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        fs::write(tmp.path().join("empty.json"), "").unwrap();

        assert_eq!(
            store.list(true).unwrap(),
            vec!["1231_2359_research.json", "0101_0900_research.json"]
        );
        assert_eq!(store.list(false).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_dir_lists_empty() {
        let store = JsonStore::new("/definitely/not/here/llmkit");
        assert!(store.list(true).unwrap().is_empty());
    }

    #[test]
    fn test_parse_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad.json"), "{oops").unwrap();
        let store = JsonStore::new(tmp.path());
        let err = store.read::<serde_json::Value>("bad.json").unwrap_err();
        assert!(err.to_string().starts_with("Malformed JSON: bad.json"));
    }
}
