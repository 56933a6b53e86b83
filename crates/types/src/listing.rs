// crates/types/src/listing.rs
//! Remote directory entries and the refresh records built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Size reported by the daemon when it does not know an entry's size.
pub const UNKNOWN_SIZE: i64 = -1;

fn unknown_size() -> i64 {
    UNKNOWN_SIZE
}

/// One entry of a remote listing (`/operations/list`, `/operations/stat`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Path", default)]
    pub path: String,
    #[serde(rename = "Size", default = "unknown_size")]
    pub size: i64,
    #[serde(rename = "IsDir", default)]
    pub is_dir: bool,
    #[serde(rename = "MimeType", default)]
    pub mime_type: String,
    #[serde(rename = "ModTime", default)]
    pub mod_time: String,
    /// Remote the entry belongs to, e.g. `"gdrive:"`.
    #[serde(skip)]
    pub fs: String,
    #[serde(skip)]
    pub modified_unix: i64,
}

impl Default for ListItem {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            path: String::new(),
            size: UNKNOWN_SIZE,
            is_dir: false,
            mime_type: String::new(),
            mod_time: String::new(),
            fs: String::new(),
            modified_unix: 0,
        }
    }
}

impl ListItem {
    /// Attach the owning remote and resolve the modification time.
    pub fn on_remote(mut self, fs: impl Into<String>) -> Self {
        self.fs = fs.into();
        self.modified_unix = DateTime::parse_from_rfc3339(&self.mod_time)
            .map(|t| t.timestamp())
            .unwrap_or_default();
        self
    }

    /// Directory part of `path`; entries at the remote root yield `""`.
    pub fn parent_dir(&self) -> &str {
        parent_dir(&self.path)
    }

    pub fn has_known_size(&self) -> bool {
        self.size >= 0
    }

    pub fn display_modified(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.modified_unix, 0)
            .map(|t| t.format("%a %m/%d %H:%M").to_string())
            .unwrap_or_default()
    }
}

/// What an observer should do with a refresh record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshAction {
    /// Insert the entry, or patch it in place if the pane already shows it.
    Add,
    Remove,
}

/// A resource change attached to a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshItem {
    pub action: RefreshAction,
    pub item: ListItem,
}

impl RefreshItem {
    pub fn add(item: ListItem) -> Self {
        Self {
            action: RefreshAction::Add,
            item,
        }
    }

    pub fn remove(item: ListItem) -> Self {
        Self {
            action: RefreshAction::Remove,
            item,
        }
    }
}

/// Directory part of a remote path; `"a.txt"` and `""` yield `""`.
pub fn parent_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => "",
    }
}

/// Join a remote directory and an entry name without doubling separators.
pub fn join_remote(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    match (dir.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => dir.to_string(),
        (false, false) => format!("{dir}/{name}"),
    }
}

/// Last path component of a remote path.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit_once('/').map_or(trimmed, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_item_decodes_daemon_entry() {
        let raw = r#"{
            "Path": "photos/2024/beach.jpg",
            "Name": "beach.jpg",
            "Size": 2048,
            "MimeType": "image/jpeg",
            "ModTime": "2024-01-15T08:30:00Z",
            "IsDir": false,
            "ID": "abc123"
        }"#;
        let item: ListItem = serde_json::from_str(raw).unwrap();
        let item = item.on_remote("gdrive:");
        assert_eq!(item.fs, "gdrive:");
        assert_eq!(item.parent_dir(), "photos/2024");
        assert_eq!(item.modified_unix, 1_705_307_400);
        assert_eq!(item.size, 2048);
    }

    #[test]
    fn test_list_item_missing_size_is_unknown() {
        let item: ListItem = serde_json::from_str(r#"{"Name": "dir", "IsDir": true}"#).unwrap();
        assert_eq!(item.size, UNKNOWN_SIZE);
        assert!(!item.has_known_size());
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("a.txt"), "");
        assert_eq!(parent_dir(""), "");
        assert_eq!(parent_dir("docs/a.txt"), "docs");
        assert_eq!(parent_dir("docs/sub/"), "docs");
        assert_eq!(parent_dir("/a.txt"), "/");
    }

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("", "a.txt"), "a.txt");
        assert_eq!(join_remote("backup/", "a.txt"), "backup/a.txt");
        assert_eq!(join_remote("backup", ""), "backup");
        assert_eq!(base_name("backup/2024/a.txt"), "a.txt");
        assert_eq!(base_name("a.txt"), "a.txt");
    }
}
