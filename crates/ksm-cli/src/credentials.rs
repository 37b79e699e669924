//! On-disk credentials and per-user paths.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_key: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// `~/.kimi-supermemory`, home of the credentials and the log file.
pub fn data_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".kimi-supermemory"))
}

pub fn credentials_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("credentials.json"))
}

/// API key stored by `init`, if the file exists and parses.
pub fn load_api_key(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let creds: Credentials = serde_json::from_str(&content).ok()?;
    Some(creds.api_key)
}

/// Write the credentials file, readable only by the owner on unix.
pub fn save(path: &Path, api_key: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let creds = Credentials {
        api_key: api_key.to_string(),
        created_at: Some(Utc::now().to_rfc3339()),
    };
    let json = serde_json::to_string_pretty(&creds)?;
    std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("cannot restrict permissions on {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");
        save(&path, "sm_secret").unwrap();

        assert_eq!(load_api_key(&path).as_deref(), Some("sm_secret"));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"apiKey\""));
        assert!(raw.contains("\"createdAt\""));
    }

    #[test]
    fn test_load_missing_or_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        assert!(load_api_key(&path).is_none());

        std::fs::write(&path, "not json").unwrap();
        assert!(load_api_key(&path).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        save(&path, "sm_secret").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
