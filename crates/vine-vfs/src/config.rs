use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FsError, FsResult};

/// Where a Vine filesystem keeps its state, and how the bridge is sized.
///
/// Only `base_dir` is required; the other paths default to fixed names
/// beneath it:
///
/// ```text
/// <base_dir>/user_id       local user identity
/// <base_dir>/objects/      content-addressed objects
/// <base_dir>/branches/     one root pointer per user
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VineConfig {
    pub base_dir: PathBuf,
    pub user_id_file: Option<PathBuf>,
    pub object_dir: Option<PathBuf>,
    pub branch_dir: Option<PathBuf>,
    /// Capacity of the bridge's job queue.
    pub bridge_queue: usize,
}

impl Default for VineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(".vine"),
            user_id_file: None,
            object_dir: None,
            branch_dir: None,
            bridge_queue: 64,
        }
    }
}

impl VineConfig {
    pub fn from_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Read a TOML config file.
    pub fn load(path: &Path) -> FsResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| FsError::Config(format!("{}: {e}", path.display())))?;
        if config.bridge_queue == 0 {
            return Err(FsError::Config(format!(
                "{}: bridge_queue must be at least 1",
                path.display()
            )));
        }
        Ok(config)
    }

    pub fn user_id_file(&self) -> PathBuf {
        self.user_id_file
            .clone()
            .unwrap_or_else(|| self.base_dir.join("user_id"))
    }

    pub fn object_dir(&self) -> PathBuf {
        self.object_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("objects"))
    }

    pub fn branch_dir(&self) -> PathBuf {
        self.branch_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("branches"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = VineConfig::default();
        assert_eq!(c.base_dir, PathBuf::from(".vine"));
        assert_eq!(c.bridge_queue, 64);
        assert_eq!(c.object_dir(), PathBuf::from(".vine/objects"));
    }

    #[test]
    fn paths_derive_from_base_dir() {
        let c = VineConfig::from_base_dir("/srv/vine");
        assert_eq!(c.user_id_file(), PathBuf::from("/srv/vine/user_id"));
        assert_eq!(c.object_dir(), PathBuf::from("/srv/vine/objects"));
        assert_eq!(c.branch_dir(), PathBuf::from("/srv/vine/branches"));
    }

    #[test]
    fn load_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vine.toml");
        fs::write(
            &path,
            "base_dir = \"/data\"\nobject_dir = \"/fast/objects\"\nbridge_queue = 8\n",
        )
        .unwrap();

        let c = VineConfig::load(&path).unwrap();
        assert_eq!(c.object_dir(), PathBuf::from("/fast/objects"));
        assert_eq!(c.branch_dir(), PathBuf::from("/data/branches"));
        assert_eq!(c.bridge_queue, 8);
    }

    #[test]
    fn load_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vine.toml");

        fs::write(&path, "base_dir = [").unwrap();
        assert!(matches!(VineConfig::load(&path), Err(FsError::Config(_))));

        fs::write(&path, "bridge_queue = 0").unwrap();
        assert!(matches!(VineConfig::load(&path), Err(FsError::Config(_))));

        assert!(matches!(
            VineConfig::load(&dir.path().join("missing.toml")),
            Err(FsError::Io(_))
        ));
    }
}
