use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{OrganizerError, Result};

/// On-disk conventions of the host editor's project folder.
///
/// Every field has a default matching the editor's current layout, so a config
/// file only needs to list what differs.
///
/// # Example
/// ```
/// use organizer::ProjectLayout;
///
/// let layout: ProjectLayout = toml::from_str("lock_file = \".busy\"").expect("valid toml");
/// assert_eq!(layout.lock_file, ".busy");
/// assert_eq!(layout.backup_suffix, ".backup");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    /// File names that hold a full copy of the project document.
    pub mirror_file_names: Vec<String>,
    /// Subdirectory holding one folder per sub-timeline.
    pub timelines_dir: String,
    pub metadata_file: String,
    pub metadata_timestamp_field: String,
    pub cache_file: String,
    pub lock_file: String,
    pub backup_suffix: String,
    pub pre_restore_suffix: String,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            mirror_file_names: vec![
                "draft_content.json".to_owned(),
                "draft_info.json".to_owned(),
                "template-2.tmp".to_owned(),
            ],
            timelines_dir: "Timelines".to_owned(),
            metadata_file: "draft_meta_info.json".to_owned(),
            metadata_timestamp_field: "tm_draft_modified".to_owned(),
            cache_file: "draft.extra".to_owned(),
            lock_file: ".locked".to_owned(),
            backup_suffix: ".backup".to_owned(),
            pre_restore_suffix: ".pre-restore-backup".to_owned(),
        }
    }
}

impl ProjectLayout {
    /// Loads a layout from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| OrganizerError::ProjectIo {
            context: "failed to read layout config",
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|err| OrganizerError::InvalidConfig {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    /// Returns `path` with the backup suffix appended to its file name.
    pub fn backup_path(&self, path: &Path) -> PathBuf {
        with_suffix(path, &self.backup_suffix)
    }

    pub(crate) fn pre_restore_path(&self, path: &Path) -> PathBuf {
        with_suffix(path, &self.pre_restore_suffix)
    }
}

/// Returns the editor's drafts folder when present, otherwise the home directory.
pub fn default_projects_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let candidates = [
        dirs::data_local_dir().map(|dir| dir.join("CapCut Drafts")),
        Some(
            home.join("Movies")
                .join("CapCut")
                .join("User Data")
                .join("Projects")
                .join("com.lveditor.draft"),
        ),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|dir| dir.is_dir())
        .unwrap_or(home)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::ProjectLayout;
    use crate::error::OrganizerError;

    #[test]
    fn backup_path_appends_suffix_to_full_file_name() {
        let layout = ProjectLayout::default();
        assert_eq!(
            layout.backup_path(Path::new("/p/template-2.tmp")),
            PathBuf::from("/p/template-2.tmp.backup")
        );
    }

    #[test]
    fn load_merges_partial_file_with_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("layout.toml");
        std::fs::write(&path, "mirror_file_names = [\"a.json\"]\ncache_file = \"c.bin\"\n")
            .expect("write config");

        let layout = ProjectLayout::load(&path).expect("config should load");

        assert_eq!(layout.mirror_file_names, vec!["a.json".to_owned()]);
        assert_eq!(layout.cache_file, "c.bin");
        assert_eq!(layout.timelines_dir, "Timelines");
    }

    #[test]
    fn load_rejects_wrong_field_types() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("layout.toml");
        std::fs::write(&path, "lock_file = 3\n").expect("write config");

        let result = ProjectLayout::load(&path);
        assert!(matches!(result, Err(OrganizerError::InvalidConfig { .. })));
    }
}
