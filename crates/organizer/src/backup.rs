use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::info;

use crate::config::ProjectLayout;
use crate::error::{OrganizerError, Result};

/// A backup file found in a project folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// Lists backups directly inside `dir`, newest first.
pub fn list_backups(dir: &Path, layout: &ProjectLayout) -> Result<Vec<BackupEntry>> {
    let read_failure = |source: std::io::Error| OrganizerError::ProjectIo {
        context: "failed to list backups",
        path: dir.to_path_buf(),
        source,
    };

    let mut backups = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_failure)? {
        let entry = entry.map_err(read_failure)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(&layout.backup_suffix) {
            continue;
        }
        let meta = entry.metadata().map_err(read_failure)?;
        if !meta.is_file() {
            continue;
        }
        backups.push(BackupEntry {
            name,
            path: entry.path(),
            size: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    backups.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(backups)
}

/// Copies a backup over its original file and returns the restored path.
///
/// The current original, if any, is first saved under the pre-restore suffix
/// so the restore itself can be undone.
pub fn restore_backup(backup: &Path, layout: &ProjectLayout) -> Result<PathBuf> {
    if !backup.is_file() {
        return Err(OrganizerError::BackupNotFound {
            path: backup.to_path_buf(),
        });
    }
    let original = original_path(backup, layout).ok_or_else(|| OrganizerError::BackupNotFound {
        path: backup.to_path_buf(),
    })?;

    if original.exists() {
        let saved = layout.pre_restore_path(&original);
        fs::copy(&original, &saved).map_err(|source| OrganizerError::ProjectIo {
            context: "failed to save current file before restore",
            path: saved.clone(),
            source,
        })?;
    }
    fs::copy(backup, &original).map_err(|source| OrganizerError::ProjectIo {
        context: "failed to restore backup",
        path: original.clone(),
        source,
    })?;

    info!(backup = %backup.display(), restored = %original.display(), "backup restored");
    Ok(original)
}

fn original_path(backup: &Path, layout: &ProjectLayout) -> Option<PathBuf> {
    let name = backup.file_name()?.to_str()?;
    let stem = name.strip_suffix(&layout.backup_suffix)?;
    if stem.is_empty() {
        return None;
    }
    Some(backup.with_file_name(stem))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{list_backups, restore_backup};
    use crate::config::ProjectLayout;
    use crate::error::OrganizerError;

    #[test]
    fn list_backups_only_returns_suffixed_files() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = ProjectLayout::default();
        fs::write(dir.path().join("draft_content.json"), "{}").expect("write project");
        fs::write(dir.path().join("draft_content.json.backup"), "{}").expect("write backup");
        fs::write(dir.path().join("draft.extra.backup"), "cache").expect("write cache backup");

        let backups = list_backups(dir.path(), &layout).expect("list should succeed");

        let mut names: Vec<_> = backups.iter().map(|entry| entry.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["draft.extra.backup", "draft_content.json.backup"]);
    }

    #[test]
    fn restore_keeps_a_pre_restore_copy_of_current_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = ProjectLayout::default();
        let original = dir.path().join("draft_content.json");
        let backup = dir.path().join("draft_content.json.backup");
        fs::write(&original, "current").expect("write project");
        fs::write(&backup, "earlier").expect("write backup");

        let restored = restore_backup(&backup, &layout).expect("restore should succeed");

        assert_eq!(restored, original);
        assert_eq!(fs::read_to_string(&original).expect("read project"), "earlier");
        assert_eq!(
            fs::read_to_string(dir.path().join("draft_content.json.pre-restore-backup"))
                .expect("read pre-restore copy"),
            "current"
        );
        assert!(backup.exists());
    }

    #[test]
    fn restore_of_missing_backup_fails() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let result = restore_backup(
            &dir.path().join("nope.json.backup"),
            &ProjectLayout::default(),
        );
        assert!(matches!(result, Err(OrganizerError::BackupNotFound { .. })));
    }
}
