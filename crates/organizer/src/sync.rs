//! Writing a reorganized project to every copy the editor keeps.
//!
//! The editor mirrors one project into several files. The primary file must
//! be written; every other target is best effort and reported per path.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ProjectLayout;
use crate::document::{ProjectDocument, strip_bom};
use crate::error::{OrganizerError, Result};
use crate::time::now_micros;

const PROJECT_FILE_EXTENSIONS: [&str; 2] = ["json", "tmp"];

/// Why a path is part of the sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRole {
    Primary,
    Mirror,
    Metadata,
    Cache,
}

/// One file that receives the serialized project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub path: PathBuf,
    pub role: TargetRole,
}

/// What happened to one target.
#[derive(Debug)]
pub enum TargetOutcome {
    Written { backup_created: bool },
    Renamed { to: PathBuf },
    Failed(OrganizerError),
}

#[derive(Debug)]
pub struct TargetReport {
    pub path: PathBuf,
    pub role: TargetRole,
    pub outcome: TargetOutcome,
}

/// Per-target results of one synchronization, in execution order.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub targets: Vec<TargetReport>,
}

impl TargetReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, TargetOutcome::Failed(_))
    }
}

impl SyncReport {
    /// The overall success criterion: the primary file was written.
    pub fn primary_succeeded(&self) -> bool {
        self.targets.iter().any(|target| {
            target.role == TargetRole::Primary
                && matches!(target.outcome, TargetOutcome::Written { .. })
        })
    }

    /// Number of project files (primary and mirrors) written.
    pub fn written_files(&self) -> usize {
        self.targets
            .iter()
            .filter(|target| matches!(target.role, TargetRole::Primary | TargetRole::Mirror))
            .filter(|target| matches!(target.outcome, TargetOutcome::Written { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets.iter().filter(|target| target.is_failure())
    }

    /// Reduces the report to one outcome, surfacing a primary failure as the error.
    pub fn into_result(mut self) -> Result<Self> {
        if self.primary_succeeded() {
            return Ok(self);
        }
        let primary = self
            .targets
            .iter()
            .position(|target| target.role == TargetRole::Primary);
        match primary.map(|index| self.targets.remove(index).outcome) {
            Some(TargetOutcome::Failed(error)) => Err(error),
            _ => Err(OrganizerError::PrimaryWriteFailure {
                path: PathBuf::new(),
                source: io::Error::other("primary file was not written"),
            }),
        }
    }
}

/// Lists the project files to overwrite: the primary, sibling mirrors, and
/// mirrors inside each sub-timeline folder.
///
/// Mirrors that do not exist are left out, as are paths resolving to a file
/// already listed.
pub fn sync_targets(primary: &Path, layout: &ProjectLayout) -> Vec<SyncTarget> {
    let dir = parent_dir(primary);
    let mut seen = vec![file_key(primary)];
    let mut targets = vec![SyncTarget {
        path: primary.to_path_buf(),
        role: TargetRole::Primary,
    }];

    let mut mirror_dirs = vec![dir.clone()];
    mirror_dirs.extend(timeline_dirs(&dir.join(&layout.timelines_dir)));

    for mirror_dir in mirror_dirs {
        for name in &layout.mirror_file_names {
            let path = mirror_dir.join(name);
            if !path.is_file() {
                continue;
            }
            let key = file_key(&path);
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            targets.push(SyncTarget {
                path,
                role: TargetRole::Mirror,
            });
        }
    }

    debug!(
        primary = %primary.display(),
        targets = targets.len(),
        "sync targets resolved"
    );
    targets
}

/// Copies `path` to its backup name unless a backup already exists.
///
/// Returns true when a backup was created by this call.
pub fn backup_once(path: &Path, layout: &ProjectLayout) -> io::Result<bool> {
    let backup = layout.backup_path(path);
    if backup.exists() || !path.exists() {
        return Ok(false);
    }
    fs::copy(path, &backup)?;
    debug!(backup = %backup.display(), "backup created");
    Ok(true)
}

/// Backs up and writes `bytes` to every target, primary first.
///
/// A primary failure stops the run so the mirrors stay consistent with it.
/// Mirror failures are recorded and the remaining mirrors are still written.
pub fn write_project_files(
    bytes: &[u8],
    targets: &[SyncTarget],
    layout: &ProjectLayout,
) -> SyncReport {
    let mut report = SyncReport::default();
    let (primaries, mirrors): (Vec<&SyncTarget>, Vec<&SyncTarget>) = targets
        .iter()
        .partition(|target| target.role == TargetRole::Primary);

    for target in primaries.into_iter().chain(mirrors) {
        let outcome = match backup_then_write(&target.path, bytes, layout) {
            Ok(backup_created) => TargetOutcome::Written { backup_created },
            Err(source) => {
                warn!(path = %target.path.display(), error = %source, "project file write failed");
                TargetOutcome::Failed(write_failure(target, source))
            }
        };
        let primary_failed =
            target.role == TargetRole::Primary && matches!(outcome, TargetOutcome::Failed(_));
        report.targets.push(TargetReport {
            path: target.path.clone(),
            role: target.role,
            outcome,
        });
        if primary_failed {
            break;
        }
    }
    report
}

/// Sets the metadata file's modification timestamp to `now_us`.
///
/// Returns `None` when the project has no metadata file.
pub fn touch_metadata(dir: &Path, layout: &ProjectLayout, now_us: i64) -> Option<TargetReport> {
    let path = dir.join(&layout.metadata_file);
    if !path.is_file() {
        return None;
    }

    let outcome = match rewrite_metadata(&path, layout, now_us) {
        Ok(backup_created) => TargetOutcome::Written { backup_created },
        Err(error) => {
            warn!(path = %path.display(), %error, "metadata update skipped");
            TargetOutcome::Failed(error)
        }
    };
    Some(TargetReport {
        path,
        role: TargetRole::Metadata,
        outcome,
    })
}

/// Renames the editor's cache file to its backup name so the editor rebuilds it.
///
/// An older renamed cache is replaced. Returns `None` when no cache exists.
pub fn invalidate_cache(dir: &Path, layout: &ProjectLayout) -> Option<TargetReport> {
    let path = dir.join(&layout.cache_file);
    if !path.exists() {
        return None;
    }
    let renamed = layout.backup_path(&path);

    let result = (|| {
        if renamed.exists() {
            fs::remove_file(&renamed)?;
        }
        fs::rename(&path, &renamed)
    })();
    let outcome = match result {
        Ok(()) => {
            debug!(cache = %path.display(), "cache invalidated");
            TargetOutcome::Renamed {
                to: renamed.clone(),
            }
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "cache invalidation skipped");
            TargetOutcome::Failed(OrganizerError::SidecarWriteFailure {
                path: path.clone(),
                reason: error.to_string(),
            })
        }
    };
    Some(TargetReport {
        path,
        role: TargetRole::Cache,
        outcome,
    })
}

/// Persists `doc` to the primary file and every mirror, then bumps the
/// metadata timestamp and invalidates the cache.
///
/// Fails only when serialization or the primary write fails.
pub fn synchronize(
    doc: &ProjectDocument,
    primary: &Path,
    layout: &ProjectLayout,
) -> Result<SyncReport> {
    let bytes = doc.to_bytes()?;
    let targets = sync_targets(primary, layout);
    let mut report = write_project_files(&bytes, &targets, layout);
    if !report.primary_succeeded() {
        return report.into_result();
    }

    let dir = parent_dir(primary);
    report
        .targets
        .extend(touch_metadata(&dir, layout, now_micros()));
    report.targets.extend(invalidate_cache(&dir, layout));

    info!(
        primary = %primary.display(),
        written = report.written_files(),
        failed = report.failures().count(),
        "project synchronized"
    );
    report.into_result()
}

/// Returns the lock marker path when the editor has the project open.
pub fn is_project_locked(dir: &Path, layout: &ProjectLayout) -> Option<PathBuf> {
    let lock = dir.join(&layout.lock_file);
    lock.exists().then_some(lock)
}

/// Lists project-like files next to `path` modified after it.
///
/// The editor may be reading one of these instead of the selected file.
pub fn newer_project_files(path: &Path) -> io::Result<Vec<PathBuf>> {
    let selected_modified = fs::metadata(path)?.modified()?;
    let selected_key = file_key(path);
    let mut newer = Vec::new();

    for entry in fs::read_dir(parent_dir(path))? {
        let candidate = entry?.path();
        let is_project_file = candidate
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| PROJECT_FILE_EXTENSIONS.contains(&ext));
        if !is_project_file || !candidate.is_file() || file_key(&candidate) == selected_key {
            continue;
        }
        if modified_time(&candidate).is_some_and(|modified| modified > selected_modified) {
            newer.push(candidate);
        }
    }
    newer.sort();
    Ok(newer)
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn timeline_dirs(timelines: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(timelines) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

fn file_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn backup_then_write(path: &Path, bytes: &[u8], layout: &ProjectLayout) -> io::Result<bool> {
    let backup_created = backup_once(path, layout)?;
    write_atomic(path, bytes)?;
    Ok(backup_created)
}

/// Replaces `path` through a temporary file in the same directory, so a
/// failed write never leaves a truncated file behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tempfile::NamedTempFile::new_in(parent_dir(path))?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        file.as_file().set_permissions(meta.permissions())?;
    }
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn rewrite_metadata(path: &Path, layout: &ProjectLayout, now_us: i64) -> Result<bool> {
    let sidecar_failure = |reason: String| OrganizerError::SidecarWriteFailure {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|err| sidecar_failure(err.to_string()))?;
    let mut meta: Value = serde_json::from_slice(strip_bom(&bytes))
        .map_err(|err| sidecar_failure(err.to_string()))?;
    let Some(fields) = meta.as_object_mut() else {
        return Err(sidecar_failure("metadata root is not an object".to_owned()));
    };
    fields.insert(layout.metadata_timestamp_field.clone(), Value::from(now_us));
    let encoded = serde_json::to_vec(&meta).map_err(|err| sidecar_failure(err.to_string()))?;

    backup_then_write(path, &encoded, layout).map_err(|err| sidecar_failure(err.to_string()))
}

fn write_failure(target: &SyncTarget, source: io::Error) -> OrganizerError {
    let path = target.path.clone();
    match target.role {
        TargetRole::Primary => OrganizerError::PrimaryWriteFailure { path, source },
        _ => OrganizerError::MirrorWriteFailure { path, source },
    }
}
