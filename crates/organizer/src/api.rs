use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ProjectLayout;
use crate::document::ProjectDocument;
use crate::error::{OrganizerError, Result};
use crate::locator::{NothingToDo, ScanOutcome, locate_tts_segments};
use crate::mutator::{MutationSummary, apply_plan};
use crate::planner::{PlanEntry, RepackPlan, plan_repack};
use crate::sync::{SyncReport, is_project_locked, parent_dir, synchronize};
use crate::time::micros_to_seconds;

/// Read-only summary of what reorganizing a project would do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub total_clips: usize,
    pub will_modify: bool,
    pub clips: Vec<ClipPreview>,
    pub total_duration_us: i64,
    pub total_duration_sec: f64,
    pub message: String,
}

/// One clip in a [`Preview`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipPreview {
    pub name: String,
    pub current_start_us: i64,
    pub new_start_us: i64,
    pub duration_us: i64,
    pub current_start_sec: f64,
    pub new_start_sec: f64,
    pub duration_sec: f64,
    pub will_move: bool,
}

/// How an apply run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(MutationSummary),
    NothingToDo(NothingToDo),
}

/// Outcome of an apply run with per-target persistence results.
#[derive(Debug)]
pub struct ApplyReport {
    pub outcome: ApplyOutcome,
    pub sync: SyncReport,
}

impl Preview {
    fn from_plan(plan: &RepackPlan) -> Self {
        let total_duration_us = plan.total_duration();
        Self {
            total_clips: plan.total_clips(),
            will_modify: plan.will_modify(),
            clips: plan.entries.iter().map(ClipPreview::from).collect(),
            total_duration_us,
            total_duration_sec: micros_to_seconds(total_duration_us),
            message: "analysis finished".to_owned(),
        }
    }

    fn nothing_to_do(reason: NothingToDo) -> Self {
        Self {
            total_clips: 0,
            will_modify: false,
            clips: Vec::new(),
            total_duration_us: 0,
            total_duration_sec: 0.0,
            message: reason.message().to_owned(),
        }
    }
}

impl From<&PlanEntry> for ClipPreview {
    fn from(entry: &PlanEntry) -> Self {
        Self {
            name: entry.name.clone(),
            current_start_us: entry.old_start,
            new_start_us: entry.new_start,
            duration_us: entry.duration,
            current_start_sec: micros_to_seconds(entry.old_start),
            new_start_sec: micros_to_seconds(entry.new_start),
            duration_sec: micros_to_seconds(entry.duration),
            will_move: entry.changed,
        }
    }
}

impl ApplyReport {
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, ApplyOutcome::Applied(_))
    }

    /// Human-readable result, distinguishing applied changes from no-ops.
    pub fn message(&self) -> String {
        match self.outcome {
            ApplyOutcome::Applied(summary) => format!(
                "audio organized: {} clips repositioned onto one track",
                summary.relocated
            ),
            ApplyOutcome::NothingToDo(reason) => format!("no changes needed: {reason}"),
        }
    }
}

/// Entry point for previewing and applying text-to-speech reorganization.
///
/// # Example
/// ```no_run
/// use organizer::{Organizer, ProjectLayout};
///
/// let organizer = Organizer::new(ProjectLayout::default());
/// let preview = organizer.preview("draft_content.json").expect("readable project");
/// if preview.total_clips > 0 {
///     let report = organizer.apply("draft_content.json").expect("apply should succeed");
///     println!("{}", report.message());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Organizer {
    layout: ProjectLayout,
}

impl Organizer {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Reads and parses one project file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ProjectDocument> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| OrganizerError::ProjectIo {
            context: "failed to read project file",
            path: path.to_path_buf(),
            source,
        })?;
        ProjectDocument::parse(&bytes)
    }

    /// Computes the repack plan for `path` without touching any file.
    pub fn preview(&self, path: impl AsRef<Path>) -> Result<Preview> {
        let doc = self.load(path)?;
        let scan = match locate_tts_segments(&doc)? {
            ScanOutcome::Found(scan) => scan,
            ScanOutcome::NothingToDo(reason) => return Ok(Preview::nothing_to_do(reason)),
        };
        let plan = plan_repack(&scan.segments);
        debug!(
            clips = plan.total_clips(),
            moved = plan.moved_clips(),
            "preview computed"
        );
        Ok(Preview::from_plan(&plan))
    }

    /// Fails with `ProjectLocked` while the editor has the project open.
    pub fn check_locked(&self, path: impl AsRef<Path>) -> Result<()> {
        let dir = parent_dir(path.as_ref());
        match is_project_locked(&dir, &self.layout) {
            Some(lock_path) => Err(OrganizerError::ProjectLocked { lock_path }),
            None => Ok(()),
        }
    }

    /// Reorganizes `path` and writes it to every project copy.
    ///
    /// Refuses locked projects before reading anything. A project without
    /// text-to-speech segments is a successful no-op and writes nothing.
    pub fn apply(&self, path: impl AsRef<Path>) -> Result<ApplyReport> {
        let path = path.as_ref();
        self.check_locked(path)?;

        let mut doc = self.load(path)?;
        let scan = match locate_tts_segments(&doc)? {
            ScanOutcome::Found(scan) => scan,
            ScanOutcome::NothingToDo(reason) => {
                info!(path = %path.display(), %reason, "nothing to reorganize");
                return Ok(ApplyReport {
                    outcome: ApplyOutcome::NothingToDo(reason),
                    sync: SyncReport::default(),
                });
            }
        };
        let plan = plan_repack(&scan.segments);
        let summary = apply_plan(&mut doc, &scan, &plan)?;
        let sync = synchronize(&doc, path, &self.layout)?;

        info!(
            path = %path.display(),
            clip_count = summary.relocated,
            moved = summary.moved,
            "project reorganized"
        );
        Ok(ApplyReport {
            outcome: ApplyOutcome::Applied(summary),
            sync,
        })
    }

    /// Directory holding the project file at `path`.
    pub fn project_dir(&self, path: impl AsRef<Path>) -> PathBuf {
        parent_dir(path.as_ref())
    }
}
