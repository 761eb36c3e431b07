//! Reorganizes text-to-speech clips in video editor project files onto one
//! audio track.

pub mod api;
pub mod backup;
pub mod config;
pub mod document;
pub mod error;
pub mod locator;
pub mod mutator;
pub mod planner;
pub mod sync;
pub mod time;

pub use api::{ApplyOutcome, ApplyReport, ClipPreview, Organizer, Preview};
pub use backup::{BackupEntry, list_backups, restore_backup};
pub use config::{ProjectLayout, default_projects_dir};
pub use document::{ProjectDocument, TimeRange};
pub use error::{OrganizerError, Result};
pub use locator::{NothingToDo, ScanOutcome, TtsScan, locate_tts_segments};
pub use mutator::{MutationSummary, apply_plan, select_master_track};
pub use planner::{PlanEntry, RepackPlan, plan_repack};
pub use sync::{SyncReport, TargetOutcome, TargetReport, TargetRole, newer_project_files};
