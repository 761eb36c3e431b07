use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Result type used by the organizer crate.
pub type Result<T> = std::result::Result<T, OrganizerError>;

/// Errors produced while inspecting, reorganizing or persisting a project.
#[derive(Debug)]
pub enum OrganizerError {
    InvalidSchema {
        reason: String,
    },
    ProjectIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    Serialization {
        source: serde_json::Error,
    },
    NoTtsMaterials,
    NoTtsSegments,
    NoAudioTrack,
    StalePlan {
        planned: usize,
        found: usize,
    },
    ProjectLocked {
        lock_path: PathBuf,
    },
    PrimaryWriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },
    MirrorWriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },
    SidecarWriteFailure {
        path: PathBuf,
        reason: String,
    },
    InvalidConfig {
        path: PathBuf,
        reason: String,
    },
    BackupNotFound {
        path: PathBuf,
    },
}

impl OrganizerError {
    /// Returns true for outcomes that mean "nothing to do" rather than failure.
    pub fn is_no_op(&self) -> bool {
        matches!(self, Self::NoTtsMaterials | Self::NoTtsSegments)
    }

    pub(crate) fn invalid_schema(reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            reason: reason.into(),
        }
    }
}

impl Display for OrganizerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSchema { reason } => write!(f, "invalid project file: {reason}"),
            Self::ProjectIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::Serialization { source } => {
                write!(f, "project serialization failed ({source})")
            }
            Self::NoTtsMaterials => {
                write!(f, "no text-to-speech audio found in this project")
            }
            Self::NoTtsSegments => {
                write!(f, "no text-to-speech segments found on the audio tracks")
            }
            Self::NoAudioTrack => write!(f, "no audio track found in the project"),
            Self::StalePlan { planned, found } => write!(
                f,
                "repack plan is stale: {planned} planned segments, {found} in document"
            ),
            Self::ProjectLocked { lock_path } => write!(
                f,
                "project is open in the editor (lock marker {}); close it and retry",
                lock_path.display()
            ),
            Self::PrimaryWriteFailure { path, source } => {
                write!(f, "failed to write project file {} ({source})", path.display())
            }
            Self::MirrorWriteFailure { path, source } => {
                write!(f, "failed to write mirror {} ({source})", path.display())
            }
            Self::SidecarWriteFailure { path, reason } => {
                write!(f, "failed to update {} ({reason})", path.display())
            }
            Self::InvalidConfig { path, reason } => {
                write!(f, "invalid config {}: {reason}", path.display())
            }
            Self::BackupNotFound { path } => {
                write!(f, "backup not found: {}", path.display())
            }
        }
    }
}

impl std::error::Error for OrganizerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ProjectIo { source, .. } => Some(source),
            Self::Serialization { source } => Some(source),
            Self::PrimaryWriteFailure { source, .. } => Some(source),
            Self::MirrorWriteFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OrganizerError;

    #[test]
    fn only_missing_tts_content_counts_as_no_op() {
        assert!(OrganizerError::NoTtsMaterials.is_no_op());
        assert!(OrganizerError::NoTtsSegments.is_no_op());
        assert!(!OrganizerError::NoAudioTrack.is_no_op());
    }
}
