use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::SystemTime;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use organizer::{
    Organizer, OrganizerError, Preview, ProjectLayout, TargetOutcome, TargetReport, TargetRole,
    default_projects_dir, list_backups, newer_project_files, restore_backup,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_LOCKED: u8 = 3;

/// Packs text-to-speech clips of a video editor project onto one audio track.
#[derive(Parser, Debug)]
#[command(name = "tts-organizer", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML file overriding the editor's project file names
    #[arg(long, env = "TTS_ORGANIZER_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show where each clip would move, without writing anything
    Preview {
        /// Project file (draft_content.json, draft_info.json or template-2.tmp)
        file: PathBuf,
        /// Print the preview as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reorganize the project and update every copy the editor keeps
    Apply {
        file: PathBuf,
        /// Only print the preview
        #[arg(long)]
        dry_run: bool,
    },
    /// List backups in a project folder
    Backups {
        /// Project folder or any file inside it
        path: PathBuf,
    },
    /// Copy a backup over its original file
    Restore { backup: PathBuf },
    /// Print the editor's default projects folder
    DefaultDir,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            match code {
                EXIT_SUCCESS => println!("no changes needed: {}", err.root_cause()),
                EXIT_LOCKED => eprintln!("{err}"),
                _ => eprintln!("error: {err:#}"),
            }
            ExitCode::from(code)
        }
    }
}

/// Maps a failed run to its exit status. Nothing-to-do outcomes count as success.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<OrganizerError>() {
        Some(OrganizerError::ProjectLocked { .. }) => EXIT_LOCKED,
        Some(organizer_err) if organizer_err.is_no_op() => EXIT_SUCCESS,
        _ => EXIT_FAILURE,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let layout = match &cli.config {
        Some(path) => ProjectLayout::load(path)?,
        None => ProjectLayout::default(),
    };
    debug!(config = ?cli.config, ?layout, "project layout resolved");
    let organizer = Organizer::new(layout);

    match cli.command {
        Commands::Preview { file, json } => {
            let preview = organizer
                .preview(&file)
                .with_context(|| format!("cannot preview {}", file.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&preview)?);
            } else {
                print_preview(&file, &preview);
            }
        }
        Commands::Apply { file, dry_run } => {
            warn_about_newer_files(&file);
            if dry_run {
                let preview = organizer
                    .preview(&file)
                    .with_context(|| format!("cannot preview {}", file.display()))?;
                print_preview(&file, &preview);
                println!("dry run: nothing written");
                return Ok(());
            }

            let report = organizer.apply(&file)?;
            println!("{}", report.message());
            if report.is_applied() {
                println!(
                    "backup: {}",
                    organizer.layout().backup_path(&file).display()
                );
            }
            for target in &report.sync.targets {
                if cli.verbose > 0 || target.is_failure() {
                    println!("  {}", describe_target(target));
                }
            }
        }
        Commands::Backups { path } => {
            let dir = if path.is_file() {
                organizer.project_dir(&path)
            } else {
                path
            };
            let backups = list_backups(&dir, organizer.layout())?;
            if backups.is_empty() {
                println!("no backups in {}", dir.display());
            }
            for backup in backups {
                println!(
                    "{:<40} {:>10} bytes  {}",
                    backup.name,
                    backup.size,
                    age(backup.modified)
                );
            }
        }
        Commands::Restore { backup } => {
            let restored = restore_backup(&backup, organizer.layout())?;
            println!("restored {}", restored.display());
        }
        Commands::DefaultDir => println!("{}", default_projects_dir().display()),
    }
    Ok(())
}

fn print_preview(file: &Path, preview: &Preview) {
    println!("{}", file.display());
    if preview.total_clips == 0 {
        println!("{}", preview.message);
        return;
    }

    for (index, clip) in preview.clips.iter().enumerate() {
        let marker = if clip.will_move { "  moved" } else { "" };
        println!(
            "{:>3}  {:<28} {:>9.2}s -> {:>9.2}s  ({:.2}s){marker}",
            index + 1,
            clip.name,
            clip.current_start_sec,
            clip.new_start_sec,
            clip.duration_sec,
        );
    }
    println!(
        "{} clips, {:.2}s total, {}",
        preview.total_clips,
        preview.total_duration_sec,
        if preview.will_modify {
            "ready to organize"
        } else {
            "already organized"
        }
    );
}

fn warn_about_newer_files(file: &Path) {
    let Ok(newer) = newer_project_files(file) else {
        return;
    };
    if newer.is_empty() {
        return;
    }
    eprintln!("warning: newer project files exist; the editor may be using one of them:");
    for path in newer {
        eprintln!("  {}", path.display());
    }
}

fn describe_target(target: &TargetReport) -> String {
    let role = match target.role {
        TargetRole::Primary => "primary",
        TargetRole::Mirror => "mirror",
        TargetRole::Metadata => "metadata",
        TargetRole::Cache => "cache",
    };
    let outcome = match &target.outcome {
        TargetOutcome::Written {
            backup_created: true,
        } => "written, backup created".to_owned(),
        TargetOutcome::Written {
            backup_created: false,
        } => "written".to_owned(),
        TargetOutcome::Renamed { to } => format!("renamed to {}", to.display()),
        TargetOutcome::Failed(err) => format!("failed: {err}"),
    };
    format!("{role:<8} {}: {outcome}", target.path.display())
}

fn age(modified: SystemTime) -> String {
    match SystemTime::now().duration_since(modified) {
        Ok(elapsed) if elapsed.as_secs() < 120 => format!("{}s ago", elapsed.as_secs()),
        Ok(elapsed) if elapsed.as_secs() < 7_200 => format!("{}m ago", elapsed.as_secs() / 60),
        Ok(elapsed) if elapsed.as_secs() < 172_800 => {
            format!("{}h ago", elapsed.as_secs() / 3_600)
        }
        Ok(elapsed) => format!("{}d ago", elapsed.as_secs() / 86_400),
        Err(_) => "just now".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::Context;
    use clap::{CommandFactory, Parser};
    use organizer::{OrganizerError, TargetOutcome, TargetReport, TargetRole};

    use super::{
        Cli, Commands, EXIT_FAILURE, EXIT_LOCKED, EXIT_SUCCESS, describe_target, exit_code,
    };

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_counts_repeated_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tts-organizer", "apply", "draft_content.json", "-vv"])
            .expect("arguments should parse");

        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Apply { ref file, dry_run: false } if file == &PathBuf::from("draft_content.json")
        ));
    }

    #[test]
    fn preview_requires_a_file() {
        assert!(Cli::try_parse_from(["tts-organizer", "preview"]).is_err());
    }

    #[test]
    fn target_description_names_role_and_outcome() {
        let target = TargetReport {
            path: PathBuf::from("draft_info.json"),
            role: TargetRole::Mirror,
            outcome: TargetOutcome::Written {
                backup_created: true,
            },
        };

        assert_eq!(
            describe_target(&target),
            "mirror   draft_info.json: written, backup created"
        );
    }

    #[test]
    fn exit_code_separates_locked_no_op_and_failure() {
        let locked = anyhow::Error::new(OrganizerError::ProjectLocked {
            lock_path: PathBuf::from(".locked"),
        });
        let no_op = Err::<(), _>(OrganizerError::NoTtsSegments)
            .context("cannot apply")
            .expect_err("no-op error");
        let failure = anyhow::Error::new(OrganizerError::NoAudioTrack);

        assert_eq!(exit_code(&locked), EXIT_LOCKED);
        assert_eq!(exit_code(&no_op), EXIT_SUCCESS);
        assert_eq!(exit_code(&failure), EXIT_FAILURE);
    }
}
