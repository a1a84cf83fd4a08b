// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use janitor_tasks::{DispatchMode, JobSummary, is_generation_error};
use tracing::{info, warn};

mod config;
mod delete_rooms;
mod purge_history;

#[derive(Parser, Debug)]
enum Subcommand {
    /// Configuration-related commands
    Config(self::config::Options),

    /// Purge old history from the rooms with the most events
    PurgeHistory(self::purge_history::Options),

    /// Delete the rooms with few or no joined members
    DeleteRooms(self::delete_rooms::Options),
}

#[derive(Parser, Debug)]
#[command(name = "synapse-janitor", version = crate::VERSION, about)]
pub struct Options {
    /// Path to the configuration file
    #[arg(short, long, global = true, action = ArgAction::Append)]
    config: Vec<Utf8PathBuf>,

    #[command(subcommand)]
    subcommand: Subcommand,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as S;
        match self.subcommand {
            S::Config(c) => Box::pin(c.run(figment)).await,
            S::PurgeHistory(c) => Box::pin(c.run(figment)).await,
            S::DeleteRooms(c) => Box::pin(c.run(figment)).await,
        }
    }

    /// Get a [`Figment`] instance with the configuration loaded
    pub fn figment(&self) -> Figment {
        let configs = if self.config.is_empty() {
            // Read the JANITOR_CONFIG environment variable
            std::env::var("JANITOR_CONFIG")
                // Default to "config.yaml"
                .unwrap_or_else(|_| "config.yaml".to_owned())
                // Split the file list on `:`
                .split(':')
                .map(Utf8PathBuf::from)
                .collect()
        } else {
            self.config.clone()
        };

        let base = configs
            .iter()
            .fold(Figment::new(), |f, path| f.merge(Yaml::file(path)));

        // Environment variables override the files, e.g.
        // JANITOR_PURGE__RETENTION_DAYS=90
        base.merge(Env::prefixed("JANITOR_").ignore(&["config"]).split("__"))
    }
}

/// Flags shared by the maintenance jobs
#[derive(clap::Args, Debug)]
struct JobOptions {
    /// Only report what would be done, without touching the homeserver
    #[arg(long, conflicts_with = "manual")]
    dry_run: bool,

    /// Ask for confirmation before acting on each room
    #[arg(long)]
    manual: bool,

    /// Query the database again, even if the list of rooms already exists
    #[arg(long)]
    force: bool,

    /// Where to keep the list of rooms, instead of the configured path
    #[arg(long, value_name = "FILE")]
    list: Option<Utf8PathBuf>,
}

impl JobOptions {
    fn mode(&self) -> DispatchMode {
        if self.dry_run {
            DispatchMode::DryRun
        } else if self.manual {
            DispatchMode::Manual
        } else {
            DispatchMode::Auto
        }
    }
}

/// Tell whether anything was done on the homeserver before a job stopped
fn explain_abort(error: anyhow::Error) -> anyhow::Error {
    if is_generation_error(&error) {
        error.context("could not prepare the list of rooms, nothing was done on the homeserver")
    } else {
        error.context("stopped while acting on the rooms, some may already be processed")
    }
}

/// Log the outcome of a job and turn it into the exit code of the process
fn report(summary: &JobSummary) -> ExitCode {
    if summary.is_success() {
        info!(
            processed = summary.processed(),
            skipped = summary.skipped(),
            "Done: {summary}"
        );
        ExitCode::SUCCESS
    } else {
        warn!(
            processed = summary.processed(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "Done with failures: {summary}"
        );
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, error::ErrorKind};
    use figment::Jail;
    use janitor_config::{ConfigurationSection, PurgeConfig};
    use janitor_tasks::{DispatchSummary, Generation, ListError};

    use super::*;

    #[test]
    fn verify_cli() {
        Options::command().debug_assert();
    }

    #[test]
    fn dry_run_and_manual_conflict() {
        let error =
            Options::try_parse_from(["synapse-janitor", "delete-rooms", "--dry-run", "--manual"])
                .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ArgumentConflict);
        assert!(error.use_stderr());
    }

    #[test]
    fn help_is_not_an_error() {
        let error = Options::try_parse_from(["synapse-janitor", "--help"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DisplayHelp);
        assert!(!error.use_stderr());
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let error =
            Options::try_parse_from(["synapse-janitor", "delete-rooms", "--threshold", "few"])
                .unwrap_err();
        assert!(error.use_stderr());
    }

    #[test]
    fn job_mode_from_flags() {
        let Options {
            subcommand: Subcommand::PurgeHistory(options),
            ..
        } = Options::try_parse_from(["synapse-janitor", "purge-history", "--dry-run"]).unwrap()
        else {
            panic!("expected the purge-history command");
        };
        assert_eq!(options.job.mode(), DispatchMode::DryRun);

        let Options {
            subcommand: Subcommand::DeleteRooms(options),
            ..
        } = Options::try_parse_from(["synapse-janitor", "delete-rooms", "--manual", "--force"])
            .unwrap()
        else {
            panic!("expected the delete-rooms command");
        };
        assert_eq!(options.job.mode(), DispatchMode::Manual);
        assert!(options.job.force);
    }

    #[test]
    fn figment_merges_files_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "base.yaml",
                r"
                    purge:
                      retention_days: 60
                      min_events: 100
                ",
            )?;
            jail.create_file(
                "override.yaml",
                r"
                    purge:
                      retention_days: 90
                ",
            )?;
            jail.set_env("JANITOR_PURGE__MIN_EVENTS", "5000");

            let options = Options::try_parse_from([
                "synapse-janitor",
                "-c",
                "base.yaml",
                "--config",
                "override.yaml",
                "config",
                "check",
            ])
            .unwrap();

            let config = PurgeConfig::extract(&options.figment()).map_err(|e| e.to_string())?;
            assert_eq!(config.retention_days, 90);
            assert_eq!(config.min_events, 5000);

            Ok(())
        });
    }

    fn summary(dispatch: DispatchSummary, malformed: usize, excluded: usize) -> JobSummary {
        JobSummary {
            generation: Generation::Reused,
            malformed,
            excluded,
            dispatch,
        }
    }

    #[test]
    fn failures_make_the_process_fail() {
        let all_good = summary(
            DispatchSummary {
                processed: 3,
                skipped: 0,
                failed: 0,
            },
            0,
            0,
        );
        assert_eq!(report(&all_good), ExitCode::SUCCESS);

        // Skipped rooms are not failures
        let only_skips = summary(
            DispatchSummary {
                processed: 0,
                skipped: 2,
                failed: 0,
            },
            1,
            4,
        );
        assert_eq!(report(&only_skips), ExitCode::SUCCESS);

        let one_failure = summary(
            DispatchSummary {
                processed: 5,
                skipped: 1,
                failed: 1,
            },
            0,
            0,
        );
        assert_eq!(report(&one_failure), ExitCode::FAILURE);
    }

    #[test]
    fn abort_message_tells_if_rooms_were_touched() {
        let error = explain_abort(
            ListError::SanityCheck {
                reason: "missing divider".to_owned(),
            }
            .into(),
        );
        assert!(format!("{error:#}").contains("nothing was done on the homeserver"));
        assert!(format!("{error:#}").contains("missing divider"));

        let error = explain_abort(anyhow::anyhow!("could not ask the operator"));
        assert!(format!("{error:#}").contains("some may already be processed"));
    }
}
