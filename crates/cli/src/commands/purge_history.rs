// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use figment::Figment;
use futures_util::TryStreamExt;
use janitor_config::{ConfigurationSectionExt, DatabaseConfig, PurgeConfig};
use janitor_matrix::PurgeHistoryRequest;
use janitor_synapse_reader::{RoomEventCount, SynapseReader};
use janitor_tasks::{Dispatcher, HistoryPurgePredicate, ListJob, RoomAction, RoomEventCountRecord};
use tracing::{info, info_span};

use super::{JobOptions, explain_abort, report};
use crate::util::{
    check_synapse_database, database_connection_from_config, room_admin_connection_from_config,
};

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(flatten)]
    pub(super) job: JobOptions,

    /// Only purge the rooms with at least this many events
    #[arg(long, value_name = "EVENTS")]
    threshold: Option<u64>,

    /// Number of days of history to keep
    #[arg(long, value_name = "DAYS", value_parser = clap::value_parser!(u32).range(1..))]
    days: Option<u32>,

    /// Never purge the rooms whose ID contains this, on top of the
    /// configured exclusions. Can be given multiple times
    #[arg(long = "exclude", value_name = "SUBSTRING")]
    exclusions: Vec<String>,
}

impl Options {
    /// Apply the flags on top of the configuration
    fn apply(&self, mut config: PurgeConfig) -> PurgeConfig {
        if let Some(list) = &self.job.list {
            config.list_path.clone_from(list);
        }

        if let Some(threshold) = self.threshold {
            config.min_events = threshold;
        }

        if let Some(days) = self.days {
            config.retention_days = days;
        }

        config.exclusions.extend(self.exclusions.iter().cloned());
        config
    }

    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let _span = info_span!("cli.purge_history").entered();

        let config = PurgeConfig::extract_or_default(figment)
            .map_err(anyhow::Error::from_boxed)
            .context("invalid `purge` configuration")?;
        let config = self.apply(config);

        let mode = self.job.mode();
        let connection = room_admin_connection_from_config(figment, mode).await?;
        let dispatcher = Dispatcher::new(&*connection, mode);

        let job = ListJob {
            list_path: &config.list_path,
            force: self.job.force,
            predicate: predicate(&config),
            action: RoomAction::PurgeHistory(request(&config, Utc::now())),
        };

        info!(
            list.path = %config.list_path,
            retention_days = config.retention_days,
            min_events = config.min_events,
            exclusions = ?config.exclusions,
            "Purging old history"
        );

        let summary = job
            .run::<RoomEventCountRecord, _, _>(|| fetch_room_event_counts(figment), &dispatcher)
            .await
            .map_err(explain_abort)?;

        Ok(report(&summary))
    }
}

fn predicate(config: &PurgeConfig) -> HistoryPurgePredicate {
    HistoryPurgePredicate {
        exclusions: config.exclusions.clone(),
        min_events: config.min_events,
    }
}

fn request(config: &PurgeConfig, now: DateTime<Utc>) -> PurgeHistoryRequest {
    PurgeHistoryRequest::older_than_days(now, config.retention_days)
        .with_delete_local_events(config.delete_local_events)
}

/// Query the number of events of every room from the Synapse database
async fn fetch_room_event_counts(figment: &Figment) -> anyhow::Result<Vec<RoomEventCount>> {
    let config = DatabaseConfig::extract_or_default(figment)
        .map_err(anyhow::Error::from_boxed)
        .context("invalid `database` configuration")?;

    let mut conn = database_connection_from_config(&config).await?;
    check_synapse_database(&mut conn).await?;

    let mut reader = SynapseReader::new(&mut conn).await?;
    let estimate = reader.estimate_event_count().await?;
    info!(
        events = estimate,
        "Counting the events of every room, this can take a while"
    );

    let rows: Vec<RoomEventCount> = reader.read_room_event_counts().try_collect().await?;
    reader.finish().await?;

    info!(rooms = rows.len(), "Counted the events of every room");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use janitor_matrix::RoomId;
    use janitor_tasks::{ExclusionReason, RoomPredicate};

    use super::*;

    fn parse(args: &[&str]) -> Options {
        let args = std::iter::once("purge-history").chain(args.iter().copied());
        Options::try_parse_from(args).unwrap()
    }

    fn record(room_id: &str, event_count: u64) -> RoomEventCountRecord {
        RoomEventCountRecord {
            room_id: RoomId::parse(room_id).unwrap(),
            event_count,
        }
    }

    #[test]
    fn config_is_used_without_flags() {
        let config = parse(&[]).apply(PurgeConfig::default());
        assert_eq!(config, PurgeConfig::default());
    }

    #[test]
    fn flags_override_config() {
        let options = parse(&[
            "--threshold",
            "1000",
            "--days",
            "90",
            "--exclude",
            "example.org",
            "--exclude",
            "!important",
            "--list",
            "/tmp/rooms.txt",
        ]);

        let config = options.apply(PurgeConfig::default());
        assert_eq!(config.min_events, 1000);
        assert_eq!(config.retention_days, 90);
        assert_eq!(config.list_path, "/tmp/rooms.txt");
        assert_eq!(config.exclusions, ["fdn.fr", "example.org", "!important"]);
    }

    #[test]
    fn zero_days_is_rejected() {
        let args = ["purge-history", "--days", "0"];
        assert!(Options::try_parse_from(args).is_err());
    }

    #[test]
    fn predicate_from_config() {
        let config = parse(&["--threshold", "10"]).apply(PurgeConfig::default());
        let predicate = predicate(&config);

        assert_eq!(predicate.check(&record("!busy:example.org", 10)), Ok(()));
        assert_eq!(
            predicate.check(&record("!busy:fdn.fr", 5000)),
            Err(ExclusionReason::Excluded {
                pattern: "fdn.fr".to_owned()
            })
        );
        assert!(predicate.check(&record("!quiet:example.org", 9)).is_err());
    }

    #[test]
    fn request_from_config() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap();
        let config = PurgeConfig {
            retention_days: 30,
            delete_local_events: true,
            ..PurgeConfig::default()
        };

        let request = request(&config, now);
        assert_eq!(
            request.purge_up_to,
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(request.retention_days, 30);
        assert!(request.delete_local_events);
    }
}
