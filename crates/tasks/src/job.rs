// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::fmt::Display;

use camino::Utf8Path;
use tracing::info;

use crate::{
    dispatch::{DispatchSummary, Dispatcher, RoomAction},
    filter::{RoomPredicate, filter_records},
    list::{Generation, ListError, generate_if_needed, read_list},
    table::ListRecord,
};

/// Outcome of a whole job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSummary {
    pub generation: Generation,

    /// Lines of the list which couldn't be parsed
    pub malformed: usize,

    /// Rooms left out by the predicate
    pub excluded: usize,

    pub dispatch: DispatchSummary,
}

impl JobSummary {
    #[must_use]
    pub fn processed(&self) -> usize {
        self.dispatch.processed
    }

    /// Rooms skipped at any stage
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.dispatch.skipped + self.malformed + self.excluded
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.dispatch.failed
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

impl Display for JobSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} failed",
            self.processed(),
            self.skipped(),
            self.failed()
        )
    }
}

/// A job going through the three stages: generating the list of rooms,
/// selecting rooms from it, and acting on them.
#[derive(Debug, Clone)]
pub struct ListJob<'a, P> {
    pub list_path: &'a Utf8Path,

    /// Generate the list even if it already exists
    pub force: bool,

    pub predicate: P,
    pub action: RoomAction,
}

impl<P> ListJob<'_, P> {
    /// Run the job. `fetch` is called to get the rows of the list when it has
    /// to be generated.
    ///
    /// # Errors
    ///
    /// Returns an error if the list couldn't be generated or read, or if the
    /// operator couldn't be asked for a confirmation. Nothing is done on the
    /// homeserver in the first case.
    pub async fn run<T, F, Fut>(
        &self,
        fetch: F,
        dispatcher: &Dispatcher<'_>,
    ) -> Result<JobSummary, anyhow::Error>
    where
        T: ListRecord,
        P: RoomPredicate<T>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T::Row>, anyhow::Error>>,
    {
        let generation = generate_if_needed::<T, _, _>(self.list_path, self.force, fetch).await?;

        let parsed = read_list::<T>(self.list_path).await?;
        let filtered = filter_records(parsed.records, &self.predicate);
        info!(
            list.path = %self.list_path,
            selected = filtered.selected.len(),
            excluded = filtered.excluded.len(),
            malformed = parsed.malformed.len(),
            mode = ?dispatcher.mode(),
            "Selected rooms from the list"
        );

        let rooms = filtered.selected.iter().map(T::room_id);
        let dispatch = dispatcher.dispatch(rooms, &self.action).await?;

        Ok(JobSummary {
            generation,
            malformed: parsed.malformed.len(),
            excluded: filtered.excluded.len(),
            dispatch,
        })
    }
}

/// Errors which abort a job before anything is done on the homeserver
#[must_use]
pub fn is_generation_error(error: &anyhow::Error) -> bool {
    error.downcast_ref::<ListError>().is_some()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use indoc::indoc;
    use janitor_matrix::{
        DeleteRoomRequest, MockRoomAdminConnection, PurgeHistoryRequest, RoomAdminConnection,
        RoomId,
    };
    use janitor_synapse_reader::{RoomEventCount, RoomMembership};

    use super::*;
    use crate::{
        DispatchMode, EmptyRoomPredicate, HistoryPurgePredicate, RoomEventCountRecord,
        RoomMembershipRecord,
    };

    fn purge_action() -> RoomAction {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        RoomAction::PurgeHistory(PurgeHistoryRequest::older_than_days(now, 30))
    }

    fn purge_job(list_path: &Utf8Path) -> ListJob<'_, HistoryPurgePredicate> {
        ListJob {
            list_path,
            force: false,
            predicate: HistoryPurgePredicate {
                exclusions: vec!["fdn.fr".to_owned()],
                min_events: 0,
            },
            action: purge_action(),
        }
    }

    fn write_list(dir: &tempfile::TempDir, content: &str) -> camino::Utf8PathBuf {
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("list.txt")).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    async fn no_fetch<R>() -> Result<Vec<R>, anyhow::Error> {
        panic!("the list should have been reused")
    }

    #[tokio::test]
    async fn all_valid_rows_are_processed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_list(
            &dir,
            indoc! {"
                      room_id      | event_count
                -------------------+-------------
                 !a:example.org    |        9000
                 !b:example.org    |         800
                 !c:example.org    |          70
                 !d:example.com    |           6
                (4 rows)
            "},
        );
        let connection = MockRoomAdminConnection::new();
        let dispatcher = Dispatcher::new(&connection, DispatchMode::Auto);

        let summary = purge_job(&path)
            .run::<RoomEventCountRecord, _, _>(no_fetch::<RoomEventCount>, &dispatcher)
            .await
            .unwrap();

        assert_eq!(summary.generation, Generation::Reused);
        assert_eq!(summary.processed(), 4);
        assert_eq!(summary.skipped(), 0);
        assert_eq!(summary.failed(), 0);
        assert!(summary.is_success());
        assert_eq!(summary.to_string(), "4 processed, 0 skipped, 0 failed");
    }

    #[tokio::test]
    async fn excluded_and_malformed_rooms_are_never_purged() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_list(
            &dir,
            indoc! {"
                      room_id      | event_count
                -------------------+-------------
                 !a:fdn.fr         |        9000
                 !b:example.org    |         lots
                 !c:example.org    |          70
                 !d:chat.fdn.fr    |           6
                (4 rows)
            "},
        );
        let connection = MockRoomAdminConnection::new();
        let dispatcher = Dispatcher::new(&connection, DispatchMode::Auto);

        let summary = purge_job(&path)
            .run::<RoomEventCountRecord, _, _>(no_fetch::<RoomEventCount>, &dispatcher)
            .await
            .unwrap();

        assert_eq!(summary.processed(), 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.excluded, 2);
        assert_eq!(summary.skipped(), 3);

        let calls = connection.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].room_id().as_str(), "!c:example.org");
    }

    #[tokio::test]
    async fn generates_missing_list_then_deletes_rooms() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("rooms.txt")).unwrap();
        let connection = MockRoomAdminConnection::new();
        let failing = RoomId::parse("!broken:example.org").unwrap();
        connection.fail_on(failing.clone()).await;
        let dispatcher = Dispatcher::new(&connection, DispatchMode::Auto);

        let job = ListJob {
            list_path: &path,
            force: false,
            predicate: EmptyRoomPredicate { threshold: 1 },
            action: RoomAction::DeleteRoom(DeleteRoomRequest::default()),
        };

        let summary = job
            .run::<RoomMembershipRecord, _, _>(
                || async {
                    Ok(vec![
                        RoomMembership {
                            room_id: "!empty:example.org".to_owned(),
                            name: None,
                            joined_members: 0,
                            local_users_in_room: 0,
                        },
                        RoomMembership {
                            room_id: "!broken:example.org".to_owned(),
                            name: Some("Broken | room".to_owned()),
                            joined_members: 1,
                            local_users_in_room: 1,
                        },
                        RoomMembership {
                            room_id: "!busy:example.org".to_owned(),
                            name: Some("Busy".to_owned()),
                            joined_members: 12,
                            local_users_in_room: 3,
                        },
                    ])
                },
                &dispatcher,
            )
            .await
            .unwrap();

        assert_eq!(summary.generation, Generation::Generated { rows: 3 });
        assert_eq!(summary.processed(), 1);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn dry_run_never_acts() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("rooms.txt")).unwrap();
        let connection = MockRoomAdminConnection::new();
        let dispatcher = Dispatcher::new(&connection, DispatchMode::DryRun);

        let rows: Vec<RoomEventCount> = (0..100)
            .map(|i| RoomEventCount {
                room_id: format!("!room{i}:example.org"),
                event_count: 1000 - i,
            })
            .collect();

        let summary = purge_job(&path)
            .run::<RoomEventCountRecord, _, _>(|| async { Ok(rows) }, &dispatcher)
            .await
            .unwrap();

        assert_eq!(summary.processed(), 100);
        assert!(connection.calls().await.is_empty());
        assert_eq!(connection.backend(), "mock");
    }

    #[tokio::test]
    async fn generation_failure_aborts_before_acting() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("rooms.txt")).unwrap();
        let connection = MockRoomAdminConnection::new();
        let dispatcher = Dispatcher::new(&connection, DispatchMode::Auto);

        let error = purge_job(&path)
            .run::<RoomEventCountRecord, _, _>(
                || async { Err(anyhow::anyhow!("relation \"events\" does not exist")) },
                &dispatcher,
            )
            .await
            .unwrap_err();

        assert!(is_generation_error(&error));
        assert!(connection.calls().await.is_empty());
        assert!(!path.exists());
    }
}
