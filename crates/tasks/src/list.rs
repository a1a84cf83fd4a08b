// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Room list files, kept between runs

use std::io::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::table::{ListRecord, ParsedTable, check_rendered, parse_table, render};

#[derive(Debug, Error)]
pub enum ListError {
    #[error("failed to fetch the rooms of the list")]
    Fetch(#[source] anyhow::Error),

    #[error("the generated list failed the sanity check: {reason}")]
    SanityCheck { reason: String },

    #[error("failed to write the list to {path}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read the list at {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What [`generate_if_needed`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// The existing file was kept as is
    Reused,

    /// The file was (re)written with this many rows
    Generated { rows: usize },
}

/// Write `content` next to `path` then move it over `path`, so that readers
/// never see a partial file.
fn write_atomically(path: &Utf8Path, content: &str) -> std::io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(directory)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Generate the list at `path`, unless it already exists and `force` is not
/// set.
///
/// `fetch` is only called when the list has to be generated. The list is
/// replaced only once it has been fully rendered and checked; on failure, the
/// previous file, if any, is left untouched.
///
/// # Errors
///
/// Returns an error if fetching the rows fails, if the rendered table looks
/// wrong, or if the file couldn't be written.
#[tracing::instrument(name = "list.generate", skip_all, fields(list.path = %path), err(Debug))]
pub async fn generate_if_needed<T, F, Fut>(
    path: &Utf8Path,
    force: bool,
    fetch: F,
) -> Result<Generation, ListError>
where
    T: ListRecord,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T::Row>, anyhow::Error>>,
{
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|source| ListError::Read {
            path: path.to_owned(),
            source,
        })?;

    if exists && !force {
        info!("Reusing the existing list, use --force to generate it again");
        return Ok(Generation::Reused);
    }

    let rows = fetch().await.map_err(ListError::Fetch)?;
    let content = render(T::COLUMNS, &rows);

    if let Err(reason) = check_rendered(T::COLUMNS, &content, rows.len()) {
        error!("Generated list:\n{content}");
        return Err(ListError::SanityCheck { reason });
    }

    // Rows with unexpected values, like negative counts, are written anyway
    // and skipped when the list is used
    let unusable = parse_table::<T>(&content).malformed.len();
    if unusable > 0 {
        warn!(
            rows = unusable,
            "Some rooms of the generated list can't be used and will be skipped"
        );
    }

    let target = path.to_owned();
    tokio::task::spawn_blocking(move || write_atomically(&target, &content))
        .await
        .map_err(std::io::Error::other)
        .and_then(|result| result)
        .map_err(|source| ListError::Write {
            path: path.to_owned(),
            source,
        })?;

    info!(rows = rows.len(), "Generated the list");
    Ok(Generation::Generated { rows: rows.len() })
}

/// Read and parse the list at `path`
///
/// # Errors
///
/// Returns an error if the file can't be read. Malformed lines are not an
/// error, see [`parse_table`].
pub async fn read_list<T: ListRecord>(path: &Utf8Path) -> Result<ParsedTable<T>, ListError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ListError::Read {
            path: path.to_owned(),
            source,
        })?;

    Ok(parse_table(&content))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use janitor_synapse_reader::RoomEventCount;

    use super::*;
    use crate::records::RoomEventCountRecord;

    fn rows() -> Vec<RoomEventCount> {
        vec![
            RoomEventCount {
                room_id: "!busy:example.org".to_owned(),
                event_count: 5000,
            },
            RoomEventCount {
                room_id: "!quiet:example.org".to_owned(),
                event_count: 12,
            },
        ]
    }

    fn list_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("rooms_to_purge.txt")).unwrap()
    }

    #[tokio::test]
    async fn generate_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = list_path(&dir);

        let generation =
            generate_if_needed::<RoomEventCountRecord, _, _>(&path, false, || async {
                Ok(rows())
            })
            .await
            .unwrap();
        assert_eq!(generation, Generation::Generated { rows: 2 });

        let parsed = read_list::<RoomEventCountRecord>(&path).await.unwrap();
        assert!(parsed.malformed.is_empty());
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].event_count, 5000);
    }

    #[tokio::test]
    async fn existing_list_is_reused_without_querying() {
        let dir = tempfile::tempdir().unwrap();
        let path = list_path(&dir);
        let content = " room_id | event_count\n---------+------------\n !old:example.org | 1\n";
        std::fs::write(&path, content).unwrap();

        let calls = AtomicUsize::new(0);
        let generation =
            generate_if_needed::<RoomEventCountRecord, _, _>(&path, false, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(rows())
            })
            .await
            .unwrap();

        assert_eq!(generation, Generation::Reused);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
    }

    #[tokio::test]
    async fn force_regenerates_existing_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = list_path(&dir);
        std::fs::write(&path, "stale").unwrap();

        let generation =
            generate_if_needed::<RoomEventCountRecord, _, _>(&path, true, || async {
                Ok(rows())
            })
            .await
            .unwrap();

        assert_eq!(generation, Generation::Generated { rows: 2 });
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("!quiet:example.org"));
        assert!(content.ends_with("(2 rows)\n"));
    }

    #[tokio::test]
    async fn unexpected_values_are_skipped_when_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = list_path(&dir);

        let mut fetched = rows();
        fetched.push(RoomEventCount {
            room_id: "!broken:example.org".to_owned(),
            event_count: -3,
        });
        fetched.push(RoomEventCount {
            room_id: String::new(),
            event_count: 10,
        });

        let generation =
            generate_if_needed::<RoomEventCountRecord, _, _>(&path, false, move || async move {
                Ok(fetched)
            })
            .await
            .unwrap();
        assert_eq!(generation, Generation::Generated { rows: 4 });

        let parsed = read_list::<RoomEventCountRecord>(&path).await.unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.malformed.len(), 2);
        assert!(
            parsed
                .records
                .iter()
                .all(|record| record.room_id.as_str() != "!broken:example.org")
        );
    }

    #[tokio::test]
    async fn failed_query_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = list_path(&dir);

        let result = generate_if_needed::<RoomEventCountRecord, _, _>(&path, false, || async {
            Err(anyhow::anyhow!("connection refused"))
        })
        .await;

        assert_matches!(result, Err(ListError::Fetch(_)));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_query_keeps_previous_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = list_path(&dir);
        std::fs::write(&path, "previous").unwrap();

        let result = generate_if_needed::<RoomEventCountRecord, _, _>(&path, true, || async {
            Err(anyhow::anyhow!("connection refused"))
        })
        .await;

        assert_matches!(result, Err(ListError::Fetch(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
    }
}
