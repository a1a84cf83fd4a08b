// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::fmt::Display;

use tracing::info;

use crate::{
    records::{RoomEventCountRecord, RoomMembershipRecord},
    table::ListRecord,
};

/// Why a room was left out of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The room ID contains an excluded pattern
    Excluded { pattern: String },

    TooFewEvents { event_count: u64, min_events: u64 },

    TooManyMembers { joined_members: u64, threshold: u64 },
}

impl Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excluded { pattern } => write!(f, "room ID contains {pattern:?}"),
            Self::TooFewEvents {
                event_count,
                min_events,
            } => write!(f, "{event_count} events, below the minimum of {min_events}"),
            Self::TooManyMembers {
                joined_members,
                threshold,
            } => write!(
                f,
                "{joined_members} joined members, above the threshold of {threshold}"
            ),
        }
    }
}

/// Decides which rooms a job acts on
pub trait RoomPredicate<T> {
    /// # Errors
    ///
    /// Returns why the record is excluded
    fn check(&self, record: &T) -> Result<(), ExclusionReason>;
}

#[derive(Debug)]
pub struct Filtered<T> {
    pub selected: Vec<T>,
    pub excluded: Vec<(T, ExclusionReason)>,
}

/// Split records into the ones the predicate selects and the ones it
/// excludes, keeping their order.
pub fn filter_records<T, P>(records: impl IntoIterator<Item = T>, predicate: &P) -> Filtered<T>
where
    T: ListRecord,
    P: RoomPredicate<T> + ?Sized,
{
    let mut selected = Vec::new();
    let mut excluded = Vec::new();

    for record in records {
        match predicate.check(&record) {
            Ok(()) => selected.push(record),
            Err(reason) => {
                info!(matrix.room_id = %record.room_id(), %reason, "Skipping room");
                excluded.push((record, reason));
            }
        }
    }

    Filtered { selected, excluded }
}

/// Selects the rooms whose history should be purged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPurgePredicate {
    /// Rooms whose ID contains any of these are never purged
    pub exclusions: Vec<String>,

    pub min_events: u64,
}

impl RoomPredicate<RoomEventCountRecord> for HistoryPurgePredicate {
    fn check(&self, record: &RoomEventCountRecord) -> Result<(), ExclusionReason> {
        if let Some(pattern) = self
            .exclusions
            .iter()
            .find(|pattern| record.room_id.as_str().contains(pattern.as_str()))
        {
            return Err(ExclusionReason::Excluded {
                pattern: pattern.clone(),
            });
        }

        if record.event_count < self.min_events {
            return Err(ExclusionReason::TooFewEvents {
                event_count: record.event_count,
                min_events: self.min_events,
            });
        }

        Ok(())
    }
}

/// Selects the rooms with at most `threshold` joined members
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyRoomPredicate {
    pub threshold: u64,
}

impl Default for EmptyRoomPredicate {
    fn default() -> Self {
        Self { threshold: 1 }
    }
}

impl RoomPredicate<RoomMembershipRecord> for EmptyRoomPredicate {
    fn check(&self, record: &RoomMembershipRecord) -> Result<(), ExclusionReason> {
        if record.joined_members > self.threshold {
            return Err(ExclusionReason::TooManyMembers {
                joined_members: record.joined_members,
                threshold: self.threshold,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use janitor_matrix::RoomId;

    use super::*;

    fn event_count(room_id: &str, event_count: u64) -> RoomEventCountRecord {
        RoomEventCountRecord {
            room_id: RoomId::parse(room_id).unwrap(),
            event_count,
        }
    }

    fn membership(room_id: &str, joined_members: u64) -> RoomMembershipRecord {
        RoomMembershipRecord {
            room_id: RoomId::parse(room_id).unwrap(),
            name: String::new(),
            joined_members,
            local_users_in_room: 0,
        }
    }

    #[test]
    fn excluded_rooms_are_never_selected() {
        let predicate = HistoryPurgePredicate {
            exclusions: vec!["fdn.fr".to_owned()],
            min_events: 0,
        };
        let records = vec![
            event_count("!a:fdn.fr", 100),
            event_count("!b:example.org", 100),
            event_count("!c:matrix.fdn.fr", 100),
            // Contained anywhere, not only in the server name
            event_count("!fdn.fr:example.org", 100),
        ];

        let filtered = filter_records(records, &predicate);

        let selected: Vec<&str> = filtered.selected.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(selected, ["!b:example.org"]);
        assert_eq!(filtered.excluded.len(), 3);
        for (record, reason) in &filtered.excluded {
            assert!(record.room_id.as_str().contains("fdn.fr"));
            assert_eq!(
                reason,
                &ExclusionReason::Excluded {
                    pattern: "fdn.fr".to_owned()
                }
            );
        }
    }

    #[test]
    fn rooms_below_minimum_events_are_excluded() {
        let predicate = HistoryPurgePredicate {
            exclusions: Vec::new(),
            min_events: 10,
        };
        let filtered = filter_records(
            vec![
                event_count("!a:example.org", 9),
                event_count("!b:example.org", 10),
            ],
            &predicate,
        );

        assert_eq!(filtered.selected, [event_count("!b:example.org", 10)]);
        assert_eq!(
            filtered.excluded[0].1,
            ExclusionReason::TooFewEvents {
                event_count: 9,
                min_events: 10
            }
        );
    }

    #[test]
    fn threshold_selection_is_exact() {
        for threshold in 0..4 {
            let predicate = EmptyRoomPredicate { threshold };
            let records: Vec<_> = (0..6)
                .map(|members| membership(&format!("!r{members}:example.org"), members))
                .collect();

            let filtered = filter_records(records, &predicate);

            assert!(
                filtered
                    .selected
                    .iter()
                    .all(|r| r.joined_members <= threshold)
            );
            assert!(
                filtered
                    .excluded
                    .iter()
                    .all(|(r, _)| r.joined_members > threshold)
            );
            assert_eq!(filtered.selected.len() + filtered.excluded.len(), 6);
        }
    }

    #[test]
    fn default_threshold_is_one_member() {
        let filtered = filter_records(
            vec![
                membership("!empty:example.org", 0),
                membership("!alone:example.org", 1),
                membership("!pair:example.org", 2),
            ],
            &EmptyRoomPredicate::default(),
        );

        assert_eq!(filtered.selected.len(), 2);
        assert_eq!(
            filtered.excluded[0].0.room_id.as_str(),
            "!pair:example.org"
        );
    }
}
