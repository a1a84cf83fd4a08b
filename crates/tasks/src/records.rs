// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use janitor_matrix::RoomId;
use janitor_synapse_reader::{RoomEventCount, RoomMembership};

use crate::table::{Column, ListRecord, TableRow, parse_count, parse_room_id};

/// A room of the history purge list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEventCountRecord {
    pub room_id: RoomId,
    pub event_count: u64,
}

impl TableRow for RoomEventCount {
    fn cells(&self) -> Vec<String> {
        vec![self.room_id.clone(), self.event_count.to_string()]
    }
}

impl ListRecord for RoomEventCountRecord {
    type Row = RoomEventCount;

    const COLUMNS: &'static [Column] = &[Column::text("room_id"), Column::number("event_count")];

    fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn parse(fields: &[&str]) -> Result<Self, String> {
        let [room_id, event_count] = fields else {
            return Err(format!("expected 2 columns, found {}", fields.len()));
        };

        Ok(Self {
            room_id: parse_room_id(room_id)?,
            event_count: parse_count(event_count, "event_count")?,
        })
    }
}

/// A room of the room deletion list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembershipRecord {
    pub room_id: RoomId,
    /// Empty if the room has no name
    pub name: String,
    pub joined_members: u64,
    pub local_users_in_room: u64,
}

impl TableRow for RoomMembership {
    fn cells(&self) -> Vec<String> {
        vec![
            self.room_id.clone(),
            self.name.clone().unwrap_or_default(),
            self.joined_members.to_string(),
            self.local_users_in_room.to_string(),
        ]
    }
}

impl ListRecord for RoomMembershipRecord {
    type Row = RoomMembership;

    const COLUMNS: &'static [Column] = &[
        Column::text("room_id"),
        Column::text("name"),
        Column::number("joined_members"),
        Column::number("local_users_in_room"),
    ];

    fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    // The name is free text and may contain the separator: it is whatever
    // sits between the room ID and the two counts.
    fn parse(fields: &[&str]) -> Result<Self, String> {
        let [room_id, name @ .., joined_members, local_users_in_room] = fields else {
            return Err(format!("expected at least 4 columns, found {}", fields.len()));
        };
        if name.is_empty() {
            return Err("missing the name column".to_owned());
        }

        Ok(Self {
            room_id: parse_room_id(room_id)?,
            name: name.join("|").trim().to_owned(),
            joined_members: parse_count(joined_members, "joined_members")?,
            local_users_in_room: parse_count(local_users_in_room, "local_users_in_room")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{parse_table, render};

    #[test]
    fn membership_list_survives_rendering() {
        let rows = vec![
            RoomMembership {
                room_id: "!abc:example.org".to_owned(),
                name: Some("Tea | Coffee".to_owned()),
                joined_members: 1,
                local_users_in_room: 1,
            },
            RoomMembership {
                room_id: "!def:example.org".to_owned(),
                name: None,
                joined_members: 0,
                local_users_in_room: 0,
            },
        ];

        let rendered = render(RoomMembershipRecord::COLUMNS, &rows);
        let parsed = parse_table::<RoomMembershipRecord>(&rendered);

        assert!(parsed.malformed.is_empty());
        assert_eq!(
            parsed.records,
            [
                RoomMembershipRecord {
                    room_id: RoomId::parse("!abc:example.org").unwrap(),
                    name: "Tea | Coffee".to_owned(),
                    joined_members: 1,
                    local_users_in_room: 1,
                },
                RoomMembershipRecord {
                    room_id: RoomId::parse("!def:example.org").unwrap(),
                    name: String::new(),
                    joined_members: 0,
                    local_users_in_room: 0,
                },
            ]
        );
    }

    #[test]
    fn reject_non_numeric_member_counts() {
        let error = RoomMembershipRecord::parse(&[" !a:example.org ", " A room ", " one ", " 0"])
            .unwrap_err();
        assert!(error.contains("joined_members"));

        let error = RoomEventCountRecord::parse(&[" !a:example.org ", " 12e3"]).unwrap_err();
        assert!(error.contains("event_count"));
    }
}
