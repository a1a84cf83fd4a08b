// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Maintenance jobs on the rooms of a homeserver.
//!
//! Each job keeps a list of rooms in a file, selects some rooms from it and
//! acts on them through a [`janitor_matrix::RoomAdminConnection`].

mod dispatch;
mod filter;
mod job;
mod list;
mod records;
pub mod table;

pub use self::{
    dispatch::{
        Confirmation, DispatchMode, DispatchSummary, Dispatcher, RoomAction, TerminalConfirmation,
    },
    filter::{
        EmptyRoomPredicate, ExclusionReason, Filtered, HistoryPurgePredicate, RoomPredicate,
        filter_records,
    },
    job::{JobSummary, ListJob, is_generation_error},
    list::{Generation, ListError, generate_if_needed, read_list},
    records::{RoomEventCountRecord, RoomMembershipRecord},
};
