// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{fmt::Display, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomIdError {
    #[error("room ID does not start with `!` sigil")]
    NoSigil,
    #[error("room ID does not have a `:` separator")]
    NoSeparator,
    #[error("room ID has an empty localpart")]
    EmptyLocalpart,
    #[error("room ID has an empty server name")]
    EmptyServerName,
    #[error("room ID contains whitespace or control characters")]
    InvalidCharacter,
}

/// A Matrix room ID, of the form `!localpart:server.name`
///
/// Only basic checks are done: the grammar of the server name is not
/// validated.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Parse a room ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the input doesn't look like a room ID
    pub fn parse(input: impl Into<String>) -> Result<Self, RoomIdError> {
        let input = input.into();

        if input.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(RoomIdError::InvalidCharacter);
        }

        let Some(without_sigil) = input.strip_prefix('!') else {
            return Err(RoomIdError::NoSigil);
        };

        let Some((localpart, server_name)) = without_sigil.split_once(':') else {
            return Err(RoomIdError::NoSeparator);
        };

        if localpart.is_empty() {
            return Err(RoomIdError::EmptyLocalpart);
        }

        if server_name.is_empty() {
            return Err(RoomIdError::EmptyServerName);
        }

        Ok(Self(input))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The opaque part between the `!` sigil and the first `:`
    #[must_use]
    pub fn localpart(&self) -> &str {
        let (localpart, _) = self.split();
        localpart
    }

    /// The server name of the homeserver which created the room
    #[must_use]
    pub fn server_name(&self) -> &str {
        let (_, server_name) = self.split();
        server_name
    }

    fn split(&self) -> (&str, &str) {
        // Checked on construction
        self.0[1..].split_once(':').unwrap_or_default()
    }
}

impl FromStr for RoomId {
    type Err = RoomIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
