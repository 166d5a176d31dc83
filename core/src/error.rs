/*
 * error.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Imapline, an IMAP client engine.
 *
 * Imapline is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Imapline is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Imapline.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Client and protocol errors.

use std::io;

use thiserror::Error;

use crate::sasl::SaslError;

/// Errors from connecting, authenticating, or running IMAP commands.
#[derive(Debug, Error)]
pub enum ImapError {
    /// Byte-stream failure (connect, timeout, read, write, EOF). The session is unusable afterwards.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    /// Tagged NO/BAD, refused continuation, or a line the engine could not classify. Carries the server line.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Every authentication strategy was rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Command not legal in the current session state.
    #[error("invalid state: {0}")]
    State(#[from] StateError),
    /// Invalid configuration file or account URL.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ImapError {
    pub fn protocol(line: impl AsRef<str>) -> Self {
        Self::Protocol(line.as_ref().trim_end_matches(&['\r', '\n'][..]).to_string())
    }

    /// True if the session's transport is gone and the caller has to reconnect.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ImapError::Transport(_))
    }
}

impl From<SaslError> for ImapError {
    fn from(e: SaslError) -> Self {
        Self::Authentication(e.to_string())
    }
}

/// A command was issued in a state that forbids it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("no mailbox selected (select a mailbox first)")]
    NoMailboxSelected,
    #[error("a mailbox is selected (close it first)")]
    MailboxSelected,
}

pub type Result<T> = std::result::Result<T, ImapError>;
