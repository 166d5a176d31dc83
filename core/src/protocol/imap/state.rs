/*
 * state.rs
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

//! Session states (RFC 3501 section 3) and which commands each allows.

use crate::error::StateError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NotAuthenticated,
    Authenticated,
    Selected {
        /// Decoded mailbox name.
        mailbox: String,
        read_only: bool,
    },
}

/// Every command the session can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Noop,
    Capability,
    Logout,
    Select,
    Examine,
    Create,
    Delete,
    Rename,
    Subscribe,
    Unsubscribe,
    List,
    Lsub,
    Status,
    Append,
    Check,
    Close,
    Expunge,
    Search,
    Fetch,
    Store,
    Copy,
}

impl SessionState {
    pub fn is_selected(&self) -> bool {
        matches!(self, SessionState::Selected { .. })
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, SessionState::NotAuthenticated)
    }

    pub fn selected_mailbox(&self) -> Option<&str> {
        match self {
            SessionState::Selected { mailbox, .. } => Some(mailbox),
            _ => None,
        }
    }

    /// Whether `verb` may be issued now.
    pub fn check(&self, verb: Verb) -> Result<(), StateError> {
        match verb {
            Verb::Noop | Verb::Capability | Verb::Logout => Ok(()),
            Verb::Select
            | Verb::Examine
            | Verb::Create
            | Verb::List
            | Verb::Lsub
            | Verb::Status
            | Verb::Subscribe
            | Verb::Unsubscribe
            | Verb::Append => {
                if self.is_authenticated() {
                    Ok(())
                } else {
                    Err(StateError::NotAuthenticated)
                }
            }
            Verb::Delete | Verb::Rename => match self {
                SessionState::NotAuthenticated => Err(StateError::NotAuthenticated),
                SessionState::Selected { .. } => Err(StateError::MailboxSelected),
                SessionState::Authenticated => Ok(()),
            },
            Verb::Check
            | Verb::Close
            | Verb::Expunge
            | Verb::Search
            | Verb::Fetch
            | Verb::Store
            | Verb::Copy => match self {
                SessionState::NotAuthenticated => Err(StateError::NotAuthenticated),
                SessionState::Authenticated => Err(StateError::NoMailboxSelected),
                SessionState::Selected { .. } => Ok(()),
            },
        }
    }
}
