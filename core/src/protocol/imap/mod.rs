/*
 * mod.rs
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

//! IMAP4rev1 client engine.
//!
//! A `Session` owns one `Connection` and a `SessionState`. Each command method checks the
//! state, writes one tagged command (with literal continuation where needed), reads until
//! the matching tagged completion and parses the untagged data it collected.

mod auth;
mod capability;
mod client;
mod command;
mod connection;
pub mod parse;
mod response;
mod state;

#[cfg(test)]
pub(crate) mod mock;

pub use auth::{authenticate, AuthOutcome};
pub use capability::{Capabilities, Capability};
pub use client::{Session, DEFAULT_PORT};
pub use command::{quote_string, CommandWriter};
pub use connection::Connection;
pub use parse::{Mailbox, MailboxStatus, StatusItem};
pub use response::{classify, Greeting, LineKind, Response, Status};
pub use state::{SessionState, Verb};
