/*
 * lib.rs
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

//! Imapline core: an IMAP4rev1 client engine written directly against the byte stream.
//!
//! - `protocol::imap`: tagged command framing, literals, response reading, SASL negotiation,
//!   session state and one method per protocol verb (`Session`).
//! - `net`: plain TCP, implicit TLS and STARTTLS streams.
//! - `mailbox_name_codec`: modified UTF-7 mailbox names.
//! - `config` / `uri`: account settings from XML or `imap://` URLs.

pub mod config;
pub mod error;
pub mod mailbox_name_codec;
pub mod net;
pub mod protocol;
pub mod sasl;
pub mod uri;

pub use config::{ImapConfig, Security};
pub use error::{ImapError, Result, StateError};
pub use protocol::imap::{
    Capabilities, Capability, Mailbox, MailboxStatus, Response, Session, SessionState, StatusItem,
};
