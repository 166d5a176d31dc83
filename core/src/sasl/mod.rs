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

//! SASL client payloads for the mechanisms the IMAP negotiator drives: PLAIN and LOGIN.
//!
//! Only the byte payloads live here; framing them on the wire (SASL-IR, literals,
//! continuation prompts) is the job of `protocol::imap::auth`.

mod login;
mod mechanism;
mod plain;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

pub use login::LoginResponses;
pub use mechanism::SaslMechanism;
pub use plain::{encode_plain, initial_response_plain};

#[derive(Debug, Error)]
#[error("{message}")]
pub struct SaslError {
    pub message: String,
}

impl SaslError {
    pub fn invalid(msg: &str) -> Self {
        Self { message: msg.to_string() }
    }
}

/// Standard base64 (with padding), as used for every SASL exchange in IMAP.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
