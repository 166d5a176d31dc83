/*
 * login.rs
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

//! Legacy LOGIN SASL mechanism: the server prompts "Username:" then "Password:".
//! The prompts are not inspected; the responses are sent in order.

use super::encode_base64;

/// The two base64 responses of a LOGIN exchange.
#[derive(Debug, Clone)]
pub struct LoginResponses {
    pub username: String,
    pub password: String,
}

impl LoginResponses {
    pub fn new(authcid: &str, password: &str) -> Self {
        Self {
            username: encode_base64(authcid.as_bytes()),
            password: encode_base64(password.as_bytes()),
        }
    }
}
