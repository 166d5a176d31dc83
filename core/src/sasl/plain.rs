/*
 * plain.rs
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

//! PLAIN SASL (RFC 4616).

use super::SaslError;

/// Build PLAIN payload: authzid NUL authcid NUL password (UTF-8).
/// Caller must base64-encode for the wire ("AUTHENTICATE PLAIN <base64>").
pub fn encode_plain(authzid: &str, authcid: &str, password: &str) -> Vec<u8> {
    format!("{}\0{}\0{}", authzid, authcid, password).into_bytes()
}

/// Same as encode_plain, but refuses fields that would corrupt the NUL-separated layout.
pub fn initial_response_plain(authzid: &str, authcid: &str, password: &str) -> Result<Vec<u8>, SaslError> {
    if authzid.contains('\0') || authcid.contains('\0') || password.contains('\0') {
        return Err(SaslError::invalid("PLAIN credentials must not contain NUL"));
    }
    Ok(encode_plain(authzid, authcid, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_authzid_starts_with_nul() {
        assert_eq!(encode_plain("", "joe", "pw"), b"\0joe\0pw");
    }

    #[test]
    fn nul_in_password_is_rejected() {
        assert!(initial_response_plain("", "joe", "p\0w").is_err());
    }
}
