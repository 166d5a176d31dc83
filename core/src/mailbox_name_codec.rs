/*
 * mailbox_name_codec.rs
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

//! Encode/decode mailbox names in IMAP modified UTF-7 (RFC 3501 section 5.1.3).
//!
//! Printable US-ASCII stands for itself, except `&` which becomes `&-`. Any other run of
//! characters is UTF-16BE, base64-encoded with `,` instead of `/` and no padding, wrapped
//! in `&` ... `-`.

use base64::alphabet::IMAP_MUTF7;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::Engine as _;
use thiserror::Error;

const MUTF7: GeneralPurpose = GeneralPurpose::new(&IMAP_MUTF7, NO_PAD);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unterminated shift sequence in {0:?}")]
    Unterminated(String),
    #[error("invalid base64 in shift sequence {0:?}")]
    InvalidBase64(String),
    #[error("invalid UTF-16 in shift sequence {0:?}")]
    InvalidUtf16(String),
}

fn is_direct(c: char) -> bool {
    ('\u{20}'..='\u{7e}').contains(&c) && c != '&'
}

fn flush_shifted(run: &mut Vec<u16>, out: &mut String) {
    if run.is_empty() {
        return;
    }
    let bytes: Vec<u8> = run.iter().flat_map(|u| u.to_be_bytes()).collect();
    out.push('&');
    out.push_str(&MUTF7.encode(bytes));
    out.push('-');
    run.clear();
}

/// Encode a Unicode mailbox name for the wire.
pub fn encode(name: &str) -> String {
    if name.chars().all(is_direct) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() * 2);
    let mut run: Vec<u16> = Vec::new();
    for c in name.chars() {
        if is_direct(c) {
            flush_shifted(&mut run, &mut out);
            out.push(c);
        } else if c == '&' {
            flush_shifted(&mut run, &mut out);
            out.push_str("&-");
        } else {
            let mut units = [0u16; 2];
            run.extend_from_slice(c.encode_utf16(&mut units));
        }
    }
    flush_shifted(&mut run, &mut out);
    out
}

/// Decode a wire mailbox name. Bytes outside shift sequences are kept as they are, so a
/// server that already sends UTF-8 names still decodes.
pub fn decode(encoded: &str) -> Result<String, CodecError> {
    if !encoded.contains('&') {
        return Ok(encoded.to_string());
    }
    let mut out = String::with_capacity(encoded.len());
    let mut rest = encoded;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let end = after
            .find('-')
            .ok_or_else(|| CodecError::Unterminated(encoded.to_string()))?;
        let shifted = &after[..end];
        if shifted.is_empty() {
            out.push('&');
        } else {
            let bytes = MUTF7
                .decode(shifted)
                .map_err(|_| CodecError::InvalidBase64(shifted.to_string()))?;
            if bytes.len() % 2 != 0 {
                return Err(CodecError::InvalidUtf16(shifted.to_string()));
            }
            let units = bytes.chunks_exact(2).map(|b| u16::from_be_bytes([b[0], b[1]]));
            for c in char::decode_utf16(units) {
                out.push(c.map_err(|_| CodecError::InvalidUtf16(shifted.to_string()))?);
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Decode, falling back to the raw text when the server sent something that is not valid
/// modified UTF-7.
pub fn decode_lossy(encoded: &str) -> String {
    decode(encoded).unwrap_or_else(|_| encoded.to_string())
}
