/*
 * response.rs
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

//! Response reader: reads server lines and sorts them into continuation requests, untagged
//! data and the tagged completion of the command in flight.
//!
//! Lines are read as *logical* lines: when a line ends with a literal marker `{N}`, exactly N
//! bytes are read verbatim and the line continues after them. Classification only ever looks
//! at the start of a logical line, so literal content (a message body containing
//! "1 OK done", say) can never end a response early.

use std::borrow::Cow;
use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::trace;

use crate::error::{ImapError, Result};

/// Outcome of one command: untagged data plus the tagged OK's response code and text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Every untagged line in arrival order, CRLF kept, literal bytes included verbatim.
    pub data: Vec<u8>,
    /// Bracketed code of the tagged OK, e.g. `APPENDUID 1 42` (brackets stripped).
    pub code: Option<String>,
    /// Human-readable text after the code.
    pub message: String,
}

impl Response {
    /// Untagged data as text (invalid UTF-8 replaced).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Completion status of a tagged (or untagged status) line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    No,
    Bad,
}

impl Status {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "OK" => Some(Status::Ok),
            "NO" => Some(Status::No),
            "BAD" => Some(Status::Bad),
            _ => None,
        }
    }
}

/// What a logical line is, judged by its first bytes only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `+ text` or a bare `+`: the server waits for more client data.
    Continuation(&'a str),
    /// `* ...`
    Untagged(&'a str),
    /// `tag STATUS rest`. `status` is None when the word after the tag is not OK/NO/BAD.
    Tagged {
        tag: &'a str,
        status: Option<Status>,
        rest: &'a str,
    },
    /// Anything else; kept as data.
    Other,
}

/// Classify a line with its CRLF already removed.
pub fn classify(line: &str) -> LineKind<'_> {
    if line == "+" {
        return LineKind::Continuation("");
    }
    if let Some(text) = line.strip_prefix("+ ") {
        return LineKind::Continuation(text);
    }
    if line == "*" || line.starts_with("* ") {
        return LineKind::Untagged(line);
    }
    let Some((tag, after)) = line.split_once(' ') else {
        return LineKind::Other;
    };
    if tag.is_empty() || !tag.bytes().all(is_tag_char) {
        return LineKind::Other;
    }
    let (word, rest) = after.split_once(' ').unwrap_or((after, ""));
    LineKind::Tagged {
        tag,
        status: Status::parse(word),
        rest,
    }
}

/// ASTRING-CHAR minus `+` (RFC 3501 `tag`).
fn is_tag_char(b: u8) -> bool {
    b > 0x20 && b < 0x7f && !matches!(b, b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\' | b'+')
}

/// Split `[CODE] text` into (Some(CODE), text); text without a leading code is all message.
pub fn split_code(rest: &str) -> (Option<String>, String) {
    let rest = rest.trim();
    if let Some(inner) = rest.strip_prefix('[') {
        if let Some(end) = inner.find(']') {
            return (Some(inner[..end].to_string()), inner[end + 1..].trim().to_string());
        }
    }
    (None, rest.to_string())
}

/// If a line fragment ends with `{N}` (before CRLF), the literal size N. Sizes too long
/// for a u64 come back as `u64::MAX`.
pub(crate) fn literal_size(fragment: &[u8]) -> Option<u64> {
    let line = fragment.strip_suffix(b"\n")?;
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = line.strip_suffix(b"}")?;
    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(std::str::from_utf8(digits).ok()?.parse().unwrap_or(u64::MAX))
}

/// Accept a literal of `size` bytes: at most a 32-bit `number` and at most `max_literal`.
fn checked_literal(size: u64, max_literal: usize) -> Result<usize> {
    if size > u64::from(u32::MAX) {
        return Err(ImapError::protocol(format!("literal size {} exceeds 32 bits", size)));
    }
    match usize::try_from(size) {
        Ok(len) if len <= max_literal => Ok(len),
        _ => Err(ImapError::protocol(format!(
            "literal of {} bytes exceeds limit of {}",
            size, max_literal
        ))),
    }
}

fn connection_closed() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed")
}

/// Read one logical line (CRLF included), pulling in any literals it announces. A literal
/// larger than `max_literal` is refused before anything is allocated for it.
pub async fn read_logical_line<R>(reader: &mut R, max_literal: usize) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut out = Vec::new();
    loop {
        let start = out.len();
        let n = reader.read_until(b'\n', &mut out).await?;
        if n == 0 || !out.ends_with(b"\n") {
            return Err(connection_closed().into());
        }
        match literal_size(&out[start..]) {
            Some(size) => {
                let len = checked_literal(size, max_literal)?;
                let at = out.len();
                let total = at
                    .checked_add(len)
                    .ok_or_else(|| ImapError::protocol("logical line too long"))?;
                out.resize(total, 0);
                reader.read_exact(&mut out[at..]).await?;
            }
            None => return Ok(out),
        }
    }
}

fn trimmed(raw: &[u8]) -> Cow<'_, str> {
    let end = raw
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end])
}

/// Read until the tagged completion for `tag`. NO/BAD and malformed completions are
/// `ImapError::Protocol` carrying the line.
pub async fn read_response<R>(reader: &mut R, tag: &str, max_literal: usize) -> Result<Response>
where
    R: AsyncBufRead + Unpin,
{
    let mut data = Vec::new();
    loop {
        let raw = read_logical_line(reader, max_literal).await?;
        let line = trimmed(&raw);
        trace!(tag, line = %line, "S:");
        match classify(&line) {
            LineKind::Tagged { tag: t, status, rest } if t == tag => {
                return match status {
                    Some(Status::Ok) => {
                        let (code, message) = split_code(rest);
                        Ok(Response { data, code, message })
                    }
                    _ => Err(ImapError::protocol(&line)),
                };
            }
            LineKind::Tagged { status: Some(_), .. } => {
                return Err(ImapError::protocol(format!("unexpected completion: {}", line)));
            }
            _ => data.extend_from_slice(&raw),
        }
    }
}

/// Wait for a `+` continuation request while command `tag` is in flight. Untagged lines that
/// arrive meanwhile are dropped. Returns the prompt text (e.g. a base64 SASL challenge).
pub async fn read_continuation<R>(reader: &mut R, tag: &str, max_literal: usize) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let raw = read_logical_line(reader, max_literal).await?;
        let line = trimmed(&raw);
        trace!(tag, line = %line, "S:");
        match classify(&line) {
            LineKind::Continuation(text) => return Ok(text.to_string()),
            LineKind::Tagged { status: Some(_), .. } => return Err(ImapError::protocol(&line)),
            _ => {}
        }
    }
}

/// Server greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// `* PREAUTH`: the connection is already authenticated.
    pub preauth: bool,
    pub code: Option<String>,
    pub message: String,
}

/// Read the greeting: `* OK` or `* PREAUTH`. `* BYE` or anything else is a protocol error.
pub async fn read_greeting<R>(reader: &mut R, max_literal: usize) -> Result<Greeting>
where
    R: AsyncBufRead + Unpin,
{
    let raw = read_logical_line(reader, max_literal).await?;
    let line = trimmed(&raw);
    trace!(line = %line, "S:");
    let rest = line.strip_prefix("* ").unwrap_or("");
    let (word, text) = rest.split_once(' ').unwrap_or((rest, ""));
    let preauth = match word {
        "OK" => false,
        "PREAUTH" => true,
        _ => return Err(ImapError::protocol(format!("unexpected greeting: {}", line))),
    };
    let (code, message) = split_code(text);
    Ok(Greeting { preauth, code, message })
}
