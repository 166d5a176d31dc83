/*
 * command.rs
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

//! Command framing: tags, literal markers and untagged continuation writes.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Issues tags `1`, `2`, `3`, ... for one connection.
#[derive(Debug, Default)]
pub struct CommandWriter {
    counter: u32,
}

impl CommandWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_tag(&mut self) -> String {
        self.counter += 1;
        self.counter.to_string()
    }

    /// Last tag issued (0 before the first command).
    pub fn last_tag(&self) -> u32 {
        self.counter
    }

    /// Write `"{tag} {command}\r\n"` and flush. Returns the tag.
    pub async fn write_command<S>(&mut self, stream: &mut S, command: &str) -> io::Result<String>
    where
        S: AsyncWrite + Unpin,
    {
        let tag = self.next_tag();
        debug!(%tag, command = %redact(command), "C:");
        write_line(stream, format!("{} {}", tag, command).as_bytes()).await?;
        Ok(tag)
    }

    /// Write a command ending in a literal marker: `{N+}` when `non_sync`, else `{N}`.
    /// The payload itself is not written here.
    pub async fn write_literal_command<S>(
        &mut self,
        stream: &mut S,
        command: &str,
        payload_len: usize,
        non_sync: bool,
    ) -> io::Result<String>
    where
        S: AsyncWrite + Unpin,
    {
        let tag = self.next_tag();
        let marker = literal_marker(payload_len, non_sync);
        debug!(%tag, command = %redact(command), %marker, "C:");
        write_line(stream, format!("{} {} {}", tag, command, marker).as_bytes()).await?;
        Ok(tag)
    }
}

/// `{N}` or `{N+}`.
pub fn literal_marker(len: usize, non_sync: bool) -> String {
    if non_sync {
        format!("{{{}+}}", len)
    } else {
        format!("{{{}}}", len)
    }
}

/// Untagged write of `bytes` + CRLF (literal payloads, SASL responses). Consumes no tag.
pub async fn write_continuation<S>(stream: &mut S, bytes: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    debug!(len = bytes.len(), "C: <continuation>");
    write_line(stream, bytes).await
}

async fn write_line<S>(stream: &mut S, line: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(line).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await
}

/// IMAP quoted string: `"` and `\` escaped.
pub fn quote_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Command text safe for logs: credentials after LOGIN / AUTHENTICATE <mech> are masked.
fn redact(command: &str) -> String {
    let mut words = command.splitn(3, ' ');
    let verb = words.next().unwrap_or("");
    if verb.eq_ignore_ascii_case("LOGIN") {
        return "LOGIN <redacted>".to_string();
    }
    if verb.eq_ignore_ascii_case("AUTHENTICATE") {
        let mechanism = words.next().unwrap_or("");
        return match words.next() {
            Some(_) => format!("AUTHENTICATE {} <redacted>", mechanism),
            None => format!("AUTHENTICATE {}", mechanism),
        };
    }
    command.to_string()
}
