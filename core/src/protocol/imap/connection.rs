/*
 * connection.rs
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

//! One IMAP connection: buffered stream, tag counter and the server's capabilities.
//!
//! Every request/response cycle goes through here. Commands that carry a literal use
//! `{N+}` when the server advertised LITERAL+, otherwise `{N}` followed by a wait for the
//! server's `+` before the payload is sent.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::capability::Capabilities;
use super::command::{literal_marker, write_continuation, CommandWriter};
use super::response::{read_continuation, read_greeting, read_response, Greeting, Response};
use crate::config::DEFAULT_MAX_LITERAL_SIZE;
use crate::error::{ImapError, Result};

pub struct Connection<S> {
    stream: BufReader<S>,
    writer: CommandWriter,
    capabilities: Capabilities,
    max_literal: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            writer: CommandWriter::new(),
            capabilities: Capabilities::default(),
            max_literal: DEFAULT_MAX_LITERAL_SIZE,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    /// Largest literal accepted from the server; bigger ones fail with a protocol error.
    pub fn set_max_literal_size(&mut self, max: usize) {
        self.max_literal = max;
    }

    /// Last tag issued.
    pub fn last_tag(&self) -> u32 {
        self.writer.last_tag()
    }

    pub async fn read_greeting(&mut self) -> Result<Greeting> {
        read_greeting(&mut self.stream, self.max_literal).await
    }

    /// Send a command and read to its tagged completion.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        let tag = self.begin(command).await?;
        self.finish(&tag).await
    }

    /// Send a command whose last argument is `payload` as a literal.
    pub async fn command_with_literal(&mut self, command: &str, payload: &[u8]) -> Result<Response> {
        let tag = self.begin_literal(command, payload.len()).await?;
        self.continue_with(payload).await?;
        self.finish(&tag).await
    }

    /// Write a command line without waiting for anything. Returns the tag.
    pub async fn begin(&mut self, command: &str) -> Result<String> {
        Ok(self.writer.write_command(&mut self.stream, command).await?)
    }

    /// Write a command ending in a literal marker for `len` bytes. Without LITERAL+ this
    /// waits for the `+` prompt, so the caller may send the payload when it returns.
    pub async fn begin_literal(&mut self, command: &str, len: usize) -> Result<String> {
        let non_sync = self.capabilities.literal_plus();
        let tag = self
            .writer
            .write_literal_command(&mut self.stream, command, len, non_sync)
            .await?;
        if !non_sync {
            self.await_continuation(&tag).await?;
        }
        Ok(tag)
    }

    /// Literal marker for `len` bytes matching this server (`{N+}` or `{N}`).
    pub fn literal_marker(&self, len: usize) -> String {
        literal_marker(len, self.capabilities.literal_plus())
    }

    /// Wait for `+`; returns the prompt text. A completion for `tag` instead is a protocol error.
    pub async fn await_continuation(&mut self, tag: &str) -> Result<String> {
        read_continuation(&mut self.stream, tag, self.max_literal).await
    }

    /// Untagged write of `bytes` + CRLF.
    pub async fn continue_with(&mut self, bytes: &[u8]) -> Result<()> {
        Ok(write_continuation(&mut self.stream, bytes).await?)
    }

    /// Read to the tagged completion for `tag`.
    pub async fn finish(&mut self, tag: &str) -> Result<Response> {
        read_response(&mut self.stream, tag, self.max_literal).await
    }

    /// Run CAPABILITY and replace the known set with the answer.
    pub async fn refresh_capabilities(&mut self) -> Result<&Capabilities> {
        let response = self.command("CAPABILITY").await?;
        let fresh = Capabilities::from_data(&response.text())
            .or_else(|| response.code.as_deref().and_then(Capabilities::from_response_code))
            .ok_or_else(|| ImapError::protocol("CAPABILITY returned no capability list"))?;
        self.capabilities = fresh;
        Ok(&self.capabilities)
    }

    /// Close the write side of the transport.
    pub async fn shutdown(&mut self) -> Result<()> {
        Ok(self.stream.get_mut().shutdown().await?)
    }

    /// Give back the transport. Unread buffered bytes are dropped.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    /// Split off the transport for a TLS upgrade, keeping the tag counter.
    pub fn into_parts(self) -> (S, CommandWriter) {
        (self.stream.into_inner(), self.writer)
    }

    /// Continue on a new transport with the old tag counter. Capabilities start empty and the
    /// literal limit is back to its default.
    pub fn from_parts(stream: S, writer: CommandWriter) -> Self {
        Self {
            stream: BufReader::new(stream),
            writer,
            capabilities: Capabilities::default(),
            max_literal: DEFAULT_MAX_LITERAL_SIZE,
        }
    }
}
