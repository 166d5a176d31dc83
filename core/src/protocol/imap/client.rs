/*
 * client.rs
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

//! IMAP session: connect, greet, authenticate, then one method per protocol verb.
//!
//! Mailbox names are passed in and returned as Unicode; on the wire they are modified UTF-7
//! inside quoted strings. Every method takes `&mut self`, so only one command is ever in
//! flight on a session.

use std::collections::{BTreeMap, BTreeSet};

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::auth::authenticate;
use super::capability::{Capabilities, STARTTLS};
use super::command::quote_string;
use super::connection::Connection;
use super::parse::{
    parse_append_uid, parse_expunge, parse_list, parse_search, parse_select, parse_status, parse_store,
    Mailbox, MailboxStatus, StatusItem,
};
use super::response::{Greeting, Response};
use super::state::{SessionState, Verb};
use crate::config::{ImapConfig, Security};
use crate::error::{ImapError, Result};
use crate::mailbox_name_codec;
use crate::net::{self, ImapStream};

/// IMAP port without implicit TLS.
pub const DEFAULT_PORT: u16 = 143;

/// An authenticated IMAP session over `S`.
pub struct Session<S> {
    conn: Connection<S>,
    state: SessionState,
}

impl Session<ImapStream> {
    /// Connect over cleartext TCP and authenticate.
    pub async fn open(user: &str, password: &str, host: &str, port: u16) -> Result<Self> {
        let config = ImapConfig::new(host).with_port(port);
        Self::connect(&config, user, password).await
    }

    /// Connect as `config` says (plain, implicit TLS or STARTTLS) and authenticate.
    pub async fn connect(config: &ImapConfig, user: &str, password: &str) -> Result<Self> {
        info!(host = %config.host, port = config.port, security = %config.security, "connecting");
        let stream = net::connect(&config.host, config.port, config.security, config.connect_timeout).await?;
        let mut conn = Connection::new(stream);
        conn.set_max_literal_size(config.max_literal_size);
        let greeting = conn.read_greeting().await?;
        if config.security != Security::StartTls || greeting.preauth {
            return Self::establish(conn, greeting, user, password).await;
        }

        seed_capabilities(&mut conn, &greeting).await?;
        if !conn.capabilities().has(STARTTLS) {
            return Err(ImapError::protocol("server does not offer STARTTLS"));
        }
        conn.command("STARTTLS").await?;
        let (stream, writer) = conn.into_parts();
        let stream = stream.upgrade_to_tls(&config.host, config.connect_timeout).await?;
        debug!("TLS established");
        let mut conn = Connection::from_parts(stream, writer);
        conn.set_max_literal_size(config.max_literal_size);
        // capabilities learned before TLS are discarded
        conn.refresh_capabilities().await?;
        authenticate(&mut conn, user, password).await?;
        Ok(Self {
            conn,
            state: SessionState::Authenticated,
        })
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Run greeting, capability discovery and authentication on an already connected stream.
    pub async fn from_stream(stream: S, user: &str, password: &str) -> Result<Self> {
        let mut conn = Connection::new(stream);
        let greeting = conn.read_greeting().await?;
        Self::establish(conn, greeting, user, password).await
    }

    async fn establish(mut conn: Connection<S>, greeting: Greeting, user: &str, password: &str) -> Result<Self> {
        seed_capabilities(&mut conn, &greeting).await?;
        if greeting.preauth {
            info!("connection pre-authenticated");
        } else {
            authenticate(&mut conn, user, password).await?;
        }
        Ok(Self {
            conn,
            state: SessionState::Authenticated,
        })
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.conn.capabilities()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Decoded name of the selected mailbox.
    pub fn selected_mailbox(&self) -> Option<&str> {
        self.state.selected_mailbox()
    }

    fn require(&self, verb: Verb) -> Result<()> {
        Ok(self.state.check(verb)?)
    }

    pub async fn noop(&mut self) -> Result<Response> {
        self.require(Verb::Noop)?;
        self.conn.command("NOOP").await
    }

    /// Ask the server again and replace the known capabilities.
    pub async fn capability(&mut self) -> Result<&Capabilities> {
        self.require(Verb::Capability)?;
        self.conn.refresh_capabilities().await
    }

    /// SELECT, or EXAMINE when `read_only`. On failure no mailbox is selected any more.
    pub async fn select(&mut self, mailbox: &str, read_only: bool) -> Result<MailboxStatus> {
        let (verb, name) = if read_only {
            (Verb::Examine, "EXAMINE")
        } else {
            (Verb::Select, "SELECT")
        };
        self.require(verb)?;
        let command = format!("{} {}", name, mailbox_arg(mailbox));
        match self.conn.command(&command).await {
            Ok(response) => {
                let status = parse_select(&response.data, response.code.as_deref(), read_only);
                info!(%mailbox, exists = status.exists, read_only = status.read_only, "selected");
                self.state = SessionState::Selected {
                    mailbox: mailbox.to_string(),
                    read_only: status.read_only,
                };
                Ok(status)
            }
            Err(e) => {
                self.state = SessionState::Authenticated;
                Err(e)
            }
        }
    }

    pub async fn examine(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.select(mailbox, true).await
    }

    pub async fn create(&mut self, mailbox: &str) -> Result<Response> {
        self.require(Verb::Create)?;
        self.conn.command(&format!("CREATE {}", mailbox_arg(mailbox))).await
    }

    pub async fn delete(&mut self, mailbox: &str) -> Result<Response> {
        self.require(Verb::Delete)?;
        self.conn.command(&format!("DELETE {}", mailbox_arg(mailbox))).await
    }

    pub async fn rename(&mut self, from: &str, to: &str) -> Result<Response> {
        self.require(Verb::Rename)?;
        let command = format!("RENAME {} {}", mailbox_arg(from), mailbox_arg(to));
        self.conn.command(&command).await
    }

    pub async fn subscribe(&mut self, mailbox: &str) -> Result<Response> {
        self.require(Verb::Subscribe)?;
        self.conn.command(&format!("SUBSCRIBE {}", mailbox_arg(mailbox))).await
    }

    pub async fn unsubscribe(&mut self, mailbox: &str) -> Result<Response> {
        self.require(Verb::Unsubscribe)?;
        self.conn.command(&format!("UNSUBSCRIBE {}", mailbox_arg(mailbox))).await
    }

    /// LIST, or LSUB when `subscribed_only`. Sorted by decoded name, case-insensitively with
    /// exact order breaking ties; the order is not locale-aware collation.
    pub async fn list(&mut self, reference: &str, pattern: &str, subscribed_only: bool) -> Result<Vec<Mailbox>> {
        let (verb, name) = if subscribed_only {
            (Verb::Lsub, "LSUB")
        } else {
            (Verb::List, "LIST")
        };
        self.require(verb)?;
        let command = format!("{} {} {}", name, mailbox_arg(reference), mailbox_arg(pattern));
        let response = self.conn.command(&command).await?;
        Ok(parse_list(&response.data, subscribed_only))
    }

    pub async fn status(&mut self, mailbox: &str, items: &[StatusItem]) -> Result<BTreeMap<StatusItem, u64>> {
        self.require(Verb::Status)?;
        let items: Vec<&str> = items.iter().map(StatusItem::name).collect();
        let command = format!("STATUS {} ({})", mailbox_arg(mailbox), items.join(" "));
        let response = self.conn.command(&command).await?;
        Ok(parse_status(&response.data))
    }

    /// APPEND `message` with `flags` (e.g. `\Seen`, may be empty). Returns the new UID when
    /// the server reports APPENDUID.
    pub async fn append(&mut self, mailbox: &str, message: &[u8], flags: &str) -> Result<Option<u32>> {
        self.require(Verb::Append)?;
        let command = format!("APPEND {} ({})", mailbox_arg(mailbox), flags.trim());
        let response = self.conn.command_with_literal(&command, message).await?;
        Ok(parse_append_uid(response.code.as_deref()))
    }

    pub async fn check(&mut self) -> Result<Response> {
        self.require(Verb::Check)?;
        self.conn.command("CHECK").await
    }

    /// CLOSE: expunge silently and leave the selected state.
    pub async fn close(&mut self) -> Result<Response> {
        self.require(Verb::Close)?;
        let response = self.conn.command("CLOSE").await?;
        self.state = SessionState::Authenticated;
        Ok(response)
    }

    /// Message numbers reported as expunged, in order.
    pub async fn expunge(&mut self) -> Result<Vec<u32>> {
        self.require(Verb::Expunge)?;
        let response = self.conn.command("EXPUNGE").await?;
        Ok(parse_expunge(&response.data))
    }

    /// SEARCH with UTF-8 charset. Returns message numbers, or UIDs when `by_uid`.
    pub async fn search(&mut self, criteria: &str, by_uid: bool) -> Result<Vec<u32>> {
        self.require(Verb::Search)?;
        let command = format!("{}SEARCH CHARSET \"UTF-8\" {}", uid_prefix(by_uid), criteria);
        let response = self.conn.command(&command).await?;
        Ok(parse_search(&response.data))
    }

    /// FETCH: raw untagged data for the caller to interpret.
    pub async fn fetch(&mut self, set: &str, items: &str, by_uid: bool) -> Result<Response> {
        self.require(Verb::Fetch)?;
        let command = format!("{}FETCH {} {}", uid_prefix(by_uid), set, items);
        self.conn.command(&command).await
    }

    /// STORE `action` (`FLAGS`, `+FLAGS`, `-FLAGS.SILENT`, ...) on `set`. Returns the flags
    /// the server reported per message.
    pub async fn store(
        &mut self,
        set: &str,
        action: &str,
        flags: &str,
        by_uid: bool,
    ) -> Result<BTreeMap<u32, BTreeSet<String>>> {
        self.require(Verb::Store)?;
        let command = format!("{}STORE {} {} ({})", uid_prefix(by_uid), set, action, flags.trim());
        let response = self.conn.command(&command).await?;
        Ok(parse_store(&response.data))
    }

    pub async fn copy(&mut self, set: &str, mailbox: &str, by_uid: bool) -> Result<Response> {
        self.require(Verb::Copy)?;
        let command = format!("{}COPY {} {}", uid_prefix(by_uid), set, mailbox_arg(mailbox));
        self.conn.command(&command).await
    }

    /// LOGOUT (errors ignored), then close the transport.
    pub async fn logout(mut self) -> Result<()> {
        if let Err(e) = self.conn.command("LOGOUT").await {
            debug!(error = %e, "LOGOUT failed");
        }
        if let Err(e) = self.conn.shutdown().await {
            debug!(error = %e, "shutdown failed");
        }
        Ok(())
    }

    /// Give back the transport without logging out.
    pub fn into_inner(self) -> S {
        self.conn.into_inner()
    }
}

/// Capabilities from a `[CAPABILITY ...]` greeting code, else from a CAPABILITY command.
async fn seed_capabilities<S>(conn: &mut Connection<S>, greeting: &Greeting) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match greeting.code.as_deref().and_then(Capabilities::from_response_code) {
        Some(caps) => conn.set_capabilities(caps),
        None => {
            conn.refresh_capabilities().await?;
        }
    }
    Ok(())
}

fn mailbox_arg(name: &str) -> String {
    quote_string(&mailbox_name_codec::encode(name))
}

fn uid_prefix(by_uid: bool) -> &'static str {
    if by_uid {
        "UID "
    } else {
        ""
    }
}
