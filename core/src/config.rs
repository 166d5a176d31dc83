/*
 * config.rs
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

//! Connection settings: server, port, transport security and connect timeout.
//! Read from ~/.imapline/config.xml or built from an imap:// / imaps:// URL. All XML goes
//! through quick_xml.
//!
//! ```xml
//! <imap>
//!   <host>mail.example.com</host>
//!   <port>993</port>
//!   <security>tls</security>
//!   <timeout>30</timeout>
//!   <username>alice</username>
//!   <max-literal-size>268435456</max-literal-size>
//! </imap>
//! ```
//! Passwords are never stored here.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{ImapError, Result};
use crate::uri;

pub const DEFAULT_PORT: u16 = 143;
pub const DEFAULT_TLS_PORT: u16 = 993;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Largest literal the reader accepts from the server.
pub const DEFAULT_MAX_LITERAL_SIZE: usize = 256 * 1024 * 1024;

/// Transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Cleartext TCP.
    #[default]
    Plain,
    /// Implicit TLS (IMAPS).
    Tls,
    /// Cleartext connect, then STARTTLS before authenticating.
    StartTls,
}

impl Security {
    pub fn default_port(&self) -> u16 {
        match self {
            Security::Tls => DEFAULT_TLS_PORT,
            Security::Plain | Security::StartTls => DEFAULT_PORT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Security::Plain => "plain",
            Security::Tls => "tls",
            Security::StartTls => "starttls",
        }
    }
}

impl FromStr for Security {
    type Err = ImapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "none" => Ok(Security::Plain),
            "tls" | "ssl" => Ok(Security::Tls),
            "starttls" => Ok(Security::StartTls),
            other => Err(ImapError::Config(format!("unknown security mode: {}", other))),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub security: Security,
    /// Bounds TCP connect and TLS handshake only.
    pub connect_timeout: Duration,
    pub username: Option<String>,
    /// Literals announced by the server above this many bytes fail the command.
    pub max_literal_size: usize,
}

impl ImapConfig {
    /// Cleartext on port 143 with the default timeout.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            security: Security::Plain,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            username: None,
            max_literal_size: DEFAULT_MAX_LITERAL_SIZE,
        }
    }

    /// Set security; the port follows unless one was set explicitly before.
    pub fn with_security(mut self, security: Security) -> Self {
        if self.port == self.security.default_port() {
            self.port = security.default_port();
        }
        self.security = security;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_literal_size(mut self, max: usize) -> Self {
        self.max_literal_size = max;
        self
    }

    /// From `imap://user@host:port` or `imaps://user@host:port`.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = uri::parse_imap_url(url)?;
        Ok(Self {
            host: parsed.host,
            port: parsed.port,
            security: parsed.security,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            username: parsed.username,
            max_literal_size: DEFAULT_MAX_LITERAL_SIZE,
        })
    }

    /// Account URL for this configuration (no password).
    pub fn to_url(&self) -> String {
        uri::imap_url(self.username.as_deref(), &self.host, self.port, self.security)
    }

    /// Parse the `<imap>` document. `host` is required; everything else has a default.
    pub fn from_xml(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut element = Vec::<u8>::new();
        let mut host = None;
        let mut port = None;
        let mut security = Security::Plain;
        let mut timeout = DEFAULT_CONNECT_TIMEOUT;
        let mut username = None;
        let mut max_literal_size = DEFAULT_MAX_LITERAL_SIZE;

        loop {
            match reader.read_event_into(&mut buf) {
                Err(e) => return Err(ImapError::Config(format!("XML parse error: {}", e))),
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) => {
                    element.clear();
                    element.extend_from_slice(e.name().as_ref());
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|e| ImapError::Config(e.to_string()))?
                        .trim()
                        .to_string();
                    match element.as_slice() {
                        b"host" => host = Some(text),
                        b"port" => port = Some(parse_number::<u16>("port", &text)?),
                        b"security" => security = text.parse()?,
                        b"timeout" => timeout = Duration::from_secs(parse_number("timeout", &text)?),
                        b"username" => username = Some(text).filter(|u| !u.is_empty()),
                        b"max-literal-size" => max_literal_size = parse_number("max-literal-size", &text)?,
                        _ => {}
                    }
                    element.clear();
                }
                Ok(Event::End(_)) => element.clear(),
                _ => {}
            }
            buf.clear();
        }
        let host = host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ImapError::Config("missing <host>".to_string()))?;
        Ok(Self {
            host,
            port: port.unwrap_or_else(|| security.default_port()),
            security,
            connect_timeout: timeout,
            username,
            max_literal_size,
        })
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut out = Vec::new();
        let mut writer = Writer::new_with_indent(&mut out, b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Start(BytesStart::new("imap")))
            .map_err(xml_err)?;
        let port = self.port.to_string();
        let timeout = self.connect_timeout.as_secs().to_string();
        let max_literal_size = self.max_literal_size.to_string();
        let mut fields = vec![
            ("host", self.host.as_str()),
            ("port", port.as_str()),
            ("security", self.security.as_str()),
            ("timeout", timeout.as_str()),
            ("max-literal-size", max_literal_size.as_str()),
        ];
        if let Some(username) = &self.username {
            fields.push(("username", username.as_str()));
        }
        for (name, value) in fields {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(xml_err)?;
            writer
                .write_event(Event::Text(BytesText::new(value)))
                .map_err(xml_err)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(xml_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("imap")))
            .map_err(xml_err)?;
        String::from_utf8(out).map_err(|e| ImapError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ImapError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_xml(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ImapError::Config(e.to_string()))?;
        }
        fs::write(path, self.to_xml()?).map_err(|e| ImapError::Config(e.to_string()))
    }
}

fn xml_err(e: impl fmt::Display) -> ImapError {
    ImapError::Config(e.to_string())
}

fn parse_number<T: FromStr>(what: &str, text: &str) -> Result<T> {
    text.parse()
        .map_err(|_| ImapError::Config(format!("invalid {}: {:?}", what, text)))
}

/// Default config directory: ~/.imapline.
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from).map(|h| h.join(".imapline"))
}

/// ~/.imapline/config.xml
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("config.xml"))
}
