/*
 * uri.rs
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

//! Account URLs: imap://user@host:port (cleartext) and imaps://user@host:port (implicit TLS).
//! The user part is percent-encoded so one `@` separates it from the host.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::Security;
use crate::error::{ImapError, Result};

/// Userinfo in authority: encode @ and other reserved so one @ separates userinfo from host.
const USERINFO: &AsciiSet = &CONTROLS
    .add(b'@')
    .add(b':')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'[')
    .add(b']')
    .add(b' ');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapUrl {
    pub security: Security,
    pub username: Option<String>,
    pub host: String,
    pub port: u16,
}

/// Format an account URL. STARTTLS accounts use `imap://`; the URL does not record the upgrade.
pub fn imap_url(username: Option<&str>, host: &str, port: u16, security: Security) -> String {
    let scheme = match security {
        Security::Tls => "imaps",
        Security::Plain | Security::StartTls => "imap",
    };
    let host = if host.contains(':') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };
    match username {
        Some(user) => format!(
            "{}://{}@{}:{}",
            scheme,
            utf8_percent_encode(user, USERINFO),
            host,
            port
        ),
        None => format!("{}://{}:{}", scheme, host, port),
    }
}

pub fn parse_imap_url(url: &str) -> Result<ImapUrl> {
    let invalid = |why: &str| ImapError::Config(format!("invalid IMAP URL {:?}: {}", url, why));
    let (scheme, rest) = url.split_once("://").ok_or_else(|| invalid("no scheme"))?;
    let security = match scheme.to_ascii_lowercase().as_str() {
        "imap" => Security::Plain,
        "imaps" => Security::Tls,
        _ => return Err(invalid("scheme must be imap or imaps")),
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let (username, host_port) = match authority.rsplit_once('@') {
        Some((user, host_port)) => {
            let user = percent_decode_str(user)
                .decode_utf8()
                .map_err(|_| invalid("user is not UTF-8"))?
                .into_owned();
            (Some(user).filter(|u| !u.is_empty()), host_port)
        }
        None => (None, authority),
    };
    let (host, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
        let (host, after) = bracketed.split_once(']').ok_or_else(|| invalid("unclosed ["))?;
        (host, after.strip_prefix(':'))
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };
    if host.is_empty() {
        return Err(invalid("no host"));
    }
    let port = match port {
        Some(p) => p.parse().map_err(|_| invalid("bad port"))?,
        None => security.default_port(),
    };
    Ok(ImapUrl {
        security,
        username,
        host: host.to_string(),
        port,
    })
}
