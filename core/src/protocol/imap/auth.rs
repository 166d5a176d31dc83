/*
 * auth.rs
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

//! Authentication negotiation.
//!
//! Strategies are tried in a fixed order: AUTHENTICATE PLAIN (if `AUTH=PLAIN`), AUTHENTICATE
//! LOGIN (if `AUTH=LOGIN`), then the LOGIN command. A server refusal moves on to the next
//! strategy; a transport failure stops immediately. SASL-IR and LITERAL+ change how the
//! payloads are framed, not which strategies are tried.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::capability::Capabilities;
use super::command::quote_string;
use super::connection::Connection;
use super::response::Response;
use crate::error::{ImapError, Result};
use crate::sasl::{encode_base64, initial_response_plain, LoginResponses, SaslMechanism};

/// Result of one authentication attempt that reached a verdict.
#[derive(Debug)]
pub enum AuthOutcome {
    Success(Response),
    /// The server refused; carries its line.
    Rejected(String),
}

impl AuthOutcome {
    fn from_result(result: Result<Response>) -> Result<Self> {
        match result {
            Ok(response) => Ok(AuthOutcome::Success(response)),
            Err(ImapError::Protocol(line)) => Ok(AuthOutcome::Rejected(line)),
            Err(e) => Err(e),
        }
    }
}

/// Authenticate `user`, then re-seed the connection's capabilities. Fails with
/// `ImapError::Authentication` carrying the last refusal if nothing worked.
pub async fn authenticate<S>(conn: &mut Connection<S>, user: &str, password: &str) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for mechanism in SaslMechanism::PREFERENCE {
        if !conn.capabilities().supports_auth(mechanism.name()) {
            continue;
        }
        let result = match mechanism {
            SaslMechanism::Plain => authenticate_plain(conn, user, password).await,
            SaslMechanism::Login => authenticate_login(conn, user, password).await,
        };
        match AuthOutcome::from_result(result)? {
            AuthOutcome::Success(response) => {
                debug!(%mechanism, "authenticated");
                reseed_capabilities(conn, &response).await?;
                return Ok(response);
            }
            AuthOutcome::Rejected(reason) => {
                warn!(%mechanism, %reason, "authentication rejected");
            }
        }
    }
    let command = format!("LOGIN {} {}", quote_string(user), quote_string(password));
    match AuthOutcome::from_result(conn.command(&command).await)? {
        AuthOutcome::Success(response) => {
            debug!("authenticated with LOGIN command");
            reseed_capabilities(conn, &response).await?;
            Ok(response)
        }
        AuthOutcome::Rejected(reason) => {
            warn!(%reason, "LOGIN rejected");
            Err(ImapError::Authentication(reason))
        }
    }
}

async fn authenticate_plain<S>(conn: &mut Connection<S>, user: &str, password: &str) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let payload = encode_base64(&initial_response_plain("", user, password)?);
    let caps = conn.capabilities();
    if caps.sasl_ir() {
        conn.command(&format!("AUTHENTICATE PLAIN {}", payload)).await
    } else if caps.literal_plus() {
        conn.command_with_literal("AUTHENTICATE PLAIN", payload.as_bytes()).await
    } else {
        sasl_exchange(conn, "AUTHENTICATE PLAIN", &[&payload]).await
    }
}

async fn authenticate_login<S>(conn: &mut Connection<S>, user: &str, password: &str) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let responses = LoginResponses::new(user, password);
    let caps = conn.capabilities();
    if caps.sasl_ir() && caps.literal_plus() {
        let command = format!("AUTHENTICATE LOGIN {}", responses.username);
        conn.command_with_literal(&command, responses.password.as_bytes()).await
    } else if caps.sasl_ir() {
        let command = format!("AUTHENTICATE LOGIN {}", responses.username);
        sasl_exchange(conn, &command, &[&responses.password]).await
    } else if caps.literal_plus() {
        let tag = conn.begin_literal("AUTHENTICATE LOGIN", responses.username.len()).await?;
        let marker = conn.literal_marker(responses.password.len());
        conn.continue_with(format!("{} {}", responses.username, marker).as_bytes())
            .await?;
        conn.continue_with(responses.password.as_bytes()).await?;
        conn.finish(&tag).await
    } else {
        sasl_exchange(
            conn,
            "AUTHENTICATE LOGIN",
            &[&responses.username, &responses.password],
        )
        .await
    }
}

/// Send `command`, answer each `+` challenge with the next response, read the completion.
async fn sasl_exchange<S>(conn: &mut Connection<S>, command: &str, responses: &[&str]) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let tag = conn.begin(command).await?;
    for response in responses {
        conn.await_continuation(&tag).await?;
        conn.continue_with(response.as_bytes()).await?;
    }
    conn.finish(&tag).await
}

/// Capabilities change after authentication: take them from the completion's code, from
/// an untagged CAPABILITY line, or ask again.
async fn reseed_capabilities<S>(conn: &mut Connection<S>, response: &Response) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let fresh = response
        .code
        .as_deref()
        .and_then(Capabilities::from_response_code)
        .or_else(|| Capabilities::from_data(&response.text()));
    match fresh {
        Some(caps) => conn.set_capabilities(caps),
        None => {
            conn.refresh_capabilities().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::imap::mock::MockStream;

    fn connection(caps: &str, server: &[u8]) -> Connection<MockStream> {
        let mut conn = Connection::new(MockStream::new(server));
        conn.set_capabilities(Capabilities::parse(caps));
        conn
    }

    #[tokio::test]
    async fn plain_with_initial_response() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=PLAIN SASL-IR",
            b"1 OK [CAPABILITY IMAP4rev1 IDLE] Logged in\r\n",
        );
        authenticate(&mut conn, "user", "secret").await.unwrap();
        assert!(conn.capabilities().has("IDLE"));
        assert!(!conn.capabilities().has("AUTH"));
        assert_eq!(
            conn.into_inner().written_str(),
            "1 AUTHENTICATE PLAIN AHVzZXIAc2VjcmV0\r\n"
        );
    }

    #[tokio::test]
    async fn plain_as_literal_then_capability_command() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=PLAIN LITERAL+",
            b"1 OK done\r\n* CAPABILITY IMAP4rev1 MOVE\r\n2 OK\r\n",
        );
        authenticate(&mut conn, "user", "secret").await.unwrap();
        assert!(conn.capabilities().has("MOVE"));
        assert_eq!(
            conn.into_inner().written_str(),
            "1 AUTHENTICATE PLAIN {16+}\r\nAHVzZXIAc2VjcmV0\r\n2 CAPABILITY\r\n"
        );
    }

    #[tokio::test]
    async fn plain_with_continuation() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=PLAIN",
            b"+ \r\n* CAPABILITY IMAP4rev1 ID\r\n1 OK done\r\n",
        );
        authenticate(&mut conn, "user", "secret").await.unwrap();
        assert!(conn.capabilities().has("ID"));
        assert_eq!(
            conn.into_inner().written_str(),
            "1 AUTHENTICATE PLAIN\r\nAHVzZXIAc2VjcmV0\r\n"
        );
    }

    #[tokio::test]
    async fn login_mechanism_without_plain() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=LOGIN",
            b"+ VXNlcm5hbWU6\r\n+ UGFzc3dvcmQ6\r\n1 OK [CAPABILITY IMAP4rev1] ok\r\n",
        );
        authenticate(&mut conn, "user", "pass").await.unwrap();
        let written = conn.into_inner().written_str();
        assert!(!written.contains("PLAIN"));
        assert_eq!(written, "1 AUTHENTICATE LOGIN\r\ndXNlcg==\r\ncGFzcw==\r\n");
    }

    #[tokio::test]
    async fn login_mechanism_with_literal_plus() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=LOGIN LITERAL+",
            b"1 OK [CAPABILITY IMAP4rev1] ok\r\n",
        );
        authenticate(&mut conn, "user", "pass").await.unwrap();
        assert_eq!(
            conn.into_inner().written_str(),
            "1 AUTHENTICATE LOGIN {8+}\r\ndXNlcg== {8+}\r\ncGFzcw==\r\n"
        );
    }

    #[tokio::test]
    async fn login_mechanism_with_initial_response() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=LOGIN SASL-IR LITERAL+",
            b"1 OK [CAPABILITY IMAP4rev1] ok\r\n",
        );
        authenticate(&mut conn, "user", "pass").await.unwrap();
        assert_eq!(
            conn.into_inner().written_str(),
            "1 AUTHENTICATE LOGIN dXNlcg== {8+}\r\ncGFzcw==\r\n"
        );
    }

    #[tokio::test]
    async fn login_mechanism_with_initial_response_waits_for_prompt() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=LOGIN SASL-IR",
            b"+ UGFzc3dvcmQ6\r\n1 OK [CAPABILITY IMAP4rev1] ok\r\n",
        );
        authenticate(&mut conn, "user", "pass").await.unwrap();
        assert_eq!(
            conn.into_inner().written_str(),
            "1 AUTHENTICATE LOGIN dXNlcg==\r\ncGFzcw==\r\n"
        );
    }

    #[tokio::test]
    async fn rejected_login_mechanism_falls_back_to_login_command() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=LOGIN",
            b"+ VXNlcm5hbWU6\r\n+ UGFzc3dvcmQ6\r\n\
              1 NO [AUTHENTICATIONFAILED] nope\r\n\
              2 OK [CAPABILITY IMAP4rev1] ok\r\n",
        );
        authenticate(&mut conn, "user", "pass").await.unwrap();
        let written = conn.into_inner().written_str();
        assert!(!written.contains("PLAIN"));
        assert_eq!(
            written,
            "1 AUTHENTICATE LOGIN\r\ndXNlcg==\r\ncGFzcw==\r\n2 LOGIN \"user\" \"pass\"\r\n"
        );
    }

    #[tokio::test]
    async fn falls_back_in_order_to_login_command() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=PLAIN AUTH=LOGIN",
            b"1 NO [AUTHENTICATIONFAILED] nope\r\n\
              2 NO [AUTHENTICATIONFAILED] nope\r\n\
              3 OK [CAPABILITY IMAP4rev1] ok\r\n",
        );
        authenticate(&mut conn, "user", "pass").await.unwrap();
        assert_eq!(
            conn.into_inner().written_str(),
            "1 AUTHENTICATE PLAIN\r\n2 AUTHENTICATE LOGIN\r\n3 LOGIN \"user\" \"pass\"\r\n"
        );
    }

    #[tokio::test]
    async fn all_rejected_is_authentication_error() {
        let mut conn = connection(
            "IMAP4rev1 AUTH=PLAIN SASL-IR",
            b"1 NO nope\r\n2 NO [AUTHENTICATIONFAILED] invalid\r\n",
        );
        match authenticate(&mut conn, "user", "pass").await {
            Err(ImapError::Authentication(reason)) => {
                assert_eq!(reason, "2 NO [AUTHENTICATIONFAILED] invalid")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn transport_failure_stops_negotiation() {
        let mut conn = connection("IMAP4rev1 AUTH=PLAIN AUTH=LOGIN SASL-IR", b"");
        let err = authenticate(&mut conn, "user", "pass").await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            conn.into_inner().written_str(),
            "1 AUTHENTICATE PLAIN AHVzZXIAcGFzcw==\r\n"
        );
    }
}
