/*
 * net.rs
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

//! Transport for the IMAP engine: TcpStream, optionally wrapped with rustls.
//!
//! Implicit TLS handshakes immediately on connect (IMAPS, 993); STARTTLS upgrades a plain
//! stream after the server accepted the command. Only the connect phase is bounded by a
//! timeout; reads afterwards wait as long as the server does.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::RootCertStore;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::config::Security;

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

static DEFAULT_CONNECTOR: std::sync::OnceLock<TlsConnector> = std::sync::OnceLock::new();

fn default_connector() -> &'static TlsConnector {
    DEFAULT_CONNECTOR.get_or_init(|| {
        let config = ClientConfig::builder()
            .with_root_certificates(build_root_store())
            .with_no_client_auth();
        TlsConnector::from(Arc::new(config))
    })
}

fn server_name(host: &str) -> io::Result<ServerName<'static>> {
    ServerName::try_from(host)
        .map(|name| name.to_owned())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))
}

async fn tls_handshake(host: &str, tcp: TcpStream) -> io::Result<TlsStream> {
    let tls = default_connector()
        .connect(server_name(host)?, tcp)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
    Ok(TlsStream { inner: tls })
}

/// Run a connect-phase future under `timeout`. Expiry maps to `ErrorKind::TimedOut`.
async fn within<T>(
    timeout: Duration,
    what: &str,
    fut: impl std::future::Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(r) => r,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{} timed out after {}s", what, timeout.as_secs()),
        )),
    }
}

/// Async TLS stream (tokio-rustls client over TcpStream).
pub struct TlsStream {
    inner: TokioTlsStream<TcpStream>,
}

impl AsyncRead for TlsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TlsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Plain TCP stream (port 143). Use `upgrade_to_tls` once the server accepted STARTTLS.
pub struct PlainStream {
    inner: TcpStream,
}

impl PlainStream {
    /// Upgrade this plain stream to TLS over the same TCP connection.
    pub async fn upgrade_to_tls(self, host: &str, timeout: Duration) -> io::Result<TlsStream> {
        within(timeout, "TLS handshake", tls_handshake(host, self.inner)).await
    }
}

impl AsyncRead for PlainStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for PlainStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// The stream a network `Session` runs on: plain or TLS.
pub enum ImapStream {
    Plain(PlainStream),
    Tls(TlsStream),
}

impl ImapStream {
    pub fn is_tls(&self) -> bool {
        matches!(self, ImapStream::Tls(_))
    }

    /// STARTTLS upgrade. Already-TLS streams are returned unchanged.
    pub async fn upgrade_to_tls(self, host: &str, timeout: Duration) -> io::Result<ImapStream> {
        match self {
            ImapStream::Plain(plain) => Ok(ImapStream::Tls(plain.upgrade_to_tls(host, timeout).await?)),
            tls @ ImapStream::Tls(_) => Ok(tls),
        }
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ImapStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            ImapStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ImapStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            ImapStream::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ImapStream::Plain(s) => Pin::new(s).poll_flush(cx),
            ImapStream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ImapStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            ImapStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Connect without TLS (port 143, or STARTTLS later).
pub async fn connect_plain(host: &str, port: u16, timeout: Duration) -> io::Result<ImapStream> {
    let addr = format!("{}:{}", host, port);
    debug!(%addr, "connecting");
    let tcp = within(timeout, "connect", TcpStream::connect(&addr)).await?;
    Ok(ImapStream::Plain(PlainStream { inner: tcp }))
}

/// Connect with implicit TLS (IMAPS, port 993). `timeout` covers TCP connect and handshake.
pub async fn connect_implicit_tls(host: &str, port: u16, timeout: Duration) -> io::Result<ImapStream> {
    let addr = format!("{}:{}", host, port);
    debug!(%addr, "connecting (implicit TLS)");
    let tls = within(timeout, "TLS connect", async {
        let tcp = TcpStream::connect(&addr).await?;
        tls_handshake(host, tcp).await
    })
    .await?;
    Ok(ImapStream::Tls(tls))
}

/// Connect for `security`: implicit TLS for `Tls`, plain TCP otherwise (STARTTLS happens later).
pub async fn connect(host: &str, port: u16, security: Security, timeout: Duration) -> io::Result<ImapStream> {
    match security {
        Security::Tls => connect_implicit_tls(host, port, timeout).await,
        Security::Plain | Security::StartTls => connect_plain(host, port, timeout).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let r = connect_plain("127.0.0.1", port, Duration::from_secs(5)).await;
        assert!(r.is_err());
    }

    #[tokio::test]
    async fn plain_connect_reaches_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });
        let stream = connect_plain("127.0.0.1", port, Duration::from_secs(5)).await.unwrap();
        assert!(!stream.is_tls());
        accept.await.unwrap().unwrap();
    }

    #[test]
    fn invalid_host_name_rejected() {
        assert!(server_name("not a host").is_err());
    }
}
