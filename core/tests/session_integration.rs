/*
 * session_integration.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration test for the IMAP session. Runs a complete mailbox workflow
 * (list, create, append, select, search, fetch, store, expunge, rename,
 * delete, logout) against a scripted server on a loopback TCP socket.
 *
 * Run with:
 *   cargo test -p imapline_core --test session_integration -- --nocapture
 */

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use imapline_core::protocol::imap::StatusItem;
use imapline_core::{ImapError, Session, SessionState, StateError};

const HEADER: &str = "Date: Mon, 7 Feb 1994 21:52:25 -0800\r\nFrom: Fred Foobar <foobar@example.com>\r\n\r\n";

/// Literal size from a line ending in `{N}` or `{N+}`.
fn literal_len(line: &str) -> Option<(usize, bool)> {
    let inner = line.strip_suffix('}')?;
    let open = inner.rfind('{')?;
    let size = &inner[open + 1..];
    match size.strip_suffix('+') {
        Some(n) => Some((n.parse().ok()?, true)),
        None => Some((size.parse().ok()?, false)),
    }
}

/// Scripted IMAP server without LITERAL+ and with AUTH=LOGIN only. Returns every command
/// line it received.
async fn serve(stream: TcpStream) -> Vec<String> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut received = Vec::new();
    writer
        .write_all(b"* OK [CAPABILITY IMAP4rev1 AUTH=LOGIN IDLE] scripted server ready\r\n")
        .await
        .unwrap();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap() == 0 {
            break;
        }
        let line = line.trim_end().to_string();
        received.push(line.clone());
        let (tag, rest) = line.split_once(' ').unwrap();
        let verb = rest.split(' ').next().unwrap().to_ascii_uppercase();

        if let Some((len, non_sync)) = literal_len(&line) {
            assert!(!non_sync, "server did not offer LITERAL+");
            writer.write_all(b"+ Ready for literal data\r\n").await.unwrap();
            let mut literal = vec![0u8; len + 2];
            reader.read_exact(&mut literal).await.unwrap();
            assert!(literal.ends_with(b"\r\n"));
        }

        let reply = match verb.as_str() {
            "AUTHENTICATE" => {
                let mut user = String::new();
                writer.write_all(b"+ VXNlcm5hbWU6\r\n").await.unwrap();
                reader.read_line(&mut user).await.unwrap();
                assert_eq!(user, "ZnJlZA==\r\n");
                let mut pass = String::new();
                writer.write_all(b"+ UGFzc3dvcmQ6\r\n").await.unwrap();
                reader.read_line(&mut pass).await.unwrap();
                assert_eq!(pass, "c2VjcmV0\r\n");
                format!("{} OK [CAPABILITY IMAP4rev1 IDLE UIDPLUS] Logged in\r\n", tag)
            }
            "NOOP" => format!("* 0 RECENT\r\n{} OK NOOP completed\r\n", tag),
            "LIST" => format!(
                "* LIST (\\HasChildren) \".\" INBOX\r\n\
                 * LIST (\\HasNoChildren) \".\" \"INBOX.Sent\"\r\n\
                 {} OK LIST completed\r\n",
                tag
            ),
            "STATUS" => format!("* STATUS \"INBOX.test\" (MESSAGES 0)\r\n{} OK STATUS completed\r\n", tag),
            "APPEND" => format!("* 1 EXISTS\r\n{} OK [APPENDUID 1 42] APPEND completed\r\n", tag),
            "SELECT" => format!(
                "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
                 * OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n\
                 * 1 EXISTS\r\n\
                 * 1 RECENT\r\n\
                 * OK [UIDVALIDITY 3857529045] UIDs valid\r\n\
                 * OK [UIDNEXT 43] Predicted next UID\r\n\
                 {} OK [READ-WRITE] SELECT completed\r\n",
                tag
            ),
            "SEARCH" => format!("* SEARCH 1\r\n{} OK SEARCH completed\r\n", tag),
            "FETCH" => format!(
                "* 1 FETCH (FLAGS (\\Seen) BODY[HEADER.FIELDS (DATE FROM)] {{{}}}\r\n{})\r\n\
                 {} OK FETCH completed\r\n",
                HEADER.len(),
                HEADER,
                tag
            ),
            "COPY" => format!("{} OK [COPYUID 3857529045 42 7] COPY completed\r\n", tag),
            "STORE" => format!("* 1 FETCH (FLAGS (\\Seen \\Deleted))\r\n{} OK STORE completed\r\n", tag),
            "EXPUNGE" => format!("* 1 EXPUNGE\r\n* 0 EXISTS\r\n{} OK EXPUNGE completed\r\n", tag),
            "LOGOUT" => {
                writer
                    .write_all(format!("* BYE logging out\r\n{} OK LOGOUT completed\r\n", tag).as_bytes())
                    .await
                    .unwrap();
                break;
            }
            _ => format!("{} OK {} completed\r\n", tag, verb),
        };
        writer.write_all(reply.as_bytes()).await.unwrap();
    }
    received
}

#[tokio::test]
async fn full_mailbox_workflow() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream).await
    });

    let mut session = Session::open("fred", "secret", "127.0.0.1", port).await.unwrap();
    assert!(session.capabilities().has("UIDPLUS"));
    assert!(!session.capabilities().has("AUTH"));

    session.noop().await.unwrap();

    let mailboxes = session.list("", "*", false).await.unwrap();
    let names: Vec<&str> = mailboxes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["INBOX", "INBOX.Sent"]);
    assert_eq!(mailboxes[0].delimiter, Some('.'));

    session.create("INBOX.test").await.unwrap();
    session.subscribe("INBOX.test").await.unwrap();
    session.unsubscribe("INBOX.test").await.unwrap();

    let status = session.status("INBOX.test", &[StatusItem::Messages]).await.unwrap();
    assert_eq!(status.get(&StatusItem::Messages), Some(&0));

    let message = b"From: Fred Foobar <foobar@example.com>\r\nSubject: afternoon meeting\r\n\r\nHello Joe\r\n";
    let uid = session.append("INBOX.test", message, "\\Seen").await.unwrap();
    assert_eq!(uid, Some(42));

    assert!(matches!(
        session.fetch("1", "(FLAGS)", false).await,
        Err(ImapError::State(StateError::NoMailboxSelected))
    ));

    let selected = session.select("INBOX.test", false).await.unwrap();
    assert_eq!(selected.exists, 1);
    assert_eq!(selected.uid_next, Some(43));
    assert!(!selected.read_only);
    assert_eq!(session.selected_mailbox(), Some("INBOX.test"));

    assert_eq!(session.search("SINCE 1-Feb-1994", false).await.unwrap(), vec![1]);

    let fetched = session
        .fetch("1", "(FLAGS BODY[HEADER.FIELDS (DATE FROM)])", false)
        .await
        .unwrap();
    assert!(fetched.text().contains("From: Fred Foobar"));
    assert!(fetched.text().ends_with(")\r\n"));

    let copied = session.copy("1", "INBOX", false).await.unwrap();
    assert_eq!(copied.code.as_deref(), Some("COPYUID 3857529045 42 7"));

    let flags = session.store("1:*", "+FLAGS", "\\Deleted", false).await.unwrap();
    assert!(flags[&1].contains("\\Deleted"));

    assert_eq!(session.expunge().await.unwrap(), vec![1]);
    session.check().await.unwrap();

    assert!(matches!(
        session.rename("INBOX.test", "INBOX.test2").await,
        Err(ImapError::State(StateError::MailboxSelected))
    ));
    session.close().await.unwrap();
    assert_eq!(session.state(), &SessionState::Authenticated);
    session.rename("INBOX.test", "INBOX.test2").await.unwrap();
    session.delete("INBOX.test2").await.unwrap();
    session.logout().await.unwrap();

    let received = server.await.unwrap();
    // one tag per command, counting up from 1; continuation lines carry none
    let tagged: Vec<&String> = received
        .iter()
        .filter(|l| l.split(' ').next().is_some_and(|t| t.parse::<u32>().is_ok()))
        .collect();
    for (i, line) in tagged.iter().enumerate() {
        assert!(line.starts_with(&format!("{} ", i + 1)), "line {:?}", line);
    }
    assert_eq!(tagged[0].as_str(), "1 AUTHENTICATE LOGIN");
    assert!(received.contains(&"7 STATUS \"INBOX.test\" (MESSAGES)".to_string()));
    assert!(received.contains(&format!("8 APPEND \"INBOX.test\" (\\Seen) {{{}}}", message.len())));
    assert!(received.contains(&"10 SEARCH CHARSET \"UTF-8\" SINCE 1-Feb-1994".to_string()));
    assert!(received.contains(&"13 STORE 1:* +FLAGS (\\Deleted)".to_string()));
    assert_eq!(tagged.last().map(|l| l.as_str()), Some("19 LOGOUT"));
}

#[tokio::test]
async fn rejected_login_is_authentication_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        writer.write_all(b"* OK [CAPABILITY IMAP4rev1] ready\r\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        writer
            .write_all(b"1 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .await
            .unwrap();
    });
    match Session::open("fred", "wrong", "127.0.0.1", port).await {
        Err(ImapError::Authentication(reason)) => assert!(reason.contains("AUTHENTICATIONFAILED")),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("login should fail"),
    }
}
