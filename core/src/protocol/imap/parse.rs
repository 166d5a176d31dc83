/*
 * parse.rs
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

//! Parsers for untagged response data, one per response shape. All are pure functions over
//! the bytes collected in a `Response`; lines they do not recognise are skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::response::{literal_size, split_code};
use crate::mailbox_name_codec;

/// SELECT / EXAMINE result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    pub flags: BTreeSet<String>,
    pub permanent_flags: BTreeSet<String>,
    pub exists: u32,
    pub recent: u32,
    pub unseen: Option<u32>,
    pub uid_validity: Option<u32>,
    pub uid_next: Option<u32>,
    pub highest_modseq: Option<u64>,
    pub read_only: bool,
}

/// One LIST / LSUB entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub attributes: BTreeSet<String>,
    /// Hierarchy delimiter; None for `NIL` (flat namespace).
    pub delimiter: Option<char>,
    /// Decoded (Unicode) name.
    pub name: String,
}

impl Mailbox {
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a.eq_ignore_ascii_case(attribute))
    }

    pub fn is_selectable(&self) -> bool {
        !self.has_attribute("\\Noselect") && !self.has_attribute("\\NonExistent")
    }
}

/// STATUS data items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusItem {
    Messages,
    Recent,
    UidNext,
    UidValidity,
    Unseen,
}

impl StatusItem {
    pub const ALL: [StatusItem; 5] = [
        StatusItem::Messages,
        StatusItem::Recent,
        StatusItem::UidNext,
        StatusItem::UidValidity,
        StatusItem::Unseen,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StatusItem::Messages => "MESSAGES",
            StatusItem::Recent => "RECENT",
            StatusItem::UidNext => "UIDNEXT",
            StatusItem::UidValidity => "UIDVALIDITY",
            StatusItem::Unseen => "UNSEEN",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|item| item.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for StatusItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split response data into logical lines without their CRLF. Literal bytes stay inside
/// the line that announced them.
pub fn logical_lines(data: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while pos < data.len() {
        let Some(nl) = data[pos..].iter().position(|&b| b == b'\n') else {
            break;
        };
        let end = pos + nl + 1;
        match literal_size(&data[pos..end]) {
            Some(n) => {
                pos = usize::try_from(n)
                    .ok()
                    .and_then(|n| end.checked_add(n))
                    .map_or(data.len(), |stop| stop.min(data.len()));
            }
            None => {
                lines.push(strip_crlf(&data[start..end]));
                start = end;
                pos = end;
            }
        }
    }
    if start < data.len() {
        lines.push(strip_crlf(&data[start..]));
    }
    lines
}

fn strip_crlf(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Byte cursor over one logical line.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    /// Consume `prefix` (ASCII case-insensitive) if it is next.
    fn eat(&mut self, prefix: &[u8]) -> bool {
        let end = self.pos + prefix.len();
        match self.buf.get(self.pos..end) {
            Some(next) if next.eq_ignore_ascii_case(prefix) => {
                self.pos = end;
                true
            }
            _ => false,
        }
    }

    /// Run of non-space, non-paren bytes. Brackets may enclose spaces and parens
    /// (`BODY[HEADER.FIELDS (DATE)]`).
    fn atom(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b' ' | b'(' | b')' if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }
        let buf: &'a [u8] = self.buf;
        if self.pos > start {
            Some(&buf[start..self.pos])
        } else {
            None
        }
    }

    fn number<T: FromStr>(&mut self) -> Option<T> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.buf[start..self.pos]).ok()?.parse().ok()
    }

    fn quoted(&mut self) -> Option<Vec<u8>> {
        if !self.eat(b"\"") {
            return None;
        }
        let mut out = Vec::new();
        loop {
            let b = self.peek()?;
            self.pos += 1;
            match b {
                b'"' => return Some(out),
                b'\\' => {
                    out.push(self.peek()?);
                    self.pos += 1;
                }
                _ => out.push(b),
            }
        }
    }

    /// `{N}` CRLF followed by N bytes.
    fn literal(&mut self) -> Option<&'a [u8]> {
        if !self.eat(b"{") {
            return None;
        }
        let len: usize = self.number()?;
        self.eat(b"+");
        if !self.eat(b"}") {
            return None;
        }
        self.eat(b"\r");
        if !self.eat(b"\n") {
            return None;
        }
        let stop = self.pos.checked_add(len)?;
        let buf: &'a [u8] = self.buf;
        let bytes = buf.get(self.pos..stop)?;
        self.pos = stop;
        Some(bytes)
    }

    fn astring(&mut self) -> Option<Vec<u8>> {
        match self.peek()? {
            b'"' => self.quoted(),
            b'{' => self.literal().map(<[u8]>::to_vec),
            _ => self.atom().map(<[u8]>::to_vec),
        }
    }

    /// NIL, or a string.
    fn nstring(&mut self) -> Option<Option<Vec<u8>>> {
        if self.eat(b"NIL") {
            return Some(None);
        }
        self.astring().map(Some)
    }

    /// `(atom atom ...)`
    fn paren_atoms(&mut self) -> Option<BTreeSet<String>> {
        if !self.eat(b"(") {
            return None;
        }
        let mut out = BTreeSet::new();
        loop {
            self.skip_spaces();
            if self.eat(b")") {
                return Some(out);
            }
            let atom = self.atom()?;
            out.insert(String::from_utf8_lossy(atom).into_owned());
        }
    }

    /// Skip one value of any shape: atom, number, string, literal or nested list.
    fn skip_value(&mut self) -> Option<()> {
        match self.peek()? {
            b'(' => {
                self.pos += 1;
                loop {
                    self.skip_spaces();
                    if self.eat(b")") {
                        return Some(());
                    }
                    self.skip_value()?;
                }
            }
            b'"' => self.quoted().map(|_| ()),
            b'{' => self.literal().map(|_| ()),
            _ => self.atom().map(|_| ()),
        }
    }
}

fn flag_list(text: &str) -> Option<BTreeSet<String>> {
    Cursor::new(text.trim().as_bytes()).paren_atoms()
}

/// SELECT / EXAMINE: FLAGS, EXISTS, RECENT and the `* OK [...]` codes. `read_only` comes
/// from the completion code, else from what was asked for.
pub fn parse_select(data: &[u8], completion_code: Option<&str>, requested_read_only: bool) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only: requested_read_only,
        ..MailboxStatus::default()
    };
    for line in logical_lines(data) {
        let line = String::from_utf8_lossy(line);
        let Some(rest) = line.strip_prefix("* ") else {
            continue;
        };
        if let Some(flags) = rest.strip_prefix("FLAGS ") {
            if let Some(flags) = flag_list(flags) {
                status.flags = flags;
            }
        } else if let Some(text) = rest.strip_prefix("OK ") {
            if let (Some(code), _) = split_code(text) {
                let (name, value) = code.split_once(' ').unwrap_or((code.as_str(), ""));
                match name {
                    "PERMANENTFLAGS" => {
                        if let Some(flags) = flag_list(value) {
                            status.permanent_flags = flags;
                        }
                    }
                    "UNSEEN" => status.unseen = value.trim().parse().ok(),
                    "UIDVALIDITY" => status.uid_validity = value.trim().parse().ok(),
                    "UIDNEXT" => status.uid_next = value.trim().parse().ok(),
                    "HIGHESTMODSEQ" => status.highest_modseq = value.trim().parse().ok(),
                    _ => {}
                }
            }
        } else if let Some((n, word)) = rest.split_once(' ') {
            match (n.parse::<u32>(), word.trim()) {
                (Ok(n), "EXISTS") => status.exists = n,
                (Ok(n), "RECENT") => status.recent = n,
                _ => {}
            }
        }
    }
    match completion_code {
        Some("READ-ONLY") => status.read_only = true,
        Some("READ-WRITE") => status.read_only = false,
        _ => {}
    }
    status
}

/// LIST (or LSUB when `subscribed_only`) lines, names decoded, sorted by lowercase name then
/// exact name. No locale collation.
pub fn parse_list(data: &[u8], subscribed_only: bool) -> Vec<Mailbox> {
    let keyword: &[u8] = if subscribed_only { b"* LSUB " } else { b"* LIST " };
    let mut mailboxes: Vec<Mailbox> = logical_lines(data)
        .into_iter()
        .filter_map(|line| {
            let mut c = Cursor::new(line);
            if !c.eat(keyword) {
                return None;
            }
            c.skip_spaces();
            let attributes = c.paren_atoms()?;
            c.skip_spaces();
            let delimiter = c
                .nstring()?
                .and_then(|d| String::from_utf8_lossy(&d).chars().next());
            c.skip_spaces();
            let raw = c.astring()?;
            let name = mailbox_name_codec::decode_lossy(&String::from_utf8_lossy(&raw));
            Some(Mailbox {
                attributes,
                delimiter,
                name,
            })
        })
        .collect();
    mailboxes.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    mailboxes
}

/// `* STATUS mailbox (ITEM n ...)` folded into one map. Unknown items are ignored.
pub fn parse_status(data: &[u8]) -> BTreeMap<StatusItem, u64> {
    let mut out = BTreeMap::new();
    for line in logical_lines(data) {
        let mut c = Cursor::new(line);
        if !c.eat(b"* STATUS ") || c.astring().is_none() {
            continue;
        }
        c.skip_spaces();
        if !c.eat(b"(") {
            continue;
        }
        loop {
            c.skip_spaces();
            if c.eat(b")") {
                break;
            }
            let Some(name) = c.atom() else {
                break;
            };
            c.skip_spaces();
            let Some(value) = c.number::<u64>() else {
                break;
            };
            if let Some(item) = std::str::from_utf8(name).ok().and_then(StatusItem::from_name) {
                out.insert(item, value);
            }
        }
    }
    out
}

/// UID from an `APPENDUID <uidvalidity> <uid>` completion code.
pub fn parse_append_uid(code: Option<&str>) -> Option<u32> {
    let mut words = code?.strip_prefix("APPENDUID ")?.split_whitespace();
    let _uid_validity = words.next()?;
    words.next()?.parse().ok()
}

/// Message numbers of every `* N EXPUNGE`, in arrival order.
pub fn parse_expunge(data: &[u8]) -> Vec<u32> {
    logical_lines(data)
        .into_iter()
        .filter_map(|line| {
            let (n, word) = std::str::from_utf8(line).ok()?.strip_prefix("* ")?.split_once(' ')?;
            (word.trim() == "EXPUNGE").then(|| n.parse().ok()).flatten()
        })
        .collect()
}

/// Numbers from `* SEARCH n1 n2 ...`; empty when the server sent none.
pub fn parse_search(data: &[u8]) -> Vec<u32> {
    logical_lines(data)
        .into_iter()
        .filter_map(|line| {
            let rest = std::str::from_utf8(line).ok()?.strip_prefix("* SEARCH")?;
            (rest.is_empty() || rest.starts_with(' ')).then_some(rest)
        })
        .flat_map(|rest| rest.split_whitespace().filter_map(|n| n.parse().ok()))
        .collect()
}

/// `* N FETCH (... FLAGS (...) ...)` lines: message number to its flags.
pub fn parse_store(data: &[u8]) -> BTreeMap<u32, BTreeSet<String>> {
    let mut out = BTreeMap::new();
    for line in logical_lines(data) {
        let mut c = Cursor::new(line);
        if !c.eat(b"* ") {
            continue;
        }
        let Some(n) = c.number::<u32>() else {
            continue;
        };
        if !c.eat(b" FETCH (") {
            continue;
        }
        loop {
            c.skip_spaces();
            if c.peek().is_none() || c.eat(b")") {
                break;
            }
            let Some(key) = c.atom() else {
                break;
            };
            c.skip_spaces();
            if key.eq_ignore_ascii_case(b"FLAGS") {
                match c.paren_atoms() {
                    Some(flags) => {
                        out.insert(n, flags);
                    }
                    None => break,
                }
            } else if c.skip_value().is_none() {
                break;
            }
        }
    }
    out
}
