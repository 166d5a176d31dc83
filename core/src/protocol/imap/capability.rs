/*
 * capability.rs
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

//! Server capabilities, from "* CAPABILITY IMAP4rev1 LITERAL+ AUTH=PLAIN ..." or from a
//! "[CAPABILITY ...]" response code. Names are case-sensitive atoms; `AUTH=PLAIN` style atoms
//! are grouped under `AUTH`.

use std::collections::{BTreeMap, BTreeSet};

pub const LITERAL_PLUS: &str = "LITERAL+";
pub const SASL_IR: &str = "SASL-IR";
pub const STARTTLS: &str = "STARTTLS";
pub const AUTH: &str = "AUTH";

/// One capability entry: a plain flag, or a group of keys (`AUTH` -> {PLAIN, LOGIN}).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Flag,
    Keyed(BTreeSet<String>),
}

/// The set the server advertised last. Replaced wholesale on every negotiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    entries: BTreeMap<String, Capability>,
}

impl Capabilities {
    pub fn parse(text: &str) -> Self {
        let mut entries: BTreeMap<String, Capability> = BTreeMap::new();
        for atom in text.split(' ') {
            let atom = atom.trim();
            if atom.is_empty() {
                continue;
            }
            match atom.split_once('=') {
                None => {
                    // a group stays a group
                    entries.entry(atom.to_string()).or_insert(Capability::Flag);
                }
                Some((group, key)) => {
                    let entry = entries
                        .entry(group.to_string())
                        .or_insert_with(|| Capability::Keyed(BTreeSet::new()));
                    if let Capability::Flag = entry {
                        *entry = Capability::Keyed(BTreeSet::new());
                    }
                    if let Capability::Keyed(keys) = entry {
                        keys.insert(key.to_string());
                    }
                }
            }
        }
        Self { entries }
    }

    /// Parse `text` and drop everything known before.
    pub fn replace_with(&mut self, text: &str) {
        *self = Self::parse(text);
    }

    /// From a response code such as `CAPABILITY IMAP4rev1 SASL-IR`. None if the code is something else.
    pub fn from_response_code(code: &str) -> Option<Self> {
        code.strip_prefix("CAPABILITY ").map(Self::parse)
    }

    /// From the first `* CAPABILITY ...` line in untagged response data.
    pub fn from_data(data: &str) -> Option<Self> {
        data.lines()
            .find_map(|line| line.strip_prefix("* CAPABILITY "))
            .map(Self::parse)
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn has_key(&self, group: &str, key: &str) -> bool {
        matches!(self.entries.get(group), Some(Capability::Keyed(keys)) if keys.contains(key))
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn literal_plus(&self) -> bool {
        self.has(LITERAL_PLUS)
    }

    pub fn sasl_ir(&self) -> bool {
        self.has(SASL_IR)
    }

    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.has_key(AUTH, mechanism)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(keys: &[&str]) -> Capability {
        Capability::Keyed(keys.iter().map(|k| k.to_string()).collect())
    }

    #[test]
    fn parses_flags_and_groups() {
        let caps = Capabilities::parse("IMAP4rev1 LITERAL+ AUTH=PLAIN AUTH=LOGIN SASL-IR");
        assert_eq!(caps.get("IMAP4rev1"), Some(&Capability::Flag));
        assert_eq!(caps.get("LITERAL+"), Some(&Capability::Flag));
        assert_eq!(caps.get("SASL-IR"), Some(&Capability::Flag));
        assert_eq!(caps.get("AUTH"), Some(&keyed(&["PLAIN", "LOGIN"])));
        assert_eq!(caps.names().count(), 4);
        assert!(caps.literal_plus());
        assert!(caps.sasl_ir());
        assert!(caps.supports_auth("PLAIN"));
        assert!(caps.supports_auth("LOGIN"));
        assert!(!caps.supports_auth("CRAM-MD5"));
    }

    #[test]
    fn names_are_case_sensitive() {
        let caps = Capabilities::parse("literal+");
        assert!(!caps.literal_plus());
    }

    #[test]
    fn flag_is_converted_to_group() {
        let caps = Capabilities::parse("AUTH AUTH=PLAIN");
        assert_eq!(caps.get("AUTH"), Some(&keyed(&["PLAIN"])));
        let caps = Capabilities::parse("AUTH=PLAIN AUTH");
        assert_eq!(caps.get("AUTH"), Some(&keyed(&["PLAIN"])));
    }

    #[test]
    fn replace_drops_previous_entries() {
        let mut caps = Capabilities::parse("IMAP4rev1 AUTH=PLAIN LOGINDISABLED");
        caps.replace_with("IMAP4rev1 IDLE");
        assert!(!caps.has("AUTH"));
        assert!(!caps.has("LOGINDISABLED"));
        assert!(caps.has("IDLE"));
    }

    #[test]
    fn trims_crlf_and_skips_empty_atoms() {
        let caps = Capabilities::parse("IMAP4rev1  IDLE\r\n");
        assert_eq!(caps.names().collect::<Vec<_>>(), vec!["IDLE", "IMAP4rev1"]);
    }

    #[test]
    fn from_code_and_data() {
        let caps = Capabilities::from_response_code("CAPABILITY IMAP4rev1 SASL-IR").unwrap();
        assert!(caps.sasl_ir());
        assert!(Capabilities::from_response_code("READ-WRITE").is_none());
        let caps = Capabilities::from_data("* OK hi\r\n* CAPABILITY IMAP4rev1 AUTH=LOGIN\r\n").unwrap();
        assert!(caps.supports_auth("LOGIN"));
        assert!(Capabilities::from_data("* OK hi\r\n").is_none());
    }
}
