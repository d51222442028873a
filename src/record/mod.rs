// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Canonical DNS record model.
//!
//! Records exist in three shapes while a reconciliation runs:
//!
//! - [`RecordDefinition`] - one record as authored in a repository file
//! - [`RecordSignature`] - the provider-independent comparison unit used by the diff
//! - [`RRSet`] / [`RRSetOperation`] - the provider's storage and update unit
//!
//! # Example
//!
//! ```rust
//! use zonesync::record::{RecordDefinition, RecordType, RecordValue};
//!
//! let def = RecordDefinition {
//!     rtype: RecordType::A,
//!     value: RecordValue::Text("10.0.0.010".to_string()),
//! };
//!
//! let signature = def.signature("www");
//! assert_eq!(signature.key(), "www:A:10.0.0.10");
//! ```

pub mod content;
pub mod name;
pub mod soa;

use crate::constants::{MAX_RECORDS_PER_FILE, MIN_RECORDS_PER_FILE};
use crate::errors::{RecordError, RecordFileError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record types a repository file may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    MX,
    TXT,
}

impl RecordType {
    /// Wire name of the type (e.g. `"AAAA"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::MX => "MX",
            Self::TXT => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    /// Parses a type name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::AAAA),
            "CNAME" => Ok(Self::CNAME),
            "MX" => Ok(Self::MX),
            "TXT" => Ok(Self::TXT),
            other => Err(other.to_string()),
        }
    }
}

/// Value of an authored record: plain content or a mail exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    /// Plain string content (address, hostname, text)
    Text(String),
    /// Mail exchange value
    Mx {
        /// Preference, lower is preferred
        priority: u16,
        /// Mail server hostname
        exchange: String,
    },
}

/// One record as authored in a repository file, after validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordDefinition {
    /// Record type, upper-cased on read
    pub rtype: RecordType,
    /// Record value
    pub value: RecordValue,
}

/// Raw shape of a definition before validation.
#[derive(Clone, Debug, Deserialize)]
struct RawRecordDefinition {
    #[serde(rename = "type")]
    rtype: String,
    value: serde_json::Value,
}

impl RecordDefinition {
    /// Validate one raw JSON definition found in the file for `subdomain`.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] when the type is unsupported, an A value is not a
    /// dotted-quad IPv4 address, an MX value lacks `priority`/`exchange`, or a
    /// non-MX record carries an object value.
    pub fn from_json(subdomain: &str, raw: &serde_json::Value) -> Result<Self, RecordError> {
        let raw: RawRecordDefinition =
            serde_json::from_value(raw.clone()).map_err(|e| RecordError::MalformedValue {
                subdomain: subdomain.to_string(),
                rtype: raw
                    .get("type")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("?")
                    .to_string(),
                reason: e.to_string(),
            })?;

        let rtype = RecordType::from_str(&raw.rtype).map_err(|rtype| {
            RecordError::UnsupportedType {
                subdomain: subdomain.to_string(),
                rtype,
            }
        })?;

        let malformed = |reason: &str| RecordError::MalformedValue {
            subdomain: subdomain.to_string(),
            rtype: rtype.to_string(),
            reason: reason.to_string(),
        };

        let value = match (rtype, &raw.value) {
            (RecordType::MX, serde_json::Value::Object(map)) => {
                let priority = map
                    .get("priority")
                    .and_then(serde_json::Value::as_u64)
                    .ok_or_else(|| malformed("missing or non-numeric priority"))?;
                let priority = u16::try_from(priority)
                    .map_err(|_| malformed("priority outside 0-65535"))?;
                let exchange = map
                    .get("exchange")
                    .and_then(serde_json::Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| malformed("missing exchange"))?;
                RecordValue::Mx {
                    priority,
                    exchange: exchange.trim().to_string(),
                }
            }
            (RecordType::MX, _) => {
                return Err(malformed("MX value must be an object with priority and exchange"))
            }
            (_, serde_json::Value::Object(_)) => {
                return Err(malformed("object values are only allowed for MX records"))
            }
            (RecordType::A, serde_json::Value::String(s)) => {
                if content::canonical_ipv4(s).is_none() {
                    return Err(RecordError::InvalidIpv4 {
                        subdomain: subdomain.to_string(),
                        value: s.clone(),
                    });
                }
                RecordValue::Text(s.trim().to_string())
            }
            (_, serde_json::Value::String(s)) => RecordValue::Text(s.clone()),
            (_, _) => return Err(malformed("value must be a string")),
        };

        Ok(Self { rtype, value })
    }

    /// Build the canonical signature of this definition at `subdomain`.
    #[must_use]
    pub fn signature(&self, subdomain: &str) -> RecordSignature {
        let rtype = self.rtype.as_str();
        match &self.value {
            RecordValue::Text(text) => RecordSignature {
                subdomain: subdomain.to_string(),
                rtype: rtype.to_string(),
                content: content::canonicalize(rtype, text),
                priority: None,
            },
            RecordValue::Mx { priority, exchange } => RecordSignature {
                subdomain: subdomain.to_string(),
                rtype: rtype.to_string(),
                content: content::canonicalize(rtype, exchange),
                priority: Some(*priority),
            },
        }
    }
}

/// Top-level shape of a repository record file: `{ owner, record: [...] }`.
#[derive(Clone, Debug, Deserialize)]
pub struct RecordFile {
    /// Owner metadata; carried through for logging only
    #[serde(default)]
    pub owner: serde_json::Value,
    /// Raw definitions, validated one by one
    pub record: Vec<serde_json::Value>,
}

impl RecordFile {
    /// Parse a record file body.
    ///
    /// # Errors
    ///
    /// Returns [`RecordFileError::Malformed`] if the JSON is invalid or the `record`
    /// array is missing, and [`RecordFileError::RecordCount`] if it holds too few or
    /// too many definitions.
    pub fn parse(file: &str, body: &str) -> Result<Self, RecordFileError> {
        let parsed: Self = serde_json::from_str(body).map_err(|e| RecordFileError::Malformed {
            file: file.to_string(),
            reason: e.to_string(),
        })?;

        let count = parsed.record.len();
        if !(MIN_RECORDS_PER_FILE..=MAX_RECORDS_PER_FILE).contains(&count) {
            return Err(RecordFileError::RecordCount {
                file: file.to_string(),
                count,
                min: MIN_RECORDS_PER_FILE,
                max: MAX_RECORDS_PER_FILE,
            });
        }

        Ok(parsed)
    }
}

/// Canonical comparison unit for one DNS record.
///
/// Two signatures are equal iff every field matches; `content` is always the
/// canonical form, never the raw authored string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordSignature {
    /// Zone-relative name, `@` for the apex
    pub subdomain: String,
    /// Upper-case record type
    pub rtype: String,
    /// Canonical content
    pub content: String,
    /// MX preference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

impl RecordSignature {
    /// Diff key: `subdomain:type:content[:priority]`.
    #[must_use]
    pub fn key(&self) -> String {
        match self.priority {
            Some(priority) => format!(
                "{}:{}:{}:{}",
                self.subdomain, self.rtype, self.content, priority
            ),
            None => format!("{}:{}:{}", self.subdomain, self.rtype, self.content),
        }
    }

    /// Identity of the RRSet this record belongs to.
    #[must_use]
    pub fn rrset_key(&self) -> RRSetKey {
        RRSetKey::new(&self.subdomain, &self.rtype)
    }

    /// Record payload as sent to a provider.
    #[must_use]
    pub fn to_rrset_record(&self) -> RRSetRecord {
        RRSetRecord {
            content: self.content.clone(),
            disabled: false,
            priority: self.priority,
        }
    }
}

impl fmt::Display for RecordSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Identity of a provider RRSet in zone-relative terms: `(subdomain, type)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RRSetKey {
    /// Zone-relative name, `@` for the apex
    pub subdomain: String,
    /// Upper-case record type
    pub rtype: String,
}

impl RRSetKey {
    #[must_use]
    pub fn new(subdomain: &str, rtype: &str) -> Self {
        Self {
            subdomain: subdomain.to_string(),
            rtype: rtype.to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for RRSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subdomain, self.rtype)
    }
}

/// One record inside an RRSet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RRSetRecord {
    /// Record content; for MX this is the exchange only
    pub content: String,
    /// Whether the provider serves the record
    #[serde(default)]
    pub disabled: bool,
    /// MX preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

/// Provider-side grouping of all records sharing a `(name, type)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RRSet {
    /// Fully qualified, lower-case name with a trailing dot
    pub name: String,
    /// Upper-case record type
    #[serde(rename = "type")]
    pub rtype: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// Records in the set
    pub records: Vec<RRSetRecord>,
}

/// How an [`RRSetOperation`] changes the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    /// Remove the whole RRSet
    Delete,
    /// Replace the whole RRSet with the given records
    Replace,
}

impl ChangeType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Replace => "REPLACE",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider-level operation in a change batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RRSetOperation {
    /// Fully qualified, lower-case name with a trailing dot
    pub name: String,
    /// Upper-case record type (may be `ALIAS` or `SOA`)
    #[serde(rename = "type")]
    pub rtype: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// Replace or delete
    pub changetype: ChangeType,
    /// Complete record list for REPLACE; empty for DELETE
    pub records: Vec<RRSetRecord>,
}

impl RRSetOperation {
    /// A DELETE for the RRSet `(name, rtype)`.
    #[must_use]
    pub fn delete(name: &str, rtype: &str) -> Self {
        Self {
            name: name.to_string(),
            rtype: rtype.to_string(),
            ttl: 0,
            changetype: ChangeType::Delete,
            records: Vec::new(),
        }
    }

    /// A REPLACE for the RRSet `(name, rtype)` with the full record list.
    #[must_use]
    pub fn replace(name: &str, rtype: &str, ttl: u32, records: Vec<RRSetRecord>) -> Self {
        Self {
            name: name.to_string(),
            rtype: rtype.to_string(),
            ttl,
            changetype: ChangeType::Replace,
            records,
        }
    }
}

impl fmt::Display for RRSetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.changetype, self.name, self.rtype)?;
        if self.changetype == ChangeType::Replace {
            let contents: Vec<String> = self
                .records
                .iter()
                .map(|r| match r.priority {
                    Some(p) => format!("{p} {}", r.content),
                    None => r.content.clone(),
                })
                .collect();
            write!(f, " ttl={} [{}]", self.ttl, contents.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
