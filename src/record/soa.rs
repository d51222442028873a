// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! SOA record content and zone serial bookkeeping.
//!
//! Serials follow the `YYYYMMDDnn` convention. The transition from the stored
//! serial to the next one is a pure function of `(current, today)` so it can be
//! tested without touching the clock.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use zonesync::record::soa::next_serial;
//!
//! let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
//! assert_eq!(next_serial(2026101903, today), 2026101904);
//! assert_eq!(next_serial(2026101807, today), 2026101901);
//! ```

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Parsed content of an SOA record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoaRecord {
    /// Primary nameserver
    pub mname: String,
    /// Administrator mailbox in DNS form
    pub rname: String,
    /// Zone serial
    pub serial: u32,
    /// Secondary refresh interval
    pub refresh: u32,
    /// Secondary retry interval
    pub retry: u32,
    /// Secondary expiry
    pub expire: u32,
    /// Negative caching TTL
    pub minimum: u32,
}

impl SoaRecord {
    /// Copy of this record carrying `serial`.
    #[must_use]
    pub fn with_serial(&self, serial: u32) -> Self {
        Self {
            serial,
            ..self.clone()
        }
    }
}

impl fmt::Display for SoaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire, self.minimum
        )
    }
}

impl FromStr for SoaRecord {
    type Err = String;

    /// Parses `mname rname serial refresh retry expire minimum`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let [mname, rname, serial, refresh, retry, expire, minimum] = fields.as_slice() else {
            return Err(format!(
                "SOA content must have 7 fields, found {}: {s}",
                fields.len()
            ));
        };

        let number = |field: &str, label: &str| -> Result<u32, String> {
            field
                .parse::<u32>()
                .map_err(|e| format!("invalid SOA {label} '{field}': {e}"))
        };

        Ok(Self {
            mname: (*mname).to_string(),
            rname: (*rname).to_string(),
            serial: number(serial, "serial")?,
            refresh: number(refresh, "refresh")?,
            retry: number(retry, "retry")?,
            expire: number(expire, "expire")?,
            minimum: number(minimum, "minimum")?,
        })
    }
}

/// `YYYYMMDD01` for `day`.
#[must_use]
pub fn first_serial_of(day: NaiveDate) -> u32 {
    // Years are bounded well below 4294 for any serial we will ever write.
    let year = u32::try_from(day.year()).unwrap_or(0);
    (year * 10_000 + day.month() * 100 + day.day()) * 100 + 1
}

/// Compute the serial that follows `current` on `today`.
///
/// - `current` already carries today's date prefix: increment the counter.
/// - otherwise: start today's counter at `01`.
///
/// The result is never lower than or equal to `current`: when the stored serial
/// is ahead of `YYYYMMDD01` for today (a clock behind the provider, or a serial not
/// in date form) it is simply incremented.
#[must_use]
pub fn next_serial(current: u32, today: NaiveDate) -> u32 {
    let fresh = first_serial_of(today);
    if current / 100 == fresh / 100 {
        current.saturating_add(1)
    } else if fresh > current {
        fresh
    } else {
        current.saturating_add(1)
    }
}

#[cfg(test)]
#[path = "soa_tests.rs"]
mod soa_tests;
