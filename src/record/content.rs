// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-type content canonicalization.
//!
//! Every function here is pure and idempotent: applying it to its own output
//! returns the same string. Both the repository side and the provider side of a
//! diff pass through [`canonicalize`], so equal records compare equal no matter
//! how they were authored or how the provider renders them.

use crate::constants::HOSTNAME_CONTENT_TYPES;

/// Canonicalize `content` for a record of type `rtype`.
///
/// - `CNAME`, `MX`, `NS`, `SRV`, `PTR` (and `ALIAS`): trailing dot enforced
/// - `TXT`: zone-file fragment extracted, then wrapped in exactly one pair of quotes
/// - `A`: octets re-rendered without leading zeros
/// - anything else: unchanged
#[must_use]
pub fn canonicalize(rtype: &str, content: &str) -> String {
    let rtype = rtype.to_ascii_uppercase();
    match rtype.as_str() {
        "TXT" => canonical_txt(content),
        "A" => canonical_ipv4(content).unwrap_or_else(|| content.to_string()),
        "ALIAS" => ensure_trailing_dot(content),
        t if HOSTNAME_CONTENT_TYPES.contains(&t) => ensure_trailing_dot(content),
        _ => content.to_string(),
    }
}

/// Append a trailing dot unless one is already present.
#[must_use]
pub fn ensure_trailing_dot(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.ends_with('.') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

/// Validate a dotted-quad IPv4 address and strip leading zeros from each octet.
///
/// Accepts exactly four octets of 1-3 ASCII digits each, every octet within 0-255.
/// `"010.001.002.003"` becomes `"10.1.2.3"`. Returns `None` for anything else.
#[must_use]
pub fn canonical_ipv4(content: &str) -> Option<String> {
    let octets: Vec<&str> = content.trim().split('.').collect();
    if octets.len() != 4 {
        return None;
    }

    let mut rendered = Vec::with_capacity(4);
    for octet in octets {
        if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u8 = octet.parse().ok()?;
        rendered.push(value.to_string());
    }

    Some(rendered.join("."))
}

/// Canonicalize TXT content.
///
/// A value pasted from a zone file (`name 300 IN TXT "v=spf1 -all"`) is reduced to
/// its value part. Surrounding quotes are stripped, then exactly one pair is added.
#[must_use]
pub fn canonical_txt(content: &str) -> String {
    let value = extract_zone_file_txt(content).unwrap_or(content).trim();
    let inner = strip_quotes(value);
    format!("\"{inner}\"")
}

/// Extract `<value>` from a `<name> [<ttl>] IN TXT <value>` fragment.
fn extract_zone_file_txt(content: &str) -> Option<&str> {
    let lower = content.to_ascii_lowercase();
    let marker = " in txt ";
    let pos = lower.find(marker)?;

    // The prefix must be an owner name and an optional TTL, never quoted text.
    let prefix = &content[..pos];
    let tokens: Vec<&str> = prefix.split_whitespace().collect();
    let owner_and_ttl = match tokens.as_slice() {
        [_owner] => true,
        [_owner, ttl] => ttl.bytes().all(|b| b.is_ascii_digit()),
        _ => false,
    };
    if !owner_and_ttl || prefix.contains('"') {
        return None;
    }

    let value = content[pos + marker.len()..].trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod content_tests;
