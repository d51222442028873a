// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Name handling: subdomains, FQDNs and record file names.

use crate::constants::{APEX, RECORD_FILE_EXTENSION};

/// Normalize a DNS name: lower-case, exactly one trailing dot.
///
/// ```rust
/// use zonesync::record::name::normalize_fqdn;
///
/// assert_eq!(normalize_fqdn("WWW.Example.COM"), "www.example.com.");
/// assert_eq!(normalize_fqdn("www.example.com.."), "www.example.com.");
/// ```
#[must_use]
pub fn normalize_fqdn(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('.');
    format!("{}.", trimmed.to_lowercase())
}

/// Zone name without the trailing dot, lower-cased.
#[must_use]
pub fn bare_zone(zone: &str) -> String {
    zone.trim().trim_matches('.').to_lowercase()
}

/// Build the FQDN of `subdomain` inside `zone`.
///
/// Leading/trailing dots on the subdomain are stripped, the result is lower-cased and
/// carries exactly one trailing dot. `@` or an empty subdomain maps to the apex.
///
/// ```rust
/// use zonesync::record::name::fqdn;
///
/// assert_eq!(fqdn("@", "example.com"), "example.com.");
/// assert_eq!(fqdn(".Blog.", "example.com."), "blog.example.com.");
/// ```
#[must_use]
pub fn fqdn(subdomain: &str, zone: &str) -> String {
    let sub = subdomain.trim().trim_matches('.');
    let zone = bare_zone(zone);
    if sub.is_empty() || sub == APEX {
        normalize_fqdn(&zone)
    } else {
        normalize_fqdn(&format!("{sub}.{zone}"))
    }
}

/// Convert a provider FQDN back into a zone-relative subdomain.
///
/// Returns `None` for names outside the zone.
#[must_use]
pub fn subdomain_of(name: &str, zone: &str) -> Option<String> {
    let name = normalize_fqdn(name);
    let apex = normalize_fqdn(&bare_zone(zone));
    if name == apex {
        return Some(APEX.to_string());
    }
    name.strip_suffix(&format!(".{apex}"))
        .filter(|sub| !sub.is_empty())
        .map(ToString::to_string)
}

/// Derive the subdomain a record file describes from its file name.
///
/// `blog.json` → `blog`, `blog.example.com.json` → `blog`, `@.json` and
/// `example.com.json` → `@`. Returns `None` when the name is not a record file.
/// Case is preserved so the caller can reject uppercase names.
#[must_use]
pub fn subdomain_from_file_name(file_name: &str, zone: &str) -> Option<String> {
    let stem = file_name.strip_suffix(&format!(".{RECORD_FILE_EXTENSION}"))?;
    if stem.is_empty() {
        return None;
    }

    let zone = bare_zone(zone);
    if stem == APEX || stem.eq_ignore_ascii_case(&zone) {
        return Some(APEX.to_string());
    }

    let suffix = format!(".{zone}");
    let sub = if stem.len() > suffix.len()
        && stem.is_char_boundary(stem.len() - suffix.len())
        && stem[stem.len() - suffix.len()..].eq_ignore_ascii_case(&suffix)
    {
        &stem[..stem.len() - suffix.len()]
    } else {
        stem
    };

    Some(sub.to_string())
}

/// Whether `child` is a strict descendant of `parent` (both zone-relative).
///
/// The apex is the ancestor of everything but is never reported here; only
/// subdomain-to-subdomain nesting matters to CNAME promotion.
#[must_use]
pub fn is_descendant(child: &str, parent: &str) -> bool {
    parent != APEX && child.ends_with(&format!(".{parent}"))
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod name_tests;
