// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Normalization and policy layer.
//!
//! Turns the record-level diff into RRSet-level operations that a provider will
//! accept and that can never remove protected names.
//!
//! # CNAME rules
//!
//! Evaluated per name holding a desired CNAME, first match wins:
//!
//! 1. Several desired CNAMEs: the first one authored is kept
//!    ([`resolve_duplicate_cnames`], applied before indexing so the diff agrees).
//! 2. A desired `A`/`AAAA` at the same name: no CNAME or ALIAS operation at all.
//! 3. Zone apex: written as `ALIAS`.
//! 4. Other desired types at the same name: written as `ALIAS`.
//! 5. Descendant names exist once the batch is applied: written as `ALIAS`.
//! 6. Still a `CNAME`: every other type the provider holds at the name is deleted
//!    first.
//!
//! A desired CNAME the provider stores in the other form is rewritten even when
//! its content is unchanged, so the stored form only depends on the repository.

use super::diff::Diff;
use super::signature::{logical_type, ActualIndex, DesiredIndex};
use crate::constants::{
    ALIAS_RECORD_TYPE, APEX, DEFAULT_PROTECTED_NAMES, DEFAULT_RECORD_TTL_SECS, SOA_TTL_SECS,
};
use crate::record::name::{bare_zone, fqdn, is_descendant, normalize_fqdn, subdomain_of};
use crate::record::{
    ChangeType, RRSetKey, RRSetOperation, RecordDefinition, RecordSignature, RecordType,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

const CNAME: &str = "CNAME";

/// Names the reconciler may update but never delete.
///
/// Entries may be given as subdomains (`www`, `@`) or FQDNs inside the zone
/// (`www.example.com.`); both forms are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedNames {
    subdomains: BTreeSet<String>,
    fqdns: BTreeSet<String>,
}

impl ProtectedNames {
    /// Build the protected set for `zone`.
    pub fn new<I, S>(names: I, zone: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut protected = Self::default();
        let zone_fqdn = normalize_fqdn(&bare_zone(zone));

        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }

            let as_fqdn = normalize_fqdn(name);
            let subdomain = if name == APEX {
                APEX.to_string()
            } else if as_fqdn == zone_fqdn || as_fqdn.ends_with(&format!(".{zone_fqdn}")) {
                subdomain_of(&as_fqdn, zone).unwrap_or_else(|| APEX.to_string())
            } else {
                name.trim_matches('.').to_lowercase()
            };

            protected.fqdns.insert(fqdn(&subdomain, zone));
            protected.subdomains.insert(subdomain);
        }

        protected
    }

    /// The default set (`@`, `www`) for `zone`.
    #[must_use]
    pub fn defaults(zone: &str) -> Self {
        Self::new(DEFAULT_PROTECTED_NAMES, zone)
    }

    #[must_use]
    pub fn protects_subdomain(&self, subdomain: &str) -> bool {
        self.subdomains.contains(subdomain)
    }

    /// Exact FQDN match, dot- and case-normalized.
    #[must_use]
    pub fn protects_fqdn(&self, name: &str) -> bool {
        self.fqdns.contains(&normalize_fqdn(name))
    }

    #[must_use]
    pub fn subdomains(&self) -> &BTreeSet<String> {
        &self.subdomains
    }
}

/// Immutable policy consumed by the planning engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Zone apex, normalized with a trailing dot
    pub zone: String,
    /// Names never deleted
    pub protected: ProtectedNames,
    /// TTL of every REPLACE
    pub default_ttl: u32,
    /// TTL of the SOA REPLACE
    pub soa_ttl: u32,
}

impl PolicyConfig {
    /// Policy for `zone` with default protected names and TTLs.
    #[must_use]
    pub fn new(zone: &str) -> Self {
        Self {
            zone: normalize_fqdn(&bare_zone(zone)),
            protected: ProtectedNames::defaults(zone),
            default_ttl: DEFAULT_RECORD_TTL_SECS,
            soa_ttl: SOA_TTL_SECS,
        }
    }

    #[must_use]
    pub fn with_protected(mut self, protected: ProtectedNames) -> Self {
        self.protected = protected;
        self
    }

    #[must_use]
    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Keep only the first CNAME authored for each subdomain.
///
/// Returns the number of CNAME definitions dropped.
pub fn resolve_duplicate_cnames(records: &mut BTreeMap<String, Vec<RecordDefinition>>) -> usize {
    let mut dropped = 0;

    for (subdomain, definitions) in records.iter_mut() {
        let mut seen = false;
        definitions.retain(|d| {
            if d.rtype != RecordType::CNAME {
                return true;
            }
            if seen {
                warn!(
                    subdomain = %subdomain,
                    value = ?d.value,
                    "A name can hold one CNAME; ignoring additional CNAME"
                );
                dropped += 1;
                return false;
            }
            seen = true;
            true
        });
    }

    dropped
}

/// Output of the policy layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyOutcome {
    /// Operations to send, unordered
    pub operations: Vec<RRSetOperation>,
    /// Subdomains whose CNAME was dropped in favour of A/AAAA records
    pub cname_conflicts: BTreeSet<String>,
    /// DELETE operations removed because they target a protected name
    pub suppressed_deletes: Vec<RRSetOperation>,
    /// Protected records left in place (not overwritten by a REPLACE)
    pub protected_kept: usize,
}

/// RRSets to evaluate: the diff's touched set plus the CNAME of every name whose
/// promotion may have changed.
///
/// Touching any RRSet at a name holding a desired CNAME, or at one of its
/// descendants, re-evaluates that CNAME.
#[must_use]
pub fn expand_touched(touched: &BTreeSet<RRSetKey>, desired: &DesiredIndex) -> BTreeSet<RRSetKey> {
    let mut expanded = touched.clone();

    for key in desired.rrsets.keys().filter(|k| k.rtype == CNAME) {
        let affected = touched.iter().any(|t| {
            t.subdomain == key.subdomain || is_descendant(&t.subdomain, &key.subdomain)
        });
        if affected {
            expanded.insert(key.clone());
        }
    }

    expanded
}

/// Subdomains that hold records once the batch is applied.
///
/// `unindexed` names record files whose content is not part of `desired`:
/// unreadable files, and files outside an incremental scope.
#[must_use]
pub fn occupied_subdomains<'a>(
    diff: &Diff,
    desired: &'a DesiredIndex,
    actual: &'a ActualIndex,
    unindexed: &'a BTreeSet<String>,
) -> BTreeSet<&'a str> {
    let deleted: BTreeSet<String> = diff.to_delete.iter().map(RecordSignature::key).collect();

    let mut occupied = desired.subdomains();
    occupied.extend(unindexed.iter().map(String::as_str));

    let mut emptied = BTreeSet::new();
    for (key, signature) in &actual.signatures {
        if deleted.contains(key) {
            emptied.insert(signature.subdomain.as_str());
        } else {
            occupied.insert(signature.subdomain.as_str());
        }
    }
    // Held names and RRSets without enabled records stay where they are.
    occupied.extend(
        actual
            .subdomains()
            .into_iter()
            .filter(|s| !emptied.contains(s)),
    );

    occupied
}

/// Type a desired CNAME at `subdomain` is written as.
#[must_use]
pub fn cname_effective_type(
    subdomain: &str,
    desired: &DesiredIndex,
    occupied: &BTreeSet<&str>,
) -> &'static str {
    if subdomain == APEX {
        return ALIAS_RECORD_TYPE;
    }
    if desired.types_at(subdomain).iter().any(|t| *t != CNAME) {
        return ALIAS_RECORD_TYPE;
    }
    if occupied.iter().any(|s| is_descendant(s, subdomain)) {
        return ALIAS_RECORD_TYPE;
    }
    CNAME
}

fn other_form(rtype: &str) -> &'static str {
    if rtype == CNAME {
        ALIAS_RECORD_TYPE
    } else {
        CNAME
    }
}

/// Desired CNAMEs the provider stores as the wrong one of CNAME and ALIAS.
fn misplaced_cnames(
    desired: &DesiredIndex,
    actual: &ActualIndex,
    occupied: &BTreeSet<&str>,
) -> BTreeSet<RRSetKey> {
    desired
        .rrsets
        .keys()
        .filter(|k| k.rtype == CNAME && !conflicts_with_address_records(&k.subdomain, desired))
        .filter(|k| {
            let effective = cname_effective_type(&k.subdomain, desired, occupied);
            actual.holds(&k.subdomain, other_form(effective))
        })
        .cloned()
        .collect()
}

/// Whether a CNAME at `subdomain` must yield to desired address records.
fn conflicts_with_address_records(subdomain: &str, desired: &DesiredIndex) -> bool {
    let types = desired.types_at(subdomain);
    types.contains("A") || types.contains("AAAA")
}

/// Build the RRSet operations for a diff.
///
/// `unindexed` is passed through to [`occupied_subdomains`].
#[must_use]
pub fn build_operations(
    diff: &Diff,
    desired: &DesiredIndex,
    actual: &ActualIndex,
    unindexed: &BTreeSet<String>,
    policy: &PolicyConfig,
) -> PolicyOutcome {
    let mut outcome = PolicyOutcome::default();
    let mut operations: Vec<RRSetOperation> = Vec::new();
    let occupied = occupied_subdomains(diff, desired, actual, unindexed);

    let mut keys = expand_touched(&diff.touched(), desired);
    for key in misplaced_cnames(desired, actual, &occupied) {
        debug!(subdomain = %key.subdomain, "Stored CNAME form no longer matches the zone layout");
        keys.insert(key);
    }

    for key in keys {
        let name = fqdn(&key.subdomain, &policy.zone);
        let records = desired.records(&key);

        if key.rtype != CNAME {
            if records.is_empty() {
                operations.push(RRSetOperation::delete(&name, &key.rtype));
            } else {
                operations.push(RRSetOperation::replace(
                    &name,
                    &key.rtype,
                    policy.default_ttl,
                    records.iter().map(|s| s.to_rrset_record()).collect(),
                ));
            }
            continue;
        }

        if records.is_empty() {
            // Stale CNAME: remove it in whichever form the provider stores it.
            for stored in [CNAME, ALIAS_RECORD_TYPE] {
                if actual.holds(&key.subdomain, stored) {
                    operations.push(RRSetOperation::delete(&name, stored));
                }
            }
            continue;
        }

        if conflicts_with_address_records(&key.subdomain, desired) {
            warn!(
                subdomain = %key.subdomain,
                "CNAME conflicts with A/AAAA records at the same name; keeping the address records"
            );
            outcome.cname_conflicts.insert(key.subdomain.clone());
            continue;
        }

        let effective = cname_effective_type(&key.subdomain, desired, &occupied);
        if effective == ALIAS_RECORD_TYPE {
            debug!(subdomain = %key.subdomain, "Writing CNAME as ALIAS");
        }

        let stale_form = other_form(effective);
        if actual.holds(&key.subdomain, stale_form) {
            operations.push(RRSetOperation::delete(&name, stale_form));
        }

        if effective == CNAME {
            for stored in actual.types_at(&key.subdomain) {
                if stored != CNAME && stored != ALIAS_RECORD_TYPE {
                    debug!(
                        subdomain = %key.subdomain,
                        rtype = stored,
                        "Clearing RRSet that would conflict with the CNAME"
                    );
                    operations.push(RRSetOperation::delete(&name, stored));
                }
            }
        }

        operations.push(RRSetOperation::replace(
            &name,
            effective,
            policy.default_ttl,
            records.iter().map(|s| s.to_rrset_record()).collect(),
        ));
    }

    // CNAME clean-up can target an RRSet the diff already deletes.
    let mut seen = BTreeSet::new();
    operations.retain(|op| seen.insert((op.name.clone(), op.rtype.clone(), op.changetype)));

    for op in operations {
        if op.changetype == ChangeType::Delete && policy.protected.protects_fqdn(&op.name) {
            info!(operation = %op, "Not deleting protected name");
            outcome.suppressed_deletes.push(op);
        } else {
            outcome.operations.push(op);
        }
    }

    outcome.protected_kept = diff
        .protected
        .iter()
        .filter(|sig| !overwritten(sig, actual, &outcome.operations, policy))
        .count();

    outcome
}

/// Whether a REPLACE of the RRSet holding `signature` is in `operations`.
fn overwritten(
    signature: &RecordSignature,
    actual: &ActualIndex,
    operations: &[RRSetOperation],
    policy: &PolicyConfig,
) -> bool {
    let name = fqdn(&signature.subdomain, &policy.zone);
    operations.iter().any(|op| {
        op.changetype == ChangeType::Replace
            && op.name == name
            && logical_type(&op.rtype) == signature.rtype
            && actual.holds(&signature.subdomain, &op.rtype)
    })
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod policy_tests;
