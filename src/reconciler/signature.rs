// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Signature index for both sides of a reconciliation.
//!
//! Desired definitions and provider RRSets are flattened into
//! `signature key -> RecordSignature` maps built with the same canonicalization,
//! so set difference over the keys is well defined.
//!
//! Provider `ALIAS` RRSets are indexed as logical `CNAME` signatures: the
//! repository only ever authors CNAMEs, and whether one is stored as CNAME or
//! ALIAS is a policy decision re-derived on every run.

use crate::constants::ALIAS_RECORD_TYPE;
use crate::record::content::canonicalize;
use crate::record::name::subdomain_of;
use crate::record::{RRSet, RRSetKey, RecordDefinition, RecordSignature};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// `signature key -> signature`
pub type SignatureIndex = BTreeMap<String, RecordSignature>;

/// Indexed desired records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredIndex {
    /// Every desired signature by key
    pub signatures: SignatureIndex,
    /// Desired records per RRSet, in authoring order
    pub rrsets: BTreeMap<RRSetKey, Vec<RecordSignature>>,
}

impl DesiredIndex {
    /// Desired records of one RRSet (empty if none).
    #[must_use]
    pub fn records(&self, key: &RRSetKey) -> &[RecordSignature] {
        self.rrsets.get(key).map_or(&[], Vec::as_slice)
    }

    /// Record types desired at `subdomain`.
    #[must_use]
    pub fn types_at(&self, subdomain: &str) -> BTreeSet<&str> {
        self.rrsets
            .keys()
            .filter(|k| k.subdomain == subdomain)
            .map(|k| k.rtype.as_str())
            .collect()
    }

    /// Every subdomain with at least one desired record.
    #[must_use]
    pub fn subdomains(&self) -> BTreeSet<&str> {
        self.rrsets.keys().map(|k| k.subdomain.as_str()).collect()
    }
}

/// Indexed provider records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActualIndex {
    /// Every enabled provider record by key (`ALIAS` indexed as `CNAME`)
    pub signatures: SignatureIndex,
    /// Provider RRSets keyed by zone-relative name and their stored type
    pub rrsets: BTreeMap<RRSetKey, RRSet>,
}

impl ActualIndex {
    /// Whether the provider stores an RRSet of exactly `rtype` at `subdomain`.
    #[must_use]
    pub fn holds(&self, subdomain: &str, rtype: &str) -> bool {
        self.rrsets.contains_key(&RRSetKey::new(subdomain, rtype))
    }

    /// Stored types at `subdomain`.
    #[must_use]
    pub fn types_at(&self, subdomain: &str) -> BTreeSet<&str> {
        self.rrsets
            .keys()
            .filter(|k| k.subdomain == subdomain)
            .map(|k| k.rtype.as_str())
            .collect()
    }

    /// Every subdomain holding at least one RRSet.
    #[must_use]
    pub fn subdomains(&self) -> BTreeSet<&str> {
        self.rrsets.keys().map(|k| k.subdomain.as_str()).collect()
    }

    /// Drop the signatures of `subdomains` so the diff never deletes them.
    ///
    /// RRSets are kept for conflict checks.
    pub fn hold(&mut self, subdomains: &BTreeSet<String>) {
        if subdomains.is_empty() {
            return;
        }
        self.signatures
            .retain(|_, sig| !subdomains.contains(&sig.subdomain));
    }
}

/// Logical type a provider type is compared as.
#[must_use]
pub fn logical_type(rtype: &str) -> String {
    if rtype.eq_ignore_ascii_case(ALIAS_RECORD_TYPE) {
        "CNAME".to_string()
    } else {
        rtype.to_ascii_uppercase()
    }
}

/// Index the desired definitions per subdomain.
///
/// A key seen twice keeps the later occurrence and logs a warning.
#[must_use]
pub fn index_desired(records: &BTreeMap<String, Vec<RecordDefinition>>) -> DesiredIndex {
    let mut index = DesiredIndex::default();

    for (subdomain, definitions) in records {
        for definition in definitions {
            let signature = definition.signature(subdomain);
            let key = signature.key();

            if index
                .signatures
                .insert(key.clone(), signature.clone())
                .is_some()
            {
                warn!(key = %key, "Duplicate record definition, last one wins");
                continue;
            }
            index
                .rrsets
                .entry(signature.rrset_key())
                .or_default()
                .push(signature);
        }
    }

    debug!(
        signatures = index.signatures.len(),
        rrsets = index.rrsets.len(),
        "Indexed desired records"
    );
    index
}

/// Index provider RRSets of `zone`.
///
/// Disabled records and names outside the zone are ignored.
#[must_use]
pub fn index_actual(rrsets: &[RRSet], zone: &str) -> ActualIndex {
    let mut index = ActualIndex::default();

    for rrset in rrsets {
        let Some(subdomain) = subdomain_of(&rrset.name, zone) else {
            debug!(name = %rrset.name, "Ignoring RRSet outside the zone");
            continue;
        };
        let logical = logical_type(&rrset.rtype);

        for record in rrset.records.iter().filter(|r| !r.disabled) {
            let signature = RecordSignature {
                subdomain: subdomain.clone(),
                rtype: logical.clone(),
                content: canonicalize(&logical, &record.content),
                priority: if logical == "MX" { record.priority } else { None },
            };
            let key = signature.key();
            if index.signatures.insert(key.clone(), signature).is_some() {
                debug!(key = %key, "Provider holds the same record twice");
            }
        }

        index
            .rrsets
            .insert(RRSetKey::new(&subdomain, &rrset.rtype), rrset.clone());
    }

    debug!(
        signatures = index.signatures.len(),
        rrsets = index.rrsets.len(),
        "Indexed provider records"
    );
    index
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod signature_tests;
