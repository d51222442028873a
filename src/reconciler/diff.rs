// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record-level diff between desired and actual signatures.
//!
//! Pure set difference over signature keys. No fuzzy matching, and TTLs are not
//! compared (every REPLACE carries the policy TTL).

use super::policy::ProtectedNames;
use super::signature::SignatureIndex;
use crate::record::{RRSetKey, RecordSignature};
use std::collections::BTreeSet;

/// Result of comparing two signature indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Desired signatures the provider lacks
    pub to_create: Vec<RecordSignature>,
    /// Provider signatures no longer desired
    pub to_delete: Vec<RecordSignature>,
    /// Provider signatures no longer desired but at a protected subdomain
    pub protected: Vec<RecordSignature>,
    /// Signatures present on both sides
    pub unchanged: usize,
}

impl Diff {
    /// RRSets touched by a create or a delete.
    #[must_use]
    pub fn touched(&self) -> BTreeSet<RRSetKey> {
        self.to_create
            .iter()
            .chain(&self.to_delete)
            .map(RecordSignature::rrset_key)
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Compare `desired` against `actual`.
///
/// `to_create = D \ A`; `A \ D` is split between `to_delete` and `protected`
/// depending on whether the subdomain is protected.
#[must_use]
pub fn compute_diff(
    desired: &SignatureIndex,
    actual: &SignatureIndex,
    protected: &ProtectedNames,
) -> Diff {
    let mut diff = Diff::default();

    for (key, signature) in desired {
        if actual.contains_key(key) {
            diff.unchanged += 1;
        } else {
            diff.to_create.push(signature.clone());
        }
    }

    for (key, signature) in actual {
        if desired.contains_key(key) {
            continue;
        }
        if protected.protects_subdomain(&signature.subdomain) {
            diff.protected.push(signature.clone());
        } else {
            diff.to_delete.push(signature.clone());
        }
    }

    diff
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod diff_tests;
