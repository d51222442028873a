// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Apply planner.
//!
//! [`plan_changes`] is the pure engine: `(desired, actual, soa, policy, today)`
//! in, an ordered operation batch out. [`apply_plan`] is the only place a batch
//! reaches a provider.

use super::diff::{compute_diff, Diff};
use super::policy::{build_operations, resolve_duplicate_cnames, PolicyConfig};
use super::signature::{index_actual, index_desired};
use crate::constants::{APEX, PROVIDER_TIMEOUT_SECS};
use crate::errors::ProviderError;
use crate::provider::{with_timeout, ApplyOutcome, DnsProvider, Granularity};
use crate::record::name::fqdn;
use crate::record::soa::{next_serial, SoaRecord};
use crate::record::{ChangeType, RRSet, RRSetOperation, RRSetRecord};
use crate::repository::DesiredRecords;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{error, info, warn};

/// Serial transition carried by a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialBump {
    pub from: u32,
    pub to: u32,
}

/// A complete, ordered change plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Record-level diff the plan was built from
    pub diff: Diff,
    /// Ordered batch: DELETEs, then REPLACEs, then the SOA (if any)
    pub operations: Vec<RRSetOperation>,
    /// Serial change, present iff the batch holds record changes and the
    /// provider tracks an SOA
    pub serial: Option<SerialBump>,
    /// DELETEs dropped because they target protected names
    pub suppressed_deletes: usize,
    /// Protected provider records the batch leaves untouched
    pub protected_kept: usize,
    /// Names whose CNAME was dropped in favour of A/AAAA records
    pub cname_conflicts: usize,
    /// Extra CNAME definitions ignored
    pub duplicate_cnames: usize,
}

impl Plan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Record operations in the batch (the SOA bump excluded).
    pub fn record_operations(&self) -> impl Iterator<Item = &RRSetOperation> {
        self.operations.iter().filter(|op| op.rtype != "SOA")
    }
}

/// Sort DELETEs before REPLACEs; within each group by name then type.
pub fn order_operations(operations: &mut [RRSetOperation]) {
    operations.sort_by(|a, b| {
        (a.changetype, &a.name, &a.rtype).cmp(&(b.changetype, &b.name, &b.rtype))
    });
}

/// The SOA REPLACE that moves `soa` to its next serial on `today`.
#[must_use]
pub fn soa_operation(soa: &SoaRecord, policy: &PolicyConfig, today: NaiveDate) -> (RRSetOperation, SerialBump) {
    let next = next_serial(soa.serial, today);
    let op = RRSetOperation::replace(
        &fqdn(APEX, &policy.zone),
        "SOA",
        policy.soa_ttl,
        vec![RRSetRecord {
            content: soa.with_serial(next).to_string(),
            disabled: false,
            priority: None,
        }],
    );
    (
        op,
        SerialBump {
            from: soa.serial,
            to: next,
        },
    )
}

/// Compute the change plan.
///
/// Subdomains whose record file could not be read are held: their provider
/// records are never deleted.
#[must_use]
pub fn plan_changes(
    desired: &DesiredRecords,
    actual: &[RRSet],
    soa: Option<&SoaRecord>,
    policy: &PolicyConfig,
    today: NaiveDate,
) -> Plan {
    let mut records = desired.records.clone();
    let duplicate_cnames = resolve_duplicate_cnames(&mut records);

    let desired_index = index_desired(&records);
    let mut actual_index = index_actual(actual, &policy.zone);
    if !desired.unreadable_subdomains.is_empty() {
        warn!(
            subdomains = ?desired.unreadable_subdomains,
            "Keeping provider records of unreadable record files"
        );
        actual_index.hold(&desired.unreadable_subdomains);
    }

    let diff = compute_diff(
        &desired_index.signatures,
        &actual_index.signatures,
        &policy.protected,
    );
    let unindexed: BTreeSet<String> = desired
        .unreadable_subdomains
        .union(&desired.unloaded_subdomains)
        .cloned()
        .collect();
    let outcome = build_operations(&diff, &desired_index, &actual_index, &unindexed, policy);

    let mut operations = outcome.operations;
    order_operations(&mut operations);

    let mut serial = None;
    if !operations.is_empty() {
        if let Some(soa) = soa {
            let (op, bump) = soa_operation(soa, policy, today);
            operations.push(op);
            serial = Some(bump);
        }
    }

    Plan {
        diff,
        operations,
        serial,
        suppressed_deletes: outcome.suppressed_deletes.len(),
        protected_kept: outcome.protected_kept,
        cname_conflicts: outcome.cname_conflicts.len(),
        duplicate_cnames,
    }
}

/// What happened to a plan's batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// Nothing to send
    NoChanges,
    /// Dry run: the batch was logged, not sent
    DryRun,
    /// The provider processed the batch
    Applied(ApplyOutcome),
    /// The provider rejected or never received the batch
    Failed(ProviderError),
}

/// Send the plan's batch to `provider`, or only log it under dry-run.
///
/// RRSet-granularity providers get a single call bounded by `timeout`;
/// record-granularity providers are allowed `timeout` per operation.
pub async fn apply_plan(
    plan: &Plan,
    provider: &dyn DnsProvider,
    dry_run: bool,
    timeout: Duration,
) -> ApplyResult {
    if plan.is_empty() {
        info!("Provider already matches the repository; nothing to apply");
        return ApplyResult::NoChanges;
    }

    if dry_run {
        for op in &plan.operations {
            info!(operation = %op, "[dry-run] Would apply");
        }
        info!(
            operations = plan.operations.len(),
            "[dry-run] Batch not sent to provider"
        );
        return ApplyResult::DryRun;
    }

    for op in &plan.operations {
        info!(operation = %op, "Applying");
    }

    let budget = match provider.granularity() {
        Granularity::RRSet => timeout,
        Granularity::Record => {
            timeout.saturating_mul(u32::try_from(plan.operations.len()).unwrap_or(u32::MAX))
        }
    };

    match with_timeout(
        provider.name(),
        "apply",
        budget,
        provider.apply_batch(&plan.operations),
    )
    .await
    {
        Ok(outcome) => ApplyResult::Applied(outcome),
        Err(e) => {
            error!(provider = provider.name(), error = %e, "Batch apply failed");
            ApplyResult::Failed(e)
        }
    }
}

/// Default per-call provider budget.
#[must_use]
pub fn default_provider_timeout() -> Duration {
    Duration::from_secs(PROVIDER_TIMEOUT_SECS)
}

/// Operations of `plan` with the given change type.
#[must_use]
pub fn count_changetype(plan: &Plan, changetype: ChangeType) -> usize {
    plan.record_operations()
        .filter(|op| op.changetype == changetype)
        .count()
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod planner_tests;
