// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation engine.
//!
//! A run loads the desired records from the repository and the actual records from
//! the provider concurrently, computes a plan with the pure [`plan_changes`] engine,
//! and applies it in one phase once the whole diff is known.
//!
//! ## Modes
//!
//! - **Full**: the whole zone is compared against the whole repository. A provider
//!   read failure aborts the run since every delete depends on it.
//! - **Incremental**: only the subdomains named by a change-set (plus their
//!   CNAME ancestors and protected descendants) are compared. A failed lookup for
//!   one subdomain is logged and that subdomain is treated as having no provider
//!   records, which can only produce REPLACEs, never DELETEs. The names of all
//!   other record files still count as occupied when deciding CNAME vs ALIAS.

pub mod diff;
pub mod planner;
pub mod policy;
pub mod report;
pub mod signature;

pub use planner::{apply_plan, plan_changes, ApplyResult, Plan};
pub use policy::{PolicyConfig, ProtectedNames};
pub use report::ReconcileReport;

use crate::constants::SCHEMA_FILE_NAME;
use crate::errors::SyncError;
use crate::metrics;
use crate::provider::{with_timeout, DnsProvider};
use crate::record::name::{fqdn, is_descendant, subdomain_from_file_name};
use crate::record::soa::SoaRecord;
use crate::record::RRSet;
use crate::repository::{list_subdomains, load_desired, DesiredRecords, RecordSource};
use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Files touched by one change-set, as paths or bare file names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Subdomains described by the changed record files.
    ///
    /// Non-record files and the schema file are ignored; uppercase subdomains are
    /// skipped with a warning, exactly as the loader skips them.
    #[must_use]
    pub fn subdomains(&self, zone: &str) -> BTreeSet<String> {
        let mut subdomains = BTreeSet::new();
        for path in self.added.iter().chain(&self.modified).chain(&self.deleted) {
            let Some(file) = Path::new(path.trim()).file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            if file == SCHEMA_FILE_NAME {
                continue;
            }
            let Some(subdomain) = subdomain_from_file_name(file, zone) else {
                continue;
            };
            if subdomain.chars().any(char::is_uppercase) {
                warn!(file = %path, "Ignoring changed record file with an uppercase subdomain");
                continue;
            }
            subdomains.insert(subdomain);
        }
        subdomains
    }
}

/// Which part of the zone a run compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    Full,
    Incremental(ChangeSet),
}

impl SyncMode {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental(_) => "incremental",
        }
    }
}

/// Run-time knobs of a reconciliation.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    pub dry_run: bool,
    /// Budget for each provider call
    pub provider_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Full,
            dry_run: false,
            provider_timeout: planner::default_provider_timeout(),
        }
    }
}

/// Both sides of a comparison.
struct Snapshot {
    desired: DesiredRecords,
    actual: Vec<RRSet>,
    soa: Option<SoaRecord>,
}

/// Reconcile `provider` against `source` once.
///
/// Returns the report even when the provider rejected operations; callers turn
/// it into an exit status with [`ReconcileReport::outcome`].
///
/// # Errors
///
/// Returns an error if the repository cannot be listed, the SOA cannot be read,
/// or (full mode) the zone cannot be read. Nothing is written in that case.
pub async fn run(
    policy: &PolicyConfig,
    source: &dyn RecordSource,
    provider: &dyn DnsProvider,
    options: &SyncOptions,
    today: NaiveDate,
) -> Result<ReconcileReport, SyncError> {
    let mode = options.mode.label();
    let start = Instant::now();
    info!(
        zone = %policy.zone,
        provider = provider.name(),
        mode = mode,
        dry_run = options.dry_run,
        "Starting reconciliation"
    );

    let snapshot = match &options.mode {
        SyncMode::Full => snapshot_full(policy, source, provider, options.provider_timeout).await,
        SyncMode::Incremental(changes) => {
            snapshot_incremental(policy, source, provider, changes, options.provider_timeout).await
        }
    };
    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(e) => {
            metrics::record_error(e.status_reason());
            metrics::record_reconciliation_error(mode, start.elapsed());
            return Err(e);
        }
    };

    let plan = plan_changes(
        &snapshot.desired,
        &snapshot.actual,
        snapshot.soa.as_ref(),
        policy,
        today,
    );
    let result = apply_plan(&plan, provider, options.dry_run, options.provider_timeout).await;

    let mut report = ReconcileReport::from_plan(mode, options.dry_run, &snapshot.desired, &plan);
    report.record_apply(result);
    report.log_summary();
    report.record_metrics(start.elapsed());
    Ok(report)
}

async fn snapshot_full(
    policy: &PolicyConfig,
    source: &dyn RecordSource,
    provider: &dyn DnsProvider,
    timeout: Duration,
) -> Result<Snapshot, SyncError> {
    let (desired, zone) = tokio::join!(
        load_desired(source, &policy.zone, None),
        with_timeout(provider.name(), "read", timeout, provider.fetch_zone()),
    );
    let zone = zone?;

    Ok(Snapshot {
        desired: desired?,
        actual: zone.rrsets,
        soa: zone.soa,
    })
}

/// Subdomains an incremental run compares.
///
/// Besides the changed names: every subdomain with a record file that is an
/// ancestor of a changed name (its CNAME form may depend on it), and every
/// protected descendant of a changed name (the provider may hold it without a
/// record file).
fn incremental_scope(
    changed: BTreeSet<String>,
    repository: &BTreeSet<String>,
    protected: &ProtectedNames,
) -> BTreeSet<String> {
    let related = repository
        .iter()
        .filter(|s| changed.iter().any(|c| is_descendant(c, s)))
        .chain(
            protected
                .subdomains()
                .iter()
                .filter(|p| changed.iter().any(|c| is_descendant(p, c))),
        )
        .cloned()
        .collect::<Vec<_>>();

    let mut scope = changed;
    scope.extend(related);
    scope
}

async fn snapshot_incremental(
    policy: &PolicyConfig,
    source: &dyn RecordSource,
    provider: &dyn DnsProvider,
    changes: &ChangeSet,
    timeout: Duration,
) -> Result<Snapshot, SyncError> {
    let changed = changes.subdomains(&policy.zone);
    if changed.is_empty() {
        info!("Change-set names no record files; nothing to compare");
    }
    let repository = list_subdomains(source, &policy.zone).await?;
    let scope = incremental_scope(changed, &repository, &policy.protected);
    debug!(scope = ?scope, "Incremental comparison scope");

    let lookups = scope.iter().map(|subdomain| async move {
        let name = fqdn(subdomain, &policy.zone);
        let result = with_timeout(
            provider.name(),
            "read",
            timeout,
            provider.fetch_records_for_name(&name),
        )
        .await;
        (name, result)
    });

    let (desired, lookups, soa) = tokio::join!(
        load_desired(source, &policy.zone, Some(&scope)),
        join_all(lookups),
        with_timeout(provider.name(), "read_soa", timeout, provider.fetch_soa()),
    );

    let desired = desired?;
    let mut actual = Vec::new();
    for (name, result) in lookups {
        match result {
            Ok(rrsets) => actual.extend(rrsets),
            Err(e) => {
                warn!(
                    name = %name,
                    error = %e,
                    "Provider lookup failed; treating the name as having no records"
                );
                metrics::record_error(SyncError::Provider(e).status_reason());
            }
        }
    }

    Ok(Snapshot {
        desired,
        actual,
        soa: soa?,
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
