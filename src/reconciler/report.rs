// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Result reporter.
//!
//! Aggregates what a run planned and what the provider accepted. The process exit
//! status is derived from [`ReconcileReport::outcome`]: an empty batch or a dry
//! run is a success, any rejected operation is a failure.

use super::planner::{count_changetype, ApplyResult, Plan};
use crate::errors::{ProviderError, SyncError};
use crate::metrics;
use crate::provider::OperationFailure;
use crate::record::ChangeType;
use crate::repository::DesiredRecords;
use std::time::Duration;
use tracing::{error, info, warn};

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// `full` or `incremental`
    pub mode: String,
    pub dry_run: bool,
    /// Operations in the batch, SOA included
    pub operations: usize,
    /// Records the diff wants to create
    pub to_create: usize,
    /// Records the diff wants to delete
    pub to_delete: usize,
    /// Records kept because their subdomain is protected
    pub protected: usize,
    /// Records already in sync
    pub unchanged: usize,
    /// REPLACE operations planned (SOA excluded)
    pub rrsets_replaced: usize,
    /// DELETE operations planned
    pub rrsets_deleted: usize,
    /// DELETE operations dropped because they target protected names
    pub deletes_suppressed: usize,
    /// Names whose CNAME yielded to A/AAAA records
    pub cname_conflicts: usize,
    /// New SOA serial, when the batch carries one
    pub serial: Option<u32>,
    /// Operations the provider accepted
    pub succeeded: usize,
    /// Operations the provider rejected
    pub failed: usize,
    /// Rejected operations with the provider's message
    pub failures: Vec<OperationFailure>,
    /// Whole-batch failure
    pub apply_error: Option<ProviderError>,
    /// Record files skipped by validation
    pub skipped_files: usize,
    /// Record definitions skipped by validation
    pub skipped_records: usize,
}

impl ReconcileReport {
    /// Counts known once the plan is built.
    #[must_use]
    pub fn from_plan(mode: &str, dry_run: bool, desired: &DesiredRecords, plan: &Plan) -> Self {
        Self {
            mode: mode.to_string(),
            dry_run,
            operations: plan.operations.len(),
            to_create: plan.diff.to_create.len(),
            to_delete: plan.diff.to_delete.len(),
            protected: plan.protected_kept,
            unchanged: plan.diff.unchanged,
            rrsets_replaced: count_changetype(plan, ChangeType::Replace),
            rrsets_deleted: count_changetype(plan, ChangeType::Delete),
            deletes_suppressed: plan.suppressed_deletes,
            cname_conflicts: plan.cname_conflicts,
            serial: plan.serial.map(|s| s.to),
            skipped_files: desired.skipped_files,
            skipped_records: desired.skipped_records,
            ..Self::default()
        }
    }

    /// Fold the apply result into the report.
    pub fn record_apply(&mut self, result: ApplyResult) {
        match result {
            ApplyResult::NoChanges | ApplyResult::DryRun => {}
            ApplyResult::Applied(outcome) => {
                self.succeeded = outcome.succeeded;
                self.failed = outcome.failed.len();
                self.failures = outcome.failed;
            }
            ApplyResult::Failed(e) => {
                self.failed = self.operations;
                self.apply_error = Some(e);
            }
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.apply_error.is_none()
    }

    /// The run's result.
    ///
    /// # Errors
    ///
    /// Returns the whole-batch provider error, or [`SyncError::PartialApply`] when
    /// individual operations were rejected.
    pub fn outcome(&self) -> Result<(), SyncError> {
        if let Some(e) = &self.apply_error {
            return Err(SyncError::Provider(e.clone()));
        }
        if self.failed > 0 {
            return Err(SyncError::PartialApply {
                failed: self.failed,
                total: self.succeeded + self.failed,
            });
        }
        Ok(())
    }

    /// Log the summary line (and every rejected operation).
    pub fn log_summary(&self) {
        for failure in &self.failures {
            error!(operation = %failure.operation, error = %failure.error, "Operation failed");
        }
        if self.skipped_files > 0 || self.skipped_records > 0 {
            warn!(
                skipped_files = self.skipped_files,
                skipped_records = self.skipped_records,
                "Invalid record files or records were skipped"
            );
        }

        info!(
            mode = %self.mode,
            dry_run = self.dry_run,
            to_create = self.to_create,
            to_delete = self.to_delete,
            protected = self.protected,
            unchanged = self.unchanged,
            rrsets_replaced = self.rrsets_replaced,
            rrsets_deleted = self.rrsets_deleted,
            deletes_suppressed = self.deletes_suppressed,
            cname_conflicts = self.cname_conflicts,
            serial = ?self.serial,
            succeeded = self.succeeded,
            failed = self.failed,
            "Reconciliation finished"
        );
    }

    /// Publish the report to the metrics registry.
    pub fn record_metrics(&self, duration: Duration) {
        metrics::record_records("create", self.to_create);
        metrics::record_records("delete", self.to_delete);
        metrics::record_records("protected", self.protected);

        if self.dry_run {
            metrics::record_reconciliation_dry_run(&self.mode, duration);
            return;
        }

        let deletes = self.rrsets_deleted;
        let replaces = self.operations.saturating_sub(deletes);
        if self.apply_error.is_some() {
            metrics::record_operations(ChangeType::Delete.as_str(), "failure", deletes);
            metrics::record_operations(ChangeType::Replace.as_str(), "failure", replaces);
        } else if self.operations > 0 {
            let failed_deletes = self
                .failures
                .iter()
                .filter(|f| f.operation.changetype == ChangeType::Delete)
                .count();
            let failed_replaces = self.failures.len() - failed_deletes;
            for (changetype, planned, failed) in [
                (ChangeType::Delete, deletes, failed_deletes),
                (ChangeType::Replace, replaces, failed_replaces),
            ] {
                metrics::record_operations(
                    changetype.as_str(),
                    "success",
                    planned.saturating_sub(failed),
                );
                metrics::record_operations(changetype.as_str(), "failure", failed);
            }
        }

        match self.outcome() {
            Ok(()) => metrics::record_reconciliation_success(&self.mode, duration),
            Err(e) => {
                metrics::record_error(e.status_reason());
                metrics::record_reconciliation_error(&self.mode, duration);
            }
        }
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod report_tests;
