// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider adapters.
//!
//! The reconciliation engine is written once against the [`DnsProvider`] trait.
//! Each adapter translates the provider-neutral [`RRSet`] / [`RRSetOperation`]
//! model into the provider's own API:
//!
//! - [`powerdns::PowerDnsProvider`] - authoritative server with RRSet-granularity
//!   `PATCH` semantics and an SOA serial
//! - [`cloudflare::CloudflareProvider`] - per-record API without batch semantics
//! - [`memory::MemoryProvider`] - in-process zone used by tests
//!
//! Every call made by the reconciler goes through [`with_timeout`], so a hung
//! provider becomes a [`ProviderError::Timeout`], never an empty record list.

pub mod cloudflare;
pub mod memory;
pub mod powerdns;
pub mod retry;

use crate::errors::ProviderError;
use crate::record::soa::SoaRecord;
use crate::record::{RRSet, RRSetOperation};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::error;

/// Unit at which a provider applies changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    /// Whole RRSets are replaced or deleted in one (atomic) request
    RRSet,
    /// Records are created and deleted one at a time
    Record,
}

/// One operation the provider rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationFailure {
    /// The operation as planned
    pub operation: RRSetOperation,
    /// Provider error message
    pub error: String,
}

/// Outcome of applying a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Operations the provider accepted
    pub succeeded: usize,
    /// Operations the provider rejected
    pub failed: Vec<OperationFailure>,
}

impl ApplyOutcome {
    /// Every operation in `ops` succeeded.
    #[must_use]
    pub fn all_succeeded(ops: &[RRSetOperation]) -> Self {
        Self {
            succeeded: ops.len(),
            failed: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Managed RRSets and SOA read together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneState {
    pub rrsets: Vec<RRSet>,
    pub soa: Option<SoaRecord>,
}

/// Adapter interface between the reconciler and a DNS provider.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Short provider name used in logs, metrics and errors.
    fn name(&self) -> &str;

    /// Unit at which [`DnsProvider::apply_batch`] operates.
    fn granularity(&self) -> Granularity;

    /// Every managed RRSet in the zone (`SOA` and `NS` excluded).
    async fn fetch_all_managed_records(&self) -> Result<Vec<RRSet>, ProviderError>;

    /// Managed RRSets at exactly `fqdn` (`SOA` and `NS` excluded).
    async fn fetch_records_for_name(&self, fqdn: &str) -> Result<Vec<RRSet>, ProviderError>;

    /// Current SOA, for providers that track a zone serial.
    async fn fetch_soa(&self) -> Result<Option<SoaRecord>, ProviderError> {
        Ok(None)
    }

    /// Managed RRSets and SOA of the whole zone.
    ///
    /// Providers that return both in one response override this to read the
    /// zone once.
    async fn fetch_zone(&self) -> Result<ZoneState, ProviderError> {
        let (rrsets, soa) = tokio::join!(self.fetch_all_managed_records(), self.fetch_soa());
        Ok(ZoneState {
            rrsets: rrsets?,
            soa: soa?,
        })
    }

    /// Apply an ordered batch.
    ///
    /// `Err` means nothing is known to have been applied; per-operation
    /// rejections are reported in [`ApplyOutcome::failed`].
    async fn apply_batch(&self, ops: &[RRSetOperation]) -> Result<ApplyOutcome, ProviderError>;
}

/// Run one provider call with a time budget.
///
/// # Errors
///
/// Returns [`ProviderError::Timeout`] if `future` does not finish within `limit`,
/// otherwise whatever the call itself returns.
pub async fn with_timeout<T, F>(
    provider: &str,
    operation: &str,
    limit: Duration,
    future: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    if let Ok(result) = tokio::time::timeout(limit, future).await {
        result
    } else {
        error!(
            provider = provider,
            operation = operation,
            timeout = ?limit,
            "Provider call timed out"
        );
        Err(ProviderError::Timeout {
            provider: provider.to_string(),
            operation: operation.to_string(),
            timeout_secs: limit.as_secs(),
        })
    }
}

/// Whether a provider RRSet type is managed by the reconciler.
#[must_use]
pub fn is_managed_type(rtype: &str) -> bool {
    !crate::constants::UNMANAGED_RECORD_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(rtype))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
