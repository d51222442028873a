// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-process zone with PowerDNS-like RRSet semantics.
//!
//! Used by the end-to-end tests: a batch is applied atomically, `SOA` and `NS`
//! are stored but never reported as managed records, and every applied batch is
//! kept so tests can assert on exactly what was sent.

use super::{is_managed_type, ApplyOutcome, DnsProvider, Granularity};
use crate::errors::ProviderError;
use crate::record::name::normalize_fqdn;
use crate::record::soa::SoaRecord;
use crate::record::{ChangeType, RRSet, RRSetOperation, RRSetRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

const PROVIDER_NAME: &str = "memory";

#[derive(Debug, Default)]
struct MemoryZone {
    rrsets: BTreeMap<(String, String), RRSet>,
    soa: Option<SoaRecord>,
    batches: Vec<Vec<RRSetOperation>>,
}

/// Zone held in memory.
#[derive(Debug)]
pub struct MemoryProvider {
    zone: String,
    state: RwLock<MemoryZone>,
    read_delay: Option<Duration>,
    fail_reads: AtomicBool,
    fail_applies: AtomicBool,
}

impl MemoryProvider {
    #[must_use]
    pub fn new(zone: &str) -> Self {
        Self {
            zone: normalize_fqdn(zone),
            state: RwLock::new(MemoryZone::default()),
            read_delay: None,
            fail_reads: AtomicBool::new(false),
            fail_applies: AtomicBool::new(false),
        }
    }

    /// Seed the zone SOA.
    #[must_use]
    pub fn with_soa(mut self, soa: SoaRecord) -> Self {
        self.state.get_mut().soa = Some(soa);
        self
    }

    /// Seed RRSets. A later RRSet with the same `(name, type)` replaces an earlier one.
    #[must_use]
    pub fn with_rrsets(mut self, rrsets: Vec<RRSet>) -> Self {
        let state = self.state.get_mut();
        for rrset in rrsets {
            let rrset = RRSet {
                name: normalize_fqdn(&rrset.name),
                rtype: rrset.rtype.to_ascii_uppercase(),
                ..rrset
            };
            state
                .rrsets
                .insert((rrset.name.clone(), rrset.rtype.clone()), rrset);
        }
        self
    }

    /// Delay every read, to exercise timeout handling.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Make subsequent reads fail with a connection error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent batches fail as a whole without applying anything.
    pub fn set_fail_applies(&self, fail: bool) {
        self.fail_applies.store(fail, Ordering::SeqCst);
    }

    /// Every stored RRSet, `SOA` and `NS` included.
    pub async fn rrsets(&self) -> Vec<RRSet> {
        self.state.read().await.rrsets.values().cloned().collect()
    }

    /// Current SOA.
    pub async fn soa(&self) -> Option<SoaRecord> {
        self.state.read().await.soa.clone()
    }

    /// Batches applied so far, oldest first.
    pub async fn applied_batches(&self) -> Vec<Vec<RRSetOperation>> {
        self.state.read().await.batches.clone()
    }

    async fn before_read(&self) -> Result<(), ProviderError> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ProviderError::Connection {
                provider: PROVIDER_NAME.to_string(),
                reason: "reads disabled".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn granularity(&self) -> Granularity {
        Granularity::RRSet
    }

    async fn fetch_all_managed_records(&self) -> Result<Vec<RRSet>, ProviderError> {
        self.before_read().await?;
        Ok(self
            .state
            .read()
            .await
            .rrsets
            .values()
            .filter(|r| is_managed_type(&r.rtype))
            .cloned()
            .collect())
    }

    async fn fetch_records_for_name(&self, fqdn: &str) -> Result<Vec<RRSet>, ProviderError> {
        self.before_read().await?;
        let name = normalize_fqdn(fqdn);
        Ok(self
            .state
            .read()
            .await
            .rrsets
            .values()
            .filter(|r| r.name == name && is_managed_type(&r.rtype))
            .cloned()
            .collect())
    }

    async fn fetch_soa(&self) -> Result<Option<SoaRecord>, ProviderError> {
        self.before_read().await?;
        Ok(self.state.read().await.soa.clone())
    }

    async fn apply_batch(&self, ops: &[RRSetOperation]) -> Result<ApplyOutcome, ProviderError> {
        if self.fail_applies.load(Ordering::SeqCst) {
            return Err(ProviderError::Http {
                provider: PROVIDER_NAME.to_string(),
                url: format!("memory://{}", self.zone),
                status: 422,
                body: "batch rejected".to_string(),
            });
        }

        // Validate SOA content up front so a bad batch leaves the zone untouched.
        let mut soa_update = None;
        for op in ops {
            if op.rtype == "SOA" && op.changetype == ChangeType::Replace {
                let content = op.records.first().map(|r: &RRSetRecord| r.content.as_str());
                let soa = content
                    .unwrap_or_default()
                    .parse::<SoaRecord>()
                    .map_err(|reason| ProviderError::Http {
                        provider: PROVIDER_NAME.to_string(),
                        url: format!("memory://{}", self.zone),
                        status: 422,
                        body: reason,
                    })?;
                soa_update = Some(soa);
            }
        }

        let mut state = self.state.write().await;
        for op in ops {
            let key = (normalize_fqdn(&op.name), op.rtype.to_ascii_uppercase());
            match op.changetype {
                ChangeType::Delete => {
                    state.rrsets.remove(&key);
                }
                ChangeType::Replace => {
                    state.rrsets.insert(
                        key.clone(),
                        RRSet {
                            name: key.0,
                            rtype: key.1,
                            ttl: op.ttl,
                            records: op.records.clone(),
                        },
                    );
                }
            }
            debug!(operation = %op, "Applied operation to memory zone");
        }
        if let Some(soa) = soa_update {
            state.soa = Some(soa);
        }
        state.batches.push(ops.to_vec());

        Ok(ApplyOutcome::all_succeeded(ops))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
