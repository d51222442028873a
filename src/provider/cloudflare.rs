// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare DNS adapter.
//!
//! Cloudflare stores individual records, not RRSets, so each planned RRSet
//! operation becomes "delete every record of `(name, type)`, then create the
//! desired ones". Operations run in order; a failure is recorded and the batch
//! moves on.
//!
//! Cloudflare has no ALIAS type. An ALIAS operation is written as a CNAME and
//! Cloudflare flattens it at the apex.

use super::retry::retry_provider_call;
use super::{is_managed_type, ApplyOutcome, DnsProvider, Granularity, OperationFailure};
use crate::constants::{ALIAS_RECORD_TYPE, CLOUDFLARE_PAGE_SIZE, PROVIDER_TIMEOUT_SECS};
use crate::errors::ProviderError;
use crate::record::name::normalize_fqdn;
use crate::record::{ChangeType, RRSet, RRSetOperation, RRSetRecord};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

const PROVIDER_NAME: &str = "cloudflare";

/// Cloudflare API response envelope.
#[derive(Debug, Deserialize)]
struct CfEnvelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<CfMessage>,
    result: Option<T>,
    result_info: Option<CfResultInfo>,
}

#[derive(Debug, Deserialize)]
struct CfMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CfResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

/// DNS record as returned by Cloudflare.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CfRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub rtype: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub priority: Option<u16>,
}

/// Body of a record create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CfRecordBody {
    #[serde(rename = "type")]
    pub rtype: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

/// Cloudflare type used to store an RRSet of `rtype`.
#[must_use]
pub fn wire_type(rtype: &str) -> String {
    if rtype.eq_ignore_ascii_case(ALIAS_RECORD_TYPE) {
        "CNAME".to_string()
    } else {
        rtype.to_ascii_uppercase()
    }
}

/// Group Cloudflare records into RRSets by `(name, type)`.
#[must_use]
pub fn group_into_rrsets(records: Vec<CfRecord>) -> Vec<RRSet> {
    let mut grouped: BTreeMap<(String, String), RRSet> = BTreeMap::new();

    for record in records {
        let name = normalize_fqdn(&record.name);
        let rtype = record.rtype.to_ascii_uppercase();
        let rrset = grouped
            .entry((name.clone(), rtype.clone()))
            .or_insert_with(|| RRSet {
                name,
                rtype: rtype.clone(),
                ttl: record.ttl,
                records: Vec::new(),
            });
        rrset.records.push(RRSetRecord {
            content: record.content,
            disabled: false,
            priority: if rtype == "MX" { record.priority } else { None },
        });
    }

    grouped.into_values().collect()
}

/// Create requests for one REPLACE operation.
#[must_use]
pub fn create_bodies(op: &RRSetOperation) -> Vec<CfRecordBody> {
    let rtype = wire_type(&op.rtype);
    let name = op.name.trim_end_matches('.').to_string();

    op.records
        .iter()
        .map(|r| CfRecordBody {
            rtype: rtype.clone(),
            name: name.clone(),
            content: r.content.trim_end_matches('.').to_string(),
            ttl: op.ttl,
            priority: r.priority,
        })
        .collect()
}

/// Cloudflare zone adapter.
#[derive(Debug, Clone)]
pub struct CloudflareProvider {
    client: HttpClient,
    base_url: String,
    zone_id: String,
    zone: String,
    api_token: String,
}

impl CloudflareProvider {
    /// Create an adapter for the Cloudflare zone `zone_id` (serving `zone`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        zone_id: &str,
        zone: &str,
        api_token: &str,
    ) -> Result<Self, ProviderError> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Connection {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            zone_id: zone_id.to_string(),
            zone: normalize_fqdn(zone),
            api_token: api_token.to_string(),
        })
    }

    fn records_url(&self, record_id: Option<&str>) -> Result<Url, ProviderError> {
        let raw = match record_id {
            Some(id) => format!("{}/zones/{}/dns_records/{id}", self.base_url, self.zone_id),
            None => format!("{}/zones/{}/dns_records", self.base_url, self.zone_id),
        };
        Url::parse(&raw).map_err(|e| ProviderError::Connection {
            provider: PROVIDER_NAME.to_string(),
            reason: format!("invalid API URL '{raw}': {e}"),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&CfRecordBody>,
    ) -> Result<CfEnvelope<T>, ProviderError> {
        debug!(method = %method, url = %url, "Cloudflare API request");

        let mut request = self
            .client
            .request(method, url.clone())
            .bearer_auth(&self.api_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ProviderError::Connection {
            provider: PROVIDER_NAME.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status == StatusCode::NOT_FOUND && body.is_none() && url.path().ends_with("dns_records")
        {
            return Err(ProviderError::ZoneNotFound {
                provider: PROVIDER_NAME.to_string(),
                zone: self.zone.clone(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Http {
                provider: PROVIDER_NAME.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: CfEnvelope<T> =
            serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("response body: {e}"),
            })?;

        if !envelope.success {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|m| format!("{}: {}", m.code, m.message))
                .collect();
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("request unsuccessful: {}", messages.join("; ")),
            });
        }

        Ok(envelope)
    }

    /// List records, optionally filtered by exact name and type, across all pages.
    async fn list_records(
        &self,
        name: Option<&str>,
        rtype: Option<&str>,
    ) -> Result<Vec<CfRecord>, ProviderError> {
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let mut url = self.records_url(None)?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("page", &page.to_string())
                    .append_pair("per_page", &CLOUDFLARE_PAGE_SIZE.to_string());
                if let Some(name) = name {
                    query.append_pair("name", name.trim_end_matches('.'));
                }
                if let Some(rtype) = rtype {
                    query.append_pair("type", rtype);
                }
            }

            let envelope: CfEnvelope<Vec<CfRecord>> = retry_provider_call(
                || self.call(Method::GET, &url, None),
                "cloudflare list records",
            )
            .await?;

            let batch = envelope.result.unwrap_or_default();
            let fetched = batch.len();
            records.extend(batch);

            let total_pages = envelope.result_info.map_or(page, |info| {
                debug!(page = info.page, total_pages = info.total_pages, "Fetched record page");
                info.total_pages
            });
            if fetched == 0 || page >= total_pages {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    async fn delete_record(&self, id: &str) -> Result<(), ProviderError> {
        let url = self.records_url(Some(id))?;
        retry_provider_call(
            || self.call::<serde_json::Value>(Method::DELETE, &url, None),
            "cloudflare delete record",
        )
        .await?;
        Ok(())
    }

    async fn create_record(&self, body: &CfRecordBody) -> Result<(), ProviderError> {
        let url = self.records_url(None)?;
        retry_provider_call(
            || self.call::<serde_json::Value>(Method::POST, &url, Some(body)),
            "cloudflare create record",
        )
        .await?;
        Ok(())
    }

    /// Apply one RRSet operation as record-level deletes and creates.
    async fn apply_operation(&self, op: &RRSetOperation) -> Result<(), ProviderError> {
        let rtype = wire_type(&op.rtype);
        let existing = self.list_records(Some(&op.name), Some(&rtype)).await?;

        for record in &existing {
            self.delete_record(&record.id).await?;
        }

        let mut created = 0usize;
        if op.changetype == ChangeType::Replace {
            for body in create_bodies(op) {
                self.create_record(&body).await?;
                created += 1;
            }
        }

        debug!(
            operation = %op,
            deleted = existing.len(),
            created = created,
            "Applied operation to Cloudflare"
        );
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn granularity(&self) -> Granularity {
        Granularity::Record
    }

    async fn fetch_all_managed_records(&self) -> Result<Vec<RRSet>, ProviderError> {
        let records: Vec<CfRecord> = self
            .list_records(None, None)
            .await?
            .into_iter()
            .filter(|r| is_managed_type(&r.rtype))
            .collect();

        info!(zone = %self.zone, records = records.len(), "Fetched managed records from Cloudflare");
        Ok(group_into_rrsets(records))
    }

    async fn fetch_records_for_name(&self, fqdn: &str) -> Result<Vec<RRSet>, ProviderError> {
        let name = normalize_fqdn(fqdn);
        let records: Vec<CfRecord> = self
            .list_records(Some(&name), None)
            .await?
            .into_iter()
            .filter(|r| is_managed_type(&r.rtype) && normalize_fqdn(&r.name) == name)
            .collect();

        Ok(group_into_rrsets(records))
    }

    async fn apply_batch(&self, ops: &[RRSetOperation]) -> Result<ApplyOutcome, ProviderError> {
        let mut outcome = ApplyOutcome::default();

        for op in ops {
            if !is_managed_type(&op.rtype) {
                // Cloudflare owns the SOA and NS records of its zones.
                debug!(operation = %op, "Skipping provider-owned RRSet");
                continue;
            }

            match self.apply_operation(op).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    error!(operation = %op, error = %e, "Cloudflare operation failed");
                    outcome.failed.push(OperationFailure {
                        operation: op.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            zone = %self.zone,
            succeeded = outcome.succeeded,
            failed = outcome.failed.len(),
            "Applied operations to Cloudflare"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod cloudflare_tests;
