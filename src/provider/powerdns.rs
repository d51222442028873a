// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! PowerDNS authoritative server adapter.
//!
//! Talks to the PowerDNS HTTP API:
//!
//! - `GET  /api/v1/servers/{server}/zones/{zone}` - zone with all RRSets and the SOA,
//!   optionally narrowed with `rrset_name` / `rrset_type`
//! - `PATCH /api/v1/servers/{server}/zones/{zone}` - `{"rrsets": [...]}` change batch
//!
//! PowerDNS applies a PATCH atomically, so a batch either succeeds or fails as a
//! whole. MX priorities live inside the content on the wire (`"10 mx.example.com."`)
//! and are split out into [`RRSetRecord::priority`] on read.

use super::retry::retry_provider_call;
use super::{is_managed_type, ApplyOutcome, DnsProvider, Granularity, ZoneState};
use crate::constants::PROVIDER_TIMEOUT_SECS;
use crate::errors::ProviderError;
use crate::record::name::normalize_fqdn;
use crate::record::soa::SoaRecord;
use crate::record::{ChangeType, RRSet, RRSetOperation, RRSetRecord};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const PROVIDER_NAME: &str = "powerdns";

/// Header carrying the PowerDNS API key
const API_KEY_HEADER: &str = "X-API-Key";

/// Zone as returned by the PowerDNS API (only the fields zonesync needs).
#[derive(Debug, Clone, Deserialize)]
struct PdnsZone {
    #[serde(default)]
    rrsets: Vec<PdnsRRSet>,
}

/// RRSet on the PowerDNS wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdnsRRSet {
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changetype: Option<String>,
    #[serde(default)]
    pub records: Vec<PdnsRecord>,
}

/// Record on the PowerDNS wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdnsRecord {
    pub content: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Serialize)]
struct PdnsPatch<'a> {
    rrsets: &'a [PdnsRRSet],
}

/// Convert a wire RRSet into the provider-neutral model.
///
/// MX content `"<priority> <exchange>"` is split into priority and exchange.
#[must_use]
pub fn from_wire(rrset: PdnsRRSet) -> RRSet {
    let rtype = rrset.rtype.to_ascii_uppercase();
    let records = rrset
        .records
        .into_iter()
        .map(|r| {
            let (content, priority) = if rtype == "MX" {
                split_priority(&r.content)
            } else {
                (r.content, None)
            };
            RRSetRecord {
                content,
                disabled: r.disabled,
                priority,
            }
        })
        .collect();

    RRSet {
        name: normalize_fqdn(&rrset.name),
        rtype,
        ttl: rrset.ttl.unwrap_or_default(),
        records,
    }
}

/// Convert a planned operation into its PATCH payload entry.
#[must_use]
pub fn to_wire(op: &RRSetOperation) -> PdnsRRSet {
    match op.changetype {
        ChangeType::Delete => PdnsRRSet {
            name: op.name.clone(),
            rtype: op.rtype.clone(),
            ttl: None,
            changetype: Some(ChangeType::Delete.to_string()),
            records: Vec::new(),
        },
        ChangeType::Replace => PdnsRRSet {
            name: op.name.clone(),
            rtype: op.rtype.clone(),
            ttl: Some(op.ttl),
            changetype: Some(ChangeType::Replace.to_string()),
            records: op
                .records
                .iter()
                .map(|r| PdnsRecord {
                    content: match r.priority {
                        Some(priority) => format!("{priority} {}", r.content),
                        None => r.content.clone(),
                    },
                    disabled: r.disabled,
                })
                .collect(),
        },
    }
}

fn split_priority(content: &str) -> (String, Option<u16>) {
    match content.trim().split_once(char::is_whitespace) {
        Some((priority, rest)) => match priority.parse::<u16>() {
            Ok(priority) => (rest.trim().to_string(), Some(priority)),
            Err(_) => (content.to_string(), None),
        },
        None => (content.to_string(), None),
    }
}

/// PowerDNS zone adapter.
#[derive(Debug, Clone)]
pub struct PowerDnsProvider {
    client: HttpClient,
    base_url: String,
    server_id: String,
    zone: String,
    api_key: String,
}

impl PowerDnsProvider {
    /// Create an adapter for `zone` on the PowerDNS API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        server_id: &str,
        zone: &str,
        api_key: &str,
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
            server_id: server_id.to_string(),
            zone: normalize_fqdn(zone),
            api_key: api_key.to_string(),
        })
    }

    fn zone_url(&self) -> Result<Url, ProviderError> {
        let raw = format!(
            "{}/api/v1/servers/{}/zones/{}",
            self.base_url, self.server_id, self.zone
        );
        Url::parse(&raw).map_err(|e| ProviderError::Connection {
            provider: PROVIDER_NAME.to_string(),
            reason: format!("invalid API URL '{raw}': {e}"),
        })
    }

    /// Execute one request and return the body of a successful response.
    async fn request(
        &self,
        method: Method,
        url: &Url,
        body: Option<&PdnsPatch<'_>>,
    ) -> Result<String, ProviderError> {
        debug!(method = %method, url = %url, "PowerDNS API request");

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ProviderError::Connection {
            provider: PROVIDER_NAME.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status == StatusCode::NOT_FOUND && method == Method::GET {
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

        Ok(text)
    }

    /// GET the zone, optionally narrowed to one name (and type).
    async fn get_zone(
        &self,
        filter: Option<(&str, Option<&str>)>,
    ) -> Result<PdnsZone, ProviderError> {
        let mut url = self.zone_url()?;
        if let Some((name, rtype)) = filter {
            let mut query = url.query_pairs_mut();
            query.append_pair("rrset_name", name);
            if let Some(rtype) = rtype {
                query.append_pair("rrset_type", rtype);
            }
        }

        let body = retry_provider_call(
            || self.request(Method::GET, &url, None),
            "powerdns get zone",
        )
        .await?;

        serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
            provider: PROVIDER_NAME.to_string(),
            reason: format!("zone body: {e}"),
        })
    }

    fn find_soa(&self, rrsets: &[PdnsRRSet]) -> Result<Option<SoaRecord>, ProviderError> {
        rrsets
            .iter()
            .find(|r| r.rtype.eq_ignore_ascii_case("SOA") && normalize_fqdn(&r.name) == self.zone)
            .and_then(|r| r.records.first())
            .map(|r| r.content.parse::<SoaRecord>())
            .transpose()
            .map_err(|reason| ProviderError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason,
            })
    }
}

#[async_trait]
impl DnsProvider for PowerDnsProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn granularity(&self) -> Granularity {
        Granularity::RRSet
    }

    async fn fetch_all_managed_records(&self) -> Result<Vec<RRSet>, ProviderError> {
        Ok(self.fetch_zone().await?.rrsets)
    }

    async fn fetch_records_for_name(&self, fqdn: &str) -> Result<Vec<RRSet>, ProviderError> {
        let name = normalize_fqdn(fqdn);
        let zone = self.get_zone(Some((name.as_str(), None))).await?;

        // Older servers ignore rrset_name and return the whole zone.
        Ok(zone
            .rrsets
            .into_iter()
            .filter(|r| is_managed_type(&r.rtype) && normalize_fqdn(&r.name) == name)
            .map(from_wire)
            .collect())
    }

    async fn fetch_soa(&self) -> Result<Option<SoaRecord>, ProviderError> {
        let zone = self.get_zone(Some((self.zone.as_str(), Some("SOA")))).await?;
        self.find_soa(&zone.rrsets)
    }

    async fn fetch_zone(&self) -> Result<ZoneState, ProviderError> {
        let zone = self.get_zone(None).await?;
        let soa = self.find_soa(&zone.rrsets)?;
        let rrsets: Vec<RRSet> = zone
            .rrsets
            .into_iter()
            .filter(|r| is_managed_type(&r.rtype))
            .map(from_wire)
            .collect();

        info!(zone = %self.zone, rrsets = rrsets.len(), "Fetched managed RRSets from PowerDNS");
        Ok(ZoneState { rrsets, soa })
    }

    async fn apply_batch(&self, ops: &[RRSetOperation]) -> Result<ApplyOutcome, ProviderError> {
        if ops.is_empty() {
            return Ok(ApplyOutcome::default());
        }

        let rrsets: Vec<PdnsRRSet> = ops.iter().map(to_wire).collect();
        let patch = PdnsPatch { rrsets: &rrsets };
        let url = self.zone_url()?;

        retry_provider_call(
            || self.request(Method::PATCH, &url, Some(&patch)),
            "powerdns patch zone",
        )
        .await?;

        info!(zone = %self.zone, operations = ops.len(), "Applied RRSet batch to PowerDNS");
        Ok(ApplyOutcome::all_succeeded(ops))
    }
}

#[cfg(test)]
#[path = "powerdns_tests.rs"]
mod powerdns_tests;
