// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Runtime configuration.
//!
//! Every setting can be passed as a flag or through a `ZONESYNC_*` environment
//! variable. [`Cli`] is the raw clap surface; [`Config::from_cli`] validates it
//! into an explicit [`Config`] before any repository or provider I/O happens.

use crate::constants::{
    DEFAULT_CLOUDFLARE_API_URL, DEFAULT_POWERDNS_SERVER_ID, DEFAULT_PROTECTED_NAMES,
    DEFAULT_RECORDS_DIR, DEFAULT_RECORD_TTL_SECS, PROVIDER_TIMEOUT_SECS,
};
use crate::errors::{ConfigError, SyncError};
use crate::provider::cloudflare::CloudflareProvider;
use crate::provider::powerdns::PowerDnsProvider;
use crate::provider::DnsProvider;
use crate::reconciler::{ChangeSet, PolicyConfig, ProtectedNames, SyncMode, SyncOptions};
use crate::record::name::bare_zone;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// DNS provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// PowerDNS authoritative server HTTP API
    Powerdns,
    /// Cloudflare DNS API
    Cloudflare,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Powerdns => "powerdns",
            Self::Cloudflare => "cloudflare",
        }
    }
}

/// Keep a DNS zone in sync with a directory of JSON record files.
#[derive(Debug, Clone, Parser)]
#[command(name = "zonesync", version, about)]
pub struct Cli {
    /// Zone (base domain) to reconcile
    #[arg(long, env = "ZONESYNC_ZONE")]
    pub zone: Option<String>,

    /// Directory holding the `<subdomain>.json` record files
    #[arg(long, env = "ZONESYNC_RECORDS_DIR", default_value = DEFAULT_RECORDS_DIR)]
    pub records_dir: PathBuf,

    /// DNS provider
    #[arg(long, env = "ZONESYNC_PROVIDER", value_enum, default_value = "powerdns")]
    pub provider: ProviderKind,

    /// Provider API base URL
    #[arg(long, env = "ZONESYNC_API_URL")]
    pub api_url: Option<String>,

    /// Provider credential
    #[arg(long, env = "ZONESYNC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// PowerDNS server id
    #[arg(long, env = "ZONESYNC_SERVER_ID", default_value = DEFAULT_POWERDNS_SERVER_ID)]
    pub server_id: String,

    /// Cloudflare zone id
    #[arg(long, env = "ZONESYNC_ZONE_ID")]
    pub zone_id: Option<String>,

    /// Names never deleted: subdomains (`@`, `www`) or FQDNs inside the zone
    #[arg(long, env = "ZONESYNC_PROTECTED", value_delimiter = ',')]
    pub protected: Vec<String>,

    /// TTL of every REPLACE operation, in seconds
    #[arg(long, env = "ZONESYNC_TTL", default_value_t = DEFAULT_RECORD_TTL_SECS)]
    pub ttl: u32,

    /// Budget for each provider call, in seconds
    #[arg(long, env = "ZONESYNC_TIMEOUT", default_value_t = PROVIDER_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Plan and log the batch without sending it
    #[arg(long, env = "ZONESYNC_DRY_RUN")]
    pub dry_run: bool,

    /// Record files added by the change-set
    #[arg(long, env = "ZONESYNC_ADDED_FILES", value_delimiter = ',')]
    pub added: Vec<String>,

    /// Record files modified by the change-set
    #[arg(long, env = "ZONESYNC_MODIFIED_FILES", value_delimiter = ',')]
    pub modified: Vec<String>,

    /// Record files deleted by the change-set
    #[arg(long, env = "ZONESYNC_DELETED_FILES", value_delimiter = ',')]
    pub deleted: Vec<String>,

    /// Write the Prometheus text exposition here after the run
    #[arg(long, env = "ZONESYNC_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
}

/// Provider connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSettings {
    PowerDns {
        api_url: Url,
        api_key: String,
        server_id: String,
    },
    Cloudflare {
        api_url: Url,
        api_token: String,
        zone_id: String,
    },
}

/// Validated configuration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Zone without trailing dot, lower-cased
    pub zone: String,
    pub records_dir: PathBuf,
    pub provider: ProviderSettings,
    pub protected: Vec<String>,
    pub ttl: u32,
    pub timeout: Duration,
    pub dry_run: bool,
    pub change_set: ChangeSet,
    pub metrics_file: Option<PathBuf>,
}

fn missing(setting: &str, flag: &str, env: &str) -> ConfigError {
    ConfigError::MissingSetting {
        setting: setting.to_string(),
        flag: flag.to_string(),
        env: env.to_string(),
    }
}

fn invalid(setting: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidSetting {
        setting: setting.to_string(),
        reason: reason.into(),
    }
}

/// Trimmed value, `None` when absent or blank.
fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| invalid("api URL", format!("'{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            "api URL",
            format!("'{raw}' must use http or https"),
        ));
    }
    Ok(url)
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

impl Config {
    /// Validate the raw command line.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] when the zone, the credential, the
    /// PowerDNS URL or the Cloudflare zone id is missing, and
    /// [`ConfigError::InvalidSetting`] for malformed values or a records directory
    /// that does not exist.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let zone = non_blank(cli.zone.as_ref())
            .map(|z| bare_zone(&z))
            .filter(|z| !z.is_empty())
            .ok_or_else(|| missing("zone", "zone", "ZONESYNC_ZONE"))?;
        if zone.contains(char::is_whitespace) || zone.contains("..") {
            return Err(invalid("zone", format!("'{zone}' is not a DNS name")));
        }

        let api_key = non_blank(cli.api_key.as_ref())
            .ok_or_else(|| missing("API key", "api-key", "ZONESYNC_API_KEY"))?;

        let provider = match cli.provider {
            ProviderKind::Powerdns => {
                let raw = non_blank(cli.api_url.as_ref())
                    .ok_or_else(|| missing("API URL", "api-url", "ZONESYNC_API_URL"))?;
                let server_id = cli.server_id.trim().to_string();
                if server_id.is_empty() {
                    return Err(invalid("server id", "must not be empty"));
                }
                ProviderSettings::PowerDns {
                    api_url: parse_api_url(&raw)?,
                    api_key,
                    server_id,
                }
            }
            ProviderKind::Cloudflare => {
                let raw = non_blank(cli.api_url.as_ref())
                    .unwrap_or_else(|| DEFAULT_CLOUDFLARE_API_URL.to_string());
                let zone_id = non_blank(cli.zone_id.as_ref())
                    .ok_or_else(|| missing("zone id", "zone-id", "ZONESYNC_ZONE_ID"))?;
                ProviderSettings::Cloudflare {
                    api_url: parse_api_url(&raw)?,
                    api_token: api_key,
                    zone_id,
                }
            }
        };

        if cli.ttl == 0 {
            return Err(invalid("ttl", "must be greater than zero"));
        }
        if cli.timeout == 0 {
            return Err(invalid("timeout", "must be greater than zero"));
        }
        if !cli.records_dir.is_dir() {
            return Err(invalid(
                "records directory",
                format!("'{}' is not a directory", cli.records_dir.display()),
            ));
        }

        let mut protected = clean_list(&cli.protected);
        if protected.is_empty() {
            protected = DEFAULT_PROTECTED_NAMES.iter().map(ToString::to_string).collect();
        }

        Ok(Self {
            zone,
            records_dir: cli.records_dir.clone(),
            provider,
            protected,
            ttl: cli.ttl,
            timeout: Duration::from_secs(cli.timeout),
            dry_run: cli.dry_run,
            change_set: ChangeSet {
                added: clean_list(&cli.added),
                modified: clean_list(&cli.modified),
                deleted: clean_list(&cli.deleted),
            },
            metrics_file: cli.metrics_file.clone(),
        })
    }

    /// Policy consumed by the planning engine.
    #[must_use]
    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig::new(&self.zone)
            .with_protected(ProtectedNames::new(&self.protected, &self.zone))
            .with_default_ttl(self.ttl)
    }

    /// Incremental when a change-set was given, full otherwise.
    #[must_use]
    pub fn mode(&self) -> SyncMode {
        if self.change_set.is_empty() {
            SyncMode::Full
        } else {
            SyncMode::Incremental(self.change_set.clone())
        }
    }

    #[must_use]
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            mode: self.mode(),
            dry_run: self.dry_run,
            provider_timeout: self.timeout,
        }
    }

    /// Provider name for logs.
    #[must_use]
    pub fn provider_kind(&self) -> ProviderKind {
        match self.provider {
            ProviderSettings::PowerDns { .. } => ProviderKind::Powerdns,
            ProviderSettings::Cloudflare { .. } => ProviderKind::Cloudflare,
        }
    }

    /// Build the configured provider adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn build_provider(&self) -> Result<Box<dyn DnsProvider>, SyncError> {
        let provider: Box<dyn DnsProvider> = match &self.provider {
            ProviderSettings::PowerDns {
                api_url,
                api_key,
                server_id,
            } => Box::new(PowerDnsProvider::new(
                api_url.as_str(),
                server_id,
                &self.zone,
                api_key,
            )?),
            ProviderSettings::Cloudflare {
                api_url,
                api_token,
                zone_id,
            } => Box::new(CloudflareProvider::new(
                api_url.as_str(),
                zone_id,
                &self.zone,
                api_token,
            )?),
        };
        Ok(provider)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
