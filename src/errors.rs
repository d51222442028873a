// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for zonesync.
//!
//! This module provides specialized error types for:
//! - Configuration problems detected before any I/O
//! - Record file parsing and validation (recovered locally, never fatal)
//! - DNS provider reads and writes (propagated to the caller)
//!
//! Validation errors are logged and the offending file or record is skipped.
//! Provider errors surface as a typed failure so the binary can exit non-zero.

use thiserror::Error;

/// Errors raised while building the runtime configuration.
///
/// These are always fatal and abort the run before any repository or
/// provider I/O takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was not supplied on the command line or in the environment
    #[error("Missing required setting '{setting}' (flag --{flag} or env {env})")]
    MissingSetting {
        /// Human-readable setting name
        setting: String,
        /// Command-line flag name without dashes
        flag: String,
        /// Environment variable name
        env: String,
    },

    /// A setting was supplied but its value cannot be used
    #[error("Invalid value for '{setting}': {reason}")]
    InvalidSetting {
        /// Human-readable setting name
        setting: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors for a single record definition inside an otherwise valid file.
///
/// The record is dropped with a warning and the rest of the file is kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The record type is not one the repository format allows
    #[error("Unsupported record type '{rtype}' for '{subdomain}'")]
    UnsupportedType {
        /// Subdomain owning the record
        subdomain: String,
        /// The offending type as authored
        rtype: String,
    },

    /// An A record whose value is not a dotted-quad IPv4 address
    #[error("Invalid IPv4 address '{value}' for '{subdomain}'")]
    InvalidIpv4 {
        /// Subdomain owning the record
        subdomain: String,
        /// The value as authored
        value: String,
    },

    /// An MX record missing its priority or exchange, or a non-MX record with an object value
    #[error("Malformed {rtype} value for '{subdomain}': {reason}")]
    MalformedValue {
        /// Subdomain owning the record
        subdomain: String,
        /// Record type as authored
        rtype: String,
        /// Explanation of what is malformed
        reason: String,
    },
}

/// Errors for a whole record file. The file is skipped with a warning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordFileError {
    /// The file could not be read from disk
    #[error("Failed to read record file '{file}': {reason}")]
    Unreadable {
        /// File name relative to the records directory
        file: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// The file is not valid JSON or does not have the `{ owner, record }` shape
    #[error("Malformed record file '{file}': {reason}")]
    Malformed {
        /// File name relative to the records directory
        file: String,
        /// Parser message
        reason: String,
    },

    /// The subdomain derived from the file name contains uppercase characters
    #[error("Record file '{file}' has an uppercase subdomain '{subdomain}'")]
    UppercaseSubdomain {
        /// File name relative to the records directory
        file: String,
        /// The derived subdomain
        subdomain: String,
    },

    /// The file holds no definitions or more than the allowed number
    #[error("Record file '{file}' holds {count} records (allowed {min}-{max})")]
    RecordCount {
        /// File name relative to the records directory
        file: String,
        /// Number of definitions found
        count: usize,
        /// Minimum allowed
        min: usize,
        /// Maximum allowed
        max: usize,
    },
}

/// Errors from DNS provider reads and writes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider call exceeded its time budget
    ///
    /// A timeout never means "no records": callers must not turn it into deletes.
    #[error("{provider} {operation} timed out after {timeout_secs}s")]
    Timeout {
        /// Provider name
        provider: String,
        /// Operation that timed out (e.g. "read", "apply")
        operation: String,
        /// Timeout in seconds
        timeout_secs: u64,
    },

    /// The provider answered with a non-success HTTP status
    #[error("{provider} returned HTTP {status} for {url}: {body}")]
    Http {
        /// Provider name
        provider: String,
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// The provider could not be reached
    #[error("Connection to {provider} failed: {reason}")]
    Connection {
        /// Provider name
        provider: String,
        /// Transport error message
        reason: String,
    },

    /// The provider answered with a body zonesync cannot interpret
    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse {
        /// Provider name
        provider: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// The configured zone does not exist on the provider
    #[error("Zone '{zone}' not found on {provider}")]
    ZoneNotFound {
        /// Provider name
        provider: String,
        /// Zone name
        zone: String,
    },
}

/// Composite error type returned by a reconciliation run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Configuration error (fatal before I/O)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Record file error
    #[error(transparent)]
    RecordFile(#[from] RecordFileError),

    /// Record definition error
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Provider read or write error
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Repository enumeration failed (e.g. the records directory is missing)
    #[error("Failed to list record files in '{dir}': {reason}")]
    Repository {
        /// Records directory
        dir: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// One or more write operations failed while the rest of the batch was applied
    #[error("{failed} of {total} provider operations failed")]
    PartialApply {
        /// Number of failed operations
        failed: usize,
        /// Total number of operations in the batch
        total: usize,
    },
}

impl SyncError {
    /// Returns true if this error is transient and the run should simply be retried.
    ///
    /// Transient errors include timeouts, connection failures, rate limiting and 5xx
    /// responses. Configuration and validation errors are permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider(
                ProviderError::Timeout { .. } | ProviderError::Connection { .. },
            )
            | Self::PartialApply { .. } => true,

            Self::Provider(ProviderError::Http { status, .. }) => {
                *status == 429 || (500..600).contains(status)
            }

            Self::Config(_)
            | Self::RecordFile(_)
            | Self::Record(_)
            | Self::Repository { .. }
            | Self::Provider(
                ProviderError::InvalidResponse { .. } | ProviderError::ZoneNotFound { .. },
            ) => false,
        }
    }

    /// Returns a stable, CamelCase reason code for logs and metrics labels.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Config(ConfigError::MissingSetting { .. }) => "MissingSetting",
            Self::Config(ConfigError::InvalidSetting { .. }) => "InvalidSetting",

            Self::RecordFile(RecordFileError::Unreadable { .. }) => "RecordFileUnreadable",
            Self::RecordFile(RecordFileError::Malformed { .. }) => "RecordFileMalformed",
            Self::RecordFile(RecordFileError::UppercaseSubdomain { .. }) => "UppercaseSubdomain",
            Self::RecordFile(RecordFileError::RecordCount { .. }) => "RecordCountOutOfRange",

            Self::Record(RecordError::UnsupportedType { .. }) => "UnsupportedRecordType",
            Self::Record(RecordError::InvalidIpv4 { .. }) => "InvalidIpv4",
            Self::Record(RecordError::MalformedValue { .. }) => "MalformedRecordValue",

            Self::Provider(ProviderError::Timeout { .. }) => "ProviderTimeout",
            Self::Provider(ProviderError::Http { .. }) => "ProviderHttpError",
            Self::Provider(ProviderError::Connection { .. }) => "ProviderUnreachable",
            Self::Provider(ProviderError::InvalidResponse { .. }) => "ProviderInvalidResponse",
            Self::Provider(ProviderError::ZoneNotFound { .. }) => "ZoneNotFound",

            Self::Repository { .. } => "RepositoryUnavailable",
            Self::PartialApply { .. } => "PartialApply",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
