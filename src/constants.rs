// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for zonesync.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Naming Constants
// ============================================================================

/// Sentinel subdomain denoting the zone apex
pub const APEX: &str = "@";

/// Record types whose content is a hostname and must end with a trailing dot
pub const HOSTNAME_CONTENT_TYPES: [&str; 5] = ["CNAME", "MX", "NS", "SRV", "PTR"];

/// Record types the reconciler never manages (provider-owned infrastructure)
pub const UNMANAGED_RECORD_TYPES: [&str; 2] = ["SOA", "NS"];

/// Provider pseudo-type used in place of CNAME at the apex or beside other types
pub const ALIAS_RECORD_TYPE: &str = "ALIAS";

/// Names protected from deletion when no explicit list is configured
pub const DEFAULT_PROTECTED_NAMES: [&str; 2] = ["@", "www"];

// ============================================================================
// TTL Constants
// ============================================================================

/// TTL applied to every REPLACE operation (1 hour)
pub const DEFAULT_RECORD_TTL_SECS: u32 = 3600;

/// TTL applied to the SOA RRSet when the serial is bumped (1 day)
pub const SOA_TTL_SECS: u32 = 86400;

// ============================================================================
// Repository Constants
// ============================================================================

/// Default directory holding the record files
pub const DEFAULT_RECORDS_DIR: &str = "records";

/// Extension of record files
pub const RECORD_FILE_EXTENSION: &str = "json";

/// JSON schema file living next to the record files; never a record file itself
pub const SCHEMA_FILE_NAME: &str = "schema.json";

/// Minimum number of record definitions in one file
pub const MIN_RECORDS_PER_FILE: usize = 1;

/// Maximum number of record definitions in one file
pub const MAX_RECORDS_PER_FILE: usize = 10;

// ============================================================================
// Provider Constants
// ============================================================================

/// Upper bound for every provider I/O call (30 seconds)
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Default PowerDNS server id
pub const DEFAULT_POWERDNS_SERVER_ID: &str = "localhost";

/// Default Cloudflare API base URL
pub const DEFAULT_CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Page size used when listing Cloudflare DNS records
pub const CLOUDFLARE_PAGE_SIZE: u32 = 100;
