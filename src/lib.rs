// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # zonesync - GitOps DNS reconciler
//!
//! zonesync keeps the records held by a DNS provider in sync with a repository of
//! JSON record files. The repository is the source of truth; every run computes the
//! minimal set of RRSet operations that makes the provider match it.
//!
//! ## Overview
//!
//! - Record files are loaded and validated; invalid files and records are skipped
//! - Provider records are read concurrently with the repository
//! - Both sides are reduced to canonical record signatures and diffed
//! - A policy layer turns the diff into safe RRSet operations (CNAME/ALIAS promotion,
//!   protected names, DELETE-before-REPLACE ordering, SOA serial bump)
//! - The batch is applied in one phase, or only logged under dry-run
//!
//! ## Modules
//!
//! - [`config`] - CLI / environment configuration
//! - [`record`] - Record model, canonicalization and SOA handling
//! - [`repository`] - Record file loader
//! - [`provider`] - DNS provider adapters (PowerDNS, Cloudflare, in-memory)
//! - [`reconciler`] - Signature index, diff engine, policy layer, planner, report
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use zonesync::reconciler::{plan_changes, PolicyConfig};
//! use zonesync::record::{RecordDefinition, RecordType, RecordValue};
//! use zonesync::repository::DesiredRecords;
//!
//! let mut desired = DesiredRecords::default();
//! desired.records.insert(
//!     "test".to_string(),
//!     vec![RecordDefinition {
//!         rtype: RecordType::A,
//!         value: RecordValue::Text("1.2.3.4".to_string()),
//!     }],
//! );
//!
//! let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
//! let plan = plan_changes(&desired, &[], None, &PolicyConfig::new("example.com"), today);
//!
//! assert_eq!(plan.operations.len(), 1);
//! assert_eq!(plan.operations[0].name, "test.example.com.");
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod metrics;
pub mod provider;
pub mod reconciler;
pub mod record;
pub mod repository;
