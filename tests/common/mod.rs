// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use std::fs;
use tempfile::TempDir;
use zonesync::provider::memory::MemoryProvider;
use zonesync::reconciler::{self, PolicyConfig, ReconcileReport, SyncOptions};
use zonesync::record::soa::SoaRecord;
use zonesync::record::{RRSet, RRSetRecord};
use zonesync::repository::FsRepository;

pub const ZONE: &str = "example.com";

/// A repository checked out into a temporary directory.
pub struct TestRepo {
    pub dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Write `<name>.json` holding `records` (JSON array body).
    pub fn write(&self, name: &str, records: &str) {
        let body = format!(r#"{{"owner": {{"username": "test"}}, "record": {records}}}"#);
        fs::write(self.dir.path().join(format!("{name}.json")), body).expect("write record file");
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.dir.path().join(format!("{name}.json"))).expect("remove record file");
    }

    pub fn source(&self) -> FsRepository {
        FsRepository::new(self.dir.path())
    }
}

pub fn rrset(name: &str, rtype: &str, contents: &[&str]) -> RRSet {
    RRSet {
        name: name.to_string(),
        rtype: rtype.to_string(),
        ttl: 3600,
        records: contents
            .iter()
            .map(|c| RRSetRecord {
                content: (*c).to_string(),
                disabled: false,
                priority: None,
            })
            .collect(),
    }
}

pub fn soa(serial: u32) -> SoaRecord {
    SoaRecord {
        mname: "ns1.example.com.".to_string(),
        rname: "hostmaster.example.com.".to_string(),
        serial,
        refresh: 10800,
        retry: 3600,
        expire: 604_800,
        minimum: 3600,
    }
}

pub fn day(year: i32, month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, d).expect("valid date")
}

pub fn today() -> NaiveDate {
    day(2026, 10, 19)
}

/// Run one full reconciliation and return its report.
pub async fn sync(
    repo: &TestRepo,
    provider: &MemoryProvider,
    policy: &PolicyConfig,
    options: &SyncOptions,
    today: NaiveDate,
) -> ReconcileReport {
    reconciler::run(policy, &repo.source(), provider, options, today)
        .await
        .expect("reconciliation run")
}
