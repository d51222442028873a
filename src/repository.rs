// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Repository loader: the desired side of a reconciliation.
//!
//! The repository is a directory of `<subdomain>.json` files, each shaped
//! `{ "owner": {...}, "record": [ { "type": "A", "value": "1.2.3.4" }, ... ] }`.
//! Invalid files and invalid records are skipped with a warning; they never
//! abort the run.

use crate::constants::{RECORD_FILE_EXTENSION, SCHEMA_FILE_NAME};
use crate::errors::{RecordFileError, SyncError};
use crate::record::name::subdomain_from_file_name;
use crate::record::{RecordDefinition, RecordFile};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Source of record files.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Enumerate record file names (never the schema file).
    async fn list_record_files(&self) -> Result<Vec<String>, SyncError>;

    /// Read and parse one record file.
    async fn read_record_file(&self, name: &str) -> Result<RecordFile, RecordFileError>;
}

/// Record files in a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsRepository {
    dir: PathBuf,
}

impl FsRepository {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl RecordSource for FsRepository {
    async fn list_record_files(&self) -> Result<Vec<String>, SyncError> {
        let repository_error = |e: std::io::Error| SyncError::Repository {
            dir: self.dir.display().to_string(),
            reason: e.to_string(),
        };

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(repository_error)?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(repository_error)? {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let is_record_file = std::path::Path::new(&name)
                .extension()
                .is_some_and(|ext| ext == RECORD_FILE_EXTENSION);
            if is_record_file && name != SCHEMA_FILE_NAME {
                files.push(name);
            }
        }

        files.sort();
        debug!(dir = %self.dir.display(), count = files.len(), "Listed record files");
        Ok(files)
    }

    async fn read_record_file(&self, name: &str) -> Result<RecordFile, RecordFileError> {
        let body = tokio::fs::read_to_string(self.dir.join(name))
            .await
            .map_err(|e| RecordFileError::Unreadable {
                file: name.to_string(),
                reason: e.to_string(),
            })?;
        RecordFile::parse(name, &body)
    }
}

/// Desired records loaded from a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredRecords {
    /// Valid definitions per subdomain
    pub records: BTreeMap<String, Vec<RecordDefinition>>,
    /// Files skipped because they failed validation
    pub skipped_files: usize,
    /// Individual records skipped because they failed validation
    pub skipped_records: usize,
    /// Subdomains whose file exists but could not be read or parsed
    pub unreadable_subdomains: BTreeSet<String>,
    /// Subdomains whose file exists but lies outside an incremental scope
    pub unloaded_subdomains: BTreeSet<String>,
}

/// Subdomains that have a record file in `source`, without reading the files.
///
/// # Errors
///
/// Returns an error if the file listing fails.
pub async fn list_subdomains(
    source: &dyn RecordSource,
    zone: &str,
) -> Result<BTreeSet<String>, SyncError> {
    Ok(source
        .list_record_files()
        .await?
        .iter()
        .filter_map(|file| subdomain_from_file_name(file, zone))
        .filter(|subdomain| !subdomain.chars().any(char::is_uppercase))
        .collect())
}

/// Load the desired records from `source`.
///
/// When `only` is given, just the files describing those subdomains are read
/// (incremental mode); otherwise every record file is.
///
/// # Errors
///
/// Returns an error only if the file listing itself fails; per-file and
/// per-record problems are logged and counted.
pub async fn load_desired(
    source: &dyn RecordSource,
    zone: &str,
    only: Option<&BTreeSet<String>>,
) -> Result<DesiredRecords, SyncError> {
    let files = source.list_record_files().await?;
    let mut desired = DesiredRecords::default();

    let mut selected = Vec::new();
    for file in files {
        let Some(subdomain) = subdomain_from_file_name(&file, zone) else {
            continue;
        };
        if subdomain.chars().any(char::is_uppercase) {
            let err = RecordFileError::UppercaseSubdomain {
                file: file.clone(),
                subdomain,
            };
            warn!("Skipping record file: {}", err);
            desired.skipped_files += 1;
            continue;
        }
        if only.is_some_and(|wanted| !wanted.contains(&subdomain)) {
            desired.unloaded_subdomains.insert(subdomain);
            continue;
        }
        selected.push((file, subdomain));
    }

    let reads = selected
        .iter()
        .map(|(file, _)| source.read_record_file(file));
    let results = join_all(reads).await;

    for ((file, subdomain), result) in selected.into_iter().zip(results) {
        let parsed = match result {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping record file: {}", e);
                desired.skipped_files += 1;
                desired.unreadable_subdomains.insert(subdomain);
                continue;
            }
        };

        let mut definitions = Vec::with_capacity(parsed.record.len());
        for raw in &parsed.record {
            match RecordDefinition::from_json(&subdomain, raw) {
                Ok(def) => definitions.push(def),
                Err(e) => {
                    warn!(file = %file, "Skipping record: {}", e);
                    desired.skipped_records += 1;
                }
            }
        }

        let entry = desired.records.entry(subdomain.clone()).or_default();
        if !entry.is_empty() {
            warn!(
                file = %file,
                subdomain = %subdomain,
                "Several record files describe the same subdomain; merging their records"
            );
        }
        entry.extend(definitions);
    }

    info!(
        subdomains = desired.records.len(),
        skipped_files = desired.skipped_files,
        skipped_records = desired.skipped_records,
        "Loaded desired records from repository"
    );

    Ok(desired)
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod repository_tests;
