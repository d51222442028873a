// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `reconciler/mod.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::ProviderError;
    use crate::provider::memory::MemoryProvider;
    use crate::record::RRSetRecord;
    use crate::repository::FsRepository;
    use std::fs;
    use tempfile::TempDir;

    const ZONE: &str = "example.com";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn rrset(name: &str, rtype: &str, content: &str) -> RRSet {
        RRSet {
            name: name.to_string(),
            rtype: rtype.to_string(),
            ttl: 3600,
            records: vec![RRSetRecord {
                content: content.to_string(),
                disabled: false,
                priority: None,
            }],
        }
    }

    fn repo(files: &[(&str, &str)]) -> (TempDir, FsRepository) {
        let dir = TempDir::new().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        let repo = FsRepository::new(dir.path());
        (dir, repo)
    }

    fn a_file(ip: &str) -> String {
        format!(r#"{{"owner": {{}}, "record": [{{"type": "A", "value": "{ip}"}}]}}"#)
    }

    #[test]
    fn test_change_set_subdomains() {
        let changes = ChangeSet {
            added: vec!["records/new.json".to_string(), "README.md".to_string()],
            modified: vec![
                "records/Upper.json".to_string(),
                "records/schema.json".to_string(),
                "records/example.com.json".to_string(),
            ],
            deleted: vec!["old.example.com.json".to_string()],
        };

        let subdomains = changes.subdomains(ZONE);

        assert_eq!(
            subdomains,
            BTreeSet::from(["@".to_string(), "new".to_string(), "old".to_string()])
        );
        assert!(!changes.is_empty());
        assert!(ChangeSet::default().is_empty());
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(SyncMode::Full.label(), "full");
        assert_eq!(
            SyncMode::Incremental(ChangeSet::default()).label(),
            "incremental"
        );
    }

    #[tokio::test]
    async fn test_full_run_read_failure_writes_nothing() {
        let (_dir, repo) = repo(&[("test.json", &a_file("1.2.3.4"))]);
        let provider = MemoryProvider::new(ZONE);
        provider.set_fail_reads(true);

        let err = run(
            &PolicyConfig::new(ZONE),
            &repo,
            &provider,
            &SyncOptions::default(),
            today(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SyncError::Provider(ProviderError::Connection { .. })));
        assert!(provider.applied_batches().await.is_empty());
    }

    #[tokio::test]
    async fn test_full_run_read_timeout_is_not_an_empty_zone() {
        let (_dir, repo) = repo(&[("test.json", &a_file("1.2.3.4"))]);
        let provider = MemoryProvider::new(ZONE)
            .with_rrsets(vec![rrset("old.example.com.", "A", "10.0.0.1")])
            .with_read_delay(Duration::from_millis(200));
        let options = SyncOptions {
            provider_timeout: Duration::from_millis(20),
            ..SyncOptions::default()
        };

        let err = run(&PolicyConfig::new(ZONE), &repo, &provider, &options, today())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Provider(ProviderError::Timeout { .. })));
        assert!(provider.applied_batches().await.is_empty());
        assert_eq!(provider.rrsets().await.len(), 1);
    }

    #[tokio::test]
    async fn test_incremental_run_only_touches_changed_names() {
        let (_dir, repo) = repo(&[
            ("test.json", &a_file("1.2.3.4")),
            ("other.json", &a_file("5.6.7.8")),
        ]);
        let provider = MemoryProvider::new(ZONE).with_rrsets(vec![
            rrset("stale.example.com.", "A", "10.0.0.1"),
            rrset("gone.example.com.", "A", "10.0.0.2"),
        ]);
        let options = SyncOptions {
            mode: SyncMode::Incremental(ChangeSet {
                added: vec!["test.json".to_string()],
                deleted: vec!["gone.json".to_string()],
                ..ChangeSet::default()
            }),
            ..SyncOptions::default()
        };

        let report = run(&PolicyConfig::new(ZONE), &repo, &provider, &options, today())
            .await
            .unwrap();

        assert_eq!(report.mode, "incremental");
        assert_eq!(report.rrsets_replaced, 1);
        assert_eq!(report.rrsets_deleted, 1);
        assert!(report.is_success());

        let names: BTreeSet<String> = provider
            .rrsets()
            .await
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(
            names,
            BTreeSet::from([
                "stale.example.com.".to_string(),
                "test.example.com.".to_string()
            ])
        );
    }

    /// Zone whose per-name lookups always fail.
    struct FailingLookups(MemoryProvider);

    #[async_trait::async_trait]
    impl DnsProvider for FailingLookups {
        fn name(&self) -> &str {
            "failing"
        }

        fn granularity(&self) -> crate::provider::Granularity {
            self.0.granularity()
        }

        async fn fetch_all_managed_records(&self) -> Result<Vec<RRSet>, ProviderError> {
            self.0.fetch_all_managed_records().await
        }

        async fn fetch_records_for_name(&self, _fqdn: &str) -> Result<Vec<RRSet>, ProviderError> {
            Err(ProviderError::Connection {
                provider: "failing".to_string(),
                reason: "connection reset".to_string(),
            })
        }

        async fn fetch_soa(&self) -> Result<Option<SoaRecord>, ProviderError> {
            self.0.fetch_soa().await
        }

        async fn apply_batch(
            &self,
            ops: &[crate::record::RRSetOperation],
        ) -> Result<crate::provider::ApplyOutcome, ProviderError> {
            self.0.apply_batch(ops).await
        }
    }

    #[tokio::test]
    async fn test_incremental_lookup_failure_never_deletes() {
        let (_dir, repo) = repo(&[("test.json", &a_file("1.2.3.4"))]);
        let provider = FailingLookups(
            MemoryProvider::new(ZONE).with_rrsets(vec![rrset("gone.example.com.", "A", "10.0.0.2")]),
        );
        let options = SyncOptions {
            mode: SyncMode::Incremental(ChangeSet {
                modified: vec!["test.json".to_string()],
                deleted: vec!["gone.json".to_string()],
                ..ChangeSet::default()
            }),
            ..SyncOptions::default()
        };

        let report = run(&PolicyConfig::new(ZONE), &repo, &provider, &options, today())
            .await
            .unwrap();

        assert_eq!(report.rrsets_deleted, 0);
        assert_eq!(report.rrsets_replaced, 1);
        let names: BTreeSet<String> = provider
            .0
            .rrsets()
            .await
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert!(names.contains("gone.example.com."));
        assert!(names.contains("test.example.com."));
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_writing() {
        let (_dir, repo) = repo(&[("test.json", &a_file("1.2.3.4"))]);
        let provider = MemoryProvider::new(ZONE);
        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };

        let report = run(&PolicyConfig::new(ZONE), &repo, &provider, &options, today())
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.operations, 1);
        assert_eq!(report.outcome(), Ok(()));
        assert!(provider.rrsets().await.is_empty());
    }

    #[test]
    fn test_incremental_scope_adds_ancestors_and_protected_descendants() {
        let changed = BTreeSet::from(["x.app".to_string(), "api".to_string()]);
        let repository = BTreeSet::from(["app".to_string(), "other".to_string()]);
        let protected = ProtectedNames::new(["@", "www", "v1.api"], ZONE);

        let scope = incremental_scope(changed, &repository, &protected);

        assert_eq!(
            scope,
            BTreeSet::from([
                "api".to_string(),
                "app".to_string(),
                "v1.api".to_string(),
                "x.app".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn test_incremental_run_sees_descendant_files() {
        let (_dir, repo) = repo(&[
            ("app.json", r#"{"owner": {}, "record": [{"type": "CNAME", "value": "new.example.net"}]}"#),
            ("x.app.json", &a_file("10.0.0.1")),
        ]);
        let provider = MemoryProvider::new(ZONE).with_rrsets(vec![
            rrset("app.example.com.", "ALIAS", "old.example.net."),
            rrset("x.app.example.com.", "A", "10.0.0.1"),
        ]);
        let options = SyncOptions {
            mode: SyncMode::Incremental(ChangeSet {
                modified: vec!["app.json".to_string()],
                ..ChangeSet::default()
            }),
            ..SyncOptions::default()
        };

        run(&PolicyConfig::new(ZONE), &repo, &provider, &options, today())
            .await
            .unwrap();

        let batches = provider.applied_batches().await;
        assert_eq!(batches.len(), 1);
        assert!(batches[0]
            .iter()
            .all(|op| op.changetype == crate::record::ChangeType::Replace && op.rtype == "ALIAS"));
    }
}
