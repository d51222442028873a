// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `powerdns.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ZONE_PATH: &str = "/api/v1/servers/localhost/zones/example.com.";

    fn zone_body() -> serde_json::Value {
        json!({
            "name": "example.com.",
            "serial": 2_025_010_101u32,
            "rrsets": [
                {
                    "name": "example.com.",
                    "type": "SOA",
                    "ttl": 86400,
                    "records": [{
                        "content": "ns1.example.com. hostmaster.example.com. 2025010101 10800 3600 604800 3600",
                        "disabled": false
                    }]
                },
                {
                    "name": "example.com.",
                    "type": "NS",
                    "ttl": 86400,
                    "records": [{ "content": "ns1.example.com.", "disabled": false }]
                },
                {
                    "name": "www.example.com.",
                    "type": "A",
                    "ttl": 3600,
                    "records": [{ "content": "10.0.0.1", "disabled": false }],
                    "comments": []
                },
                {
                    "name": "example.com.",
                    "type": "MX",
                    "ttl": 3600,
                    "records": [{ "content": "10 mail.example.com.", "disabled": false }]
                }
            ]
        })
    }

    async fn setup() -> (MockServer, PowerDnsProvider) {
        let server = MockServer::start().await;
        let provider =
            PowerDnsProvider::new(&server.uri(), "localhost", "example.com", "secret").unwrap();
        (server, provider)
    }

    #[test]
    fn test_from_wire_splits_mx_priority() {
        let rrset = from_wire(PdnsRRSet {
            name: "Example.COM.".to_string(),
            rtype: "mx".to_string(),
            ttl: Some(300),
            changetype: None,
            records: vec![PdnsRecord {
                content: "20 mx2.example.com.".to_string(),
                disabled: false,
            }],
        });

        assert_eq!(rrset.name, "example.com.");
        assert_eq!(rrset.rtype, "MX");
        assert_eq!(rrset.records[0].content, "mx2.example.com.");
        assert_eq!(rrset.records[0].priority, Some(20));
    }

    #[test]
    fn test_from_wire_keeps_txt_content_intact() {
        let rrset = from_wire(PdnsRRSet {
            name: "example.com.".to_string(),
            rtype: "TXT".to_string(),
            ttl: Some(300),
            changetype: None,
            records: vec![PdnsRecord {
                content: "\"10 reasons\"".to_string(),
                disabled: false,
            }],
        });

        assert_eq!(rrset.records[0].content, "\"10 reasons\"");
        assert_eq!(rrset.records[0].priority, None);
    }

    #[test]
    fn test_to_wire_renders_mx_and_delete() {
        let replace = RRSetOperation::replace(
            "example.com.",
            "MX",
            3600,
            vec![RRSetRecord {
                content: "mail.example.com.".to_string(),
                disabled: false,
                priority: Some(10),
            }],
        );
        let wire = to_wire(&replace);
        assert_eq!(wire.changetype.as_deref(), Some("REPLACE"));
        assert_eq!(wire.ttl, Some(3600));
        assert_eq!(wire.records[0].content, "10 mail.example.com.");

        let wire = to_wire(&RRSetOperation::delete("old.example.com.", "A"));
        assert_eq!(wire.changetype.as_deref(), Some("DELETE"));
        assert_eq!(wire.ttl, None);
        assert!(wire.records.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_managed_records_excludes_soa_and_ns() {
        let (server, provider) = setup().await;

        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .and(header("X-API-Key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(zone_body()))
            .mount(&server)
            .await;

        let rrsets = provider.fetch_all_managed_records().await.unwrap();

        assert_eq!(rrsets.len(), 2);
        assert!(rrsets.iter().all(|r| r.rtype != "SOA" && r.rtype != "NS"));
        let mx = rrsets.iter().find(|r| r.rtype == "MX").unwrap();
        assert_eq!(mx.records[0].priority, Some(10));
    }

    #[tokio::test]
    async fn test_fetch_records_for_name_filters_by_name() {
        let (server, provider) = setup().await;

        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .and(query_param("rrset_name", "www.example.com."))
            .respond_with(ResponseTemplate::new(200).set_body_json(zone_body()))
            .mount(&server)
            .await;

        let rrsets = provider
            .fetch_records_for_name("WWW.example.com")
            .await
            .unwrap();

        assert_eq!(rrsets.len(), 1);
        assert_eq!(rrsets[0].name, "www.example.com.");
        assert_eq!(rrsets[0].records[0].content, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_fetch_soa() {
        let (server, provider) = setup().await;

        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .and(query_param("rrset_name", "example.com."))
            .and(query_param("rrset_type", "SOA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(zone_body()))
            .expect(1)
            .mount(&server)
            .await;

        let soa = provider.fetch_soa().await.unwrap().unwrap();
        assert_eq!(soa.mname, "ns1.example.com.");
        assert_eq!(soa.serial, 2_025_010_101);
    }

    /// Records and SOA come from a single zone read
    #[tokio::test]
    async fn test_fetch_zone_reads_once() {
        let (server, provider) = setup().await;

        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(zone_body()))
            .expect(1)
            .mount(&server)
            .await;

        let zone = provider.fetch_zone().await.unwrap();

        assert_eq!(zone.rrsets.len(), 2);
        assert_eq!(zone.soa.map(|s| s.serial), Some(2_025_010_101));
    }

    #[tokio::test]
    async fn test_missing_zone_maps_to_zone_not_found() {
        let (server, provider) = setup().await;

        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("Could not find domain"))
            .mount(&server)
            .await;

        let err = provider.fetch_all_managed_records().await.unwrap_err();
        assert!(matches!(err, ProviderError::ZoneNotFound { ref zone, .. } if zone == "example.com."));
    }

    #[tokio::test]
    async fn test_transient_read_error_is_retried() {
        let (server, provider) = setup().await;

        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(zone_body()))
            .mount(&server)
            .await;

        let rrsets = provider.fetch_all_managed_records().await.unwrap();
        assert_eq!(rrsets.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_batch_sends_single_patch() {
        let (server, provider) = setup().await;

        let ops = vec![
            RRSetOperation::delete("old.example.com.", "A"),
            RRSetOperation::replace(
                "www.example.com.",
                "A",
                3600,
                vec![RRSetRecord {
                    content: "10.0.0.2".to_string(),
                    disabled: false,
                    priority: None,
                }],
            ),
        ];

        Mock::given(method("PATCH"))
            .and(path(ZONE_PATH))
            .and(header("X-API-Key", "secret"))
            .and(body_json(json!({
                "rrsets": [
                    { "name": "old.example.com.", "type": "A", "changetype": "DELETE", "records": [] },
                    {
                        "name": "www.example.com.",
                        "type": "A",
                        "ttl": 3600,
                        "changetype": "REPLACE",
                        "records": [{ "content": "10.0.0.2", "disabled": false }]
                    }
                ]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = provider.apply_batch(&ops).await.unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_apply_batch_rejected_fails_whole_batch() {
        let (server, provider) = setup().await;

        Mock::given(method("PATCH"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(422).set_body_string("RRset conflicts"))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider
            .apply_batch(&[RRSetOperation::delete("old.example.com.", "A")])
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Http { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_apply_empty_batch_makes_no_request() {
        let (server, provider) = setup().await;

        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = provider.apply_batch(&[]).await.unwrap();
        assert_eq!(outcome.succeeded, 0);
    }
}
