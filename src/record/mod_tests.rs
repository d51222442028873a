// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the record model

#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;

    #[test]
    fn test_record_type_parse_is_case_insensitive() {
        assert_eq!("cname".parse::<RecordType>(), Ok(RecordType::CNAME));
        assert_eq!(" Aaaa ".parse::<RecordType>(), Ok(RecordType::AAAA));
        assert_eq!("SRV".parse::<RecordType>(), Err("SRV".to_string()));
    }

    #[test]
    fn test_definition_from_json_a() {
        let def = RecordDefinition::from_json("test", &json!({"type": "a", "value": "1.2.3.4"}))
            .unwrap();

        assert_eq!(def.rtype, RecordType::A);
        assert_eq!(def.value, RecordValue::Text("1.2.3.4".to_string()));
    }

    #[test]
    fn test_definition_from_json_invalid_ipv4() {
        let err = RecordDefinition::from_json("test", &json!({"type": "A", "value": "1.2.3"}))
            .unwrap_err();

        assert!(matches!(err, RecordError::InvalidIpv4 { .. }));
    }

    #[test]
    fn test_definition_from_json_mx() {
        let def = RecordDefinition::from_json(
            "@",
            &json!({"type": "MX", "value": {"priority": 10, "exchange": "mx.example.net"}}),
        )
        .unwrap();

        assert_eq!(
            def.value,
            RecordValue::Mx {
                priority: 10,
                exchange: "mx.example.net".to_string()
            }
        );
    }

    #[test]
    fn test_definition_from_json_mx_missing_exchange() {
        let err = RecordDefinition::from_json("@", &json!({"type": "MX", "value": {"priority": 10}}))
            .unwrap_err();

        assert!(matches!(err, RecordError::MalformedValue { .. }));
    }

    #[test]
    fn test_definition_from_json_mx_priority_out_of_range() {
        let err = RecordDefinition::from_json(
            "@",
            &json!({"type": "MX", "value": {"priority": 70000, "exchange": "mx.example.net"}}),
        )
        .unwrap_err();

        assert!(err.to_string().contains("0-65535"));
    }

    #[test]
    fn test_definition_from_json_mx_string_value_rejected() {
        let err = RecordDefinition::from_json("@", &json!({"type": "MX", "value": "mx.example.net"}))
            .unwrap_err();

        assert!(matches!(err, RecordError::MalformedValue { .. }));
    }

    #[test]
    fn test_definition_from_json_object_value_for_non_mx() {
        let err = RecordDefinition::from_json(
            "www",
            &json!({"type": "CNAME", "value": {"priority": 1, "exchange": "x"}}),
        )
        .unwrap_err();

        assert!(matches!(err, RecordError::MalformedValue { .. }));
    }

    #[test]
    fn test_definition_from_json_unsupported_type() {
        let err = RecordDefinition::from_json("www", &json!({"type": "SRV", "value": "x"}))
            .unwrap_err();

        assert_eq!(
            err,
            RecordError::UnsupportedType {
                subdomain: "www".to_string(),
                rtype: "SRV".to_string()
            }
        );
    }

    #[test]
    fn test_definition_from_json_missing_type() {
        let err = RecordDefinition::from_json("www", &json!({"value": "x"})).unwrap_err();
        assert!(matches!(err, RecordError::MalformedValue { .. }));
    }

    #[test]
    fn test_signature_key_without_priority() {
        let def = RecordDefinition {
            rtype: RecordType::CNAME,
            value: RecordValue::Text("host.example.com".to_string()),
        };

        assert_eq!(def.signature("app").key(), "app:CNAME:host.example.com.");
    }

    #[test]
    fn test_signature_key_with_priority() {
        let def = RecordDefinition {
            rtype: RecordType::MX,
            value: RecordValue::Mx {
                priority: 5,
                exchange: "mx.example.net".to_string(),
            },
        };

        let signature = def.signature("@");
        assert_eq!(signature.key(), "@:MX:mx.example.net.:5");
        assert_eq!(signature.rrset_key(), RRSetKey::new("@", "MX"));
    }

    #[test]
    fn test_signature_uses_canonical_content() {
        let authored = RecordDefinition {
            rtype: RecordType::TXT,
            value: RecordValue::Text("hello".to_string()),
        };
        let quoted = RecordDefinition {
            rtype: RecordType::TXT,
            value: RecordValue::Text("\"hello\"".to_string()),
        };

        assert_eq!(authored.signature("x"), quoted.signature("x"));
    }

    #[test]
    fn test_record_file_parse() {
        let body = r#"{"owner": {"username": "alice"}, "record": [{"type": "A", "value": "1.2.3.4"}]}"#;
        let file = RecordFile::parse("test.json", body).unwrap();

        assert_eq!(file.record.len(), 1);
        assert_eq!(file.owner["username"], "alice");
    }

    #[test]
    fn test_record_file_missing_record_array() {
        let err = RecordFile::parse("test.json", r#"{"owner": {}}"#).unwrap_err();
        assert!(matches!(err, RecordFileError::Malformed { .. }));
    }

    #[test]
    fn test_record_file_record_not_an_array() {
        let err = RecordFile::parse("test.json", r#"{"owner": {}, "record": "A"}"#).unwrap_err();
        assert!(matches!(err, RecordFileError::Malformed { .. }));
    }

    #[test]
    fn test_record_file_empty_record_array() {
        let err = RecordFile::parse("test.json", r#"{"owner": {}, "record": []}"#).unwrap_err();
        assert!(matches!(err, RecordFileError::RecordCount { count: 0, .. }));
    }

    #[test]
    fn test_record_file_too_many_records() {
        let records: Vec<serde_json::Value> = (0..11)
            .map(|i| json!({"type": "TXT", "value": format!("v{i}")}))
            .collect();
        let body = json!({"owner": {}, "record": records}).to_string();

        let err = RecordFile::parse("big.json", &body).unwrap_err();
        assert!(matches!(err, RecordFileError::RecordCount { count: 11, .. }));
    }

    #[test]
    fn test_operation_serializes_like_rrset_patch() {
        let op = RRSetOperation::replace(
            "test.example.com.",
            "A",
            3600,
            vec![RRSetRecord {
                content: "1.2.3.4".to_string(),
                disabled: false,
                priority: None,
            }],
        );

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "test.example.com.",
                "type": "A",
                "ttl": 3600,
                "changetype": "REPLACE",
                "records": [{"content": "1.2.3.4", "disabled": false}]
            })
        );
    }

    #[test]
    fn test_operation_display() {
        let op = RRSetOperation::delete("old.example.com.", "A");
        assert_eq!(op.to_string(), "DELETE old.example.com. A");
    }

    #[test]
    fn test_change_type_orders_delete_first() {
        assert!(ChangeType::Delete < ChangeType::Replace);
    }
}
