// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `content.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_hostname_types_get_trailing_dot() {
        for rtype in ["CNAME", "MX", "NS", "SRV", "PTR", "ALIAS"] {
            assert_eq!(
                canonicalize(rtype, "host.example.com"),
                "host.example.com.",
                "{rtype} content should end with a dot"
            );
            assert_eq!(
                canonicalize(rtype, "host.example.com."),
                "host.example.com.",
                "{rtype} content should keep a single dot"
            );
        }
    }

    #[test]
    fn test_type_is_case_insensitive() {
        assert_eq!(canonicalize("cname", "target.example.net"), "target.example.net.");
    }

    #[test]
    fn test_ipv4_strips_leading_zeros() {
        assert_eq!(canonicalize("A", "010.001.000.100"), "10.1.0.100");
        assert_eq!(canonical_ipv4("1.2.3.4"), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn test_ipv4_rejects_invalid() {
        assert_eq!(canonical_ipv4("1.2.3"), None);
        assert_eq!(canonical_ipv4("1.2.3.4.5"), None);
        assert_eq!(canonical_ipv4("1.2.3.a"), None);
        assert_eq!(canonical_ipv4("1.2..4"), None);
        assert_eq!(canonical_ipv4("1.2.3.0004"), None);
        assert_eq!(canonical_ipv4("256.1.1.1"), None);
        assert_eq!(canonical_ipv4("-1.1.1.1"), None);
    }

    #[test]
    fn test_invalid_a_content_passes_through_canonicalize() {
        // Provider-side garbage must not be silently rewritten
        assert_eq!(canonicalize("A", "not-an-ip"), "not-an-ip");
    }

    #[test]
    fn test_txt_is_quoted_once() {
        assert_eq!(canonical_txt("v=spf1 -all"), "\"v=spf1 -all\"");
        assert_eq!(canonical_txt("\"v=spf1 -all\""), "\"v=spf1 -all\"");
        assert_eq!(canonical_txt(""), "\"\"");
    }

    #[test]
    fn test_txt_extracts_zone_file_fragment() {
        assert_eq!(
            canonical_txt("_dmarc 300 IN TXT \"v=DMARC1; p=none\""),
            "\"v=DMARC1; p=none\""
        );
        assert_eq!(
            canonical_txt("_github-challenge in txt abc123"),
            "\"abc123\""
        );
    }

    #[test]
    fn test_txt_does_not_extract_from_quoted_text() {
        // "IN TXT" inside the text itself is content, not a zone-file paste
        let content = "\"see the docs for IN TXT usage\"";
        assert_eq!(canonical_txt(content), content);
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let samples = [
            ("A", "001.002.003.004"),
            ("AAAA", "2001:db8::1"),
            ("CNAME", "target.example.com"),
            ("MX", "mail.example.com"),
            ("TXT", "www 3600 IN TXT \"hello world\""),
            ("TXT", "plain"),
            ("TXT", "\"a\" \"b\""),
            ("CAA", "0 issue \"letsencrypt.org\""),
        ];

        for (rtype, content) in samples {
            let once = canonicalize(rtype, content);
            let twice = canonicalize(rtype, &once);
            assert_eq!(once, twice, "{rtype} canonicalization of {content:?}");
        }
    }

    #[test]
    fn test_other_types_pass_through() {
        assert_eq!(canonicalize("AAAA", "2001:DB8::1"), "2001:DB8::1");
        assert_eq!(canonicalize("CAA", "0 issue \"ca.example\""), "0 issue \"ca.example\"");
    }
}
