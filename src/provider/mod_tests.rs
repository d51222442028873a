// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the provider interface helpers

#[cfg(test)]
mod tests {
    use super::super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let result = with_timeout("test", "read", Duration::from_secs(1), async {
            Ok::<_, ProviderError>(42)
        })
        .await;

        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_with_timeout_maps_elapsed_to_timeout_error() {
        let result: Result<(), ProviderError> =
            with_timeout("slow", "read", Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(ProviderError::Timeout { ref provider, ref operation, .. })
                if provider == "slow" && operation == "read"
        ));
    }

    #[test]
    fn test_is_managed_type() {
        assert!(is_managed_type("A"));
        assert!(is_managed_type("ALIAS"));
        assert!(!is_managed_type("SOA"));
        assert!(!is_managed_type("ns"));
    }

    #[test]
    fn test_apply_outcome_all_succeeded() {
        let ops = vec![
            RRSetOperation::delete("a.example.com.", "A"),
            RRSetOperation::delete("b.example.com.", "A"),
        ];

        let outcome = ApplyOutcome::all_succeeded(&ops);
        assert_eq!(outcome.succeeded, 2);
        assert!(outcome.is_success());
    }
}
