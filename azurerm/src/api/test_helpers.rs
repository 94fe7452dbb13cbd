//! Test helpers for the ARM API

#[cfg(test)]
pub fn create_test_client(url: &str) -> super::Client {
    super::Client::with_config(
        url,
        super::Credential::StaticToken("test-token".to_string()),
        super::RetryConfig {
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            ..Default::default()
        },
    )
    .unwrap()
}
