//! Retryable-failure classification.
//!
//! Transport failures are recognised by matching well-known fragments in
//! the error text, case-insensitively. Anything that does not match is
//! fatal (HTTP 4xx/5xx with a body, authorisation failures, ...).

/// Error text fragments that mark a failure as transient.
pub const RETRYABLE_MARKERS: [&str; 8] = [
    "network error",
    "err_incomplete_chunked_encoding",
    "err_connection_reset",
    "err_connection_aborted",
    "fetch_error",
    "abort",
    "timeout",
    "streaming error",
];

/// Whether an error with this text should be retried.
pub fn is_retryable(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    RETRYABLE_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_are_retryable() {
        assert!(is_retryable("network error"));
        assert!(is_retryable("Network Error: connection refused"));
        assert!(is_retryable("net::ERR_INCOMPLETE_CHUNKED_ENCODING"));
        assert!(is_retryable("ERR_CONNECTION_RESET"));
        assert!(is_retryable("The operation was aborted"));
        assert!(is_retryable("Request timeout"));
        assert!(is_retryable("Streaming error: body closed"));
    }

    #[test]
    fn test_http_errors_are_fatal() {
        assert!(!is_retryable("HTTP 403: Forbidden"));
        assert!(!is_retryable("HTTP 401: Unauthorized"));
        assert!(!is_retryable("HTTP 500: Internal Server Error"));
        assert!(!is_retryable(""));
    }
}
