//! Classification of raw backend failures into the canonical taxonomy.
//!
//! Provider diagnostics frequently arrive as a JSON document whose `message`
//! field is itself another JSON-encoded error envelope. [`extract_nested_message`]
//! digs out the innermost human-readable string and the most specific numeric
//! code before classification runs.
//!
//! ```rust
//! use mprovider::{normalize, ErrorKind, ProviderId};
//!
//! let error = normalize(
//!     r#"{"error":{"message":"API key not valid","code":403}}"#,
//!     None,
//!     ProviderId::Gemini,
//! );
//! assert_eq!(error.kind, ErrorKind::Auth);
//! assert_eq!(error.status, Some(403));
//! ```

use std::error::Error;

use serde_json::Value;

use crate::{ErrorKind, ProviderError, ProviderId};

/// Digs the innermost diagnostic string and numeric code out of a raw error
/// message that may wrap JSON inside JSON an arbitrary (finite) number of
/// times.
///
/// At each level the substring from the first `{` through the last `}` is
/// parsed; when the parse succeeds the `error` object (or the top-level
/// object) is consulted for `message` and `code`, and extraction recurses on
/// the inner `message`. A deeper `code` overwrites a shallower one. As soon
/// as parsing fails or no nested `message` exists, the current string is the
/// leaf and is returned unchanged. Each recursion step shrinks the working
/// string, so extraction terminates on any finite input.
pub fn extract_nested_message(raw: &str) -> (String, Option<u16>) {
    let mut current = raw.to_string();
    let mut code = None;

    loop {
        let Some(start) = current.find('{') else {
            break;
        };
        let Some(end) = current.rfind('}') else {
            break;
        };
        if end <= start {
            break;
        }

        let Ok(parsed) = serde_json::from_str::<Value>(&current[start..=end]) else {
            break;
        };

        let node = match parsed.get("error") {
            Some(inner) if inner.is_object() => inner,
            _ => &parsed,
        };

        if let Some(inner_code) = node
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|value| u16::try_from(value).ok())
        {
            code = Some(inner_code);
        }

        match node.get("message").and_then(Value::as_str) {
            Some(inner) => current = inner.to_string(),
            None => break,
        }
    }

    (current, code)
}

type TextRule = (fn(&str) -> bool, ErrorKind);

/// Ordered message heuristics, evaluated once per normalization. First match
/// wins; quota wording is checked before rate limiting because provider
/// quota failures often arrive with 429-style phrasing.
const TEXT_RULES: &[TextRule] = &[
    (is_network_text, ErrorKind::Network),
    (is_quota_text, ErrorKind::Quota),
    (is_content_filter_text, ErrorKind::ContentFilter),
    (is_context_length_text, ErrorKind::ContextLength),
    (is_rate_limit_text, ErrorKind::RateLimit),
    (is_auth_text, ErrorKind::Auth),
    (is_model_unavailable_text, ErrorKind::ModelUnavailable),
    (is_server_text, ErrorKind::Server),
];

fn is_network_text(message: &str) -> bool {
    ["network", "connection", "connect error", "dns", "socket", "timed out", "timeout"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn is_quota_text(message: &str) -> bool {
    message.contains("quota") || message.contains("billing")
}

fn is_content_filter_text(message: &str) -> bool {
    ["safety", "blocked", "content filter", "prohibited content"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn is_context_length_text(message: &str) -> bool {
    ["context length", "context window", "token limit", "too many tokens", "input too long"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn is_rate_limit_text(message: &str) -> bool {
    message.contains("rate limit")
        || message.contains("resource_exhausted")
        || message.contains("too many requests")
}

fn is_auth_text(message: &str) -> bool {
    ["api key", "unauthorized", "unauthenticated", "permission denied", "forbidden"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn is_model_unavailable_text(message: &str) -> bool {
    (message.contains("model") && (message.contains("not found") || message.contains("not supported")))
        || message.contains("model_not_found")
}

fn is_server_text(message: &str) -> bool {
    message.contains("internal error") || message.contains("internal server error")
}

fn classify_text(message: &str) -> ErrorKind {
    let lowered = message.to_ascii_lowercase();
    TEXT_RULES
        .iter()
        .find(|(predicate, _)| predicate(&lowered))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

fn classify_status(status: u16, message: &str) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::Auth,
        402 => ErrorKind::Quota,
        404 => ErrorKind::ModelUnavailable,
        408 => ErrorKind::Network,
        429 => {
            if is_quota_text(&message.to_ascii_lowercase()) {
                ErrorKind::Quota
            } else {
                ErrorKind::RateLimit
            }
        }
        400 | 422 => {
            if is_context_length_text(&message.to_ascii_lowercase()) {
                ErrorKind::ContextLength
            } else {
                ErrorKind::Validation
            }
        }
        500..=599 => ErrorKind::Server,
        _ => classify_text(message),
    }
}

/// Normalizes a raw diagnostic string (plus an optional transport-level
/// status code) into a [`ProviderError`].
///
/// The status embedded in the innermost error envelope wins over the outer
/// transport status when both are present.
pub fn normalize(raw: &str, status: Option<u16>, provider: ProviderId) -> ProviderError {
    let (leaf, embedded_code) = extract_nested_message(raw);
    let status = embedded_code.or(status);

    let kind = match status {
        Some(code) => classify_status(code, &leaf),
        None => classify_text(&leaf),
    };

    let mut error = ProviderError::new(kind, leaf).with_provider(provider);
    if let Some(code) = status {
        error = error.with_status(code);
    }

    error
}

/// Normalizes an arbitrary error value, keeping it attached as the opaque
/// diagnostic source. An already-normalized [`ProviderError`] would lose its
/// classification here; callers pass those through instead.
pub fn normalize_source<E>(error: E, provider: ProviderId) -> ProviderError
where
    E: Error + Send + Sync + 'static,
{
    let raw = error.to_string();
    normalize(&raw, None, provider).with_source(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_returns_plain_strings_unchanged() {
        let (leaf, code) = extract_nested_message("connection refused");
        assert_eq!(leaf, "connection refused");
        assert_eq!(code, None);
    }

    #[test]
    fn extract_survives_malformed_and_truncated_json() {
        for raw in [
            "{not json at all}",
            r#"{"error":{"message":"unterminated"#,
            "{}",
            "{ } trailing",
            "prefix { mismatched ] } suffix",
        ] {
            let (leaf, code) = extract_nested_message(raw);
            assert_eq!(leaf, raw, "input must fall through unchanged: {raw}");
            assert_eq!(code, None);
        }
    }

    #[test]
    fn extract_unwraps_single_error_envelope() {
        let raw = r#"{"error":{"message":"API key not valid","code":400,"status":"INVALID_ARGUMENT"}}"#;
        let (leaf, code) = extract_nested_message(raw);
        assert_eq!(leaf, "API key not valid");
        assert_eq!(code, Some(400));
    }

    #[test]
    fn extract_recurses_to_arbitrary_finite_depth() {
        let mut payload = "deepest diagnostic".to_string();
        for depth in 0..5 {
            let encoded = serde_json::to_string(&payload).expect("encode payload");
            payload = format!(r#"{{"error":{{"message":{encoded},"code":{}}}}}"#, 500 + depth);
        }

        let (leaf, code) = extract_nested_message(&payload);
        assert_eq!(leaf, "deepest diagnostic");
        // The innermost envelope was built first, with code 500.
        assert_eq!(code, Some(500));
    }

    #[test]
    fn innermost_code_wins_over_outer_code() {
        // Doubly-encoded envelope: outer code 500, inner code 429.
        let raw = "{\"error\":{\"message\":\"{\\\"error\\\":{\\\"message\\\":\\\"quota exceeded\\\",\\\"code\\\":429}}\",\"code\":500}}";
        let (leaf, code) = extract_nested_message(raw);
        assert_eq!(leaf, "quota exceeded");
        assert_eq!(code, Some(429));
    }

    #[test]
    fn outer_code_is_kept_when_inner_envelope_has_none() {
        let raw = "{\"error\":{\"message\":\"{\\\"error\\\":{\\\"message\\\":\\\"upstream hiccup\\\"}}\",\"code\":503}}";
        let (leaf, code) = extract_nested_message(raw);
        assert_eq!(leaf, "upstream hiccup");
        assert_eq!(code, Some(503));
    }

    #[test]
    fn extract_reads_top_level_message_without_error_wrapper() {
        let raw = r#"{"message":"bare diagnostic","code":418}"#;
        let (leaf, code) = extract_nested_message(raw);
        assert_eq!(leaf, "bare diagnostic");
        assert_eq!(code, Some(418));
    }

    #[test]
    fn normalize_classifies_by_embedded_code_over_transport_status() {
        let raw = "{\"error\":{\"message\":\"{\\\"error\\\":{\\\"message\\\":\\\"quota exceeded\\\",\\\"code\\\":429}}\",\"code\":500}}";
        let error = normalize(raw, Some(500), ProviderId::Gemini);

        assert_eq!(error.message, "quota exceeded");
        assert_eq!(error.status, Some(429));
        // 429 with quota wording classifies as quota, not rate limiting.
        assert_eq!(error.kind, ErrorKind::Quota);
        assert_eq!(error.provider, Some(ProviderId::Gemini));
    }

    #[test]
    fn normalize_maps_statuses_to_kinds() {
        let cases = [
            (401, "bad key", ErrorKind::Auth),
            (403, "permission denied", ErrorKind::Auth),
            (402, "payment required", ErrorKind::Quota),
            (404, "model missing", ErrorKind::ModelUnavailable),
            (408, "request timeout", ErrorKind::Network),
            (429, "too many requests", ErrorKind::RateLimit),
            (400, "bad request body", ErrorKind::Validation),
            (400, "input too long for context window", ErrorKind::ContextLength),
            (500, "oops", ErrorKind::Server),
            (503, "overloaded", ErrorKind::Server),
        ];

        for (status, message, expected) in cases {
            let error = normalize(message, Some(status), ProviderId::Gemini);
            assert_eq!(error.kind, expected, "status {status} / {message}");
        }
    }

    #[test]
    fn normalize_falls_back_to_text_heuristics_without_status() {
        let cases = [
            ("network is unreachable", ErrorKind::Network),
            ("connection reset by peer", ErrorKind::Network),
            ("quota exceeded for project", ErrorKind::Quota),
            ("response blocked for safety reasons", ErrorKind::ContentFilter),
            ("prompt exceeds the model token limit", ErrorKind::ContextLength),
            ("RESOURCE_EXHAUSTED: slow down", ErrorKind::RateLimit),
            ("API key not valid", ErrorKind::Auth),
            ("model gemma-7b not found", ErrorKind::ModelUnavailable),
            ("internal error encountered", ErrorKind::Server),
            ("something inexplicable", ErrorKind::Unknown),
        ];

        for (message, expected) in cases {
            let error = normalize(message, None, ProviderId::Gemini);
            assert_eq!(error.kind, expected, "{message}");
        }
    }

    #[test]
    fn unknown_remains_retriable_by_default() {
        let error = normalize("gremlins", None, ProviderId::Gemini);
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert!(error.retriable);
    }

    #[test]
    fn normalize_source_preserves_the_original_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let error = normalize_source(io, ProviderId::Gemini);

        assert_eq!(error.kind, ErrorKind::Network);
        let source = std::error::Error::source(&error).expect("source should be kept");
        assert!(source.to_string().contains("connection refused"));
    }
}
