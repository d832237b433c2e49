// Ambient request data handed to identification strategies

use axum::http::{header, request::Parts, HeaderMap, HeaderName};
use tenancy_models::hostname::normalize_fqdn;

/// The parts of an inbound request that tenant identification may look at.
#[derive(Debug, Clone, Default)]
pub struct RequestHost {
    host: String,
    secure: bool,
    path_and_query: String,
    headers: HeaderMap,
}

impl RequestHost {
    pub fn new(host: &str) -> Self {
        Self {
            host: normalize_fqdn(host),
            secure: false,
            path_and_query: "/".to_string(),
            headers: HeaderMap::new(),
        }
    }

    /// Build from request parts. The `Host` header wins over the URI
    /// authority. `x-forwarded-proto: https` marks the request secure only
    /// when `trust_forwarded_proto` is set.
    pub fn from_parts(parts: &Parts, trust_forwarded_proto: bool) -> Self {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.host())
            .unwrap_or_default();

        let secure = parts.uri.scheme_str() == Some("https")
            || trust_forwarded_proto
                && parts
                    .headers
                    .get("x-forwarded-proto")
                    .and_then(|v| v.to_str().ok())
                    .map(|proto| proto.eq_ignore_ascii_case("https"))
                    .unwrap_or(false);

        Self {
            host: normalize_fqdn(host),
            secure,
            path_and_query: parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".to_string()),
            headers: parts.headers.clone(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn secured(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn with_path(mut self, path_and_query: impl Into<String>) -> Self {
        self.path_and_query = path_and_query.into();
        self
    }

    /// Normalized host, without port
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn path_and_query(&self) -> &str {
        &self.path_and_query
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
