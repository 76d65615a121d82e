//! Tracing setup and the request/correlation id pattern, grounded on the
//! teacher's `observability/tracing.rs`.

use std::fmt;

use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Initializes the global tracing subscriber with JSON output and an
/// env-filter driven by `RUST_LOG` (defaulting to `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().with_target(true).init();
}

/// Identifies a single HTTP request for logs and the `X-Request-ID` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ties together requests that belong to the same logical session across
/// multiple agent calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_roundtrips_from_string() {
        let id = CorrelationId::from_string("session-42");
        assert_eq!(id.as_str(), "session-42");
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::new().as_str(), RequestId::new().as_str());
    }
}
