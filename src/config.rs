//! Provider configuration and operation timeouts.
//!
//! The host hands the provider a JSON configuration block during `configure`;
//! [`ProviderConfig`] is its deserialized form. Resources that block on
//! remote provisioning carry a [`Timeouts`] attribute whose durations are
//! expressed as strings ("45m", "1h30m", "90s").

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Default control-plane endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://console.tidewave.dev/api/v1";

/// Default upper bound for waiting on service creation.
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(45 * 60);

/// Provider configuration supplied by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Project-scoped access key.
    pub access_key: String,
    /// Secret paired with the access key.
    pub secret_key: String,
    /// The project every managed object belongs to.
    pub project_id: String,
    /// Control-plane base URL override.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ProviderConfig {
    /// Deserialize the host's configure payload.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ProviderError> {
        let config: ProviderConfig = serde_json::from_value(value.clone())
            .map_err(|e| ProviderError::configuration(format!("invalid provider config: {}", e)))?;
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(ProviderError::configuration(
                "access_key and secret_key must be non-empty",
            ));
        }
        if config.project_id.is_empty() {
            return Err(ProviderError::configuration("project_id must be non-empty"));
        }
        Ok(config)
    }

    /// The control-plane base URL, defaulting when no override is set.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

/// Per-operation timeout overrides carried in resource state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Upper bound for the create operation's readiness wait.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
}

impl Timeouts {
    /// Resolve the create timeout, falling back to `default` when the
    /// override is absent or unparseable.
    pub fn create_or(&self, default: Duration) -> Duration {
        self.create
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(default)
    }
}

/// Parse a duration string made of `<number><unit>` segments, where unit is
/// one of `h`, `m`, `s`, `ms`. Returns `None` for anything else; callers
/// fall back to their default rather than failing the operation.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut digits = String::new();
    let mut seen_segment = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            return None;
        }
        let value: u64 = digits.parse().ok()?;
        digits.clear();

        let segment = match c {
            'h' => Duration::from_secs(value.checked_mul(3600)?),
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                Duration::from_millis(value)
            }
            'm' => Duration::from_secs(value.checked_mul(60)?),
            's' => Duration::from_secs(value),
            _ => return None,
        };
        total = total.checked_add(segment)?;
        seen_segment = true;
    }

    // Trailing digits without a unit make the whole string invalid.
    if !digits.is_empty() || !seen_segment {
        return None;
    }
    Some(total)
}
