//! Connection target: the per-user WebSocket endpoint.

use url::Url;

use crate::constants::WS_PATH_PREFIX;

/// Errors in a host-supplied connection target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("user id is empty")]
    EmptyUserId,

    #[error("user id contains invalid characters: {0}")]
    InvalidUserId(String),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme `{0}` (expected ws or wss)")]
    UnsupportedScheme(String),
}

/// Resolved endpoint for one user's notification socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    user_id: String,
    url: Url,
}

impl ConnectTarget {
    /// Builds `{ws|wss}://{host}/ws/{user_id}`.
    ///
    /// `secure` mirrors whether the hosting page/app is served over TLS.
    pub fn for_host(host: &str, secure: bool, user_id: &str) -> Result<Self, ConfigError> {
        let scheme = if secure { "wss" } else { "ws" };
        Self::with_base(&format!("{scheme}://{host}"), user_id)
    }

    /// Builds `{base}/ws/{user_id}` from an explicit base URL override.
    pub fn with_base(base: &str, user_id: &str) -> Result<Self, ConfigError> {
        validate_user_id(user_id)?;
        let base = base.trim_end_matches('/');
        let url = Url::parse(&format!("{base}{WS_PATH_PREFIX}/{user_id}"))
            .map_err(|e| ConfigError::InvalidUrl(format!("{base}: {e}")))?;
        Self::from_parts(user_id, url)
    }

    /// Wraps an already-resolved URL, checking only scheme and user id.
    pub fn from_url(url: &str, user_id: &str) -> Result<Self, ConfigError> {
        validate_user_id(user_id)?;
        let url = Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{url}: {e}")))?;
        Self::from_parts(user_id, url)
    }

    fn from_parts(user_id: &str, url: Url) -> Result<Self, ConfigError> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::InvalidUrl(format!("{url}: missing host")));
        }
        Ok(Self {
            user_id: user_id.to_string(),
            url,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Whether the endpoint uses TLS.
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }
}

impl std::fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

fn validate_user_id(user_id: &str) -> Result<(), ConfigError> {
    if user_id.trim().is_empty() {
        return Err(ConfigError::EmptyUserId);
    }
    if user_id
        .chars()
        .any(|c| c == '/' || c == '?' || c == '#' || c.is_whitespace())
    {
        return Err(ConfigError::InvalidUserId(user_id.to_string()));
    }
    Ok(())
}
