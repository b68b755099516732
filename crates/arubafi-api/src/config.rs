use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// TLS certificate verification mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerify {
    /// Verify against the system trust store.
    #[default]
    Enabled,
    /// Accept any certificate. Logged once at WARN when the transport is built.
    Disabled,
    /// Verify against a custom CA bundle (PEM).
    CustomCa(PathBuf),
}

/// Everything needed to reach and authenticate against one backend.
///
/// Owned by a single client instance. Missing host, username and password
/// may be filled in by the credential resolver before the first session is
/// established; after that the config is treated as read-only.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// FQDN or IP, optionally with a scheme and port.
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Overrides the backend's default port.
    pub port: Option<u16>,
    /// HTTP(S) proxy URL applied to every request.
    pub proxy: Option<String>,
    /// Overrides the backend's default API version prefix.
    pub api_version: Option<String>,
    /// Config scope used when a request does not set one.
    pub default_scope: Option<String>,
    pub tls: TlsVerify,
    pub timeout: Duration,
    /// Pre-issued bearer token (Central).
    pub api_token: Option<SecretString>,
    /// OAuth client id for the password grant (Central).
    pub client_id: Option<String>,
    /// OAuth client secret for the password grant (Central).
    pub client_secret: Option<SecretString>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: None,
            username: None,
            password: None,
            port: None,
            proxy: None,
            api_version: None,
            default_scope: None,
            tls: TlsVerify::default(),
            timeout: DEFAULT_TIMEOUT,
            api_token: None,
            client_id: None,
            client_secret: None,
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.username = Some(username.into());
        self.password = Some(password);
        self
    }

    pub fn with_api_token(mut self, token: SecretString) -> Self {
        self.api_token = Some(token);
        self
    }

    pub fn with_tls(mut self, tls: TlsVerify) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Username and password, or a configuration error naming what is missing.
    pub(crate) fn login_pair(&self) -> Result<(&str, &SecretString), crate::Error> {
        let username = self
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| crate::Error::Configuration {
                message: "username is not set".into(),
            })?;
        let password = self.password.as_ref().ok_or_else(|| crate::Error::Configuration {
            message: format!("password for `{username}` is not set"),
        })?;
        Ok((username, password))
    }
}
