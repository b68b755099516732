use chrono::{DateTime, Utc};
use secrecy::SecretString;
use url::Url;

use crate::config::ConnectionConfig;
use crate::error::Error;

/// Which upstream management API a client talks to.
///
/// Determines the default port, URL prefix, login handshake, and how
/// session material is attached to each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Backend {
    /// Mobility Master (AOS 8) -- UID token passed as the `UIDARUBA`
    /// query parameter, token-enveloped JSON bodies.
    Mobility,
    /// AirWave -- cookie session, CSRF header on writes, XML bodies.
    AirWave,
    /// Central -- bearer token, plain JSON bodies.
    Central,
}

impl Backend {
    /// Human-readable product name, used in prompts and diagnostics.
    pub fn product_name(self) -> &'static str {
        match self {
            Self::Mobility => "Mobility Master",
            Self::AirWave => "AirWave",
            Self::Central => "Central",
        }
    }

    /// Port used when neither the host string nor the config names one.
    /// `None` means the scheme default.
    pub fn default_port(self) -> Option<u16> {
        match self {
            Self::Mobility => Some(4343),
            Self::AirWave | Self::Central => None,
        }
    }

    /// API version inserted as a `/v<N>` path prefix when the config
    /// does not set one.
    pub fn default_api_version(self) -> Option<&'static str> {
        match self {
            Self::Mobility => Some("1"),
            Self::AirWave | Self::Central => None,
        }
    }

    /// Config scope attached to every call unless overridden.
    pub fn default_scope(self) -> Option<&'static str> {
        match self {
            Self::Mobility => Some("/md"),
            Self::AirWave | Self::Central => None,
        }
    }

    /// Name of the query parameter that carries the config scope.
    ///
    /// Only the Mobility Master has a configuration hierarchy.
    pub fn scope_param(self) -> Option<&'static str> {
        match self {
            Self::Mobility => Some("config_path"),
            Self::AirWave | Self::Central => None,
        }
    }

    /// The login endpoint, relative to the base URL.
    pub fn login_path(self) -> &'static str {
        match self {
            Self::Mobility => "api/login",
            Self::AirWave => "LOGIN",
            Self::Central => "oauth2/token",
        }
    }

    /// The logout endpoint, relative to the base URL.
    ///
    /// Returns `None` where the backend has no server-side logout and
    /// closing simply drops the local session.
    pub fn logout_path(self) -> Option<&'static str> {
        match self {
            Self::Mobility => Some("api/logout"),
            Self::AirWave | Self::Central => None,
        }
    }

    /// Whether the backend relies on a cookie jar for its session.
    pub fn uses_cookies(self) -> bool {
        matches!(self, Self::AirWave)
    }

    /// Resolve the base URL for this backend: scheme, host, port and the
    /// API version prefix.
    ///
    /// A host without a scheme is assumed to be `https://`.
    pub fn base_url(self, config: &ConnectionConfig) -> Result<Url, Error> {
        let host = config
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Configuration {
                message: format!("{} host is not set", self.product_name()),
            })?;

        let host = host.trim_end_matches('/');
        let mut url = if host.contains("://") {
            Url::parse(host)?
        } else {
            Url::parse(&format!("https://{host}"))?
        };

        if url.port().is_none() {
            if let Some(port) = config.port.or(self.default_port()) {
                url.set_port(Some(port)).map_err(|()| Error::Configuration {
                    message: format!("cannot set port {port} on {host}"),
                })?;
            }
        }

        let version = config.api_version.as_deref().or(self.default_api_version());
        match version {
            Some(v) => url.set_path(&format!("/v{}", v.trim_start_matches('v'))),
            None => url.set_path("/"),
        }
        Ok(url)
    }
}

/// CSRF token captured at login, replayed on state-changing requests.
#[derive(Debug, Clone)]
pub struct CsrfToken {
    /// Header the token is sent back in (e.g. `X-BISCOTTI`).
    pub header: String,
    pub value: SecretString,
}

/// Session material produced by a login handshake.
///
/// Exactly one variant is active per backend.
#[derive(Debug, Clone)]
pub enum AuthMaterial {
    /// Mobility Master UID, sent as the `UIDARUBA` query parameter.
    Uid(SecretString),
    /// AirWave cookie session. The cookies themselves live in the
    /// client's jar; only the CSRF token is carried here.
    Cookie { csrf: Option<CsrfToken> },
    /// Central access token, sent as `Authorization: Bearer`.
    Bearer(SecretString),
}

/// An established session: auth material, optional expiry, and the base
/// URL every request is resolved against.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub backend: Backend,
    pub auth: AuthMaterial,
    pub expires_at: Option<DateTime<Utc>>,
    pub base_url: Url,
}

impl SessionHandle {
    /// Whether the handle has a known expiry at or before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(host: &str) -> ConnectionConfig {
        ConnectionConfig::new(host)
    }

    #[test]
    fn mobility_base_url_gets_port_and_version() {
        let url = Backend::Mobility.base_url(&config("mm.example.net")).unwrap();
        assert_eq!(url.as_str(), "https://mm.example.net:4343/v1");
    }

    #[test]
    fn explicit_port_and_scheme_win() {
        let url = Backend::Mobility
            .base_url(&config("http://127.0.0.1:8080/"))
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/v1");
    }

    #[test]
    fn airwave_base_url_has_no_prefix() {
        let url = Backend::AirWave.base_url(&config("amp.example.net")).unwrap();
        assert_eq!(url.as_str(), "https://amp.example.net/");
    }

    #[test]
    fn api_version_override() {
        let mut cfg = config("mm.example.net");
        cfg.api_version = Some("v2".into());
        let url = Backend::Mobility.base_url(&cfg).unwrap();
        assert_eq!(url.path(), "/v2");
    }

    #[test]
    fn missing_host_is_configuration_error() {
        let cfg = ConnectionConfig::default();
        assert!(matches!(
            Backend::Central.base_url(&cfg),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("AirWave".parse::<Backend>().unwrap(), Backend::AirWave);
        assert_eq!("mobility".parse::<Backend>().unwrap(), Backend::Mobility);
        assert_eq!(Backend::Central.to_string(), "central");
    }
}
