// Shared transport for all three backends.
//
// Builds the reqwest::Client from TLS, proxy, timeout and cookie settings,
// and executes composed requests. No retries: one request in, one raw
// response (or a transport error) out.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::{ConnectionConfig, TlsVerify};
use crate::error::Error;
use crate::request::{Body, ComposedRequest};

/// Settings used to build the HTTP client of one client instance.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsVerify,
    pub timeout: Duration,
    pub proxy: Option<String>,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl TransportConfig {
    pub fn from_connection(config: &ConnectionConfig) -> Self {
        Self {
            tls: config.tls.clone(),
            timeout: config.timeout,
            proxy: config.proxy.clone(),
            cookie_jar: None,
        }
    }

    /// Attach a fresh cookie jar. Needed by cookie-session backends.
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }

    /// Attach a caller-owned cookie jar, so the caller can seed or read
    /// the session cookies.
    pub fn with_shared_cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("arubafi/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsVerify::Enabled => {}
            TlsVerify::CustomCa(path) => {
                let pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA bundle {}: {e}", path.display())))?;
                let cert = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| Error::Tls(format!("invalid CA bundle: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsVerify::Disabled => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        if let Some(proxy) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| Error::Configuration {
                message: format!("invalid proxy URL: {e}"),
            })?;
            builder = builder.proxy(proxy);
        }

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// Raw upstream answer, before normalization.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Executes composed requests over one HTTP client.
pub struct Transport {
    http: reqwest::Client,
    cookie_jar: Option<Arc<Jar>>,
}

impl Transport {
    /// Build the transport. Disabled certificate verification is reported
    /// here, once per client, rather than on every call.
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        if config.tls == TlsVerify::Disabled {
            warn!("TLS certificate verification is disabled; the upstream identity is not checked");
        }
        Ok(Self {
            http: config.build_client()?,
            cookie_jar: config.cookie_jar.clone(),
        })
    }

    /// Wrap an existing client, e.g. one pointed at a mock server.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            cookie_jar: None,
        }
    }

    /// Send one request.
    pub async fn send(&self, request: &ComposedRequest) -> Result<RawResponse, Error> {
        let endpoint = request.url.path().to_owned();
        debug!(method = %request.method, %endpoint, params = request.query.len(), "sending request");

        let mut builder = self
            .http
            .request(request.method.into(), request.url.clone())
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            Some(Body::Json(payload)) => builder.json(payload),
            Some(Body::Form(fields)) => builder.form(fields),
            None => builder,
        };

        let transport_error = |source: reqwest::Error| Error::Transport {
            endpoint: endpoint.clone(),
            source: source.without_url(),
        };
        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.map_err(transport_error)?;
        trace!(status, bytes = body.len(), "response received");

        Ok(RawResponse {
            status,
            content_type,
            headers,
            body,
        })
    }

    /// Value of a cookie the jar holds for `url`.
    pub fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.cookie_jar.as_ref()?.cookies(url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            key.eq_ignore_ascii_case(name).then(|| value.to_owned())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cookie_lookup_reads_the_jar() {
        let config = TransportConfig::from_connection(&ConnectionConfig::default()).with_cookie_jar();
        let url = Url::parse("https://amp.example.net/").unwrap();
        config
            .cookie_jar
            .as_ref()
            .unwrap()
            .add_cookie_str("X-BISCOTTI=abc; Path=/", &url);
        let transport = Transport::new(&config).unwrap();
        assert_eq!(transport.cookie(&url, "x-biscotti").as_deref(), Some("abc"));
        assert_eq!(transport.cookie(&url, "csrftoken"), None);
    }

    #[test]
    fn missing_ca_bundle_is_a_tls_error() {
        let config = TransportConfig {
            tls: TlsVerify::CustomCa("/nonexistent/ca.pem".into()),
            ..TransportConfig::from_connection(&ConnectionConfig::default())
        };
        assert!(matches!(config.build_client(), Err(Error::Tls(_))));
    }

    #[test]
    fn bad_proxy_is_a_configuration_error() {
        let config = TransportConfig {
            proxy: Some("http://proxy.example.net:99999".into()),
            ..TransportConfig::from_connection(&ConnectionConfig::default())
        };
        assert!(matches!(config.build_client(), Err(Error::Configuration { .. })));
    }
}
