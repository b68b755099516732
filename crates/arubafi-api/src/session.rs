// Session management: login handshakes and the cached session handle.
//
// The handle is published through an ArcSwapOption so request composition
// reads it lock-free; every write (establish, invalidate) happens under
// one tokio mutex. A rejected session is discarded, never silently
// re-established.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{AuthMaterial, Backend, CsrfToken, SessionHandle};
use crate::config::ConnectionConfig;
use crate::error::Error;
use crate::redact;
use crate::request::{Body, ComposedRequest, Method, join_endpoint};
use crate::response;
use crate::transport::{RawResponse, Transport};

/// Headers (and cookie names) that may carry the AirWave CSRF token, in
/// order of preference.
const CSRF_NAMES: [&str; 2] = ["X-BISCOTTI", "X-CSRF-Token"];

/// Owns the session handle of one client instance.
pub struct SessionManager {
    backend: Backend,
    current: ArcSwapOption<SessionHandle>,
    write_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            current: ArcSwapOption::empty(),
            write_lock: Mutex::new(()),
        }
    }

    /// The live session handle.
    ///
    /// Fails with [`Error::NoSession`] before the first `establish`, and
    /// with [`Error::SessionExpired`] once the handle was invalidated or
    /// has passed its known expiry.
    pub fn current(&self) -> Result<Arc<SessionHandle>, Error> {
        match self.current.load_full() {
            Some(handle) if handle.is_expired(Utc::now()) => Err(Error::SessionExpired {
                status: None,
                endpoint: handle.base_url.to_string(),
            }),
            Some(handle) => Ok(handle),
            None => Err(Error::NoSession),
        }
    }

    /// The cached handle, if any, without checking expiry.
    pub fn peek(&self) -> Option<Arc<SessionHandle>> {
        self.current.load_full()
    }

    /// Log in, unless a usable handle is already cached.
    pub async fn establish(
        &self,
        config: &ConnectionConfig,
        transport: &Transport,
    ) -> Result<Arc<SessionHandle>, Error> {
        let _guard = self.write_lock.lock().await;
        if let Some(handle) = self.current.load_full() {
            if !handle.is_expired(Utc::now()) {
                debug!(backend = %self.backend, "reusing cached session");
                return Ok(handle);
            }
        }

        let handle = Arc::new(match self.backend {
            Backend::Mobility => uid_login(config, transport).await?,
            Backend::AirWave => cookie_login(config, transport).await?,
            Backend::Central => bearer_login(config, transport).await?,
        });
        self.current.store(Some(Arc::clone(&handle)));
        info!(backend = %self.backend, base_url = %handle.base_url, "session established");
        Ok(handle)
    }

    /// Discard the cached handle.
    pub async fn invalidate(&self) {
        let _guard = self.write_lock.lock().await;
        if self.current.swap(None).is_some() {
            debug!(backend = %self.backend, "session handle discarded");
        }
    }

    /// Discard the cached handle only if it is still `rejected`.
    ///
    /// A late rejection of an old handle leaves a session established
    /// after it in place.
    pub async fn invalidate_if(&self, rejected: &Arc<SessionHandle>) {
        let _guard = self.write_lock.lock().await;
        let still_current = self
            .current
            .load_full()
            .is_some_and(|handle| Arc::ptr_eq(&handle, rejected));
        if !still_current {
            debug!(backend = %self.backend, "rejected handle already replaced");
            return;
        }
        self.current.store(None);
        debug!(backend = %self.backend, "session handle discarded");
    }
}

// ── Handshakes ──────────────────────────────────────────────────────

/// `POST /v1/api/login` with form credentials; the UID comes back in
/// `_global_result.UIDARUBA`.
async fn uid_login(config: &ConnectionConfig, transport: &Transport) -> Result<SessionHandle, Error> {
    let base_url = Backend::Mobility.base_url(config)?;
    let (username, password) = config.login_pair()?;
    debug!(%username, "logging in to Mobility Master");

    let request = ComposedRequest::new(Method::Post, join_endpoint(&base_url, Backend::Mobility.login_path())?)
        .with_body(Body::Form(vec![
            ("username".into(), username.to_owned()),
            ("password".into(), password.expose_secret().to_owned()),
        ]));
    let raw = checked_login(transport, &request).await?;

    let document = response::normalize(raw.status, &raw.body, raw.content_type.as_deref()).map_err(|e| {
        Error::Authentication {
            status: raw.status,
            body: match e {
                Error::Upstream { message, .. } => message,
                other => other.to_string(),
            },
        }
    })?;
    let uid = document
        .envelope
        .and_then(|envelope| envelope.uid)
        .ok_or_else(|| Error::Authentication {
            status: raw.status,
            body: "login response carried no UIDARUBA".into(),
        })?;

    Ok(SessionHandle {
        backend: Backend::Mobility,
        auth: AuthMaterial::Uid(uid),
        expires_at: None,
        base_url,
    })
}

/// `POST /LOGIN` with the AirWave form fields; the session lives in the
/// cookie jar, the CSRF token in a response header or cookie.
async fn cookie_login(config: &ConnectionConfig, transport: &Transport) -> Result<SessionHandle, Error> {
    let base_url = Backend::AirWave.base_url(config)?;
    let (username, password) = config.login_pair()?;
    debug!(%username, "logging in to AirWave");

    let request = ComposedRequest::new(Method::Post, join_endpoint(&base_url, Backend::AirWave.login_path())?)
        .with_body(Body::Form(vec![
            ("destination".into(), "/".into()),
            ("credential_0".into(), username.to_owned()),
            ("credential_1".into(), password.expose_secret().to_owned()),
        ]));
    let raw = checked_login(transport, &request).await?;

    let csrf = CSRF_NAMES
        .iter()
        .find_map(|name| raw.header(name).map(|value| (*name, value.to_owned())))
        .or_else(|| {
            CSRF_NAMES
                .iter()
                .find_map(|name| transport.cookie(&base_url, name).map(|value| (*name, value)))
        })
        .map(|(header, value)| CsrfToken {
            header: header.to_owned(),
            value: SecretString::from(value),
        });
    if csrf.is_none() {
        debug!("AirWave login returned no CSRF token; writes will be sent without one");
    }

    Ok(SessionHandle {
        backend: Backend::AirWave,
        auth: AuthMaterial::Cookie { csrf },
        expires_at: None,
        base_url,
    })
}

#[derive(Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Use the pre-issued API token, or run the OAuth password grant against
/// `POST /oauth2/token`.
async fn bearer_login(config: &ConnectionConfig, transport: &Transport) -> Result<SessionHandle, Error> {
    let base_url = Backend::Central.base_url(config)?;
    if let Some(token) = &config.api_token {
        debug!("using pre-issued Central API token");
        return Ok(SessionHandle {
            backend: Backend::Central,
            auth: AuthMaterial::Bearer(token.clone()),
            expires_at: None,
            base_url,
        });
    }

    let (username, password) = config.login_pair()?;
    debug!(%username, "requesting Central access token");
    let mut form = vec![
        ("grant_type".to_owned(), "password".to_owned()),
        ("username".to_owned(), username.to_owned()),
        ("password".to_owned(), password.expose_secret().to_owned()),
    ];
    if let Some(client_id) = &config.client_id {
        form.push(("client_id".into(), client_id.clone()));
    }
    if let Some(secret) = &config.client_secret {
        form.push(("client_secret".into(), secret.expose_secret().to_owned()));
    }

    let request = ComposedRequest::new(Method::Post, join_endpoint(&base_url, Backend::Central.login_path())?)
        .with_body(Body::Form(form));
    let raw = checked_login(transport, &request).await?;

    let grant: TokenGrant = serde_json::from_str(&raw.body).map_err(|e| Error::MalformedResponse {
        message: format!("token response: {e}"),
        excerpt: redact::excerpt(&raw.body),
    })?;
    let expires_at = grant
        .expires_in
        .and_then(TimeDelta::try_seconds)
        .map(|lifetime| Utc::now() + lifetime);

    Ok(SessionHandle {
        backend: Backend::Central,
        auth: AuthMaterial::Bearer(SecretString::from(grant.access_token)),
        expires_at,
        base_url,
    })
}

/// Send a login request and turn any non-success status into
/// [`Error::Authentication`].
async fn checked_login(transport: &Transport, request: &ComposedRequest) -> Result<RawResponse, Error> {
    let raw = transport.send(request).await?;
    if !raw.is_success() {
        warn!(status = raw.status, endpoint = %request.url.path(), "login rejected");
        return Err(Error::Authentication {
            status: raw.status,
            body: redact::excerpt(&raw.body),
        });
    }
    Ok(raw)
}
