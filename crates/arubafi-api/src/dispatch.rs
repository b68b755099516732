// The per-call pipeline shared by every backend client:
// compose → send → status classification → normalize.

use std::sync::Arc;

use tracing::{Instrument, debug, info_span, warn};

use crate::auth::{Backend, SessionHandle};
use crate::config::ConnectionConfig;
use crate::credentials::{self, Prompter};
use crate::error::Error;
use crate::redact;
use crate::request::{self, RequestSpec};
use crate::response::{self, ResponseDocument};
use crate::session::SessionManager;
use crate::transport::{RawResponse, Transport, TransportConfig};

pub(crate) struct Dispatcher {
    backend: Backend,
    config: ConnectionConfig,
    transport: Transport,
    session: SessionManager,
}

impl Dispatcher {
    pub(crate) fn new(backend: Backend, config: ConnectionConfig) -> Result<Self, Error> {
        let mut transport_config = TransportConfig::from_connection(&config);
        if backend.uses_cookies() {
            transport_config = transport_config.with_cookie_jar();
        }
        Ok(Self::with_transport(backend, config, Transport::new(&transport_config)?))
    }

    pub(crate) fn with_transport(backend: Backend, config: ConnectionConfig, transport: Transport) -> Self {
        Self {
            backend,
            config,
            transport,
            session: SessionManager::new(backend),
        }
    }

    pub(crate) fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub(crate) fn session(&self) -> Option<Arc<SessionHandle>> {
        self.session.peek()
    }

    /// Fill missing connection attributes, then log in.
    pub(crate) async fn comms(&mut self, prompter: &dyn Prompter) -> Result<Arc<SessionHandle>, Error> {
        self.config = credentials::resolve(self.backend, self.config.clone(), prompter)?;
        self.establish().await
    }

    pub(crate) async fn establish(&self) -> Result<Arc<SessionHandle>, Error> {
        self.session.establish(&self.config, &self.transport).await
    }

    pub(crate) async fn invalidate(&self) {
        self.session.invalidate().await;
    }

    /// Run one resource call and normalize its body.
    ///
    /// Mobility Master writes must answer with a `_global_result`
    /// envelope; a write answered without one was not applied.
    pub(crate) async fn execute(&self, spec: &RequestSpec) -> Result<ResponseDocument, Error> {
        let raw = self.execute_raw(spec).await?;
        let document = response::normalize(raw.status, &raw.body, raw.content_type.as_deref())
            .map_err(|e| e.with_endpoint(&spec.endpoint))?;
        if self.envelope_required(spec) && document.envelope.is_none() {
            warn!(endpoint = %spec.endpoint, "write answered without a result envelope");
            return Err(Error::Upstream {
                endpoint: spec.endpoint.clone(),
                status: i64::from(document.http_status),
                message: format!(
                    "configuration not written: no `_global_result` in response ({})",
                    redact::excerpt(&raw.body)
                ),
            });
        }
        Ok(document)
    }

    fn envelope_required(&self, spec: &RequestSpec) -> bool {
        self.backend == Backend::Mobility && spec.method.is_state_changing()
    }

    /// Run one resource call, returning the body untouched.
    ///
    /// 401/403 discard the session the request was sent with and fail
    /// with [`Error::SessionExpired`]; any other non-success status is an
    /// [`Error::Upstream`].
    pub(crate) async fn execute_raw(&self, spec: &RequestSpec) -> Result<RawResponse, Error> {
        let span = info_span!(
            "resource",
            backend = %self.backend,
            method = %spec.method,
            endpoint = %spec.endpoint,
        );
        async {
            let session = self.session.current()?;
            let request = request::compose(spec, &session, &self.config)?;
            let raw = self.transport.send(&request).await?;
            debug!(status = raw.status, "upstream answered");

            if matches!(raw.status, 401 | 403) {
                self.session.invalidate_if(&session).await;
                warn!(status = raw.status, "session rejected by upstream");
                return Err(Error::SessionExpired {
                    status: Some(raw.status),
                    endpoint: spec.endpoint.clone(),
                });
            }
            if !raw.is_success() {
                return Err(Error::Upstream {
                    endpoint: spec.endpoint.clone(),
                    status: i64::from(raw.status),
                    message: redact::excerpt(&raw.body),
                });
            }
            Ok(raw)
        }
        .instrument(span)
        .await
    }
}
