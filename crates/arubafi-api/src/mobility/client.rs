use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info};

use super::ObjectQuery;
use crate::auth::{Backend, SessionHandle};
use crate::config::ConnectionConfig;
use crate::credentials::Prompter;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::request::{Method, RequestSpec};
use crate::response::ResponseDocument;
use crate::transport::Transport;

/// Client for the Mobility Master configuration API.
///
/// ```no_run
/// # async fn demo() -> Result<(), arubafi_api::Error> {
/// use arubafi_api::{ConnectionConfig, MmClient, ObjectQuery};
/// use secrecy::SecretString;
///
/// let config = ConnectionConfig::new("mm.example.net")
///     .with_credentials("admin", SecretString::from("secret"));
/// let mm = MmClient::new(config)?;
/// mm.establish().await?;
/// let groups = mm.ap_group(None, ObjectQuery::profile("default")).await?;
/// println!("{}", groups.data);
/// # Ok(()) }
/// ```
pub struct MmClient {
    dispatcher: Dispatcher,
}

impl MmClient {
    pub fn new(config: ConnectionConfig) -> Result<Self, Error> {
        Ok(Self {
            dispatcher: Dispatcher::new(Backend::Mobility, config)?,
        })
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(config: ConnectionConfig, http: reqwest::Client) -> Self {
        Self {
            dispatcher: Dispatcher::with_transport(Backend::Mobility, config, Transport::with_client(http)),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.dispatcher.config()
    }

    /// The cached session handle, if a session is established.
    pub fn session(&self) -> Option<Arc<SessionHandle>> {
        self.dispatcher.session()
    }

    /// Ask for any missing host, username or password, then log in.
    pub async fn comms(&mut self, prompter: &dyn Prompter) -> Result<(), Error> {
        self.dispatcher.comms(prompter).await.map(|_| ())
    }

    /// Log in with the configured credentials. A no-op while a session
    /// is cached.
    pub async fn establish(&self) -> Result<(), Error> {
        self.dispatcher.establish().await.map(|_| ())
    }

    /// `GET /v1/api/logout`, then drop the local session.
    pub async fn logout(&self) -> Result<ResponseDocument, Error> {
        let path = Backend::Mobility.logout_path().unwrap_or("api/logout");
        let result = self.dispatcher.execute(&RequestSpec::get(path)).await;
        self.dispatcher.invalidate().await;
        info!("logged out of Mobility Master");
        result
    }

    /// Generic resource call.
    pub async fn resource(&self, spec: RequestSpec) -> Result<ResponseDocument, Error> {
        self.dispatcher.execute(&spec).await
    }

    /// Call a configuration object endpoint. With a payload the call is a
    /// POST (and its envelope is checked); without, a GET.
    pub async fn object(
        &self,
        endpoint: &str,
        data: Option<Value>,
        query: ObjectQuery,
    ) -> Result<ResponseDocument, Error> {
        let spec = match data {
            Some(payload) => query.into_spec(Method::Post, endpoint).json(payload),
            None => query.into_spec(Method::Get, endpoint),
        };
        debug!(endpoint, method = %spec.method, "configuration object call");
        self.resource(spec).await
    }

    /// `POST /v1/configuration/object/write_memory` -- persist pending
    /// configuration at `config_path`.
    pub async fn write_memory(&self, config_path: Option<&str>) -> Result<ResponseDocument, Error> {
        let mut spec = RequestSpec::post("configuration/object/write_memory", json!({}));
        spec.scope = config_path.map(str::to_owned);
        let document = self.resource(spec).await?;
        info!(?config_path, "configuration written to memory");
        Ok(document)
    }
}
