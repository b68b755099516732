//! Aruba Central REST client.
//!
//! Bearer-token auth: either a pre-issued API token, or an access token
//! from the OAuth password grant. Bodies are plain JSON.

use std::sync::Arc;

use crate::auth::{Backend, SessionHandle};
use crate::config::ConnectionConfig;
use crate::credentials::Prompter;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::request::RequestSpec;
use crate::response::ResponseDocument;
use crate::transport::Transport;

pub struct CentralClient {
    dispatcher: Dispatcher,
}

impl CentralClient {
    pub fn new(config: ConnectionConfig) -> Result<Self, Error> {
        Ok(Self {
            dispatcher: Dispatcher::new(Backend::Central, config)?,
        })
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(config: ConnectionConfig, http: reqwest::Client) -> Self {
        Self {
            dispatcher: Dispatcher::with_transport(Backend::Central, config, Transport::with_client(http)),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.dispatcher.config()
    }

    pub fn session(&self) -> Option<Arc<SessionHandle>> {
        self.dispatcher.session()
    }

    /// Ask for whatever is missing (host, and credentials unless an API
    /// token is configured), then obtain a token.
    pub async fn comms(&mut self, prompter: &dyn Prompter) -> Result<(), Error> {
        self.dispatcher.comms(prompter).await.map(|_| ())
    }

    pub async fn establish(&self) -> Result<(), Error> {
        self.dispatcher.establish().await.map(|_| ())
    }

    /// Forget the access token.
    pub async fn close(&self) {
        self.dispatcher.invalidate().await;
    }

    /// Generic resource call.
    pub async fn resource(&self, spec: RequestSpec) -> Result<ResponseDocument, Error> {
        self.dispatcher.execute(&spec).await
    }

    /// `GET <path>` with the given query parameters.
    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<ResponseDocument, Error> {
        let spec = params
            .iter()
            .fold(RequestSpec::get(path), |spec, (key, value)| spec.param(*key, value));
        self.resource(spec).await
    }
}
