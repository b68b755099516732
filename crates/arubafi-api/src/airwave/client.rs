use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use reqwest::cookie::Jar;
use serde_json::Value;
use tracing::info;

use super::inventory::{CacheState, InventoryCache, InventoryStore, Table, TableName};
use super::registry::{InstanceGuard, InstanceRegistry};
use crate::auth::{Backend, SessionHandle};
use crate::config::ConnectionConfig;
use crate::credentials::Prompter;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::request::RequestSpec;
use crate::response::ResponseDocument;
use crate::transport::{Transport, TransportConfig};

/// Registry key of the AirWave client.
const INSTANCE_KIND: &str = "airwave";
/// The full inventory dump.
const AP_LIST: &str = "ap_list.xml";

/// Client for the AirWave management platform.
///
/// Only one instance may be live per [`InstanceRegistry`]; the inventory
/// is fetched at most once per instance unless explicitly refreshed.
pub struct AirWave {
    dispatcher: Dispatcher,
    inventory: InventoryCache,
    _registration: InstanceGuard,
}

impl AirWave {
    /// Create the process-wide AirWave client.
    pub fn new(config: ConnectionConfig) -> Result<Self, Error> {
        Self::with_registry(config, &InstanceRegistry::global())
    }

    /// Create a client registered in `registry` instead of the global one.
    pub fn with_registry(config: ConnectionConfig, registry: &Arc<InstanceRegistry>) -> Result<Self, Error> {
        let registration = registry.acquire(INSTANCE_KIND)?;
        Ok(Self {
            dispatcher: Dispatcher::new(Backend::AirWave, config)?,
            inventory: InventoryCache::new(),
            _registration: registration,
        })
    }

    /// Create a client around an existing `reqwest::Client`. The client
    /// should carry a cookie store for the session to survive login.
    ///
    /// The transport cannot see that store, so the CSRF token is taken
    /// from the login response headers only. Use
    /// [`AirWave::with_cookie_jar`] when it may arrive as a cookie.
    pub fn with_client(
        config: ConnectionConfig,
        http: reqwest::Client,
        registry: &Arc<InstanceRegistry>,
    ) -> Result<Self, Error> {
        let registration = registry.acquire(INSTANCE_KIND)?;
        Ok(Self {
            dispatcher: Dispatcher::with_transport(Backend::AirWave, config, Transport::with_client(http)),
            inventory: InventoryCache::new(),
            _registration: registration,
        })
    }

    /// Create a client whose session cookies live in `jar`.
    pub fn with_cookie_jar(
        config: ConnectionConfig,
        jar: Arc<Jar>,
        registry: &Arc<InstanceRegistry>,
    ) -> Result<Self, Error> {
        let registration = registry.acquire(INSTANCE_KIND)?;
        let transport_config = TransportConfig::from_connection(&config).with_shared_cookie_jar(jar);
        Ok(Self {
            dispatcher: Dispatcher::with_transport(Backend::AirWave, config, Transport::new(&transport_config)?),
            inventory: InventoryCache::new(),
            _registration: registration,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.dispatcher.config()
    }

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

    /// Drop the session. AirWave has no logout endpoint; the cookies
    /// become useless once the handle is gone.
    pub async fn close(&self) {
        self.dispatcher.invalidate().await;
        info!("AirWave session closed");
    }

    /// Generic resource call.
    pub async fn resource(&self, spec: RequestSpec) -> Result<ResponseDocument, Error> {
        self.dispatcher.execute(&spec).await
    }

    // ── Inventory ───────────────────────────────────────────────────

    pub fn inventory_state(&self) -> CacheState {
        self.inventory.state()
    }

    /// The inventory store, fetching `ap_list.xml` on first use.
    pub async fn inventory(&self) -> Result<Arc<InventoryStore>, Error> {
        self.inventory.get_or_load(|| self.fetch_inventory()).await
    }

    /// Re-fetch the inventory, replacing the cached store.
    pub async fn refresh_inventory(&self) -> Result<Arc<InventoryStore>, Error> {
        self.inventory.refresh(|| self.fetch_inventory()).await
    }

    async fn fetch_inventory(&self) -> Result<String, Error> {
        let raw = self.dispatcher.execute_raw(&RequestSpec::get(AP_LIST)).await?;
        Ok(raw.body)
    }

    /// One named table of the inventory.
    pub async fn get_table(&self, name: TableName) -> Result<Arc<Table>, Error> {
        Ok(self.inventory().await?.table(name))
    }

    /// The inventory as returned by AirWave, without conversion.
    pub async fn raw_inventory(&self) -> Result<Arc<str>, Error> {
        Ok(self.inventory().await?.raw())
    }

    pub async fn controller_fqdns(&self) -> Result<BTreeSet<String>, Error> {
        Ok(self.inventory().await?.controller_fqdns())
    }

    pub async fn controllers_aps(&self) -> Result<BTreeMap<String, Vec<String>>, Error> {
        Ok(self.inventory().await?.controllers_aps())
    }

    pub async fn ap_controller_id(&self, ap_name: &str) -> Result<Option<String>, Error> {
        Ok(self.inventory().await?.ap_controller_id(ap_name))
    }

    /// The `all_items` record of a controller, by id.
    pub async fn controller_info(&self, controller_id: &str) -> Result<Option<Value>, Error> {
        Ok(self.inventory().await?.controller_record(controller_id))
    }

    pub async fn aps_controller_ids<'a>(
        &self,
        ap_names: impl IntoIterator<Item = &'a str>,
    ) -> Result<BTreeSet<String>, Error> {
        Ok(self.inventory().await?.aps_controller_ids(ap_names))
    }
}
