// AirWave inventory cache.
//
// The whole `ap_list.xml` dump is fetched once and fanned out into named
// lookup tables. Concurrent first callers share one in-flight fetch: the
// load mutex is held across the request, and the finished store is
// published through an ArcSwapOption so later reads never lock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::redact;
use crate::response;
use crate::xml::{attribute, children, first_text};

/// A named inventory table: key → value.
pub type Table = BTreeMap<String, Value>;

/// The lookup tables derived from the inventory dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TableName {
    /// Controller id → FQDN.
    Controllers,
    /// Controller LAN IP → name, for controllers without an FQDN.
    NoPtrControllers,
    /// Instant virtual controller id → FQDN.
    IapVirtualControllers,
    /// Controller id → list of AP names.
    ControllerAps,
    /// AP name → controller id.
    ApControllers,
    /// AP id → name, for APs not managed by a controller.
    ControllerlessAps,
    /// Every record id → its summary fields.
    AllItems,
}

impl TableName {
    pub const ALL: [Self; 7] = [
        Self::Controllers,
        Self::NoPtrControllers,
        Self::IapVirtualControllers,
        Self::ControllerAps,
        Self::ApControllers,
        Self::ControllerlessAps,
        Self::AllItems,
    ];
}

/// Lifecycle of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CacheState {
    Empty,
    Loading,
    Populated,
}

/// The built inventory: raw XML, its normalized document, and the tables.
#[derive(Debug)]
pub struct InventoryStore {
    raw: Arc<str>,
    document: Value,
    tables: HashMap<TableName, Arc<Table>>,
    built_at: DateTime<Utc>,
}

impl InventoryStore {
    /// Parse the raw `ap_list.xml` body and build every table from it.
    pub fn build(raw: String) -> Result<Self, Error> {
        let document = response::normalize(200, &raw, Some("application/xml"))?;
        let Some(root) = document.xml_root() else {
            return Err(Error::MalformedResponse {
                message: "inventory document has no root element".into(),
                excerpt: redact::excerpt(&raw),
            });
        };
        let tables = fan_out(children(root, "ap"));
        let document = document.into_data();
        Ok(Self {
            raw: Arc::from(raw),
            document,
            tables,
            built_at: Utc::now(),
        })
    }

    pub fn table(&self, name: TableName) -> Arc<Table> {
        self.tables.get(&name).cloned().unwrap_or_default()
    }

    /// The untouched XML body.
    pub fn raw(&self) -> Arc<str> {
        Arc::clone(&self.raw)
    }

    /// The normalized inventory document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    // ── Derived queries ─────────────────────────────────────────────

    /// FQDNs of every controller that has one.
    pub fn controller_fqdns(&self) -> BTreeSet<String> {
        self.table(TableName::Controllers)
            .values()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect()
    }

    /// Controller FQDN → names of the APs it manages.
    ///
    /// Only controllers with an FQDN and at least one AP appear; APs of
    /// instant virtual controllers are not included.
    pub fn controllers_aps(&self) -> BTreeMap<String, Vec<String>> {
        let aps_by_controller = self.table(TableName::ControllerAps);
        self.table(TableName::Controllers)
            .iter()
            .filter_map(|(controller_id, fqdn)| {
                let fqdn = fqdn.as_str()?;
                let names: Vec<String> = aps_by_controller
                    .get(controller_id)?
                    .as_array()?
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect();
                (!names.is_empty()).then(|| (fqdn.to_owned(), names))
            })
            .collect()
    }

    /// The `all_items` record of a controller.
    pub fn controller_record(&self, controller_id: &str) -> Option<Value> {
        self.table(TableName::AllItems).get(controller_id).cloned()
    }

    /// Id of the controller managing the named AP.
    pub fn ap_controller_id(&self, ap_name: &str) -> Option<String> {
        self.table(TableName::ApControllers)
            .get(ap_name)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    /// Distinct controller ids for a set of AP names. Unknown names are
    /// skipped.
    pub fn aps_controller_ids<'a>(&self, ap_names: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let table = self.table(TableName::ApControllers);
        ap_names
            .into_iter()
            .filter_map(|name| table.get(name).and_then(Value::as_str).map(str::to_owned))
            .collect()
    }
}

fn fan_out(records: &[Value]) -> HashMap<TableName, Arc<Table>> {
    let mut controllers = Table::new();
    let mut no_ptr = Table::new();
    let mut virtual_controllers = Table::new();
    let mut controller_aps: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut ap_controllers = Table::new();
    let mut controllerless = Table::new();
    let mut all_items = Table::new();

    for record in records {
        let Some(id) = attribute(record, "id") else {
            warn!("inventory record without an id skipped");
            continue;
        };
        let field = |tag| first_text(record, tag);
        let category = field("device_category").unwrap_or_default();
        let name = field("name");
        let controller_id = field("controller_id");
        let fqdn = field("fqdn");
        let model = field("model");

        all_items.insert(
            id.to_owned(),
            json!({
                "lan_ip": field("lan_ip"),
                "lan_mac": field("lan_mac"),
                "name": name,
                "serial_number": field("serial_number"),
                "device_category": field("device_category"),
                "controller_id": controller_id,
                "fqdn": fqdn,
                "manufacturer": field("mfgr"),
                "model": model,
                "is_rap": field("is_remote_ap"),
            }),
        );

        let is_controller = category.contains("controller");
        let is_virtual = model.is_some_and(|m| m.contains("Instant Virtual Controller"));

        if is_controller && !is_virtual {
            match (fqdn, field("lan_ip")) {
                (Some(fqdn), _) => {
                    controllers.insert(id.to_owned(), json!(fqdn));
                }
                (None, Some(ip)) => {
                    no_ptr.insert(ip.to_owned(), json!(name));
                }
                (None, None) => debug!(id, "controller without FQDN or LAN IP"),
            }
        } else if is_controller {
            virtual_controllers.insert(id.to_owned(), json!(fqdn));
        } else if let (true, Some(controller_id)) = (category.contains("thin_ap"), controller_id) {
            let ap_name = name.unwrap_or(id);
            controller_aps
                .entry(controller_id.to_owned())
                .or_default()
                .push(json!(ap_name));
            ap_controllers.insert(ap_name.to_owned(), json!(controller_id));
        } else if controller_id.is_none() {
            controllerless.insert(id.to_owned(), json!(name));
        }
    }

    let controller_aps: Table = controller_aps
        .into_iter()
        .map(|(id, aps)| (id, Value::Array(aps)))
        .collect();

    HashMap::from([
        (TableName::Controllers, Arc::new(controllers)),
        (TableName::NoPtrControllers, Arc::new(no_ptr)),
        (TableName::IapVirtualControllers, Arc::new(virtual_controllers)),
        (TableName::ControllerAps, Arc::new(controller_aps)),
        (TableName::ApControllers, Arc::new(ap_controllers)),
        (TableName::ControllerlessAps, Arc::new(controllerless)),
        (TableName::AllItems, Arc::new(all_items)),
    ])
}

/// Build-once, single-flight holder of the [`InventoryStore`].
#[derive(Default)]
pub struct InventoryCache {
    store: ArcSwapOption<InventoryStore>,
    load: Mutex<()>,
    loading: AtomicBool,
}

/// Clears the loading flag when the load finishes or is cancelled.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl InventoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CacheState {
        if self.store.load().is_some() {
            CacheState::Populated
        } else if self.loading.load(Ordering::SeqCst) {
            CacheState::Loading
        } else {
            CacheState::Empty
        }
    }

    /// The store, built from `fetch` on first use.
    ///
    /// Callers arriving while a fetch is in flight wait for it and get
    /// the same store. A failed fetch leaves the cache empty.
    pub async fn get_or_load<F, Fut>(&self, fetch: F) -> Result<Arc<InventoryStore>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, Error>>,
    {
        if let Some(store) = self.store.load_full() {
            return Ok(store);
        }
        let _guard = self.load.lock().await;
        if let Some(store) = self.store.load_full() {
            debug!("inventory populated by a concurrent caller");
            return Ok(store);
        }
        self.load_locked(fetch).await
    }

    /// Fetch and rebuild the store, replacing the current one.
    pub async fn refresh<F, Fut>(&self, fetch: F) -> Result<Arc<InventoryStore>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, Error>>,
    {
        let _guard = self.load.lock().await;
        self.load_locked(fetch).await
    }

    async fn load_locked<F, Fut>(&self, fetch: F) -> Result<Arc<InventoryStore>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, Error>>,
    {
        let _flag = LoadingFlag::raise(&self.loading);
        let raw = fetch().await?;
        let store = Arc::new(InventoryStore::build(raw)?);
        info!(
            items = store.table(TableName::AllItems).len(),
            controllers = store.table(TableName::Controllers).len(),
            "inventory built"
        );
        self.store.store(Some(Arc::clone(&store)));
        Ok(store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use pretty_assertions::assert_eq;

    use super::*;

    const AP_LIST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<amp:amp_ap_list version="1" xmlns:amp="http://www.airwave.com">
  <ap id="1">
    <device_category>controller</device_category>
    <fqdn>mc1.example.net</fqdn>
    <lan_ip>10.0.0.1</lan_ip>
    <model id="10">Aruba 7210</model>
    <name>mc1</name>
  </ap>
  <ap id="2">
    <device_category>controller</device_category>
    <lan_ip>10.0.0.2</lan_ip>
    <model id="10">Aruba 7210</model>
    <name>mc2</name>
  </ap>
  <ap id="3">
    <device_category>controller</device_category>
    <fqdn>vc.example.net</fqdn>
    <model id="11">Instant Virtual Controller</model>
    <name>vc</name>
  </ap>
  <ap id="4">
    <controller_id>1</controller_id>
    <device_category>thin_ap</device_category>
    <model id="12">AP-515</model>
    <name>ap-lobby</name>
    <mfgr>Aruba</mfgr>
    <is_remote_ap>false</is_remote_ap>
  </ap>
  <ap id="5">
    <controller_id>1</controller_id>
    <device_category>thin_ap</device_category>
    <model id="12">AP-515</model>
    <name>ap-hall</name>
  </ap>
  <ap id="6">
    <device_category>ap</device_category>
    <model id="13">IAP-305</model>
    <name>iap-kiosk</name>
  </ap>
</amp:amp_ap_list>"#;

    #[test]
    fn fan_out_fills_every_table() {
        let store = InventoryStore::build(AP_LIST.to_owned()).unwrap();

        assert_eq!(store.table(TableName::Controllers).get("1").unwrap(), "mc1.example.net");
        assert_eq!(store.table(TableName::NoPtrControllers).get("10.0.0.2").unwrap(), "mc2");
        assert_eq!(
            store.table(TableName::IapVirtualControllers).get("3").unwrap(),
            "vc.example.net"
        );
        assert_eq!(
            store.table(TableName::ControllerAps).get("1").unwrap(),
            &json!(["ap-lobby", "ap-hall"])
        );
        assert_eq!(store.table(TableName::ApControllers).get("ap-hall").unwrap(), "1");
        assert_eq!(store.table(TableName::ControllerlessAps).get("6").unwrap(), "iap-kiosk");

        let all = store.table(TableName::AllItems);
        assert_eq!(all.len(), 6);
        assert_eq!(all["4"]["manufacturer"], "Aruba");
        assert_eq!(all["4"]["model"], "AP-515");
        assert_eq!(all["4"]["is_rap"], "false");
        assert_eq!(all["2"]["fqdn"], Value::Null);
    }

    #[test]
    fn derived_queries() {
        let store = InventoryStore::build(AP_LIST.to_owned()).unwrap();
        assert_eq!(
            store.controller_fqdns().into_iter().collect::<Vec<_>>(),
            ["mc1.example.net"]
        );
        assert_eq!(
            store.controllers_aps(),
            BTreeMap::from([(
                "mc1.example.net".to_owned(),
                vec!["ap-lobby".to_owned(), "ap-hall".to_owned()]
            )])
        );
        assert_eq!(store.ap_controller_id("ap-lobby").as_deref(), Some("1"));
        assert_eq!(store.ap_controller_id("ap-missing"), None);
        assert_eq!(
            store.aps_controller_ids(["ap-lobby", "ap-hall", "nope"]).len(),
            1
        );
    }

    #[test]
    fn controllers_aps_skips_virtual_and_unnamed_controllers() {
        const MIXED: &str = r#"<amp:amp_ap_list version="1" xmlns:amp="http://www.airwave.com">
  <ap id="2">
    <device_category>controller</device_category>
    <lan_ip>10.0.0.2</lan_ip>
    <model id="10">Aruba 7210</model>
    <name>mc2</name>
  </ap>
  <ap id="3">
    <device_category>controller</device_category>
    <fqdn>vc.example.net</fqdn>
    <model id="11">Instant Virtual Controller</model>
    <name>vc</name>
  </ap>
  <ap id="8">
    <controller_id>2</controller_id>
    <device_category>thin_ap</device_category>
    <name>ap-8</name>
  </ap>
  <ap id="9">
    <controller_id>3</controller_id>
    <device_category>thin_ap</device_category>
    <name>iap-1</name>
  </ap>
</amp:amp_ap_list>"#;
        let store = InventoryStore::build(MIXED.to_owned()).unwrap();
        assert_eq!(store.table(TableName::ControllerAps).len(), 2);
        assert!(store.controllers_aps().is_empty());
    }

    #[test]
    fn controller_record_reads_all_items() {
        let store = InventoryStore::build(AP_LIST.to_owned()).unwrap();
        let record = store.controller_record("1").unwrap();
        assert_eq!(record["fqdn"], "mc1.example.net");
        assert_eq!(record["lan_ip"], "10.0.0.1");
        assert_eq!(store.controller_record("99"), None);
    }

    #[test]
    fn empty_list_builds_empty_tables() {
        let store = InventoryStore::build("<amp:amp_ap_list/>".to_owned()).unwrap();
        for name in TableName::ALL {
            assert!(store.table(name).is_empty(), "{name}");
        }
    }

    #[test]
    fn non_xml_inventory_is_malformed() {
        let err = InventoryStore::build(r#"{"ap": []}"#.to_owned()).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn table_names_round_trip_through_strings() {
        for name in TableName::ALL {
            assert_eq!(name.to_string().parse::<TableName>().unwrap(), name);
        }
        assert_eq!(TableName::NoPtrControllers.to_string(), "no_ptr_controllers");
    }

    #[tokio::test]
    async fn concurrent_first_callers_share_one_fetch() {
        let cache = InventoryCache::new();
        let fetches = AtomicUsize::new(0);
        let fetches = &fetches;
        let fetch = || async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(AP_LIST.to_owned())
        };

        assert_eq!(cache.state(), CacheState::Empty);
        let (a, b) = tokio::join!(cache.get_or_load(fetch), cache.get_or_load(fetch));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.state(), CacheState::Populated);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_empty() {
        let cache = InventoryCache::new();
        let result = cache
            .get_or_load(|| async {
                Err(Error::Upstream {
                    endpoint: "ap_list.xml".into(),
                    status: 500,
                    message: "boom".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.state(), CacheState::Empty);

        cache.get_or_load(|| async { Ok(AP_LIST.to_owned()) }).await.unwrap();
        assert_eq!(cache.state(), CacheState::Populated);
    }
}
