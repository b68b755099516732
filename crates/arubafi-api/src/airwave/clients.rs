use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::AirWave;
use crate::error::Error;
use crate::request::RequestSpec;
use crate::response::ResponseDocument;
use crate::xml::{attribute, first_child, first_text};

/// Where a wireless client is associated, and the AP serving it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientApInfo {
    pub ap_id: String,
    pub ap_name: Option<String>,
    pub radio: Option<String>,
    pub essid: Option<String>,
    pub vlan: Option<String>,
    pub controller_id: Option<String>,
    pub client_count: Option<String>,
    pub firmware: Option<String>,
    pub ap_fqdn: Option<String>,
    pub lan_ip: Option<String>,
    pub lan_mac: Option<String>,
    pub model: Option<String>,
    pub operating_mode: Option<String>,
    pub serial_number: Option<String>,
}

fn owned(text: Option<&str>) -> Option<String> {
    text.map(str::to_owned)
}

fn root_of<'a>(document: &'a ResponseDocument, endpoint: &str) -> Result<&'a Value, Error> {
    document.xml_root().ok_or_else(|| Error::MalformedResponse {
        message: format!("{endpoint}: expected an XML document"),
        excerpt: String::new(),
    })
}

impl AirWave {
    /// Look up the AP a client (by MAC) is associated with.
    ///
    /// Two targeted calls: `client_detail.xml?mac=` for the association,
    /// then `ap_list.xml?id=` for the AP. Neither touches the inventory
    /// cache. Returns `None` when the client is unknown or not associated.
    pub async fn client_ap_info(&self, mac: &str) -> Result<Option<ClientApInfo>, Error> {
        let detail = self
            .resource(RequestSpec::get("client_detail.xml").param("mac", mac.trim().to_uppercase()))
            .await?;
        let root = root_of(&detail, "client_detail.xml")?;

        if let Some(error) = first_text(root, "error") {
            return Err(Error::Upstream {
                endpoint: "client_detail.xml".into(),
                status: 0,
                message: error.to_owned(),
            });
        }
        let Some(client) = first_child(root, "client") else {
            debug!(mac, "client unknown to AirWave");
            return Ok(None);
        };
        if first_text(client, "assoc_stat") != Some("true") {
            debug!(mac, "client not associated");
            return Ok(None);
        }

        let ap = first_child(client, "ap");
        let Some(ap_id) = ap.and_then(|ap| attribute(ap, "id")) else {
            return Ok(None);
        };
        let mut info = ClientApInfo {
            ap_id: ap_id.to_owned(),
            ap_name: owned(ap.and_then(|ap| ap.get("#text")).and_then(Value::as_str)),
            radio: owned(first_text(client, "radio_mode")),
            essid: owned(first_text(client, "ssid")),
            vlan: owned(first_text(client, "vlan")),
            ..ClientApInfo::default()
        };

        let ap_detail = self
            .resource(RequestSpec::get("ap_list.xml").param("id", ap_id))
            .await?;
        if let Some(ap) = first_child(root_of(&ap_detail, "ap_list.xml")?, "ap") {
            info.controller_id = owned(first_text(ap, "controller_id"));
            info.client_count = owned(first_text(ap, "client_count"));
            info.firmware = owned(first_text(ap, "firmware"));
            info.ap_fqdn = owned(first_text(ap, "fqdn"));
            info.lan_ip = owned(first_text(ap, "lan_ip"));
            info.lan_mac = owned(first_text(ap, "lan_mac"));
            info.model = owned(first_text(ap, "model"));
            info.operating_mode = owned(first_text(ap, "operating_mode"));
            info.serial_number = owned(first_text(ap, "serial_number"));
        }
        Ok(Some(info))
    }

    /// The `all_items` record of the controller serving a client.
    ///
    /// Resolves the client's AP with [`AirWave::client_ap_info`], then
    /// looks its controller up in the inventory. `None` when the client is
    /// not associated or its AP reports no controller.
    pub async fn client_controller_info(&self, mac: &str) -> Result<Option<Value>, Error> {
        let Some(controller_id) = self.client_ap_info(mac).await?.and_then(|info| info.controller_id) else {
            return Ok(None);
        };
        self.controller_info(&controller_id).await
    }
}
