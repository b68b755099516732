// Thin wrappers over `MmClient::object` for frequently used
// configuration objects.

use serde_json::Value;

use super::{MmClient, ObjectQuery};
use crate::error::Error;
use crate::response::ResponseDocument;

macro_rules! config_objects {
    ($( $(#[$doc:meta])* $name:ident => $object:literal; )+) => {
        impl MmClient {
            $(
                $(#[$doc])*
                ///
                #[doc = concat!("`GET` (or `POST` with `data`) `/configuration/object/", $object, "`")]
                pub async fn $name(
                    &self,
                    data: Option<Value>,
                    query: ObjectQuery,
                ) -> Result<ResponseDocument, Error> {
                    self.object(concat!("configuration/object/", $object), data, query).await
                }
            )+
        }
    };
}

config_objects! {
    /// AP groups.
    ap_group => "ap_group";
    /// AP system profiles.
    ap_sys_prof => "ap_sys_prof";
    /// SSID profiles.
    ssid_prof => "ssid_prof";
    /// Virtual AP profiles.
    virtual_ap => "virtual_ap";
    /// Regulatory domain profiles.
    reg_domain_prof => "reg_domain_prof";
    /// 802.11k profiles.
    dot11k_prof => "dot11k_prof";
    /// 802.11r profiles.
    dot11r_prof => "dot11r_prof";
    /// 5 GHz radio profiles.
    ap_a_radio_prof => "ap_a_radio_prof";
    /// High-throughput radio profiles.
    ht_radio_prof => "ht_radio_prof";
    /// Configuration node hierarchy.
    node_hierarchy => "node_hierarchy";
    /// Register a device in the configuration hierarchy.
    add_configuration_device => "add_configuration_device";
    /// Network destinations.
    netdst => "netdst";
    /// Network services.
    netsvc => "netsvc";
    /// Session ACLs.
    acl_sess => "acl_sess";
}
