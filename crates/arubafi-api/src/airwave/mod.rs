//! AirWave client: cookie session, XML resources, and the inventory
//! cache built from `ap_list.xml`.

mod client;
mod clients;
mod inventory;
mod registry;

pub use client::AirWave;
pub use clients::ClientApInfo;
pub use inventory::{CacheState, InventoryCache, InventoryStore, Table, TableName};
pub use registry::{InstanceGuard, InstanceRegistry};
