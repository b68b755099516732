// arubafi-api: Async Rust client for Aruba network management APIs
//
// Three backends behind one calling convention (construct, establish a
// session, call endpoint methods or the generic `resource`):
//   - Mobility Master (AOS 8): UID token, token-enveloped JSON
//   - AirWave: cookie session, XML, cached inventory
//   - Central: bearer token, JSON

pub mod airwave;
pub mod auth;
pub mod central;
pub mod config;
pub mod credentials;
mod dispatch;
pub mod error;
pub mod filter;
pub mod mobility;
mod redact;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;
pub mod xml;

// ── Primary re-exports ──────────────────────────────────────────────
pub use airwave::{AirWave, CacheState, ClientApInfo, InstanceRegistry, TableName};
pub use auth::{AuthMaterial, Backend, SessionHandle};
pub use central::CentralClient;
pub use config::{ConnectionConfig, TlsVerify};
pub use credentials::{NonInteractive, Prompter};
pub use error::Error;
pub use filter::{FilterExpression, FilterOp};
pub use mobility::{MmClient, ObjectQuery};
pub use request::{Method, RequestSpec};
pub use response::{BodyFormat, ResponseDocument};
