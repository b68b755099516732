//! Mobility Master (AOS 8) configuration API client.
//!
//! Session: `POST /v1/api/login` returns a UID that is sent back as the
//! `UIDARUBA` query parameter. Object calls are scoped by `config_path`
//! (default `/md`) and may carry a filter, see [`ObjectQuery`].

mod client;
mod objects;
mod query;

pub use client::MmClient;
pub use query::ObjectQuery;
