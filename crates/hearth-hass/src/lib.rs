//! Entity snapshot providers backed by Home Assistant.
//!
//! [`EntitySnapshotProvider`] is the read interface the search engine uses
//! for plain listings and substring lookups. [`HassClient`] serves it from
//! the REST API (`GET /api/states`); [`StaticSnapshot`] serves it from
//! memory or from a saved states dump.

pub mod client;
pub mod snapshot;

pub use client::HassClient;
pub use snapshot::{matches_keyword, select_entities, EntitySnapshotProvider, StaticSnapshot};
