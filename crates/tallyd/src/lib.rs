//! Tally daemon library
//!
//! The daemon owns the SQLite store and exposes the analytics and
//! gamification API over HTTP. Domain math lives in tally_common; this
//! crate wires it to storage, the submission pipeline, and the routes.

pub mod config;
pub mod notify;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod stats;
pub mod store;
