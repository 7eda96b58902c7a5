//! OptiRoute CLI - command line tools for the flood-risk engine.
//!
//! - `offline`: load datasets and route files, build engines without a server
//! - `client`: blocking HTTP client for a running OptiRoute server

pub mod client;
pub mod offline;

pub use client::RouteClient;
pub use offline::{load_route, parse_lat_lng, Datasets};
