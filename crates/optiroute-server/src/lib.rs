//! Shared library surface for the route ranking server and its tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod directions;
pub mod geocode;
pub mod planner;
pub mod state;
pub mod weather;
