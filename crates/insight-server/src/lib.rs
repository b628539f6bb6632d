//! Shared library surface for the insight server and its tests.

pub mod api;
pub mod config;
pub mod state;
pub mod store;
