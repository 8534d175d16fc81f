//! Region-partitioned log query service with an agent tool facade.
//! The core (store, bootstrap, time codec, service) is transport-agnostic;
//! `http` and `mcp`/`tools` are thin adapters over it.

pub mod config;
pub mod error;
pub mod model;
pub mod time_codec;
pub mod store;
pub mod bootstrap;
pub mod service;
pub mod tools;
pub mod http;
pub mod mcp;
