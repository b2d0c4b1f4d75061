//! # koza
//!
//! Library target of the KozaTakip orchestrator binary: the HTTP API, the CLI
//! and the device-configuration file. Exposed so integration tests can build
//! the router without starting a server.

pub mod api;
pub mod cli;
pub mod device_config;
