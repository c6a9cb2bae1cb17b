//! Core domain + application logic for the WhatsApp bulk-send client.
//!
//! This crate is framework-agnostic. The backend REST API lives behind ports
//! (traits) implemented in adapter crates.

pub mod attachment;
pub mod automation;
pub mod config;
pub mod contacts;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod phone;
pub mod ports;
pub mod schedule;
pub mod status;
pub mod utils;

pub use errors::{Error, Result};
