//! Core of the contract-address watcher.
//!
//! `extract` is the pure detection engine. Everything around it (blacklist,
//! detection log, relay, history seeding) talks to the outside world through
//! ports implemented in adapter crates, so the core stays framework-agnostic.

pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod filter;
pub mod heartbeat;
pub mod history;
pub mod logging;
pub mod messaging;
pub mod metrics;
pub mod pipeline;
pub mod relay;
pub mod seen;
pub mod stream;
pub mod text;
pub mod utils;

pub use errors::{Error, Result};
pub use extract::{extract, Detection, DetectionKind};
