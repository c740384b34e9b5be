//! Core domain + application logic for the concierge agent.
//!
//! The poll loop, the notification dedup state machine and the callback
//! dispatcher live here. Camera, detector and Telegram sit behind ports
//! (traits) implemented in adapter crates.

pub mod config;
pub mod controller;
pub mod detection;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod imaging;
pub mod logging;
pub mod messaging;
pub mod notify;
pub mod security;
pub mod snapshot;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
