//! Core domain + application logic for the XP bot.
//!
//! This crate is framework-agnostic. Telegram and the rewards HTTP API live
//! behind ports (traits) implemented in adapter crates.

pub mod bot;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messages;
pub mod messaging;
pub mod ports;
pub mod registry;
pub mod rewards;
pub mod security;

pub use errors::{Error, Result};
