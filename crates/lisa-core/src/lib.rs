//! Core of the Lisa bot: inbound WhatsApp message classification and dispatch.
//!
//! This crate is transport-agnostic. The WhatsApp session lives behind
//! [`messaging::port::SessionTransport`], implemented in adapter crates.

pub mod classify;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod media;
pub mod messaging;
pub mod pipeline;
pub mod status;

pub use errors::{Error, Result};
