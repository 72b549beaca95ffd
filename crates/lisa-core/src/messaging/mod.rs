//! Transport-facing types: inbound events and the session port.

pub mod port;
pub mod types;
