//! Seam between the gateway core and messaging transports.
//!
//! A transport (Telegram in the shipped build) pushes inbound text through
//! [`Inbound`] and carries deliveries out through [`Outbound`]. The core
//! never sees transport types, so tests drive it with fakes.

pub mod plugin;

pub use plugin::{Inbound, NoopOutbound, Outbound};
