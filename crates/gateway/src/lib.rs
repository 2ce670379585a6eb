//! Gateway: cached probe endpoints over HTTP plus the membership-gated
//! broadcast channel.
//!
//! Lifecycle:
//! 1. Load + validate config (env overrides win for secrets)
//! 2. Open the roster store (fatal on I/O failure)
//! 3. Build shared state: the two probe caches, gate, command router
//! 4. Start the Telegram transport when a bot token is configured
//! 5. Serve HTTP until a shutdown signal, then drain with a bounded grace
//!
//! Policy lives in [`gate`]; transports stay thin and call through
//! `waypost_channels` traits.

pub mod broadcast;
pub mod commands;
pub mod gate;
pub mod server;
pub mod state;
