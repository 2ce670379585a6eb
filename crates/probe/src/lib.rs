//! External probes and the TTL cache in front of them.
//!
//! A probe is an expensive external command invocation (fastfetch, vnstat).
//! Each read endpoint owns one [`cache::TtlCache`] wrapping one
//! [`ProbeSource`]; tests substitute deterministic sources.

pub mod cache;
pub mod exec;
pub mod system;
pub mod traffic;

use async_trait::async_trait;

pub use {
    cache::TtlCache,
    exec::{ExecOpts, exec_command},
    system::SystemReportSource,
    traffic::{TrafficSummarySource, raw_traffic},
};

/// A capability producing one probe payload per call.
///
/// Implementations make no latency or determinism promises; the cache layer
/// decides when to invoke them.
#[async_trait]
pub trait ProbeSource: Send + Sync {
    async fn collect(&self) -> anyhow::Result<String>;
}
