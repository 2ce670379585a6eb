use std::{sync::Arc, time::Duration};

use {
    waypost_config::WaypostConfig,
    waypost_probe::{ExecOpts, SystemReportSource, TrafficSummarySource, TtlCache, raw_traffic},
    waypost_roster::RosterStore,
};

/// Shared gateway runtime state, wrapped in Arc for use across async tasks.
///
/// Everything a request handler touches hangs off this: no module-level
/// statics anywhere in the gateway.
pub struct GatewayState {
    /// Server version string.
    pub version: String,
    /// Hostname for the health endpoint.
    pub hostname: String,
    /// Largest `limit` the raw traffic query accepts.
    pub raw_limit_ceiling: u32,
    /// Composite system report, short window.
    pub info_cache: TtlCache<SystemReportSource>,
    /// Traffic summary, longer window. Independent of `info_cache` even
    /// though both shell out to vnstat.
    pub stat_cache: TtlCache<TrafficSummarySource>,
    /// Membership roster.
    pub roster: Arc<RosterStore>,
    exec_opts: ExecOpts,
}

impl GatewayState {
    pub fn new(config: &WaypostConfig, roster: Arc<RosterStore>) -> Arc<Self> {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".into());

        let exec_opts = ExecOpts {
            timeout: Duration::from_secs(config.probe.command_timeout_secs),
            ..Default::default()
        };

        Arc::new(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            hostname,
            raw_limit_ceiling: config.probe.raw_limit_ceiling,
            info_cache: TtlCache::new(
                SystemReportSource::new(exec_opts.clone()),
                Duration::from_secs(config.probe.info_ttl_secs),
            ),
            stat_cache: TtlCache::new(
                TrafficSummarySource::new(exec_opts.clone()),
                Duration::from_secs(config.probe.stat_ttl_secs),
            ),
            roster,
            exec_opts,
        })
    }

    /// Uncached raw traffic query. Callers validate the range first.
    pub async fn raw_traffic(&self, mode: &str, limit: u32) -> anyhow::Result<String> {
        raw_traffic(mode, limit, &self.exec_opts).await
    }
}
