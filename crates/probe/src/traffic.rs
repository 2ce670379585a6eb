use {
    anyhow::{Context, bail},
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::{ExecOpts, ProbeSource, exec_command};

// ── vnstat JSON model (the fields we read) ───────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VnstatReport {
    #[serde(default)]
    pub interfaces: Vec<VnstatInterface>,
}

#[derive(Debug, Deserialize)]
pub struct VnstatInterface {
    pub name: String,
    #[serde(default)]
    pub traffic: VnstatTraffic,
}

#[derive(Debug, Default, Deserialize)]
pub struct VnstatTraffic {
    #[serde(default)]
    pub day: Vec<DayTraffic>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DayTraffic {
    #[serde(default)]
    pub rx: u64,
    #[serde(default)]
    pub tx: u64,
}

// ── Aggregation ──────────────────────────────────────────────────────────────

/// Rx/tx totals for the last day and the trailing 7- and 30-day windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSummary {
    pub day_rx: u64,
    pub day_tx: u64,
    pub day7_rx: u64,
    pub day7_tx: u64,
    pub day30_rx: u64,
    pub day30_tx: u64,
}

/// Fold per-day records (oldest first, as vnstat emits them) into a summary.
pub fn summarize(days: &[DayTraffic]) -> TrafficSummary {
    let mut summary = TrafficSummary::default();

    if let Some(last) = days.last() {
        summary.day_rx = last.rx;
        summary.day_tx = last.tx;
    }

    let week_start = days.len().saturating_sub(7);
    for (i, day) in days.iter().enumerate() {
        summary.day30_rx += day.rx;
        summary.day30_tx += day.tx;
        if i >= week_start {
            summary.day7_rx += day.rx;
            summary.day7_tx += day.tx;
        }
    }

    summary
}

// ── Sources ──────────────────────────────────────────────────────────────────

/// Structured traffic summary aggregated from `vnstat --json d 30`.
///
/// The cached payload is the serialized [`TrafficSummary`] of the first
/// reported interface.
pub struct TrafficSummarySource {
    opts: ExecOpts,
}

impl TrafficSummarySource {
    pub fn new(opts: ExecOpts) -> Self {
        Self { opts }
    }
}

#[async_trait]
impl ProbeSource for TrafficSummarySource {
    async fn collect(&self) -> anyhow::Result<String> {
        let raw = exec_command("vnstat", &["--json", "d", "30"], &self.opts).await?;
        if raw.trim().is_empty() {
            bail!("vnstat produced no output");
        }

        let report: VnstatReport =
            serde_json::from_str(&raw).context("unparseable vnstat json")?;
        let Some(interface) = report.interfaces.first() else {
            bail!("vnstat reported no interfaces");
        };

        let summary = summarize(&interface.traffic.day);
        Ok(serde_json::to_string(&summary)?)
    }
}

/// Uncached pass-through of a bounded historical query.
///
/// Callers validate `limit` against the configured ceiling before calling;
/// this function only runs the collaborator.
pub async fn raw_traffic(mode: &str, limit: u32, opts: &ExecOpts) -> anyhow::Result<String> {
    let limit = limit.to_string();
    let raw = exec_command("vnstat", &["--json", mode, &limit], opts).await?;
    if raw.trim().is_empty() {
        bail!("vnstat produced no output");
    }
    Ok(raw)
}
