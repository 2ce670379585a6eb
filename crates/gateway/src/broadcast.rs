use tracing::{info, warn};

use {waypost_channels::Outbound, waypost_roster::RosterStore};

/// Outcome of one fan-out. `attempted` is the snapshot size at dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Best-effort fan-out of one message to every current member.
///
/// The recipient set is a snapshot taken here; principals joining or leaving
/// mid-dispatch may or may not be included. Each delivery is independent: a
/// failure is logged and counted, never aborts the rest. No acks, ordering,
/// or retries.
pub async fn broadcast_message(
    roster: &RosterStore,
    outbound: &dyn Outbound,
    text: &str,
) -> BroadcastReport {
    let recipients = roster.snapshot();
    let mut report = BroadcastReport {
        attempted: recipients.len(),
        ..Default::default()
    };

    for id in recipients {
        match outbound.send_text(id, text).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                warn!(to = id, error = %e, "broadcast delivery failed");
                report.failed += 1;
            },
        }
    }

    info!(
        attempted = report.attempted,
        delivered = report.delivered,
        failed = report.failed,
        "broadcast complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use {anyhow::Result, async_trait::async_trait};

    use waypost_common::PrincipalId;

    use super::*;

    /// Records deliveries; fails for one configured recipient.
    struct FlakyOutbound {
        fail_for: PrincipalId,
        sent: Mutex<Vec<PrincipalId>>,
    }

    #[async_trait]
    impl Outbound for FlakyOutbound {
        async fn send_text(&self, to: PrincipalId, _text: &str) -> Result<()> {
            if to == self.fail_for {
                anyhow::bail!("recipient unreachable");
            }
            self.sent.lock().unwrap().push(to);
            Ok(())
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Arc::new(RosterStore::open(dir.path().join("users.db")).unwrap());
        for id in 1..=5 {
            roster.add(id, None).unwrap();
        }
        let outbound = FlakyOutbound {
            fail_for: 3,
            sent: Mutex::new(Vec::new()),
        };

        let report = broadcast_message(&roster, &outbound, "hello").await;

        assert_eq!(report.attempted, 5);
        assert_eq!(report.delivered, 4);
        assert_eq!(report.failed, 1);
        let mut sent = outbound.sent.lock().unwrap().clone();
        sent.sort_unstable();
        assert_eq!(sent, vec![1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn empty_roster_broadcast_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Arc::new(RosterStore::open(dir.path().join("users.db")).unwrap());

        let report =
            broadcast_message(&roster, &waypost_channels::NoopOutbound, "hello").await;
        assert_eq!(report, BroadcastReport::default());
    }
}
