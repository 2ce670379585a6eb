use {anyhow::Result, async_trait::async_trait, tracing::debug};

use waypost_common::PrincipalId;

/// Deliver messages to principals on a channel.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_text(&self, to: PrincipalId, text: &str) -> Result<()>;
}

/// Handle one inbound message from a channel.
///
/// Returns the replies to send back to the originating principal, in order.
/// Side effects (onboarding, broadcast, revocation) happen inside.
#[async_trait]
pub trait Inbound: Send + Sync {
    async fn handle(&self, from: PrincipalId, text: &str) -> Vec<String>;
}

/// Outbound that drops everything. Used when no transport is configured and
/// by tests that only care about the reply stream.
pub struct NoopOutbound;

#[async_trait]
impl Outbound for NoopOutbound {
    async fn send_text(&self, to: PrincipalId, text: &str) -> Result<()> {
        debug!(to, len = text.len(), "noop outbound dropping message");
        Ok(())
    }
}
