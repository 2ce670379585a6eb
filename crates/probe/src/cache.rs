use std::time::Duration;

use {
    tokio::{sync::Mutex, time::Instant},
    tracing::warn,
};

use crate::ProbeSource;

#[derive(Default)]
struct CacheSlot {
    value: String,
    refreshed_at: Option<Instant>,
}

/// Time-windowed cache wrapping one expensive probe.
///
/// The slot lock is held across the refresh, so callers that observe an
/// expired window queue behind the one in-flight collect and share its
/// result instead of each invoking the probe.
///
/// A failed collect is cached as an empty payload for the full window;
/// callers always receive a value. The failure itself is only visible in the
/// logs.
pub struct TtlCache<S> {
    source: S,
    ttl: Duration,
    slot: Mutex<CacheSlot>,
}

impl<S: ProbeSource> TtlCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: Mutex::new(CacheSlot::default()),
        }
    }

    /// Return the cached payload, refreshing it first if the window expired.
    pub async fn get(&self) -> String {
        let mut slot = self.slot.lock().await;
        if let Some(at) = slot.refreshed_at
            && at.elapsed() <= self.ttl
        {
            return slot.value.clone();
        }

        let value = match self.source.collect().await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "probe refresh failed, caching empty payload");
                String::new()
            },
        };
        slot.value = value.clone();
        slot.refreshed_at = Some(Instant::now());
        value
    }
}
