use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, B256};
use glide_primitives::{Batch, Role, Timestamp};
use tracing::debug;

/// Source of the current time for challenge deadlines.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Timestamp(millis)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start.0),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now.0, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(millis))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.load(Ordering::SeqCst))
    }
}

/// Answers whether an address may act in a role.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, address: &Address, role: Role) -> bool;
}

/// The on-chain side of the rollup, told about every newly committed batch.
pub trait SettlementLayer: Send + Sync {
    fn submit_batch(&self, batch: &Batch) -> anyhow::Result<()>;
}

/// Settlement layer that accepts every batch without sending it anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSettlement;

impl SettlementLayer for NoopSettlement {
    fn submit_batch(&self, batch: &Batch) -> anyhow::Result<()> {
        debug!(id = %batch.id, root = %B256::from(batch.root), "Skipping settlement submission");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_on_request() {
        let clock = ManualClock::new(Timestamp(10));
        assert_eq!(clock.now(), Timestamp(10));
        clock.advance(5);
        assert_eq!(clock.now(), Timestamp(15));
        clock.set(Timestamp(u64::MAX - 1));
        clock.advance(10);
        assert_eq!(clock.now(), Timestamp(u64::MAX));
    }

    #[test]
    fn system_clock_is_past_2020() {
        assert!(SystemClock.now() > Timestamp(1_577_836_800_000));
    }
}
