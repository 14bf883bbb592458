//! Stuck-target watchdog: tracks consecutive
//! scout-queue failures per mint and backs off exponentially so a
//! pathological mint cannot monopolise the queue.

use crate::config::WatchdogConfig;
use crate::types::Mint;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuckOutcome {
    NotAttempted,
    Submitted,
    Confirmed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, Default)]
struct StuckState {
    failures: u32,
    backoff_until: i64,
}

/// Per-mint consecutive-failure counter with exponential backoff once
/// `failures` reaches `max_attempts`: `base_minutes * 2^(failures - max_attempts)`.
pub struct StuckTargetWatchdog {
    cfg: WatchdogConfig,
    state: DashMap<Mint, StuckState>,
}

impl StuckTargetWatchdog {
    pub fn new(cfg: WatchdogConfig) -> Self {
        Self {
            cfg,
            state: DashMap::new(),
        }
    }

    /// Records the outcome of a scout-queue attempt at `now` (unix seconds).
    /// `Submitted`/`Confirmed` reset the failure count; `Skipped`/`Failed`
    /// increment it and, once at or past `max_attempts`, set a backoff
    /// window. `NotAttempted` is a no-op observation.
    pub fn record(&self, mint: &Mint, outcome: StuckOutcome, now: i64) {
        if !self.cfg.enabled {
            return;
        }
        match outcome {
            StuckOutcome::NotAttempted => {}
            StuckOutcome::Submitted | StuckOutcome::Confirmed => {
                self.state.remove(mint);
            }
            StuckOutcome::Skipped | StuckOutcome::Failed => {
                let mut entry = self.state.entry(mint.clone()).or_default();
                entry.failures += 1;
                if entry.failures >= self.cfg.max_attempts {
                    let exponent = entry.failures - self.cfg.max_attempts;
                    let backoff_minutes = self.cfg.base_minutes * 2_i64.pow(exponent);
                    entry.backoff_until = now + backoff_minutes * 60;
                }
            }
        }
    }

    /// True if `mint` is currently inside its backoff window. Disabled
    /// watchdogs and mints with no recorded failures never block.
    pub fn is_blocked(&self, mint: &Mint, now: i64) -> bool {
        if !self.cfg.enabled {
            return false;
        }
        self.state
            .get(mint)
            .map(|entry| entry.backoff_until > now)
            .unwrap_or(false)
    }

    pub fn failures(&self, mint: &Mint) -> u32 {
        self.state.get(mint).map(|e| e.failures).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> WatchdogConfig {
        WatchdogConfig {
            enabled: true,
            max_attempts: 3,
            base_minutes: 5,
        }
    }

    /// S5: max_attempts=3, base=5min. Fourth consecutive failure should
    /// double the backoff that the third failure set.
    #[test]
    fn backoff_doubles_on_each_failure_past_max_attempts() {
        let wd = StuckTargetWatchdog::new(cfg());
        let mint = Mint::from("mintA");

        wd.record(&mint, StuckOutcome::Failed, 0);
        wd.record(&mint, StuckOutcome::Failed, 0);
        assert!(!wd.is_blocked(&mint, 1));

        wd.record(&mint, StuckOutcome::Failed, 0);
        assert!(wd.is_blocked(&mint, 5 * 60 - 1));
        assert!(!wd.is_blocked(&mint, 5 * 60 + 1));

        wd.record(&mint, StuckOutcome::Failed, 5 * 60 + 1);
        assert!(wd.is_blocked(&mint, 5 * 60 + 1 + 10 * 60 - 1));
        assert!(!wd.is_blocked(&mint, 5 * 60 + 1 + 10 * 60 + 1));
    }

    #[test]
    fn confirmed_resets_failure_count() {
        let wd = StuckTargetWatchdog::new(cfg());
        let mint = Mint::from("mintA");

        wd.record(&mint, StuckOutcome::Failed, 0);
        wd.record(&mint, StuckOutcome::Failed, 0);
        wd.record(&mint, StuckOutcome::Confirmed, 0);

        assert_eq!(wd.failures(&mint), 0);
        assert!(!wd.is_blocked(&mint, 0));
    }

    #[test]
    fn disabled_watchdog_never_blocks() {
        let mut disabled = cfg();
        disabled.enabled = false;
        let wd = StuckTargetWatchdog::new(disabled);
        let mint = Mint::from("mintA");

        for _ in 0..10 {
            wd.record(&mint, StuckOutcome::Failed, 0);
        }
        assert!(!wd.is_blocked(&mint, 0));
    }
}
