//! Orphan tracker: in-memory bookkeeping for
//! held mints that have fallen out of the target universe — a position is
//! an orphan candidate for `grace_ticks` consecutive ticks before it is
//! surfaced as ready for a universe exit.

use crate::config::OrphanConfig;
use crate::types::Mint;
use std::collections::HashMap;

/// One held mint as seen by the caller at tick time — carries the symbol
/// and current USD value so the tracker can note them while a position is
/// missing from the target universe, without re-querying position state.
#[derive(Debug, Clone)]
pub struct HeldMintInfo {
    pub mint: Mint,
    pub symbol: String,
    pub usd_value: f64,
}

#[derive(Debug, Clone)]
struct OrphanState {
    first_missing_at: i64,
    ticks_missing: u32,
    symbol: String,
    last_usd_value: f64,
}

pub struct OrphanTracker {
    cfg: OrphanConfig,
    missing: HashMap<Mint, OrphanState>,
}

impl OrphanTracker {
    pub fn new(cfg: OrphanConfig) -> Self {
        Self {
            cfg,
            missing: HashMap::new(),
        }
    }

    /// Call once per tick with the full set of held mints (with their
    /// current symbol/USD value) and the set of mints currently in the
    /// target universe. Mints held but not targeted accrue a missing tick
    /// and have their symbol/last_usd_value refreshed; mints that reappear
    /// (or are no longer held) drop out of tracking entirely.
    pub fn tick(&mut self, held: &[HeldMintInfo], targeted: &[Mint], now: i64) {
        let held_set: std::collections::HashSet<&Mint> = held.iter().map(|h| &h.mint).collect();
        let targeted_set: std::collections::HashSet<&Mint> = targeted.iter().collect();

        self.missing.retain(|mint, _| held_set.contains(mint));

        for info in held {
            if targeted_set.contains(&info.mint) {
                self.missing.remove(&info.mint);
                continue;
            }
            let entry = self.missing.entry(info.mint.clone()).or_insert(OrphanState {
                first_missing_at: now,
                ticks_missing: 0,
                symbol: info.symbol.clone(),
                last_usd_value: info.usd_value,
            });
            entry.ticks_missing += 1;
            entry.symbol = info.symbol.clone();
            entry.last_usd_value = info.usd_value;
        }
    }

    pub fn ready_for_exit(&self, mint: &Mint) -> bool {
        self.missing
            .get(mint)
            .map(|s| s.ticks_missing >= self.cfg.grace_ticks)
            .unwrap_or(false)
    }

    pub fn first_missing_at(&self, mint: &Mint) -> Option<i64> {
        self.missing.get(mint).map(|s| s.first_missing_at)
    }

    pub fn ticks_missing(&self, mint: &Mint) -> u32 {
        self.missing.get(mint).map(|s| s.ticks_missing).unwrap_or(0)
    }

    pub fn symbol(&self, mint: &Mint) -> Option<&str> {
        self.missing.get(mint).map(|s| s.symbol.as_str())
    }

    pub fn last_usd_value(&self, mint: &Mint) -> Option<f64> {
        self.missing.get(mint).map(|s| s.last_usd_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(grace_ticks: u32) -> OrphanConfig {
        OrphanConfig { grace_ticks }
    }

    fn info(mint: &Mint, symbol: &str, usd_value: f64) -> HeldMintInfo {
        HeldMintInfo {
            mint: mint.clone(),
            symbol: symbol.to_string(),
            usd_value,
        }
    }

    #[test]
    fn mint_missing_for_grace_ticks_becomes_ready_for_exit() {
        let mut tracker = OrphanTracker::new(cfg(3));
        let mint = Mint::from("mintA");
        let held = vec![info(&mint, "AAA", 10.0)];

        tracker.tick(&held, &[], 100);
        assert!(!tracker.ready_for_exit(&mint));
        tracker.tick(&held, &[], 101);
        assert!(!tracker.ready_for_exit(&mint));
        tracker.tick(&held, &[], 102);
        assert!(tracker.ready_for_exit(&mint));
        assert_eq!(tracker.first_missing_at(&mint), Some(100));
        assert_eq!(tracker.symbol(&mint), Some("AAA"));
        assert_eq!(tracker.last_usd_value(&mint), Some(10.0));
    }

    #[test]
    fn reappearance_in_targets_clears_tracking() {
        let mut tracker = OrphanTracker::new(cfg(2));
        let mint = Mint::from("mintA");
        let held = vec![info(&mint, "AAA", 10.0)];

        tracker.tick(&held, &[], 100);
        tracker.tick(&held, &[mint.clone()], 101);

        assert_eq!(tracker.ticks_missing(&mint), 0);
        assert!(!tracker.ready_for_exit(&mint));
        assert_eq!(tracker.symbol(&mint), None);
    }

    #[test]
    fn no_longer_held_drops_tracking_entry() {
        let mut tracker = OrphanTracker::new(cfg(1));
        let mint = Mint::from("mintA");

        tracker.tick(&[info(&mint, "AAA", 10.0)], &[], 100);
        assert!(tracker.ready_for_exit(&mint));

        tracker.tick(&[], &[], 101);
        assert_eq!(tracker.ticks_missing(&mint), 0);
        assert!(!tracker.ready_for_exit(&mint));
    }

    #[test]
    fn last_usd_value_tracks_latest_observation_while_missing() {
        let mut tracker = OrphanTracker::new(cfg(5));
        let mint = Mint::from("mintA");

        tracker.tick(&[info(&mint, "AAA", 10.0)], &[], 100);
        tracker.tick(&[info(&mint, "AAA", 4.0)], &[], 101);

        assert_eq!(tracker.last_usd_value(&mint), Some(4.0));
        assert_eq!(tracker.ticks_missing(&mint), 2);
    }
}
