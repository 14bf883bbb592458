//! Price-bar store and fill-forward writer:
//! a per-minute last-price snapshot per tracked mint, bounded to 200
//! mints by a 6-hour sliding TTL with LRU eviction on overflow. Readers
//! compute SMAs, returns, highs, and drawdowns over the retained window.

use crate::config::BarsConfig;
use crate::types::Mint;
use std::collections::{HashMap, VecDeque};

const MINUTE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct Bar {
    pub ts: i64,
    pub price: f64,
}

struct MintBars {
    bars: VecDeque<Bar>,
    last_seen: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteSummary {
    pub tracked_count: usize,
    pub rows_written: usize,
    pub skipped_no_price: usize,
    pub skipped_already_exists: usize,
}

/// In-memory per-minute fill-forward price bar store.
pub struct PriceBarStore {
    cfg: BarsConfig,
    mints: HashMap<Mint, MintBars>,
}

impl PriceBarStore {
    pub fn new(cfg: BarsConfig) -> Self {
        Self {
            cfg,
            mints: HashMap::new(),
        }
    }

    /// Writes one bar per `(mint, last_price)` pair, floored to the minute,
    /// idempotent on `(mint, ts)`. Evicts the least-recently-seen mint when
    /// the tracked set would exceed `max_tracked_mints`, and drops bars
    /// older than `ttl_hours` from every tracked mint.
    pub fn write_tick(&mut self, prices: &[(Mint, Option<f64>)], now: i64) -> WriteSummary {
        let ts = floor_to_minute(now);
        let ttl_secs = self.cfg.ttl_hours * 3600;
        let mut summary = WriteSummary::default();

        for (mint, price) in prices {
            let Some(price) = price else {
                summary.skipped_no_price += 1;
                continue;
            };

            if !self.mints.contains_key(mint) && self.mints.len() >= self.cfg.max_tracked_mints {
                self.evict_lru();
            }

            let entry = self.mints.entry(mint.clone()).or_insert_with(|| MintBars {
                bars: VecDeque::new(),
                last_seen: now,
            });
            entry.last_seen = now;

            if entry.bars.back().map(|b| b.ts) == Some(ts) {
                summary.skipped_already_exists += 1;
            } else {
                entry.bars.push_back(Bar { ts, price: *price });
                summary.rows_written += 1;
            }

            while entry.bars.front().map(|b| b.ts < ts - ttl_secs).unwrap_or(false) {
                entry.bars.pop_front();
            }
        }

        summary.tracked_count = self.mints.len();
        summary
    }

    fn evict_lru(&mut self) {
        if let Some(lru_mint) = self
            .mints
            .iter()
            .min_by_key(|(_, b)| b.last_seen)
            .map(|(m, _)| m.clone())
        {
            self.mints.remove(&lru_mint);
        }
    }

    /// Logical (oldest-to-newest) bar order. The backing `VecDeque` wraps
    /// once `push_back`/`pop_front` has cycled past its start, so reading
    /// only `as_slices().0` silently drops the newest bars after a wrap —
    /// collect both slices instead.
    fn bars(&self, mint: &Mint) -> Vec<Bar> {
        self.mints
            .get(mint)
            .map(|b| b.bars.iter().copied().collect())
            .unwrap_or_default()
    }

    /// `None` unless the retained window has at least `window_minutes` bars.
    pub fn sma(&self, mint: &Mint, window_minutes: usize) -> Option<f64> {
        let bars = self.bars(mint);
        if bars.len() < window_minutes || window_minutes == 0 {
            return None;
        }
        let window = &bars[bars.len() - window_minutes..];
        Some(window.iter().map(|b| b.price).sum::<f64>() / window_minutes as f64)
    }

    pub fn return_pct(&self, mint: &Mint, window_minutes: usize) -> Option<f64> {
        let bars = self.bars(mint);
        if bars.len() < window_minutes + 1 || window_minutes == 0 {
            return None;
        }
        let start = bars[bars.len() - window_minutes - 1].price;
        let end = bars[bars.len() - 1].price;
        if start <= 0.0 {
            return None;
        }
        Some((end - start) / start)
    }

    pub fn high(&self, mint: &Mint, window_minutes: usize) -> Option<f64> {
        let bars = self.bars(mint);
        if bars.is_empty() {
            return None;
        }
        let take = window_minutes.min(bars.len());
        bars[bars.len() - take..]
            .iter()
            .map(|b| b.price)
            .fold(None, |acc, p| Some(acc.map_or(p, |a: f64| a.max(p))))
    }

    /// Max peak-to-trough drawdown over the retained window, as a
    /// positive fraction (0.2 == a 20% drawdown).
    pub fn drawdown(&self, mint: &Mint, window_minutes: usize) -> Option<f64> {
        let bars = self.bars(mint);
        if bars.is_empty() {
            return None;
        }
        let take = window_minutes.min(bars.len());
        let window = &bars[bars.len() - take..];
        let mut peak = window[0].price;
        let mut max_dd: f64 = 0.0;
        for b in window {
            peak = peak.max(b.price);
            if peak > 0.0 {
                max_dd = max_dd.max((peak - b.price) / peak);
            }
        }
        Some(max_dd)
    }

    pub fn tracked_count(&self) -> usize {
        self.mints.len()
    }
}

fn floor_to_minute(ts: i64) -> i64 {
    ts - ts.rem_euclid(MINUTE_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(max_tracked: usize) -> BarsConfig {
        BarsConfig {
            ttl_hours: 6,
            max_tracked_mints: max_tracked,
        }
    }

    #[test]
    fn write_tick_is_idempotent_within_the_same_minute() {
        let mut store = PriceBarStore::new(cfg(200));
        let mint = Mint::from("mintA");

        let s1 = store.write_tick(&[(mint.clone(), Some(1.0))], 0);
        assert_eq!(s1.rows_written, 1);

        let s2 = store.write_tick(&[(mint.clone(), Some(1.1))], 30);
        assert_eq!(s2.skipped_already_exists, 1);
        assert_eq!(s2.rows_written, 0);
    }

    #[test]
    fn sma_is_none_until_window_is_full() {
        let mut store = PriceBarStore::new(cfg(200));
        let mint = Mint::from("mintA");
        for i in 0..5 {
            store.write_tick(&[(mint.clone(), Some(1.0 + i as f64))], i * 60);
        }
        assert!(store.sma(&mint, 10).is_none());
        let sma = store.sma(&mint, 5).unwrap();
        assert!((sma - 3.0).abs() < 1e-9);
    }

    #[test]
    fn lru_eviction_drops_the_least_recently_seen_mint_on_overflow() {
        let mut store = PriceBarStore::new(cfg(2));
        store.write_tick(&[(Mint::from("a"), Some(1.0))], 0);
        store.write_tick(&[(Mint::from("b"), Some(1.0))], 60);
        store.write_tick(&[(Mint::from("c"), Some(1.0))], 120);

        assert_eq!(store.tracked_count(), 2);
        assert!(store.sma(&Mint::from("a"), 1).is_none());
        assert!(store.sma(&Mint::from("c"), 1).is_some());
    }

    #[test]
    fn drawdown_tracks_the_worst_peak_to_trough_move() {
        let mut store = PriceBarStore::new(cfg(200));
        let mint = Mint::from("mintA");
        for (i, price) in [1.0, 2.0, 1.0, 1.5].into_iter().enumerate() {
            store.write_tick(&[(mint.clone(), Some(price))], i as i64 * 60);
        }
        let dd = store.drawdown(&mint, 10).unwrap();
        assert!((dd - 0.5).abs() < 1e-9);
    }

    /// Pushes enough bars to cycle the underlying `VecDeque` past its
    /// start (TTL eviction pops the front while new minutes push the
    /// back), then checks readers still see the newest prices rather than
    /// a stale view truncated to the deque's first contiguous slice.
    #[test]
    fn readers_see_newest_bars_after_the_deque_wraps() {
        let mut store = PriceBarStore::new(BarsConfig {
            ttl_hours: 1,
            max_tracked_mints: 200,
        });
        let mint = Mint::from("mintA");

        // 1h TTL keeps the last 60 bars; push 120 minutes so the deque
        // has definitely wrapped (pop_front/push_back past its capacity).
        for i in 0..120 {
            store.write_tick(&[(mint.clone(), Some(i as f64))], i * 60);
        }

        // Newest price is 119.0 at minute 119; sma(1) must see it, not a
        // value from the stale first-slice window.
        let sma1 = store.sma(&mint, 1).unwrap();
        assert!((sma1 - 119.0).abs() < 1e-9);

        let ret = store.return_pct(&mint, 5).unwrap();
        assert!((ret - (119.0 - 114.0) / 114.0).abs() < 1e-9);

        let high = store.high(&mint, 5).unwrap();
        assert!((high - 119.0).abs() < 1e-9);
    }
}
