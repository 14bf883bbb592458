//! Ranking engine: turns held positions and
//! scan candidates into a common [`RankedItem`] shape with per-component
//! score contributions and the nine exit/promotion flags the rotation
//! evaluator and scout gate read from.

pub mod rotation;

use crate::config::RankingConfig;
use crate::types::{Mint, Regime, SlotType};

/// Either side of the ranking input: a currently-held position, or a
/// scan candidate not yet in the portfolio.
#[derive(Debug, Clone)]
pub enum Rankable {
    Held(HeldPosition),
    Candidate(Candidate),
}

#[derive(Debug, Clone)]
pub struct HeldPosition {
    pub mint: Mint,
    pub signal: f64,
    pub regime: Regime,
    pub entry_price: f64,
    pub peak_price: f64,
    pub current_price: f64,
    pub entry_ms: i64,
    pub now_ms: i64,
    pub slot_type: SlotType,
    pub fifo_discrepancy: bool,
    pub peak_pnl_pct: f64,
}

impl HeldPosition {
    pub fn pnl_pct(&self) -> f64 {
        if self.entry_price > 0.0 {
            (self.current_price - self.entry_price) / self.entry_price
        } else {
            0.0
        }
    }

    pub fn hours_held(&self) -> f64 {
        ((self.now_ms - self.entry_ms).max(0) as f64) / 3_600_000.0
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub mint: Mint,
    pub signal: f64,
    pub regime: Regime,
    pub scanner_score: f64,
    pub volume_24h: f64,
    pub liquidity_usd: f64,
    pub price_change_24h: f64,
    pub freshness_hours: f64,
}

/// The nine exit/promotion flags the rotation evaluator reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankFlags {
    pub is_stale: bool,
    pub trailing_stop_triggered: bool,
    pub eligible_for_promotion: bool,
    pub eligible_for_rotation: bool,
    pub scout_stop_loss_triggered: bool,
    pub core_loss_exit_triggered: bool,
    pub scout_underperforming: bool,
    pub scout_grace_expired: bool,
    pub break_even_locked: bool,
    pub break_even_exit_triggered: bool,
}

#[derive(Debug, Clone)]
pub struct RankedItem {
    pub mint: Mint,
    pub rank: f64,
    pub pnl_pct: f64,
    pub hours_held: f64,
    pub slot_type: Option<SlotType>,
    pub signal_c: f64,
    pub momentum_c: f64,
    pub time_c: f64,
    pub trailing_c: f64,
    pub freshness_c: f64,
    pub quality_c: f64,
    pub flags: RankFlags,
}

/// Ranks a held position. `cfg` supplies all thresholds and component
/// weights.
pub fn rank_held(pos: &HeldPosition, cfg: &RankingConfig) -> RankedItem {
    let p = pos.pnl_pct();
    let h = pos.hours_held();
    let minutes = h * 60.0;
    let is_core = matches!(pos.slot_type, SlotType::Core);

    let signal_c = pos.signal * cfg.w_signal;
    let momentum_c = (5.0 * p).tanh() * cfg.w_momentum;

    let time_c = if h <= cfg.stale_hours {
        0.0
    } else {
        let mut c = -((h - cfg.stale_hours) / 24.0).min(2.0) * cfg.w_time;
        if p.abs() < cfg.stale_band_pct {
            c += cfg.stale_penalty;
        }
        c
    };

    let mut trailing_c = 0.0;
    let mut trailing_stop_triggered = false;
    if is_core && pos.peak_price > 0.0 {
        let drop = (pos.peak_price - pos.current_price) / pos.peak_price;
        let threshold = if p >= cfg.trailing_profit_threshold {
            cfg.trailing_tight_pct
        } else {
            cfg.trailing_base_pct
        };
        let profit_floor = (cfg.trailing_profit_threshold / 2.0).max(0.0);

        if drop > threshold && p < profit_floor {
            trailing_stop_triggered = true;
            trailing_c = cfg.trailing_stop_penalty;
        } else if drop > threshold {
            trailing_c = -drop * cfg.w_trailing * 2.0;
        } else if drop > threshold / 2.0 {
            trailing_c = -drop * cfg.w_trailing;
        }
    }

    let rank = signal_c + momentum_c + time_c + trailing_c;

    let break_even_locked = p >= cfg.be_lock_threshold || pos.peak_pnl_pct >= cfg.be_lock_threshold;
    let scout_underperforming = !is_core && p < 0.0 && minutes >= cfg.underperform_min_minutes;
    let flags = RankFlags {
        is_stale: h > cfg.stale_hours && p.abs() < cfg.stale_band_pct,
        trailing_stop_triggered,
        eligible_for_promotion: !is_core
            && pos.regime == Regime::Trend
            && p >= cfg.promo_min_pnl
            && pos.signal >= cfg.promo_min_signal
            && h >= cfg.promo_min_hours
            && !pos.fifo_discrepancy,
        eligible_for_rotation: rank < 0.0,
        scout_stop_loss_triggered: !is_core && p <= -cfg.scout_stop_pct,
        core_loss_exit_triggered: is_core && p <= -cfg.loss_exit_pct,
        scout_underperforming,
        scout_grace_expired: scout_underperforming && minutes >= cfg.underperform_min_minutes + cfg.grace_min_minutes,
        break_even_locked,
        break_even_exit_triggered: break_even_locked && p < -0.005,
    };

    RankedItem {
        mint: pos.mint.clone(),
        rank,
        pnl_pct: p,
        hours_held: h,
        slot_type: Some(pos.slot_type),
        signal_c,
        momentum_c,
        time_c,
        trailing_c,
        freshness_c: 0.0,
        quality_c: 0.0,
        flags,
    }
}

fn tier(value: f64, high: f64, low: f64) -> f64 {
    if value >= high {
        0.5
    } else if value >= low {
        0.25
    } else {
        0.0
    }
}

/// Ranks a scan candidate. Volume/liquidity tier thresholds ($50k/$10k) are
/// this engine's own convention, not sourced from config — see the ledger
/// entry for this module.
pub fn rank_candidate(c: &Candidate, cfg: &RankingConfig) -> RankedItem {
    let signal_c = c.signal * cfg.w_signal;
    let momentum_c = (5.0 * c.price_change_24h).tanh() * cfg.w_momentum;
    let freshness_c = (1.0 - (c.freshness_hours / 24.0).clamp(0.0, 1.0)) * 0.5;

    let volume_tier = tier(c.volume_24h, 50_000.0, 10_000.0);
    let liquidity_tier = tier(c.liquidity_usd, 50_000.0, 10_000.0);
    let scanner_component = (c.scanner_score / 10.0).min(1.0);
    let quality_c = (volume_tier + liquidity_tier + scanner_component) * cfg.w_quality;

    let rank = signal_c + momentum_c + freshness_c + quality_c;

    RankedItem {
        mint: c.mint.clone(),
        rank,
        pnl_pct: 0.0,
        hours_held: 0.0,
        slot_type: None,
        signal_c,
        momentum_c,
        time_c: 0.0,
        trailing_c: 0.0,
        freshness_c,
        quality_c,
        flags: RankFlags::default(),
    }
}

/// Held scouts eligible for promotion, highest rank first. The async
/// continuation check (bar-based ret15/ret60/drawdown/SMA) lives with the
/// bar reader and tries these candidates in order.
pub fn promotion_candidates(held: &[RankedItem]) -> Vec<Mint> {
    let mut eligible: Vec<&RankedItem> = held.iter().filter(|h| h.flags.eligible_for_promotion).collect();
    eligible.sort_by(|a, b| b.rank.partial_cmp(&a.rank).unwrap_or(std::cmp::Ordering::Equal));
    eligible.into_iter().map(|h| h.mint.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RankingConfig {
        RankingConfig::default()
    }

    #[test]
    fn scout_stop_loss_flag_fires_at_threshold() {
        let pos = HeldPosition {
            mint: Mint::from("m1"),
            signal: 0.0,
            regime: Regime::Unknown,
            entry_price: 1.0,
            peak_price: 1.0,
            current_price: 0.92,
            entry_ms: 0,
            now_ms: 3_600_000,
            slot_type: SlotType::Scout,
            fifo_discrepancy: false,
            peak_pnl_pct: 0.0,
        };
        let ranked = rank_held(&pos, &cfg());
        assert!(ranked.flags.scout_stop_loss_triggered);
    }

    #[test]
    fn break_even_lock_persists_from_peak_pnl() {
        let pos = HeldPosition {
            mint: Mint::from("m1"),
            signal: 0.0,
            regime: Regime::Unknown,
            entry_price: 1.0,
            peak_price: 1.15,
            current_price: 0.99,
            entry_ms: 0,
            now_ms: 3_600_000,
            slot_type: SlotType::Core,
            fifo_discrepancy: false,
            peak_pnl_pct: 0.15,
        };
        let ranked = rank_held(&pos, &cfg());
        assert!(ranked.flags.break_even_locked);
        assert!(ranked.flags.break_even_exit_triggered);
    }

    #[test]
    fn core_trailing_stop_triggers_below_profit_floor() {
        let pos = HeldPosition {
            mint: Mint::from("m1"),
            signal: 0.0,
            regime: Regime::Unknown,
            entry_price: 1.0,
            peak_price: 1.30,
            current_price: 1.05,
            entry_ms: 0,
            now_ms: 3_600_000,
            slot_type: SlotType::Core,
            fifo_discrepancy: false,
            peak_pnl_pct: 0.30,
        };
        let ranked = rank_held(&pos, &cfg());
        assert!(ranked.flags.trailing_stop_triggered);
    }

    #[test]
    fn eligible_for_promotion_requires_trend_and_thresholds() {
        let pos = HeldPosition {
            mint: Mint::from("m1"),
            signal: 0.8,
            regime: Regime::Trend,
            entry_price: 1.0,
            peak_price: 1.1,
            current_price: 1.1,
            entry_ms: 0,
            now_ms: 3 * 3_600_000,
            slot_type: SlotType::Scout,
            fifo_discrepancy: false,
            peak_pnl_pct: 0.10,
        };
        let ranked = rank_held(&pos, &cfg());
        assert!(ranked.flags.eligible_for_promotion);
    }

    #[test]
    fn candidate_quality_c_rewards_deep_liquidity() {
        let thin = Candidate {
            mint: Mint::from("c1"),
            signal: 0.0,
            regime: Regime::Unknown,
            scanner_score: 0.0,
            volume_24h: 1_000.0,
            liquidity_usd: 1_000.0,
            price_change_24h: 0.0,
            freshness_hours: 12.0,
        };
        let deep = Candidate {
            liquidity_usd: 100_000.0,
            volume_24h: 100_000.0,
            ..thin.clone()
        };
        let c = cfg();
        assert!(rank_candidate(&deep, &c).quality_c > rank_candidate(&thin, &c).quality_c);
    }

    #[test]
    fn promotion_candidates_sorted_best_first() {
        let mut weak = HeldPosition {
            mint: Mint::from("weak"),
            signal: 0.6,
            regime: Regime::Trend,
            entry_price: 1.0,
            peak_price: 1.06,
            current_price: 1.06,
            entry_ms: 0,
            now_ms: 3 * 3_600_000,
            slot_type: SlotType::Scout,
            fifo_discrepancy: false,
            peak_pnl_pct: 0.06,
        };
        let mut strong = weak.clone();
        strong.mint = Mint::from("strong");
        strong.signal = 0.95;
        strong.current_price = 1.20;
        strong.peak_price = 1.20;
        strong.peak_pnl_pct = 0.20;

        let c = cfg();
        let ranked = vec![rank_held(&weak, &c), rank_held(&strong, &c)];
        let order = promotion_candidates(&ranked);
        assert_eq!(order.first().unwrap().0, "strong");
        let _ = &mut weak;
    }
}
