//! Capital sizer: converts (equity, stop,
//! mode, liquidity sweep) into a final trade size and rejection reason,
//! and adaptively governs haircuts from realised-vs-quoted slippage.

pub mod governor;
pub mod probes;

use crate::config::SizingConfig;
use crate::error::{Error, Result};
use crate::external::{AggregatorClient, QuoteRequest};
use crate::types::{Mint, Side, SlotType};
use governor::SlippageGovernor;

const SWEEP_MULTIPLIERS: [f64; 5] = [0.5, 1.0, 2.0, 4.0, 8.0];

#[derive(Debug, Clone)]
pub struct SizingContext {
    pub mint: Mint,
    pub equity_usd: f64,
    pub sol_price_usd: f64,
    pub mode: SlotType,
    pub stop_pct: f64,
    pub expected_move_pct: f64,
    pub current_mint_exposure_usd: f64,
    pub pool_tvl_usd: Option<f64>,
    pub vol_5m_usd: Option<f64>,
    pub vol_1h_usd: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitingFactor {
    Risk,
    Liquidity,
    Edge,
    MintExposure,
    Participation,
}

impl LimitingFactor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Risk => "risk",
            Self::Liquidity => "liquidity",
            Self::Edge => "edge",
            Self::MintExposure => "mint_exposure",
            Self::Participation => "participation",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizeExplanation {
    pub final_size_usd: f64,
    pub risk_cap_usd: f64,
    pub base_size_usd: f64,
    pub liquidity_cap_usd: Option<f64>,
    pub edge_cap_usd: f64,
    pub mint_exposure_cap_usd: f64,
    pub limiting_factor: LimitingFactor,
}

struct SweepResult {
    liquidity_cap_usd: Option<f64>,
    roundtrip_cost_pct: f64,
}

/// Computes the final trade size and owns the adaptive slippage governor
/// shared across ticks.
pub struct CapitalSizer {
    cfg: SizingConfig,
    governor: SlippageGovernor,
}

impl CapitalSizer {
    pub fn new(cfg: SizingConfig) -> Self {
        let governor = SlippageGovernor::new(cfg.governor_window, cfg.safety_haircut);
        Self { cfg, governor }
    }

    pub fn governor(&self) -> &SlippageGovernor {
        &self.governor
    }

    pub fn governor_mut(&mut self) -> &mut SlippageGovernor {
        &mut self.governor
    }

    fn base_size_usd(&self, ctx: &SizingContext) -> f64 {
        match ctx.mode {
            SlotType::Scout => {
                let scaled = self.cfg.base_usd * (ctx.equity_usd / self.cfg.base_equity).max(0.0).sqrt();
                scaled.clamp(self.cfg.min_trade_usd, self.cfg.max_trade_usd)
            }
            SlotType::Core => 2.0 * self.cfg.min_trade_usd,
        }
    }

    async fn liquidity_sweep(&self, agg: &dyn AggregatorClient, ctx: &SizingContext) -> Result<SweepResult> {
        let (entry_max, exit_max, min_ratio) = match ctx.mode {
            SlotType::Scout => (
                self.cfg.entry_max_impact_pct_scout,
                self.cfg.exit_max_impact_pct_scout,
                self.cfg.min_round_trip_ratio_scout,
            ),
            SlotType::Core => (
                self.cfg.entry_max_impact_pct_core,
                self.cfg.exit_max_impact_pct_core,
                self.cfg.min_round_trip_ratio_core,
            ),
        };

        let base_sol = self.base_size_usd(ctx) / ctx.sol_price_usd.max(1e-9);
        let mut max_passing_usd: Option<f64> = None;
        let mut base_roundtrip_cost = None;

        for &m in &SWEEP_MULTIPLIERS {
            let sol_in = base_sol * m;
            let buy = agg
                .quote(QuoteRequest {
                    mint: ctx.mint.clone(),
                    side: Side::Buy,
                    amount_in: sol_in,
                    slippage_bps: 100,
                })
                .await?;

            let sell_amount = buy.out_amount * 0.9;
            let sell = agg
                .quote(QuoteRequest {
                    mint: ctx.mint.clone(),
                    side: Side::Sell,
                    amount_in: sell_amount,
                    slippage_bps: 100,
                })
                .await?;

            let round_trip = if sol_in > 0.0 {
                sell.out_amount / (0.9 * sol_in)
            } else {
                0.0
            };

            let passes = buy.price_impact_pct <= entry_max && sell.price_impact_pct <= exit_max && round_trip >= min_ratio;

            if (m - 1.0).abs() < 1e-9 {
                base_roundtrip_cost = Some((1.0 - round_trip).max(0.0));
            }

            if passes {
                max_passing_usd = Some(sol_in * ctx.sol_price_usd);
            }
        }

        Ok(SweepResult {
            liquidity_cap_usd: max_passing_usd.map(|usd| usd * self.governor.haircut()),
            roundtrip_cost_pct: base_roundtrip_cost.unwrap_or(0.0),
        })
    }

    fn edge_cap_usd(&self, base_size_usd: f64, ctx: &SizingContext, roundtrip_cost_pct: f64) -> f64 {
        let buffer = self.cfg.edge_buffer_pct;
        let net_edge = ctx.expected_move_pct - roundtrip_cost_pct - buffer;
        if net_edge <= 0.0 {
            0.0
        } else {
            base_size_usd * (net_edge / buffer).min(2.0)
        }
    }

    /// Runs the full tier-gate → risk → base → sweep → edge → exposure →
    /// participation cascade, returning the size explanation or a
    /// [`Error::SizingRejected`] with a `liquidity` / `minimum` reason.
    pub async fn calculate_size(&self, ctx: &SizingContext, agg: &dyn AggregatorClient) -> Result<SizeExplanation> {
        let (min_tvl, min_vol_5m) = match ctx.mode {
            SlotType::Scout => (self.governor.min_tvl_scout(), self.cfg.min_vol_5m_scout_usd),
            SlotType::Core => (self.governor.min_tvl_core(), self.cfg.min_vol_5m_core_usd),
        };

        let tvl_ok = ctx.pool_tvl_usd.unwrap_or(0.0) >= min_tvl;
        let vol_ok = ctx.vol_5m_usd.unwrap_or(0.0) >= min_vol_5m;
        if !tvl_ok || !vol_ok {
            return Err(Error::SizingRejected("liquidity".into()));
        }

        let risk_cap_usd = if ctx.stop_pct > 0.0 {
            ctx.equity_usd * self.risk_per_trade(ctx.mode) / ctx.stop_pct
        } else {
            0.0
        };

        let base_size_usd = self.base_size_usd(ctx);
        let sweep = self.liquidity_sweep(agg, ctx).await?;
        let edge_cap_usd = self.edge_cap_usd(base_size_usd, ctx, sweep.roundtrip_cost_pct);
        let mint_exposure_cap_usd = (ctx.equity_usd * self.cfg.max_mint_pct - ctx.current_mint_exposure_usd).max(0.0);

        let mut caps: Vec<(LimitingFactor, f64)> = vec![
            (LimitingFactor::Risk, risk_cap_usd),
            (LimitingFactor::Edge, edge_cap_usd),
            (LimitingFactor::MintExposure, mint_exposure_cap_usd),
        ];
        if let Some(liquidity_cap) = sweep.liquidity_cap_usd {
            caps.push((LimitingFactor::Liquidity, liquidity_cap));
        }

        let participation_cap = [ctx.vol_5m_usd, ctx.vol_1h_usd]
            .into_iter()
            .flatten()
            .map(|v| v * self.cfg.max_participation_pct)
            .fold(f64::INFINITY, f64::min);
        if participation_cap.is_finite() {
            caps.push((LimitingFactor::Participation, participation_cap));
        }

        let (limiting_factor, final_size_usd) = caps
            .into_iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .expect("caps is never empty");

        if final_size_usd < self.cfg.min_trade_usd {
            return Err(Error::SizingRejected("minimum".into()));
        }

        Ok(SizeExplanation {
            final_size_usd,
            risk_cap_usd,
            base_size_usd,
            liquidity_cap_usd: sweep.liquidity_cap_usd,
            edge_cap_usd,
            mint_exposure_cap_usd,
            limiting_factor,
        })
    }

    fn risk_per_trade(&self, mode: SlotType) -> f64 {
        match mode {
            SlotType::Scout => self.cfg.risk_per_trade_scout,
            SlotType::Core => self.cfg.risk_per_trade_core,
        }
    }
}
