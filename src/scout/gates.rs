//! Entry gate pipeline run on a freshly-claimed scout-queue row
//!. Each stage either advances the
//! claim or terminates it with a reason.

use crate::bars::PriceBarStore;
use crate::config::{ScoutConfig, SizingConfig};
use crate::error::Result;
use crate::external::AggregatorClient;
use crate::sizing::{probes, CapitalSizer, SizeExplanation, SizingContext};
use crate::types::{Mint, SlotType};
use crate::watchdog::LiquidationLock;

#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Pass(SizeExplanation),
    Skipped(&'static str),
    InsufficientBars,
}

/// Everything the gate pipeline needs to know about the wider system state
/// for one candidate, gathered up-front so each stage is a pure check.
pub struct GateContext<'a> {
    pub mint: Mint,
    pub now: i64,
    pub daily_entry_count: u32,
    pub current_scout_slots: usize,
    pub sol_balance: f64,
    pub spend_sol: f64,
    pub tx_fee_buffer_sol: f64,
    pub whale_confirmed: Option<bool>,
    pub price_usd: f64,
    pub sizing_ctx: SizingContext,
    pub bars: &'a PriceBarStore,
    pub first_seen_at: i64,
}

/// Runs every stage in order, short-circuiting on the first failure.
pub async fn run(
    ctx: &GateContext<'_>,
    scout_cfg: &ScoutConfig,
    sizing_cfg: &SizingConfig,
    liquidation_lock: &LiquidationLock,
    sizer: &CapitalSizer,
    agg: &dyn AggregatorClient,
) -> Result<GateOutcome> {
    if liquidation_lock.is_liquidating(&ctx.mint, ctx.now).await? {
        return Ok(GateOutcome::Skipped("liquidation_lock_reentry_ban"));
    }

    if ctx.daily_entry_count >= scout_cfg.daily_entry_limit {
        return Ok(GateOutcome::Skipped("daily_entry_limit"));
    }

    if ctx.current_scout_slots >= scout_cfg.scout_slots {
        return Ok(GateOutcome::Skipped("scout_slots_full"));
    }

    let required_sol = ctx.spend_sol + scout_cfg.sol_reserve + ctx.tx_fee_buffer_sol;
    if ctx.sol_balance < required_sol {
        return Ok(GateOutcome::Skipped("insufficient_sol_balance"));
    }

    if scout_cfg.whale_confirmation_enabled && ctx.whale_confirmed == Some(false) {
        return Ok(GateOutcome::Skipped("whale_confirmation_failed"));
    }

    match bar_entry_gate(ctx, scout_cfg) {
        BarGateResult::Pass => {}
        BarGateResult::InsufficientBars => {
            let warm_for_minutes = (ctx.now - ctx.first_seen_at) / 60;
            if warm_for_minutes >= scout_cfg.warmup_timeout_minutes {
                return Ok(GateOutcome::Skipped("warmup_timeout"));
            }
            return Ok(GateOutcome::InsufficientBars);
        }
        BarGateResult::Fail(reason) => return Ok(GateOutcome::Skipped(reason)),
    }

    let sell_outcome = probes::sellability_probe(
        agg,
        &ctx.mint,
        (ctx.spend_sol * 0.1).max(0.001),
        ctx.sizing_ctx.mode,
        sizing_cfg,
    )
    .await?;
    if sell_outcome == probes::ProbeOutcome::Fail {
        return Ok(GateOutcome::Skipped("sellability_probe_failed"));
    }

    let estimated_tokens = if ctx.price_usd > 0.0 {
        ctx.spend_sol * ctx.sizing_ctx.sol_price_usd / ctx.price_usd
    } else {
        0.0
    };
    let exit_outcome = probes::exit_liquidity_probe(agg, &ctx.mint, estimated_tokens, ctx.sizing_ctx.mode, sizing_cfg).await?;
    if exit_outcome == probes::ProbeOutcome::Fail {
        return Ok(GateOutcome::Skipped("exit_liquidity_probe_failed"));
    }

    match sizer.calculate_size(&ctx.sizing_ctx, agg).await {
        Ok(explanation) => Ok(GateOutcome::Pass(explanation)),
        Err(_) => Ok(GateOutcome::Skipped("sizing_rejected")),
    }
}

enum BarGateResult {
    Pass,
    InsufficientBars,
    Fail(&'static str),
}

/// ret15 not chasing a pump, sufficient pullback from the local high, and
/// price trading above its trend SMA.
fn bar_entry_gate(ctx: &GateContext<'_>, scout_cfg: &ScoutConfig) -> BarGateResult {
    let _ = scout_cfg;
    let (Some(ret15), Some(high15), Some(sma60)) = (
        ctx.bars.return_pct(&ctx.mint, 15),
        ctx.bars.high(&ctx.mint, 15),
        ctx.bars.sma(&ctx.mint, 60),
    ) else {
        return BarGateResult::InsufficientBars;
    };

    const MAX_CHASE_RET15: f64 = 0.60;
    const MIN_PULLBACK_FROM_HIGH: f64 = 0.02;

    if ret15 > MAX_CHASE_RET15 {
        return BarGateResult::Fail("bar_gate_chasing_pump");
    }

    if high15 > 0.0 && (high15 - ctx.price_usd) / high15 < MIN_PULLBACK_FROM_HIGH {
        return BarGateResult::Fail("bar_gate_insufficient_pullback");
    }

    if ctx.price_usd < sma60 {
        return BarGateResult::Fail("bar_gate_below_trend_sma");
    }

    BarGateResult::Pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiquidationConfig;
    use crate::external::aggregator::MockAggregatorClient;
    use crate::store::Store;

    async fn base_ctx(bars: &PriceBarStore) -> GateContext<'_> {
        GateContext {
            mint: Mint::from("mintA"),
            now: 10_000,
            daily_entry_count: 0,
            current_scout_slots: 0,
            sol_balance: 10.0,
            spend_sol: 0.1,
            tx_fee_buffer_sol: 0.01,
            whale_confirmed: None,
            price_usd: 1.0,
            sizing_ctx: SizingContext {
                mint: Mint::from("mintA"),
                equity_usd: 1000.0,
                sol_price_usd: 150.0,
                mode: SlotType::Scout,
                stop_pct: 0.1,
                expected_move_pct: 0.2,
                current_mint_exposure_usd: 0.0,
                pool_tvl_usd: Some(100_000.0),
                vol_5m_usd: Some(10_000.0),
                vol_1h_usd: Some(50_000.0),
            },
            bars,
            first_seen_at: 9_000,
        }
    }

    #[tokio::test]
    async fn insufficient_bars_before_timeout_reschedules() {
        let bars = PriceBarStore::new(crate::config::BarsConfig { ttl_hours: 6, max_tracked_mints: 200 });
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let lock = LiquidationLock::new(store.positions(), LiquidationConfig { ban_hours: 4 });
        let sizer = CapitalSizer::new(SizingConfig::default());
        let agg = MockAggregatorClient::new(1.0);

        let ctx = base_ctx(&bars).await;
        let outcome = run(
            &ctx,
            &ScoutConfig::default(),
            &SizingConfig::default(),
            &lock,
            &sizer,
            &agg,
        )
        .await
        .unwrap();

        assert_eq!(outcome, GateOutcome::InsufficientBars);
    }

    #[tokio::test]
    async fn liquidation_lock_short_circuits_before_other_gates() {
        let bars = PriceBarStore::new(crate::config::BarsConfig { ttl_hours: 6, max_tracked_mints: 200 });
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let lock = LiquidationLock::new(store.positions(), LiquidationConfig { ban_hours: 4 });
        let sizer = CapitalSizer::new(SizingConfig::default());
        let agg = MockAggregatorClient::new(1.0);

        let ctx = base_ctx(&bars).await;
        lock.lock(&ctx.mint, "core_loss_exit", 0, SlotType::Scout).await.unwrap();

        let outcome = run(
            &ctx,
            &ScoutConfig::default(),
            &SizingConfig::default(),
            &lock,
            &sizer,
            &agg,
        )
        .await
        .unwrap();

        assert_eq!(outcome, GateOutcome::Skipped("liquidation_lock_reentry_ban"));
    }
}
