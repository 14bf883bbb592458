//! Telemetry aggregator: summarises slippage, governor adjustments, and
//! allocation events in memory between ticks, then flushes rollups to the
//! persistent [`TelemetryRepo`].

use crate::sizing::governor::SlippageGovernor;
use crate::store::TelemetryRepo;
use crate::error::Result;
use crate::types::Mint;

#[derive(Debug, Clone, Copy, Default)]
pub struct TickSummary {
    pub scout_buys: u32,
    pub scout_skips: u32,
    pub rotations: u32,
    pub exits: u32,
    pub total_size_usd: f64,
}

/// In-memory accumulator for one tick, flushed to storage at tick end.
pub struct TelemetryAggregator<'a> {
    repo: &'a TelemetryRepo,
    summary: TickSummary,
}

impl<'a> TelemetryAggregator<'a> {
    pub fn new(repo: &'a TelemetryRepo) -> Self {
        Self {
            repo,
            summary: TickSummary::default(),
        }
    }

    pub fn record_allocation_attempt(&mut self, mint: &Mint, accepted: bool, size_usd: f64, limiting_factor: Option<&str>) {
        if accepted {
            self.summary.scout_buys += 1;
            self.summary.total_size_usd += size_usd;
        } else {
            self.summary.scout_skips += 1;
        }
        let _ = (mint, limiting_factor);
    }

    pub fn record_rotation(&mut self) {
        self.summary.rotations += 1;
    }

    pub fn record_exit(&mut self) {
        self.summary.exits += 1;
    }

    pub fn summary(&self) -> TickSummary {
        self.summary
    }

    /// Persists this tick's rollups plus a governor snapshot.
    pub async fn flush(
        &self,
        tick_seq: u64,
        config_hash: &str,
        duration_ms: u64,
        governor: &SlippageGovernor,
        equity_usd: f64,
        sol_price_usd: Option<f64>,
    ) -> Result<()> {
        self.repo
            .record_tick(
                tick_seq,
                Some(&format!(
                    "buys={} skips={} rotations={} exits={} haircut={:.3}",
                    self.summary.scout_buys,
                    self.summary.scout_skips,
                    self.summary.rotations,
                    self.summary.exits,
                    governor.haircut(),
                )),
                config_hash,
                duration_ms,
            )
            .await?;
        self.repo.record_equity_snapshot(equity_usd, sol_price_usd).await?;
        Ok(())
    }
}
