//! Liquidation lock: a protective exit marks
//! its mint `liquidating` with a re-entry ban, so the scout queue and
//! promotion machinery cannot immediately buy back into a position this
//! engine just fled. The ban auto-expires; nothing needs to poll it down.

use crate::config::LiquidationConfig;
use crate::error::Result;
use crate::store::{PositionTrackingRepo, PositionTrackingRow};
use crate::types::{Mint, SlotType};

pub struct LiquidationLock {
    positions: PositionTrackingRepo,
    cfg: LiquidationConfig,
}

impl LiquidationLock {
    pub fn new(positions: PositionTrackingRepo, cfg: LiquidationConfig) -> Self {
        Self { positions, cfg }
    }

    /// Marks `mint` liquidating with a re-entry ban through `now + ban_hours`.
    /// Creates a placeholder tracking row first if the position was already
    /// fully closed (and therefore deleted) by the time this runs.
    pub async fn lock(&self, mint: &Mint, reason: &str, now: i64, slot_type: SlotType) -> Result<()> {
        if self.positions.get(mint).await?.is_none() {
            self.positions
                .upsert(&PositionTrackingRow {
                    mint: mint.clone(),
                    entry_price: 0.0,
                    peak_price: 0.0,
                    peak_time: now,
                    last_price: 0.0,
                    last_update: now,
                    total_tokens: 0.0,
                    slot_type,
                    promotion_count: 0,
                    source: None,
                    liquidating: false,
                    liquidating_reason: None,
                    liquidating_since: None,
                    reentry_ban_until: None,
                    peak_pnl_pct: 0.0,
                })
                .await?;
        }

        let ban_until = now + self.cfg.ban_hours * 3600;
        self.positions.set_liquidating(mint, reason, now, ban_until).await
    }

    /// True while the mint is locked and its ban has not yet expired;
    /// expiry is purely a function of `now`, no write is needed to "unlock".
    pub async fn is_liquidating(&self, mint: &Mint, now: i64) -> Result<bool> {
        let Some(row) = self.positions.get(mint).await? else {
            return Ok(false);
        };
        Ok(row.liquidating && row.reentry_ban_until.map(|until| until > now).unwrap_or(false))
    }

    pub async fn clear(&self, mint: &Mint) -> Result<()> {
        self.positions.clear_liquidating(mint).await
    }
}
