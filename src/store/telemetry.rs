use super::Store;
use crate::error::Result;
use crate::types::Mint;
use rusqlite::params;

/// Summarised writers over the telemetry tables (`rotation_log`,
/// `allocation_events`, `equity_snapshots`, `bot_tick_telemetry`,
/// `watch_candidates`, `capacity_telemetry`).
#[derive(Clone)]
pub struct TelemetryRepo {
    store: Store,
}

impl TelemetryRepo {
    pub(super) fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn record_rotation(&self, action: &str, worst_mint: Option<&Mint>, best_mint: Option<&Mint>, detail: Option<&str>) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO rotation_log (action, worst_mint, best_mint, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, strftime('%s','now'))",
            params![action, worst_mint.map(|m| m.0.clone()), best_mint.map(|m| m.0.clone()), detail],
        )?;
        Ok(())
    }

    pub async fn record_allocation(
        &self,
        mint: &Mint,
        outcome: &str,
        reason: Option<&str>,
        size_usd: Option<f64>,
        limiting_factor: Option<&str>,
    ) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO allocation_events (mint, outcome, reason, size_usd, limiting_factor, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, strftime('%s','now'))",
            params![mint.0, outcome, reason, size_usd, limiting_factor],
        )?;
        Ok(())
    }

    pub async fn record_equity_snapshot(&self, equity_usd: f64, sol_price_usd: Option<f64>) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO equity_snapshots (equity_usd, sol_price_usd, created_at)
             VALUES (?1, ?2, strftime('%s','now'))",
            params![equity_usd, sol_price_usd],
        )?;
        Ok(())
    }

    pub async fn record_tick(&self, tick_seq: u64, action: Option<&str>, config_hash: &str, duration_ms: u64) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO bot_tick_telemetry (tick_seq, action, config_hash, duration_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, strftime('%s','now'))",
            params![tick_seq as i64, action, config_hash, duration_ms as i64],
        )?;
        Ok(())
    }

    pub async fn upsert_watch_candidate(&self, mint: &Mint, symbol: Option<&str>, reason: &str, now: i64) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO watch_candidates (mint, symbol, reason, first_seen_at, last_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(mint) DO UPDATE SET
                reason = excluded.reason,
                last_seen_at = excluded.last_seen_at",
            params![mint.0, symbol, reason, now],
        )?;
        Ok(())
    }

    pub async fn record_capacity(&self, scout_slots_used: usize, core_slots_used: usize, total_slots: usize) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO capacity_telemetry (scout_slots_used, core_slots_used, total_slots, created_at)
             VALUES (?1, ?2, ?3, strftime('%s','now'))",
            params![scout_slots_used as i64, core_slots_used as i64, total_slots as i64],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_write_without_error() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.telemetry();

        repo.record_rotation("trailing_stop_exit", Some(&Mint::from("m1")), None, None)
            .await
            .unwrap();
        repo.record_allocation(&Mint::from("m1"), "SKIPPED", Some("liquidity"), None, None)
            .await
            .unwrap();
        repo.record_equity_snapshot(1000.0, Some(150.0)).await.unwrap();
        repo.record_tick(1, Some("scout_buy"), "abc123", 42).await.unwrap();
        repo.upsert_watch_candidate(&Mint::from("m2"), Some("SYM"), "insufficient_bars", 100)
            .await
            .unwrap();
        repo.record_capacity(3, 2, 10).await.unwrap();
    }
}
