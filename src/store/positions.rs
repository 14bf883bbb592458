use super::Store;
use crate::error::{Error, Result};
use crate::types::{Mint, SlotType};
use rusqlite::{params, OptionalExtension};

/// One row per currently-held mint — row existence implies
/// `total_tokens > dust`.
#[derive(Debug, Clone)]
pub struct PositionTrackingRow {
    pub mint: Mint,
    pub entry_price: f64,
    pub peak_price: f64,
    pub peak_time: i64,
    pub last_price: f64,
    pub last_update: i64,
    pub total_tokens: f64,
    pub slot_type: SlotType,
    pub promotion_count: u32,
    pub source: Option<String>,
    pub liquidating: bool,
    pub liquidating_reason: Option<String>,
    pub liquidating_since: Option<i64>,
    pub reentry_ban_until: Option<i64>,
    pub peak_pnl_pct: f64,
}

fn slot_type_str(s: SlotType) -> &'static str {
    match s {
        SlotType::Scout => "scout",
        SlotType::Core => "core",
    }
}

fn slot_type_from_str(s: &str) -> SlotType {
    match s {
        "core" => SlotType::Core,
        _ => SlotType::Scout,
    }
}

fn row_to_tracking(row: &rusqlite::Row) -> rusqlite::Result<PositionTrackingRow> {
    let mint: String = row.get(0)?;
    let slot_type: String = row.get(7)?;
    Ok(PositionTrackingRow {
        mint: Mint(mint),
        entry_price: row.get(1)?,
        peak_price: row.get(2)?,
        peak_time: row.get(3)?,
        last_price: row.get(4)?,
        last_update: row.get(5)?,
        total_tokens: row.get(6)?,
        slot_type: slot_type_from_str(&slot_type),
        promotion_count: row.get::<_, i64>(8)? as u32,
        source: row.get(9)?,
        liquidating: row.get::<_, i64>(10)? != 0,
        liquidating_reason: row.get(11)?,
        liquidating_since: row.get(12)?,
        reentry_ban_until: row.get(13)?,
        peak_pnl_pct: row.get(14)?,
    })
}

const SELECT_COLUMNS: &str = "mint, entry_price, peak_price, peak_time, last_price, last_update, \
     total_tokens, slot_type, promotion_count, source, liquidating, liquidating_reason, \
     liquidating_since, reentry_ban_until, peak_pnl_pct";

#[derive(Clone)]
pub struct PositionTrackingRepo {
    store: Store,
}

impl PositionTrackingRepo {
    pub(super) fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn upsert(&self, row: &PositionTrackingRow) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO position_tracking
                (mint, entry_price, peak_price, peak_time, last_price, last_update, total_tokens,
                 slot_type, promotion_count, source, liquidating, liquidating_reason,
                 liquidating_since, reentry_ban_until, peak_pnl_pct)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(mint) DO UPDATE SET
                entry_price = excluded.entry_price,
                peak_price = excluded.peak_price,
                peak_time = excluded.peak_time,
                last_price = excluded.last_price,
                last_update = excluded.last_update,
                total_tokens = excluded.total_tokens,
                slot_type = excluded.slot_type,
                promotion_count = excluded.promotion_count,
                source = excluded.source,
                liquidating = excluded.liquidating,
                liquidating_reason = excluded.liquidating_reason,
                liquidating_since = excluded.liquidating_since,
                reentry_ban_until = excluded.reentry_ban_until,
                peak_pnl_pct = excluded.peak_pnl_pct",
            params![
                row.mint.0,
                row.entry_price,
                row.peak_price,
                row.peak_time,
                row.last_price,
                row.last_update,
                row.total_tokens,
                slot_type_str(row.slot_type),
                row.promotion_count,
                row.source,
                row.liquidating as i64,
                row.liquidating_reason,
                row.liquidating_since,
                row.reentry_ban_until,
                row.peak_pnl_pct,
            ],
        )?;
        Ok(())
    }

    pub async fn get(&self, mint: &Mint) -> Result<Option<PositionTrackingRow>> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM position_tracking WHERE mint = ?1");
        conn.query_row(&sql, params![mint.0], row_to_tracking)
            .optional()
            .map_err(Error::from)
    }

    pub async fn all_held(&self) -> Result<Vec<PositionTrackingRow>> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM position_tracking ORDER BY mint ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], row_to_tracking)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Row existence implies `total_tokens > dust` — a full close deletes it.
    pub async fn delete(&self, mint: &Mint) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "DELETE FROM position_tracking WHERE mint = ?1",
            params![mint.0],
        )?;
        Ok(())
    }

    /// Marks a held position to the current price: advances `peak_price`/
    /// `peak_time`/`peak_pnl_pct` when `price` is a new high, always
    /// refreshes `last_price`/`last_update`. No-op if `mint` isn't held.
    pub async fn mark_price(&self, mint: &Mint, price: f64, now: i64) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "UPDATE position_tracking SET
                last_price = ?2,
                last_update = ?3,
                peak_price = MAX(peak_price, ?2),
                peak_time = CASE WHEN ?2 > peak_price THEN ?3 ELSE peak_time END,
                peak_pnl_pct = CASE
                    WHEN entry_price > 0 AND (?2 - entry_price) / entry_price > peak_pnl_pct
                    THEN (?2 - entry_price) / entry_price
                    ELSE peak_pnl_pct
                END
             WHERE mint = ?1",
            params![mint.0, price, now],
        )?;
        Ok(())
    }

    pub async fn set_liquidating(
        &self,
        mint: &Mint,
        reason: &str,
        since: i64,
        reentry_ban_until: i64,
    ) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "UPDATE position_tracking SET liquidating = 1, liquidating_reason = ?2,
                liquidating_since = ?3, reentry_ban_until = ?4 WHERE mint = ?1",
            params![mint.0, reason, since, reentry_ban_until],
        )?;
        Ok(())
    }

    pub async fn clear_liquidating(&self, mint: &Mint) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "UPDATE position_tracking SET liquidating = 0, liquidating_reason = NULL,
                liquidating_since = NULL, reentry_ban_until = NULL WHERE mint = ?1",
            params![mint.0],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mint: &str) -> PositionTrackingRow {
        PositionTrackingRow {
            mint: Mint::from(mint),
            entry_price: 1.0,
            peak_price: 1.0,
            peak_time: 0,
            last_price: 1.0,
            last_update: 0,
            total_tokens: 100.0,
            slot_type: SlotType::Scout,
            promotion_count: 0,
            source: None,
            liquidating: false,
            liquidating_reason: None,
            liquidating_since: None,
            reentry_ban_until: None,
            peak_pnl_pct: 0.0,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.positions();

        repo.upsert(&sample("mintA")).await.unwrap();
        let got = repo.get(&Mint::from("mintA")).await.unwrap().unwrap();
        assert_eq!(got.total_tokens, 100.0);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.positions();

        repo.upsert(&sample("mintA")).await.unwrap();
        repo.delete(&Mint::from("mintA")).await.unwrap();
        assert!(repo.get(&Mint::from("mintA")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_price_advances_peak_on_new_high() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.positions();
        let mint = Mint::from("mintA");

        repo.upsert(&sample("mintA")).await.unwrap();
        repo.mark_price(&mint, 1.5, 100).await.unwrap();

        let got = repo.get(&mint).await.unwrap().unwrap();
        assert_eq!(got.last_price, 1.5);
        assert_eq!(got.peak_price, 1.5);
        assert_eq!(got.peak_time, 100);
        assert!((got.peak_pnl_pct - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn mark_price_does_not_lower_peak_on_a_dip() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.positions();
        let mint = Mint::from("mintA");

        repo.upsert(&sample("mintA")).await.unwrap();
        repo.mark_price(&mint, 1.5, 100).await.unwrap();
        repo.mark_price(&mint, 1.1, 200).await.unwrap();

        let got = repo.get(&mint).await.unwrap().unwrap();
        assert_eq!(got.last_price, 1.1);
        assert_eq!(got.peak_price, 1.5);
        assert_eq!(got.peak_time, 100);
        assert!((got.peak_pnl_pct - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn liquidation_lock_set_and_clear() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.positions();

        repo.upsert(&sample("mintA")).await.unwrap();
        repo.set_liquidating(&Mint::from("mintA"), "core_loss_exit", 100, 200)
            .await
            .unwrap();
        let got = repo.get(&Mint::from("mintA")).await.unwrap().unwrap();
        assert!(got.liquidating);
        assert_eq!(got.reentry_ban_until, Some(200));

        repo.clear_liquidating(&Mint::from("mintA")).await.unwrap();
        let got = repo.get(&Mint::from("mintA")).await.unwrap().unwrap();
        assert!(!got.liquidating);
    }
}
