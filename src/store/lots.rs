use super::Store;
use crate::error::{Error, Result};
use crate::ledger::lot::{Lot, LotStatus, OpenPositionLot, PnlEvent, PnlEventType, Side};
use crate::types::{Mint, TxSig};
use rusqlite::{params, OptionalExtension};

#[derive(Clone)]
pub struct LotRepo {
    store: Store,
}

fn side_str(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}

fn side_from_str(s: &str) -> Side {
    match s {
        "sell" => Side::Sell,
        _ => Side::Buy,
    }
}

fn status_str(status: LotStatus) -> &'static str {
    match status {
        LotStatus::Confirmed => "confirmed",
        LotStatus::Paper => "paper",
        LotStatus::Failed => "failed",
        LotStatus::Pending => "pending",
    }
}

fn status_from_str(s: &str) -> LotStatus {
    match s {
        "paper" => LotStatus::Paper,
        "failed" => LotStatus::Failed,
        "pending" => LotStatus::Pending,
        _ => LotStatus::Confirmed,
    }
}

fn event_type_str(t: PnlEventType) -> &'static str {
    match t {
        PnlEventType::RealizedGain => "realized_gain",
        PnlEventType::RealizedLoss => "realized_loss",
        PnlEventType::DustWriteoff => "dust_writeoff",
        PnlEventType::Fee => "fee",
        PnlEventType::PartialExitRemaining => "partial_exit_remaining",
    }
}

impl LotRepo {
    pub(super) fn new(store: Store) -> Self {
        Self { store }
    }

    /// Idempotent on tx_sig: returns `false` without writing if the tx_sig
    /// already has a lot row.
    pub async fn insert_lot(&self, lot: &Lot) -> Result<bool> {
        let conn = self.store.conn();
        let conn = conn.lock().await;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM trade_lots WHERE tx_sig = ?1",
                params![lot.tx_sig.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::from)?;
        if existing.is_some() {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO trade_lots
                (lot_id, tx_sig, mint, side, quantity, usd_value, unit_price_usd,
                 sol_price_usd, fee_usd, source, status, decision_id, entry_timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                lot.lot_id.to_string(),
                lot.tx_sig.0,
                lot.mint.0,
                side_str(lot.side),
                lot.quantity,
                lot.usd_value,
                lot.unit_price_usd,
                lot.sol_price_usd,
                lot.fee_usd,
                lot.source,
                status_str(lot.status),
                lot.decision_id,
                lot.timestamp,
            ],
        )?;

        if lot.side == Side::Buy {
            conn.execute(
                "INSERT INTO position_lots
                    (lot_id, mint, original_qty, remaining_qty, cost_basis_usd,
                     unit_cost_usd, entry_timestamp, is_closed)
                 VALUES (?1, ?2, ?3, ?3, ?4, ?5, ?6, 0)",
                params![
                    lot.lot_id.to_string(),
                    lot.mint.0,
                    lot.quantity,
                    lot.usd_value,
                    lot.unit_price_usd,
                    lot.timestamp,
                ],
            )?;
        }

        Ok(true)
    }

    /// Open lots for a mint, ascending by entry timestamp — the FIFO order.
    pub async fn open_lots_for_mint(&self, mint: &Mint) -> Result<Vec<OpenPositionLot>> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT lot_id, mint, original_qty, remaining_qty, cost_basis_usd,
                    unit_cost_usd, entry_timestamp, is_closed
             FROM position_lots
             WHERE mint = ?1 AND is_closed = 0
             ORDER BY entry_timestamp ASC",
        )?;
        let rows = stmt
            .query_map(params![mint.0], |row| {
                let lot_id: String = row.get(0)?;
                let mint: String = row.get(1)?;
                Ok(OpenPositionLot {
                    lot_id: lot_id.parse().unwrap_or_default(),
                    mint: Mint(mint),
                    original_qty: row.get(2)?,
                    remaining_qty: row.get(3)?,
                    cost_basis_usd: row.get(4)?,
                    unit_cost_usd: row.get(5)?,
                    entry_timestamp: row.get(6)?,
                    is_closed: row.get::<_, i64>(7)? != 0,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub async fn update_open_lot_remaining(
        &self,
        lot_id: &crate::ledger::lot::LotId,
        remaining_qty: f64,
        cost_basis_usd: f64,
        is_closed: bool,
    ) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "UPDATE position_lots SET remaining_qty = ?1, cost_basis_usd = ?2, is_closed = ?3 WHERE lot_id = ?4",
            params![remaining_qty, cost_basis_usd, is_closed as i64, lot_id.to_string()],
        )?;
        Ok(())
    }

    pub async fn insert_pnl_event(&self, event: &PnlEvent) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO pnl_events
                (mint, tx_sig, event_type, cost_basis_usd, proceeds_usd, pnl_usd, suspicious, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, strftime('%s','now'))",
            params![
                event.mint.0,
                event.tx_sig.as_ref().map(|t| t.0.clone()),
                event_type_str(event.event_type),
                event.cost_basis_usd,
                event.proceeds_usd,
                event.pnl_usd,
                event.suspicious as i64,
                event.detail,
            ],
        )?;
        Ok(())
    }

    /// Aggregate (qty, weighted avg unit cost) over open lots — used by the
    /// integrity check against position_tracking.
    pub async fn open_aggregate(&self, mint: &Mint) -> Result<(f64, f64)> {
        let lots = self.open_lots_for_mint(mint).await?;
        let total_qty: f64 = lots.iter().map(|l| l.remaining_qty).sum();
        if total_qty <= 0.0 {
            return Ok((0.0, 0.0));
        }
        let total_cost: f64 = lots
            .iter()
            .map(|l| l.remaining_qty * l.unit_cost_usd)
            .sum();
        Ok((total_qty, total_cost / total_qty))
    }

    pub async fn lot_by_tx_sig(&self, tx_sig: &TxSig) -> Result<Option<Lot>> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.query_row(
            "SELECT lot_id, tx_sig, mint, side, quantity, usd_value, unit_price_usd,
                    sol_price_usd, fee_usd, source, status, decision_id, entry_timestamp
             FROM trade_lots WHERE tx_sig = ?1",
            params![tx_sig.0],
            |row| {
                let lot_id: String = row.get(0)?;
                let tx_sig: String = row.get(1)?;
                let mint: String = row.get(2)?;
                let side: String = row.get(3)?;
                let status: String = row.get(10)?;
                Ok(Lot {
                    lot_id: lot_id.parse().unwrap_or_default(),
                    tx_sig: TxSig(tx_sig),
                    mint: Mint(mint),
                    side: side_from_str(&side),
                    quantity: row.get(4)?,
                    usd_value: row.get(5)?,
                    unit_price_usd: row.get(6)?,
                    sol_price_usd: row.get(7)?,
                    fee_usd: row.get(8)?,
                    source: row.get(9)?,
                    status: status_from_str(&status),
                    decision_id: row.get(11)?,
                    timestamp: row.get(12)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::lot::Side;
    use uuid::Uuid;

    fn sample_lot(tx_sig: &str, qty: f64, price: f64, ts: i64) -> Lot {
        Lot {
            lot_id: Uuid::new_v4(),
            tx_sig: TxSig::from(tx_sig),
            timestamp: ts,
            mint: Mint::from("mint1"),
            side: Side::Buy,
            quantity: qty,
            usd_value: qty * price,
            unit_price_usd: price,
            sol_price_usd: None,
            fee_usd: None,
            source: None,
            status: LotStatus::Confirmed,
            decision_id: None,
        }
    }

    #[tokio::test]
    async fn insert_lot_is_idempotent_on_tx_sig() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.lots();

        let lot = sample_lot("sig1", 100.0, 1.0, 1);
        assert!(repo.insert_lot(&lot).await.unwrap());
        assert!(!repo.insert_lot(&lot).await.unwrap());

        let open = repo.open_lots_for_mint(&Mint::from("mint1")).await.unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn open_lots_ordered_by_entry_timestamp() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.lots();

        repo.insert_lot(&sample_lot("sig-b", 100.0, 2.0, 2)).await.unwrap();
        repo.insert_lot(&sample_lot("sig-a", 100.0, 1.0, 1)).await.unwrap();

        let open = repo.open_lots_for_mint(&Mint::from("mint1")).await.unwrap();
        assert_eq!(open[0].entry_timestamp, 1);
        assert_eq!(open[1].entry_timestamp, 2);
    }
}
