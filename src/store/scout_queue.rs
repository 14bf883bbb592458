use super::Store;
use crate::error::{Error, Result};
use crate::types::Mint;
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoutQueueStatus {
    Pending,
    InProgress,
    Bought,
    Failed,
    Skipped,
}

impl ScoutQueueStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Bought => "BOUGHT",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "IN_PROGRESS" => Self::InProgress,
            "BOUGHT" => Self::Bought,
            "FAILED" => Self::Failed,
            "SKIPPED" => Self::Skipped,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoutQueueRow {
    pub mint: Mint,
    pub symbol: Option<String>,
    pub score: f64,
    pub reasons: Option<String>,
    pub spend_sol: f64,
    pub status: ScoutQueueStatus,
    pub buy_attempts: u32,
    pub warmup_attempts: u32,
    pub in_progress_at: Option<i64>,
    pub next_attempt_at: Option<i64>,
    pub last_attempt_at: Option<i64>,
    pub last_error: Option<String>,
    pub tx_sig: Option<String>,
    pub queued_at: i64,
}

const SELECT_COLUMNS: &str = "mint, symbol, score, reasons, spend_sol, status, buy_attempts, \
     warmup_attempts, in_progress_at, next_attempt_at, last_attempt_at, last_error, tx_sig, queued_at";

fn row_to_queue(row: &rusqlite::Row) -> rusqlite::Result<ScoutQueueRow> {
    let mint: String = row.get(0)?;
    let status: String = row.get(5)?;
    Ok(ScoutQueueRow {
        mint: Mint(mint),
        symbol: row.get(1)?,
        score: row.get(2)?,
        reasons: row.get(3)?,
        spend_sol: row.get(4)?,
        status: ScoutQueueStatus::from_str(&status),
        buy_attempts: row.get::<_, i64>(6)? as u32,
        warmup_attempts: row.get::<_, i64>(7)? as u32,
        in_progress_at: row.get(8)?,
        next_attempt_at: row.get(9)?,
        last_attempt_at: row.get(10)?,
        last_error: row.get(11)?,
        tx_sig: row.get(12)?,
        queued_at: row.get(13)?,
    })
}

/// Outcome of an attempted atomic claim.
#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(ScoutQueueRow),
    NoneAvailable,
}

#[derive(Clone)]
pub struct ScoutQueueRepo {
    store: Store,
}

impl ScoutQueueRepo {
    pub(super) fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn enqueue(&self, row: &ScoutQueueRow) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO scout_queue
                (mint, symbol, score, reasons, spend_sol, status, buy_attempts, warmup_attempts,
                 in_progress_at, next_attempt_at, last_attempt_at, last_error, tx_sig, queued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(mint) DO NOTHING",
            params![
                row.mint.0,
                row.symbol,
                row.score,
                row.reasons,
                row.spend_sol,
                row.status.as_str(),
                row.buy_attempts,
                row.warmup_attempts,
                row.in_progress_at,
                row.next_attempt_at,
                row.last_attempt_at,
                row.last_error,
                row.tx_sig,
                row.queued_at,
            ],
        )?;
        Ok(())
    }

    /// Atomically claim one PENDING row whose `next_attempt_at` is past due,
    /// transitioning it to IN_PROGRESS. Uses an IMMEDIATE transaction so
    /// SQLite's single-writer serialization makes the claim exclusive:
    /// concurrent callers racing this method see exactly one winner and the
    /// rest observe `NoneAvailable` (property 9, scout-queue §4.5 step 3).
    pub async fn claim_one_pending(&self, now: i64) -> Result<ClaimOutcome> {
        let conn = self.store.conn();
        let mut conn = conn.lock().await;
        let tx = conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .map_err(Error::from)?;

        let mint: Option<String> = tx
            .query_row(
                "SELECT mint FROM scout_queue
                 WHERE status = 'PENDING' AND (next_attempt_at IS NULL OR next_attempt_at <= ?1)
                 ORDER BY score DESC LIMIT 1",
                params![now],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::from)?;

        let Some(mint) = mint else {
            tx.commit().map_err(Error::from)?;
            return Ok(ClaimOutcome::NoneAvailable);
        };

        let updated = tx
            .execute(
                "UPDATE scout_queue SET status = 'IN_PROGRESS', in_progress_at = ?2
                 WHERE mint = ?1 AND status = 'PENDING'",
                params![mint, now],
            )
            .map_err(Error::from)?;

        if updated == 0 {
            tx.commit().map_err(Error::from)?;
            return Ok(ClaimOutcome::NoneAvailable);
        }

        let claimed = tx
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM scout_queue WHERE mint = ?1"),
                params![mint],
                row_to_queue,
            )
            .map_err(Error::from)?;

        tx.commit().map_err(Error::from)?;
        Ok(ClaimOutcome::Claimed(claimed))
    }

    pub async fn get(&self, mint: &Mint) -> Result<Option<ScoutQueueRow>> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM scout_queue WHERE mint = ?1");
        conn.query_row(&sql, params![mint.0], row_to_queue)
            .optional()
            .map_err(Error::from)
    }

    pub async fn stale_in_progress(&self, cutoff: i64) -> Result<Vec<ScoutQueueRow>> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM scout_queue
             WHERE status = 'IN_PROGRESS' AND in_progress_at < ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![cutoff], row_to_queue)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub async fn set_status(
        &self,
        mint: &Mint,
        status: ScoutQueueStatus,
        next_attempt_at: Option<i64>,
        buy_attempts: u32,
        last_error: Option<&str>,
    ) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "UPDATE scout_queue SET status = ?2, next_attempt_at = ?3, buy_attempts = ?4,
                last_error = ?5, last_attempt_at = strftime('%s','now'), in_progress_at = NULL
             WHERE mint = ?1",
            params![mint.0, status.as_str(), next_attempt_at, buy_attempts, last_error],
        )?;
        Ok(())
    }

    /// All rows not yet terminal (PENDING or IN_PROGRESS), newest first.
    pub async fn pending_summary(&self) -> Result<Vec<ScoutQueueRow>> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM scout_queue
             WHERE status IN ('PENDING', 'IN_PROGRESS')
             ORDER BY queued_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_queue)?.filter_map(|r| r.ok()).collect();
        Ok(rows)
    }

    pub async fn mark_bought(&self, mint: &Mint, tx_sig: &str, now: i64) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "UPDATE scout_queue SET status = 'BOUGHT', tx_sig = ?2, in_progress_at = NULL, last_attempt_at = ?3
             WHERE mint = ?1",
            params![mint.0, tx_sig, now],
        )?;
        Ok(())
    }

    /// Count of rows that transitioned to BOUGHT at or after `since`
    /// (day-boundary timestamp), for the scout gate pipeline's daily-entry
    /// limit.
    pub async fn count_bought_since(&self, since: i64) -> Result<u32> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scout_queue WHERE status = 'BOUGHT' AND last_attempt_at >= ?1",
            params![since],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mint: &str) -> ScoutQueueRow {
        ScoutQueueRow {
            mint: Mint::from(mint),
            symbol: Some("SYM".into()),
            score: 1.0,
            reasons: None,
            spend_sol: 0.1,
            status: ScoutQueueStatus::Pending,
            buy_attempts: 0,
            warmup_attempts: 0,
            in_progress_at: None,
            next_attempt_at: None,
            last_attempt_at: None,
            last_error: None,
            tx_sig: None,
            queued_at: 0,
        }
    }

    #[tokio::test]
    async fn claim_transitions_to_in_progress() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.scout_queue();

        repo.enqueue(&sample("mintA")).await.unwrap();
        match repo.claim_one_pending(1000).await.unwrap() {
            ClaimOutcome::Claimed(row) => {
                assert_eq!(row.mint.0, "mintA");
                assert_eq!(row.status, ScoutQueueStatus::InProgress);
            }
            ClaimOutcome::NoneAvailable => panic!("expected a claim"),
        }
    }

    #[tokio::test]
    async fn second_claim_on_same_row_finds_nothing() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.scout_queue();

        repo.enqueue(&sample("mintA")).await.unwrap();
        repo.claim_one_pending(1000).await.unwrap();
        match repo.claim_one_pending(1000).await.unwrap() {
            ClaimOutcome::NoneAvailable => {}
            ClaimOutcome::Claimed(_) => panic!("row should already be claimed"),
        }
    }

    #[tokio::test]
    async fn future_next_attempt_is_not_claimable() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.scout_queue();

        let mut row = sample("mintA");
        row.next_attempt_at = Some(5000);
        repo.enqueue(&row).await.unwrap();
        match repo.claim_one_pending(1000).await.unwrap() {
            ClaimOutcome::NoneAvailable => {}
            ClaimOutcome::Claimed(_) => panic!("row is not yet due"),
        }
    }

    #[tokio::test]
    async fn count_bought_since_only_counts_todays_buys() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.scout_queue();

        repo.enqueue(&sample("yesterday")).await.unwrap();
        repo.mark_bought(&Mint::from("yesterday"), "sig1", 1_000).await.unwrap();

        repo.enqueue(&sample("today1")).await.unwrap();
        repo.mark_bought(&Mint::from("today1"), "sig2", 100_000).await.unwrap();
        repo.enqueue(&sample("today2")).await.unwrap();
        repo.mark_bought(&Mint::from("today2"), "sig3", 100_500).await.unwrap();

        let count = repo.count_bought_since(100_000).await.unwrap();
        assert_eq!(count, 2);
    }
}
