//! Stranded IN_PROGRESS row reclaim:
//! unsticks claims whose owning task crashed before finishing, regardless
//! of whether that task still exists.

use crate::config::ScoutConfig;
use crate::error::Result;
use crate::store::{ScoutQueueRepo, ScoutQueueStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct RecoverySummary {
    pub rescheduled: u32,
    pub skipped: u32,
}

/// Moves every IN_PROGRESS row older than `stale_minutes` back to PENDING
/// with exponential backoff (`base_minutes` is reused as the 1-minute
/// default unit — `base × 2^(attempt-1)`), or to SKIPPED once the row's
/// buy_attempts has reached `max_buy_attempts`.
pub async fn reclaim_stale(repo: &ScoutQueueRepo, cfg: &ScoutConfig, now: i64) -> Result<RecoverySummary> {
    let cutoff = now - cfg.stale_minutes * 60;
    let stuck = repo.stale_in_progress(cutoff).await?;
    let mut summary = RecoverySummary::default();

    for row in stuck {
        if row.buy_attempts >= cfg.max_buy_attempts {
            repo.set_status(&row.mint, ScoutQueueStatus::Skipped, None, row.buy_attempts, Some("watchdog_stale_max_attempts"))
                .await?;
            summary.skipped += 1;
        } else {
            let attempt = row.buy_attempts + 1;
            let backoff_secs = 60 * 2_i64.pow(attempt.saturating_sub(1));
            repo.set_status(
                &row.mint,
                ScoutQueueStatus::Pending,
                Some(now + backoff_secs),
                attempt,
                Some("watchdog_stale_reclaimed"),
            )
            .await?;
            summary.rescheduled += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ScoutQueueRow, ScoutQueueStatus as Status, Store};
    use crate::types::Mint;

    fn in_progress_row(mint: &str, buy_attempts: u32, in_progress_at: i64) -> ScoutQueueRow {
        ScoutQueueRow {
            mint: Mint::from(mint),
            symbol: None,
            score: 1.0,
            reasons: None,
            spend_sol: 0.1,
            status: Status::InProgress,
            buy_attempts,
            warmup_attempts: 0,
            in_progress_at: Some(in_progress_at),
            next_attempt_at: None,
            last_attempt_at: None,
            last_error: None,
            tx_sig: None,
            queued_at: 0,
        }
    }

    async fn store_with(rows: &[ScoutQueueRow]) -> Store {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.scout_queue();
        for row in rows {
            let mut pending = row.clone();
            pending.status = Status::Pending;
            repo.enqueue(&pending).await.unwrap();
            if row.status == Status::InProgress {
                repo.claim_one_pending(row.in_progress_at.unwrap_or(0)).await.unwrap();
            }
        }
        store
    }

    #[tokio::test]
    async fn stale_row_under_max_attempts_is_rescheduled() {
        let store = store_with(&[in_progress_row("mintA", 0, 0)]).await;
        let repo = store.scout_queue();
        let cfg = ScoutConfig {
            stale_minutes: 5,
            max_buy_attempts: 3,
            ..ScoutConfig::default()
        };

        let summary = reclaim_stale(&repo, &cfg, 10_000).await.unwrap();
        assert_eq!(summary.rescheduled, 1);

        let row = repo.get(&Mint::from("mintA")).await.unwrap().unwrap();
        assert_eq!(row.status, Status::Pending);
        assert_eq!(row.buy_attempts, 1);
    }

    #[tokio::test]
    async fn stale_row_at_max_attempts_is_skipped() {
        let store = store_with(&[in_progress_row("mintA", 3, 0)]).await;
        let repo = store.scout_queue();
        let cfg = ScoutConfig {
            stale_minutes: 5,
            max_buy_attempts: 3,
            ..ScoutConfig::default()
        };

        let summary = reclaim_stale(&repo, &cfg, 10_000).await.unwrap();
        assert_eq!(summary.skipped, 1);

        let row = repo.get(&Mint::from("mintA")).await.unwrap().unwrap();
        assert_eq!(row.status, Status::Skipped);
    }

    #[tokio::test]
    async fn fresh_in_progress_row_is_left_alone() {
        let store = store_with(&[in_progress_row("mintA", 0, 9_900)]).await;
        let repo = store.scout_queue();
        let cfg = ScoutConfig {
            stale_minutes: 5,
            ..ScoutConfig::default()
        };

        let summary = reclaim_stale(&repo, &cfg, 10_000).await.unwrap();
        assert_eq!(summary.rescheduled, 0);
        assert_eq!(summary.skipped, 0);
    }
}
