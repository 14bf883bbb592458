//! CLI command implementations: wires a loaded [`Config`] to a [`Engine`]
//! and runs the operator-facing subcommands.

use anyhow::{Context, Result};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::engine::Engine;
use crate::external::{
    AggregatorClient, BalanceReader, DexScreenerClient, HttpAggregatorClient, LiveExecution, MarketDataClient, PaperExecution,
};
use crate::ranking::rotation::RotationAction;
use crate::store::Store;
use crate::telemetry::TelemetryAggregator;
use crate::types::{Mint, SlotType};

/// Best-effort SOL/USD conversion shared with the scout gate pipeline's
/// sizing context — a live price feed is out of scope.
const SOL_PRICE_USD: f64 = 150.0;

/// Config fingerprint recorded alongside each tick's telemetry row so a
/// hot-reload or redeploy shows up in the history even without a version
/// bump.
fn config_fingerprint(config: &Config) -> String {
    let mut hasher = DefaultHasher::new();
    format!("{config:?}").hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

async fn open_store(config: &Config) -> Result<Store> {
    let store = Store::open(&config.store.database_path)
        .with_context(|| format!("opening store at {}", config.store.database_path))?;
    store.init_schema().await.context("initializing schema")?;
    Ok(store)
}

fn build_engine(config: &Config, store: Store) -> Engine {
    let aggregator = Arc::new(HttpAggregatorClient::new(config.aggregator.base_url.clone()));
    let market_data = Arc::new(DexScreenerClient::new());
    let execution: Arc<dyn crate::external::Execution> = match config.runtime.execution_mode {
        crate::config::ExecutionMode::Paper => Arc::new(PaperExecution::new(aggregator.clone())),
        crate::config::ExecutionMode::Live => Arc::new(LiveExecution::new(aggregator.clone())),
    };
    let balances: Arc<dyn crate::external::BalanceReader> = Arc::new(crate::external::ScriptedBalanceReader::new(vec![0.0], 0.0));

    Engine::new(store, config.clone(), aggregator, market_data, execution, balances)
}

/// Runs the tick loop until interrupted. Each tick is a best-effort pass —
/// a failed tick logs and waits for the next interval rather than exiting.
pub async fn start(config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        info!("starting in dry-run mode: decisions are computed but no orders are submitted");
    }

    let store = open_store(config).await?;
    let engine = build_engine(config, store);
    let interval = Duration::from_secs(config.runtime.tick_interval_secs);
    let mut tick_seq: u64 = 0;
    let config_hash = config_fingerprint(config);

    info!(tick_interval_secs = config.runtime.tick_interval_secs, "engine started");

    loop {
        tick_seq += 1;

        if config.runtime.manual_pause {
            info!(tick_seq, "engine paused, skipping tick");
        } else if let Err(e) = run_tick(&engine, tick_seq, &config_hash, dry_run).await {
            error!(tick_seq, error = %e, "tick failed");
        }

        tokio::time::sleep(interval).await;
    }
}

/// One full tick: mark positions to market, evaluate and apply rotation,
/// run one scout-queue claim, then flush telemetry. Mirrors the control
/// flow decisions → ranking → rotation → sizing → scout/exit execution →
/// ledger/telemetry.
async fn run_tick(engine: &Engine, tick_seq: u64, config_hash: &str, dry_run: bool) -> Result<()> {
    let tick_started = Instant::now();
    let now = chrono::Utc::now().timestamp();
    let now_ms = now * 1000;

    let held_rows = engine.store.positions().all_held().await?;
    let pending_rows = engine.store.scout_queue().pending_summary().await?;

    let mut watched: Vec<Mint> = held_rows.iter().map(|r| r.mint.clone()).collect();
    for row in &pending_rows {
        if !watched.contains(&row.mint) {
            watched.push(row.mint.clone());
        }
    }

    let mut prices: HashMap<Mint, Option<f64>> = HashMap::with_capacity(watched.len());
    for mint in &watched {
        let price = match engine.market_data.token_pairs(mint).await {
            Ok(pairs) => pairs.first().and_then(|p| p.price_usd.as_deref()).and_then(|s| s.parse::<f64>().ok()),
            Err(e) => {
                warn!(tick_seq, mint = mint.as_str(), error = %e, "market data lookup failed");
                None
            }
        };
        prices.insert(mint.clone(), price);
    }

    let price_pairs: Vec<(Mint, Option<f64>)> = prices.iter().map(|(m, p)| (m.clone(), *p)).collect();
    let write_summary = engine.mark_to_market(&price_pairs, now).await?;
    info!(
        tick_seq,
        rows_written = write_summary.rows_written,
        skipped_no_price = write_summary.skipped_no_price,
        "marked positions to market"
    );

    let sol_balance = engine.balances.sol_balance().await?;
    let telemetry_repo = engine.store.telemetry();
    let mut telemetry = TelemetryAggregator::new(&telemetry_repo);

    let action = engine.evaluate_rotation(&[], now_ms).await?;
    if dry_run {
        info!(tick_seq, ?action, "rotation evaluated (dry run, not applied)");
    } else if !matches!(action, RotationAction::NoAction) {
        telemetry.record_rotation();
        match engine.apply_rotation(&action, &mut telemetry, now).await {
            Ok(exits) => info!(tick_seq, ?action, exits, "rotation applied"),
            Err(e) => error!(tick_seq, ?action, error = %e, "rotation apply failed"),
        }
    }

    if !dry_run {
        let current_scout_slots = held_rows.iter().filter(|r| r.slot_type == SlotType::Scout).count();
        let lookup_prices = prices.clone();
        let price_lookup = move |mint: &Mint| lookup_prices.get(mint).copied().flatten().unwrap_or(0.0);

        let day_start = now - now.rem_euclid(86_400);
        let daily_entry_count = engine.store.scout_queue().count_bought_since(day_start).await?;

        match engine.run_scout_tick(sol_balance, daily_entry_count, current_scout_slots, price_lookup, now).await {
            Ok(outcome) => info!(tick_seq, ?outcome, "scout tick"),
            Err(e) => error!(tick_seq, error = %e, "scout tick failed"),
        }
    }

    let duration_ms = tick_started.elapsed().as_millis() as u64;
    let sizer = engine.sizer.read().await;
    telemetry
        .flush(
            tick_seq,
            config_hash,
            duration_ms,
            sizer.governor(),
            sol_balance * SOL_PRICE_USD,
            Some(SOL_PRICE_USD),
        )
        .await?;

    Ok(())
}

/// Prints a snapshot of held positions and pending scout-queue rows.
pub async fn status(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let positions = store.positions().all_held().await?;

    println!("\n=== POSITIONS ===\n");
    if positions.is_empty() {
        println!("No open positions.");
    } else {
        for pos in &positions {
            let pnl_pct = if pos.entry_price > 0.0 {
                (pos.last_price - pos.entry_price) / pos.entry_price * 100.0
            } else {
                0.0
            };
            println!(
                "  {:<44} {:>10?} tokens={:<14.4} entry={:<12.8} last={:<12.8} pnl={:+.2}%{}",
                pos.mint.as_str(),
                pos.slot_type,
                pos.total_tokens,
                pos.entry_price,
                pos.last_price,
                pnl_pct,
                if pos.liquidating { "  [LIQUIDATING]" } else { "" },
            );
        }
    }

    println!();
    Ok(())
}

/// Prints the currently loaded configuration with secrets masked.
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Checks connectivity to the aggregator and market-data collaborators.
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== HEALTH CHECK ===\n");
    let mut all_ok = true;

    print!("Store... ");
    match open_store(config).await {
        Ok(_) => println!("OK"),
        Err(e) => {
            println!("FAILED: {e}");
            all_ok = false;
        }
    }

    print!("Aggregator ({})... ", config.aggregator.base_url);
    let aggregator = HttpAggregatorClient::new(config.aggregator.base_url.clone());
    match aggregator
        .quote(crate::external::QuoteRequest {
            mint: Mint::from("So11111111111111111111111111111111111111112"),
            side: crate::types::Side::Buy,
            amount_in: 1.0,
            slippage_bps: 50,
        })
        .await
    {
        Ok(_) => println!("OK"),
        Err(e) => {
            println!("FAILED: {e}");
            all_ok = false;
        }
    }

    println!();
    if all_ok {
        println!("All systems healthy!");
    } else {
        warn!("one or more health checks failed");
        println!("Some systems are unhealthy. Check the errors above.");
    }

    Ok(())
}

/// Operational subcommand: prints the scout queue's pending/in-progress
/// rows without running a claim.
pub async fn scout_status(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let queue = store.scout_queue();
    let pending = queue.pending_summary().await?;

    println!("\n=== SCOUT QUEUE ===\n");
    if pending.is_empty() {
        println!("Queue is empty.");
    } else {
        for row in &pending {
            println!(
                "  {:<44} status={:<12?} score={:<8.3} attempts={}",
                row.mint.as_str(),
                row.status,
                row.score,
                row.buy_attempts,
            );
        }
    }
    println!();
    Ok(())
}

/// Operational subcommand: evaluates the rotation cascade against the
/// current held set without executing the chosen action.
pub async fn rotate_dry_run(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let engine = build_engine(config, store);
    let now = chrono::Utc::now().timestamp_millis();

    let action = engine.evaluate_rotation(&[], now).await?;
    println!("\n=== ROTATION DRY RUN ===\n");
    println!("{action:?}");
    println!();
    Ok(())
}

/// Operational subcommand: forces a close-position pass on a single mint,
/// independent of the rotation cascade (e.g. manual intervention).
pub async fn close_position(config: &Config, mint: &str) -> Result<()> {
    let store = open_store(config).await?;
    let engine = build_engine(config, store);
    let mint = Mint::from(mint);

    let row = engine
        .store
        .positions()
        .get(&mint)
        .await?
        .with_context(|| format!("no open position for {}", mint.as_str()))?;

    let closer = crate::exit::PositionCloser::new(
        &config.exit,
        &engine.ledger,
        engine.execution.as_ref(),
        engine.balances.as_ref(),
        &engine.liquidation_lock,
    );

    let now = chrono::Utc::now().timestamp();
    let outcome = closer
        .close_position(&mint, crate::exit::ExitReason::UniverseExit, row.last_price, now, row.slot_type)
        .await?;

    println!("\n=== CLOSE POSITION ===\n");
    println!("{outcome:?}");
    println!();
    Ok(())
}
