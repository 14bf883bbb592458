//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub store: StoreConfig,
    pub aggregator: AggregatorConfig,
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub scout: ScoutConfig,
    #[serde(default)]
    pub exit: ExitConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub liquidation: LiquidationConfig,
    #[serde(default)]
    pub orphan: OrphanConfig,
    #[serde(default)]
    pub bars: BarsConfig,
    #[serde(default)]
    pub decisions: DecisionsConfig,
}

/// Execution mode and tick cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_execution_mode")]
    pub execution_mode: ExecutionMode,
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default)]
    pub manual_pause: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Paper,
    Live,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_aggregator_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_market_data_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    #[serde(default = "default_risk_per_trade_scout")]
    pub risk_per_trade_scout: f64,
    #[serde(default = "default_risk_per_trade_core")]
    pub risk_per_trade_core: f64,
    #[serde(default = "default_base_usd")]
    pub base_usd: f64,
    #[serde(default = "default_base_equity")]
    pub base_equity: f64,
    #[serde(default = "default_min_trade_usd")]
    pub min_trade_usd: f64,
    #[serde(default = "default_max_trade_usd")]
    pub max_trade_usd: f64,
    #[serde(default = "default_min_tvl_scout")]
    pub min_tvl_scout_usd: f64,
    #[serde(default = "default_min_tvl_core")]
    pub min_tvl_core_usd: f64,
    #[serde(default = "default_max_mint_pct")]
    pub max_mint_pct: f64,
    #[serde(default = "default_max_participation_pct")]
    pub max_participation_pct: f64,
    #[serde(default = "default_safety_haircut")]
    pub safety_haircut: f64,
    #[serde(default = "default_governor_window")]
    pub governor_window: usize,
    #[serde(default = "default_min_vol_5m_scout")]
    pub min_vol_5m_scout_usd: f64,
    #[serde(default = "default_min_vol_5m_core")]
    pub min_vol_5m_core_usd: f64,
    #[serde(default = "default_entry_max_impact_scout")]
    pub entry_max_impact_pct_scout: f64,
    #[serde(default = "default_entry_max_impact_core")]
    pub entry_max_impact_pct_core: f64,
    #[serde(default = "default_exit_max_impact_scout")]
    pub exit_max_impact_pct_scout: f64,
    #[serde(default = "default_exit_max_impact_core")]
    pub exit_max_impact_pct_core: f64,
    #[serde(default = "default_min_round_trip_scout")]
    pub min_round_trip_ratio_scout: f64,
    #[serde(default = "default_min_round_trip_core")]
    pub min_round_trip_ratio_core: f64,
    #[serde(default = "default_edge_buffer_pct")]
    pub edge_buffer_pct: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_scout: default_risk_per_trade_scout(),
            risk_per_trade_core: default_risk_per_trade_core(),
            base_usd: default_base_usd(),
            base_equity: default_base_equity(),
            min_trade_usd: default_min_trade_usd(),
            max_trade_usd: default_max_trade_usd(),
            min_tvl_scout_usd: default_min_tvl_scout(),
            min_tvl_core_usd: default_min_tvl_core(),
            max_mint_pct: default_max_mint_pct(),
            max_participation_pct: default_max_participation_pct(),
            safety_haircut: default_safety_haircut(),
            governor_window: default_governor_window(),
            min_vol_5m_scout_usd: default_min_vol_5m_scout(),
            min_vol_5m_core_usd: default_min_vol_5m_core(),
            entry_max_impact_pct_scout: default_entry_max_impact_scout(),
            entry_max_impact_pct_core: default_entry_max_impact_core(),
            exit_max_impact_pct_scout: default_exit_max_impact_scout(),
            exit_max_impact_pct_core: default_exit_max_impact_core(),
            min_round_trip_ratio_scout: default_min_round_trip_scout(),
            min_round_trip_ratio_core: default_min_round_trip_core(),
            edge_buffer_pct: default_edge_buffer_pct(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_w_signal")]
    pub w_signal: f64,
    #[serde(default = "default_w_momentum")]
    pub w_momentum: f64,
    #[serde(default = "default_w_time")]
    pub w_time: f64,
    #[serde(default = "default_w_trailing")]
    pub w_trailing: f64,
    #[serde(default = "default_w_quality")]
    pub w_quality: f64,
    #[serde(default = "default_stale_hours")]
    pub stale_hours: f64,
    #[serde(default = "default_stale_band_pct")]
    pub stale_band_pct: f64,
    #[serde(default = "default_stale_penalty")]
    pub stale_penalty: f64,
    #[serde(default = "default_scout_stop_pct")]
    pub scout_stop_pct: f64,
    #[serde(default = "default_loss_exit_pct")]
    pub loss_exit_pct: f64,
    #[serde(default = "default_underperform_min")]
    pub underperform_min_minutes: f64,
    #[serde(default = "default_grace_min")]
    pub grace_min_minutes: f64,
    #[serde(default = "default_be_lock_threshold")]
    pub be_lock_threshold: f64,
    #[serde(default = "default_promo_min_pnl")]
    pub promo_min_pnl: f64,
    #[serde(default = "default_promo_min_signal")]
    pub promo_min_signal: f64,
    #[serde(default = "default_promo_min_hours")]
    pub promo_min_hours: f64,
    #[serde(default = "default_trailing_tight_pct")]
    pub trailing_tight_pct: f64,
    #[serde(default = "default_trailing_base_pct")]
    pub trailing_base_pct: f64,
    #[serde(default = "default_trailing_profit_threshold")]
    pub trailing_profit_threshold: f64,
    #[serde(default = "default_trailing_stop_penalty")]
    pub trailing_stop_penalty: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            w_signal: default_w_signal(),
            w_momentum: default_w_momentum(),
            w_time: default_w_time(),
            w_trailing: default_w_trailing(),
            w_quality: default_w_quality(),
            stale_hours: default_stale_hours(),
            stale_band_pct: default_stale_band_pct(),
            stale_penalty: default_stale_penalty(),
            scout_stop_pct: default_scout_stop_pct(),
            loss_exit_pct: default_loss_exit_pct(),
            underperform_min_minutes: default_underperform_min(),
            grace_min_minutes: default_grace_min(),
            be_lock_threshold: default_be_lock_threshold(),
            promo_min_pnl: default_promo_min_pnl(),
            promo_min_signal: default_promo_min_signal(),
            promo_min_hours: default_promo_min_hours(),
            trailing_tight_pct: default_trailing_tight_pct(),
            trailing_base_pct: default_trailing_base_pct(),
            trailing_profit_threshold: default_trailing_profit_threshold(),
            trailing_stop_penalty: default_trailing_stop_penalty(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RotationConfig {
    #[serde(default = "default_rotation_threshold")]
    pub rotation_threshold: f64,
    #[serde(default = "default_stale_exit_hours")]
    pub stale_exit_hours: f64,
    #[serde(default = "default_total_slots")]
    pub total_slots: usize,
    #[serde(default = "default_core_slots")]
    pub core_slots: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            rotation_threshold: default_rotation_threshold(),
            stale_exit_hours: default_stale_exit_hours(),
            total_slots: default_total_slots(),
            core_slots: default_core_slots(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoutConfig {
    #[serde(default = "default_daily_entry_limit")]
    pub daily_entry_limit: u32,
    #[serde(default = "default_scout_slots")]
    pub scout_slots: usize,
    #[serde(default = "default_sol_reserve")]
    pub sol_reserve: f64,
    #[serde(default = "default_stale_minutes")]
    pub stale_minutes: i64,
    #[serde(default = "default_max_buy_attempts")]
    pub max_buy_attempts: u32,
    #[serde(default = "default_warmup_timeout_minutes")]
    pub warmup_timeout_minutes: i64,
    #[serde(default = "default_reschedule_backoff_secs")]
    pub reschedule_backoff_secs: i64,
    #[serde(default)]
    pub whale_confirmation_enabled: bool,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            daily_entry_limit: default_daily_entry_limit(),
            scout_slots: default_scout_slots(),
            sol_reserve: default_sol_reserve(),
            stale_minutes: default_stale_minutes(),
            max_buy_attempts: default_max_buy_attempts(),
            warmup_timeout_minutes: default_warmup_timeout_minutes(),
            reschedule_backoff_secs: default_reschedule_backoff_secs(),
            whale_confirmation_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExitConfig {
    #[serde(default = "default_dust_usd")]
    pub dust_usd_threshold: f64,
    #[serde(default = "default_dust_qty")]
    pub dust_qty_buffer: f64,
    #[serde(default = "default_max_retries_exit")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_initial_slippage_bps")]
    pub initial_slippage_bps: u32,
    #[serde(default = "default_max_slippage_bps")]
    pub max_slippage_bps: u32,
    #[serde(default = "default_flash_close_pct")]
    pub flash_close_pct: f64,
    #[serde(default = "default_sol_reserve")]
    pub sol_reserve: f64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            dust_usd_threshold: default_dust_usd(),
            dust_qty_buffer: default_dust_qty(),
            max_retries: default_max_retries_exit(),
            retry_delay_ms: default_retry_delay_ms(),
            initial_slippage_bps: default_initial_slippage_bps(),
            max_slippage_bps: default_max_slippage_bps(),
            flash_close_pct: default_flash_close_pct(),
            sol_reserve: default_sol_reserve(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_watchdog_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_watchdog_base_minutes")]
    pub base_minutes: i64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_watchdog_max_attempts(),
            base_minutes: default_watchdog_base_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiquidationConfig {
    #[serde(default = "default_ban_hours")]
    pub ban_hours: i64,
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            ban_hours: default_ban_hours(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrphanConfig {
    #[serde(default = "default_grace_ticks")]
    pub grace_ticks: u32,
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            grace_ticks: default_grace_ticks(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BarsConfig {
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
    #[serde(default = "default_max_tracked_mints")]
    pub max_tracked_mints: usize,
}

impl Default for BarsConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            max_tracked_mints: default_max_tracked_mints(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionsConfig {
    #[serde(default = "default_core_target_pct")]
    pub core_target_pct: f64,
    #[serde(default = "default_max_pos_pct")]
    pub max_pos_pct: f64,
    #[serde(default = "default_deploy_target_pct")]
    pub deploy_target_pct: f64,
    #[serde(default = "default_scaling_passes")]
    pub max_scaling_passes: u32,
}

impl Default for DecisionsConfig {
    fn default() -> Self {
        Self {
            core_target_pct: default_core_target_pct(),
            max_pos_pct: default_max_pos_pct(),
            deploy_target_pct: default_deploy_target_pct(),
            max_scaling_passes: default_scaling_passes(),
        }
    }
}

// Default value functions

fn default_execution_mode() -> ExecutionMode {
    ExecutionMode::Paper
}

fn default_tick_interval_secs() -> u64 {
    30
}

fn default_database_path() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "rotator.db".into())
}

fn default_aggregator_base_url() -> String {
    "https://quote-api.example.com".into()
}

fn default_market_data_base_url() -> String {
    "https://api.dexscreener.com".into()
}

fn default_timeout_ms() -> u64 {
    10000
}

fn default_max_retries() -> u32 {
    3
}

fn default_risk_per_trade_scout() -> f64 {
    0.01
}
fn default_risk_per_trade_core() -> f64 {
    0.02
}
fn default_base_usd() -> f64 {
    20.0
}
fn default_base_equity() -> f64 {
    1000.0
}
fn default_min_trade_usd() -> f64 {
    10.0
}
fn default_max_trade_usd() -> f64 {
    500.0
}
fn default_min_tvl_scout() -> f64 {
    10_000.0
}
fn default_min_tvl_core() -> f64 {
    50_000.0
}
fn default_max_mint_pct() -> f64 {
    0.15
}
fn default_max_participation_pct() -> f64 {
    0.1
}
fn default_safety_haircut() -> f64 {
    0.85
}
fn default_governor_window() -> usize {
    50
}
fn default_min_vol_5m_scout() -> f64 {
    2_000.0
}
fn default_min_vol_5m_core() -> f64 {
    5_000.0
}
fn default_entry_max_impact_scout() -> f64 {
    0.05
}
fn default_entry_max_impact_core() -> f64 {
    0.03
}
fn default_exit_max_impact_scout() -> f64 {
    0.08
}
fn default_exit_max_impact_core() -> f64 {
    0.05
}
fn default_min_round_trip_scout() -> f64 {
    0.90
}
fn default_min_round_trip_core() -> f64 {
    0.93
}
fn default_edge_buffer_pct() -> f64 {
    0.01
}

fn default_w_signal() -> f64 {
    1.0
}
fn default_w_momentum() -> f64 {
    1.0
}
fn default_w_time() -> f64 {
    1.0
}
fn default_w_trailing() -> f64 {
    1.0
}
fn default_w_quality() -> f64 {
    1.0
}
fn default_stale_hours() -> f64 {
    24.0
}
fn default_stale_band_pct() -> f64 {
    0.02
}
fn default_stale_penalty() -> f64 {
    -0.5
}
fn default_scout_stop_pct() -> f64 {
    0.07
}
fn default_loss_exit_pct() -> f64 {
    0.10
}
fn default_underperform_min() -> f64 {
    30.0
}
fn default_grace_min() -> f64 {
    60.0
}
fn default_be_lock_threshold() -> f64 {
    0.10
}
fn default_promo_min_pnl() -> f64 {
    0.05
}
fn default_promo_min_signal() -> f64 {
    0.5
}
fn default_promo_min_hours() -> f64 {
    2.0
}
fn default_trailing_tight_pct() -> f64 {
    0.05
}
fn default_trailing_base_pct() -> f64 {
    0.15
}
fn default_trailing_profit_threshold() -> f64 {
    0.20
}
fn default_trailing_stop_penalty() -> f64 {
    -2.0
}

fn default_rotation_threshold() -> f64 {
    0.5
}
fn default_stale_exit_hours() -> f64 {
    48.0
}
fn default_total_slots() -> usize {
    10
}
fn default_core_slots() -> usize {
    4
}

fn default_daily_entry_limit() -> u32 {
    20
}
fn default_scout_slots() -> usize {
    6
}
fn default_sol_reserve() -> f64 {
    0.05
}
fn default_stale_minutes() -> i64 {
    5
}
fn default_max_buy_attempts() -> u32 {
    3
}
fn default_warmup_timeout_minutes() -> i64 {
    15
}
fn default_reschedule_backoff_secs() -> i64 {
    300
}

fn default_dust_usd() -> f64 {
    1.0
}
fn default_dust_qty() -> f64 {
    10.0
}
fn default_max_retries_exit() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    500
}
fn default_initial_slippage_bps() -> u32 {
    100
}
fn default_max_slippage_bps() -> u32 {
    500
}
fn default_flash_close_pct() -> f64 {
    0.95
}

fn default_watchdog_max_attempts() -> u32 {
    3
}
fn default_watchdog_base_minutes() -> i64 {
    5
}

fn default_ban_hours() -> i64 {
    24
}

fn default_grace_ticks() -> u32 {
    10
}

fn default_ttl_hours() -> i64 {
    6
}
fn default_max_tracked_mints() -> usize {
    200
}

fn default_core_target_pct() -> f64 {
    0.10
}
fn default_max_pos_pct() -> f64 {
    0.20
}
fn default_deploy_target_pct() -> f64 {
    0.80
}
fn default_scaling_passes() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .set_default("runtime.tick_interval_secs", default_tick_interval_secs() as i64)?
            .set_default("store.database_path", default_database_path())?
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("ROTATOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.sizing.min_trade_usd <= 0.0 {
            anyhow::bail!("min_trade_usd must be positive");
        }
        if self.sizing.max_trade_usd < self.sizing.min_trade_usd {
            anyhow::bail!("max_trade_usd must be >= min_trade_usd");
        }
        if self.sizing.safety_haircut < 0.50 || self.sizing.safety_haircut > 0.95 {
            anyhow::bail!("safety_haircut must be within [0.50, 0.95]");
        }
        if self.rotation.core_slots > self.rotation.total_slots {
            anyhow::bail!("core_slots cannot exceed total_slots");
        }
        if self.exit.max_slippage_bps > 10000 {
            anyhow::bail!("max_slippage_bps cannot exceed 10000 (100%)");
        }
        if self.exit.initial_slippage_bps > self.exit.max_slippage_bps {
            anyhow::bail!("initial_slippage_bps cannot exceed max_slippage_bps");
        }
        if self.decisions.deploy_target_pct <= 0.0 || self.decisions.deploy_target_pct > 1.0 {
            anyhow::bail!("deploy_target_pct must be within (0, 1]");
        }
        if self.bars.max_tracked_mints == 0 {
            anyhow::bail!("max_tracked_mints must be positive");
        }

        Ok(())
    }

    /// Produce a stable hash over the configuration's values, for telemetry attribution.
    pub fn snapshot_hash(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let serialized = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Get masked configuration for display (hide secrets).
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Runtime:
    execution_mode: {:?}
    tick_interval: {}s
    manual_pause: {}
  Store:
    database_path: {}
  Aggregator:
    base_url: {}
    api_key: {}
  Market data:
    base_url: {}
  Sizing:
    risk_per_trade_scout: {}
    risk_per_trade_core: {}
    safety_haircut: {}
  Rotation:
    total_slots: {}
    core_slots: {}
    rotation_threshold: {}
  Scout:
    scout_slots: {}
    daily_entry_limit: {}
"#,
            self.runtime.execution_mode,
            self.runtime.tick_interval_secs,
            self.runtime.manual_pause,
            mask_path(&self.store.database_path),
            mask_url(&self.aggregator.base_url),
            if self.aggregator.api_key.is_empty() {
                "(not set)"
            } else {
                "***"
            },
            self.market_data.base_url,
            self.sizing.risk_per_trade_scout,
            self.sizing.risk_per_trade_core,
            self.sizing.safety_haircut,
            self.rotation.total_slots,
            self.rotation.core_slots,
            self.rotation.rotation_threshold,
            self.scout.scout_slots,
            self.scout.daily_entry_limit,
        )
    }
}

/// Mask URL for display (hide API keys in query params).
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

fn mask_path(path: &str) -> String {
    if path.contains('@') {
        "***".to_string()
    } else {
        path.to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig {
                execution_mode: default_execution_mode(),
                tick_interval_secs: default_tick_interval_secs(),
                manual_pause: false,
            },
            store: StoreConfig {
                database_path: default_database_path(),
            },
            aggregator: AggregatorConfig {
                base_url: default_aggregator_base_url(),
                api_key: String::new(),
                timeout_ms: default_timeout_ms(),
                max_retries: default_max_retries(),
            },
            market_data: MarketDataConfig {
                base_url: default_market_data_base_url(),
                timeout_ms: default_timeout_ms(),
            },
            sizing: SizingConfig::default(),
            ranking: RankingConfig::default(),
            rotation: RotationConfig::default(),
            scout: ScoutConfig::default(),
            exit: ExitConfig::default(),
            watchdog: WatchdogConfig::default(),
            liquidation: LiquidationConfig::default(),
            orphan: OrphanConfig::default(),
            bars: BarsConfig::default(),
            decisions: DecisionsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.rotation.core_slots, 4);
        assert_eq!(config.sizing.safety_haircut, 0.85);
    }

    #[test]
    fn test_validate_rejects_bad_haircut() {
        let mut config = Config::default();
        config.sizing.safety_haircut = 0.30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(
            mask_url("https://api.example.com"),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_snapshot_hash_stable() {
        let a = Config::default().snapshot_hash();
        let b = Config::default().snapshot_hash();
        assert_eq!(a, b);
    }
}
