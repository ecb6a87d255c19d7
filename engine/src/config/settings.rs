// Engine settings: defaults mirror the constants the bot was tuned with,
// overridable from a JSON file. Credentials only ever come from the environment.
use serde::Deserialize;
use shared::models::Interval;
use std::env;
use std::path::Path;

use crate::error::{EngineError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EngineSettings {
    pub scan: ScanCriteria,
    pub age: AgeSettings,
    pub grid: GridSettings,
    pub bot: BotSettings,
    pub exchange: ExchangeSettings,
    pub advisory: AdvisorySettings,
    pub accumulation: AccumulationSettings,
}

impl EngineSettings {
    /// Defaults when `path` is `None`, otherwise the JSON file layered over defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("Failed to read settings file '{}': {}", path.display(), e))
        })?;
        let settings: EngineSettings = serde_json::from_str(&raw).map_err(|e| {
            EngineError::ConfigError(format!("Invalid settings file '{}': {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.grid.reserve_fraction > 0.0 && self.grid.reserve_fraction <= 1.0) {
            return Err(EngineError::ConfigError(format!(
                "grid.reserve_fraction must be in (0, 1], got {}",
                self.grid.reserve_fraction
            )));
        }
        if self.grid.levels_per_side == 0 {
            return Err(EngineError::ConfigError("grid.levels_per_side must be at least 1".to_string()));
        }
        if self.scan.min_price > self.scan.max_price {
            return Err(EngineError::ConfigError(format!(
                "scan.min_price {} exceeds scan.max_price {}",
                self.scan.min_price, self.scan.max_price
            )));
        }
        if self.age.coarse_lookback == 0 || self.age.fine_lookback == 0 {
            return Err(EngineError::ConfigError("age lookbacks must be at least 1 candle".to_string()));
        }
        if self.accumulation.min_candles == 0 || self.accumulation.min_candles > self.accumulation.candle_count {
            return Err(EngineError::ConfigError(format!(
                "accumulation.min_candles must be in [1, {}], got {}",
                self.accumulation.candle_count, self.accumulation.min_candles
            )));
        }
        if self.scan.concurrency == 0 {
            return Err(EngineError::ConfigError("scan.concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Hard gates and result limits for the new-listing scan.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanCriteria {
    pub quote_asset: String,
    pub min_volume: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub min_price_change: f64,
    pub max_price_change: f64,
    pub min_score: f64,
    pub max_results: usize,
    /// Stablecoins and long-established majors never worth an age lookup.
    pub excluded_symbols: Vec<String>,
    /// Symbols classified in flight at once.
    pub concurrency: usize,
    /// Pause before each per-symbol classification, in milliseconds.
    pub pace_ms: u64,
}

impl Default for ScanCriteria {
    fn default() -> Self {
        ScanCriteria {
            quote_asset: "USDT".to_string(),
            min_volume: 50_000.0,
            min_price: 0.000001,
            max_price: 2.0,
            min_price_change: -90.0,
            max_price_change: 1000.0,
            min_score: 20.0,
            max_results: 25,
            excluded_symbols: [
                "BUSDUSDT", "USDCUSDT", "TUSDUSDT", "PAXUSDT", "DAIUSDT", "BTCUSDT", "ETHUSDT", "BNBUSDT",
                "XRPUSDT", "ADAUSDT", "DOGEUSDT", "SOLUSDT", "MATICUSDT", "DOTUSDT", "AVAXUSDT",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            concurrency: 4,
            pace_ms: 50,
        }
    }
}

/// Two-stage listing-age check.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgeSettings {
    pub coarse_interval: Interval,
    pub coarse_lookback: u32,
    /// Active coarse periods at or above which a symbol is established.
    pub coarse_threshold: u32,
    pub fine_interval: Interval,
    pub fine_lookback: u32,
    /// When set, a fine-stage age above this also marks the symbol established.
    pub max_new_age_days: Option<u32>,
}

impl AgeSettings {
    /// Stricter variant: two monthly candles, 35 daily candles, at most 30 days old.
    pub fn strict() -> Self {
        AgeSettings {
            coarse_lookback: 2,
            coarse_threshold: 2,
            fine_lookback: 35,
            max_new_age_days: Some(30),
            ..Self::default()
        }
    }
}

impl Default for AgeSettings {
    fn default() -> Self {
        AgeSettings {
            coarse_interval: Interval::Month1,
            coarse_lookback: 4,
            coarse_threshold: 3,
            fine_interval: Interval::Day1,
            fine_lookback: 144,
            max_new_age_days: None,
        }
    }
}

/// Grid sizing.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GridSettings {
    /// Share of the reported quote balance the grid may commit.
    pub reserve_fraction: f64,
    /// Levels consumed per side; extra advisory levels are ignored.
    pub levels_per_side: usize,
    /// Pause between order submissions, in milliseconds.
    pub order_pause_ms: u64,
}

impl Default for GridSettings {
    fn default() -> Self {
        GridSettings { reserve_fraction: 0.8, levels_per_side: 5, order_pause_ms: 200 }
    }
}

/// Per-symbol trading loop.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotSettings {
    pub interval_minutes: u64,
    pub candle_interval: Interval,
    pub candle_count: u32,
    /// Candles per aggregated period in the advisory context (24 x 15m = 6h).
    pub bucket_size: usize,
    pub max_buckets: usize,
    pub recent_candles: usize,
    pub min_quote_balance: f64,
    pub min_base_balance: f64,
    pub cancel_before_iteration: bool,
    /// Starting quote balance for `--dry-run`.
    pub paper_quote_balance: f64,
}

impl Default for BotSettings {
    fn default() -> Self {
        BotSettings {
            interval_minutes: 15,
            candle_interval: Interval::Minute15,
            candle_count: 144,
            bucket_size: 24,
            max_buckets: 6,
            recent_candles: 16,
            min_quote_balance: 5.0,
            min_base_balance: 0.1,
            cancel_before_iteration: false,
            paper_quote_balance: 100.0,
        }
    }
}

/// Follow-up accumulation check on scan results.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AccumulationSettings {
    pub candle_interval: Interval,
    pub candle_count: u32,
    /// Symbols with less history than this are left out of the analysis.
    pub min_candles: u32,
}

impl Default for AccumulationSettings {
    fn default() -> Self {
        AccumulationSettings { candle_interval: Interval::Day1, candle_count: 144, min_candles: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExchangeSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub recv_window_ms: Option<u64>,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        ExchangeSettings { base_url: "https://api.binance.com".to_string(), timeout_secs: 10, recv_window_ms: None }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdvisorySettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AdvisorySettings {
    fn default() -> Self {
        AdvisorySettings {
            endpoint: "https://api.deepseek.com/chat/completions".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

/// Signed-endpoint credentials for the exchange.
#[derive(Clone)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials").field("api_key", &"<redacted>").finish()
    }
}

impl ExchangeCredentials {
    pub fn from_env() -> Result<Self> {
        Ok(ExchangeCredentials {
            api_key: required_env("BINANCE_API_KEY")?,
            secret_key: required_env("BINANCE_SECRET_KEY")?,
        })
    }
}

/// Bearer key for the advisory service.
pub fn advisory_key_from_env() -> Result<String> {
    required_env("DEEPSEEK_API_KEY")
}

fn required_env(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::ConfigError(format!("{} is not set", name)))
}
