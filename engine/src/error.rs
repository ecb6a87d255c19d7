use std::fmt;
use thiserror::Error;

/// Pipeline step an error was raised in. Used to give collaborator failures
/// enough context to be logged on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchTickers,
    CancelOrders,
    FetchBalances,
    FetchPrice,
    FetchCandles,
    RequestAdvice,
    ExecuteOrders,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::FetchTickers => "fetch-tickers",
            Stage::CancelOrders => "cancel-orders",
            Stage::FetchBalances => "fetch-balances",
            Stage::FetchPrice => "fetch-price",
            Stage::FetchCandles => "fetch-candles",
            Stage::RequestAdvice => "request-advice",
            Stage::ExecuteOrders => "execute-orders",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP transport error: {source}")]
    HttpError {
        #[from]
        source: reqwest::Error,
    },

    #[error("Exchange rejected request (status {status}): {body}")]
    ExchangeError { status: u16, body: String },

    #[error("Advisory service error: {0}")]
    AdvisoryError(String),

    #[error("Payload parse error: {0}")]
    ParseError(String),

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("No grid orders could be placed for {symbol}: {buys_skipped} buy and {sells_skipped} sell levels skipped, {failed} submissions failed")]
    NoOrdersPlaced {
        symbol: String,
        buys_skipped: usize,
        sells_skipped: usize,
        failed: usize,
    },

    #[error("[{stage}] {symbol}: {source}")]
    StageError {
        stage: Stage,
        symbol: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl EngineError {
    /// Wrap `self` with the stage and symbol it happened at.
    pub fn at(self, stage: Stage, symbol: &str) -> Self {
        EngineError::StageError {
            stage,
            symbol: symbol.to_string(),
            source: Box::new(self),
        }
    }

    /// Stage the error was tagged with, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            EngineError::StageError { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// `.stage(Stage::X, symbol)` on any engine result.
pub trait StageContext<T> {
    fn stage(self, stage: Stage, symbol: &str) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, stage: Stage, symbol: &str) -> Result<T> {
        self.map_err(|e| e.at(stage, symbol))
    }
}
