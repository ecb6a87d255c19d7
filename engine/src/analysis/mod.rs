pub mod accumulation;
pub mod age;
pub mod scoring;
pub mod sma;
pub mod summary;

pub use accumulation::{analyze, AccumulationAnalysis, Action, Grade, Signals};
pub use age::{AgeClass, AgeClassifier, AgeEstimate, AgeSource};
pub use scoring::{score_ticker, RejectReason, ScoreCard, ScoreOutcome};
pub use summary::{count_active, summarize, CandleSummary, PeriodChange};
