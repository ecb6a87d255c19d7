pub mod context;
pub mod deepseek;
pub mod response;

pub use context::MarketContext;
pub use deepseek::DeepSeekAdvisor;
pub use response::parse_recommendation;
