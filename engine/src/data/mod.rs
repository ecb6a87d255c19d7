pub mod age_table;
pub mod market_data;

pub use age_table::YoungSymbolTable;
pub use market_data::MarketDataStore;
