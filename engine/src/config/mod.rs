pub mod settings;

pub use settings::{
    advisory_key_from_env, AccumulationSettings, AdvisorySettings, AgeSettings, BotSettings, EngineSettings, ExchangeCredentials,
    ExchangeSettings, GridSettings, ScanCriteria,
};
