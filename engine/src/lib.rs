// grid-scout engine: new-listing scanner and advisory-driven grid bot.

pub mod advisory;
pub mod analysis;
pub mod config;
pub mod connectors;
pub mod data;
pub mod error;
pub mod grid;
pub mod services;

pub use error::{EngineError, Result};
