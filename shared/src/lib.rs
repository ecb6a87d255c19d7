// Plain data models and pure helpers used by the engine crate.
// Nothing in here performs I/O.
pub mod models;
pub mod utils;
