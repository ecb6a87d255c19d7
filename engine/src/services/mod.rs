// Pipelines built on the collaborator traits.
pub mod accumulation;
pub mod grid_bot;
pub mod report;
pub mod scanner;

pub use accumulation::{AccumulationReport, AccumulationScanner};
pub use grid_bot::{GridBot, GridCounts, IterationReport, PlacedOrder};
pub use scanner::{ScanReport, ScanStats, Scanner};
