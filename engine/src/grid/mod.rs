pub mod allocator;
pub mod precision;

pub use allocator::{BuyPlan, GridAllocator, GridPlan, OrderIntent, SellPlan, SellPolicy, SkippedLevel};
pub use precision::{quantity_decimals, round_quantity};
