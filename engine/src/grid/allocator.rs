// Budget allocation for one grid.
//
// Planning runs in two phases because the sell side depends on what the buy
// side actually achieved: `plan_buys` sizes buys against the quote budget,
// then `plan_sells` sizes sells against a balance read after the buys went out.
use serde::Serialize;
use shared::models::{OrderSide, Recommendation};
use shared::utils::{average, round_down};

use super::precision::{quantity_decimals, round_quantity};
use crate::config::GridSettings;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderIntent {
    /// Position of the source level in the recommendation.
    pub level_index: usize,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    /// Sized against an anticipated balance; never submitted.
    pub conditional: bool,
}

impl OrderIntent {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Level whose share rounded to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedLevel {
    pub level_index: usize,
    pub side: OrderSide,
    pub price: f64,
    pub raw_quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyPlan {
    pub usable_budget: f64,
    pub per_order_budget: f64,
    pub orders: Vec<OrderIntent>,
    pub skipped: Vec<SkippedLevel>,
    /// Lowest-index and highest-index valid buy prices.
    pub first_price: Option<f64>,
    pub last_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SellPolicy {
    /// Coin on hand, split across sell levels.
    Held { free_base: f64 },
    /// Nothing held: quantity projected from the buys that were placed.
    Projected { expected_quantity: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellPlan {
    pub policy: SellPolicy,
    pub orders: Vec<OrderIntent>,
    pub skipped: Vec<SkippedLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPlan {
    pub per_order_budget: f64,
    pub buys: BuyPlan,
    pub sells: SellPlan,
}

pub struct GridAllocator {
    reserve_fraction: f64,
    levels_per_side: usize,
}

impl GridAllocator {
    pub fn new(settings: &GridSettings) -> Self {
        GridAllocator {
            reserve_fraction: settings.reserve_fraction,
            levels_per_side: settings.levels_per_side,
        }
    }

    /// Positive levels with their recommendation index, capped at `levels_per_side`.
    fn valid_levels<'a>(&self, levels: &'a [f64]) -> impl Iterator<Item = (usize, f64)> + 'a {
        levels
            .iter()
            .copied()
            .enumerate()
            .take(self.levels_per_side)
            .filter(|&(_, price)| price > 0.0 && price.is_finite())
    }

    pub fn plan_buys(&self, rec: &Recommendation, quote_budget: f64, base_asset: &str) -> BuyPlan {
        let usable_budget = (quote_budget * self.reserve_fraction).max(0.0);
        let levels: Vec<(usize, f64)> = self.valid_levels(&rec.buy_levels).collect();
        let per_order_budget = if levels.is_empty() { 0.0 } else { usable_budget / levels.len() as f64 };

        let mut orders = Vec::with_capacity(levels.len());
        let mut skipped = Vec::new();
        let mut spent = 0.0;
        for &(level_index, price) in &levels {
            let raw_quantity = per_order_budget / price;
            let remaining = (usable_budget - spent).max(0.0);
            let quantity = fit_quantity(base_asset, raw_quantity, remaining / price);
            if quantity > 0.0 {
                spent += quantity * price;
                orders.push(OrderIntent { level_index, side: OrderSide::Buy, price, quantity, conditional: false });
            } else {
                skipped.push(SkippedLevel { level_index, side: OrderSide::Buy, price, raw_quantity });
            }
        }

        BuyPlan {
            usable_budget,
            per_order_budget,
            orders,
            skipped,
            first_price: levels.first().map(|&(_, p)| p),
            last_price: levels.last().map(|&(_, p)| p),
        }
    }

    /// Size sells from a post-buy balance snapshot. `buys_placed` is how many
    /// buy orders the exchange accepted.
    pub fn plan_sells(
        &self,
        rec: &Recommendation,
        buys: &BuyPlan,
        buys_placed: usize,
        free_base: f64,
        base_asset: &str,
    ) -> SellPlan {
        let levels: Vec<(usize, f64)> = self.valid_levels(&rec.sell_levels).collect();

        let (policy, total, conditional) = if free_base > 0.0 {
            (SellPolicy::Held { free_base }, free_base, false)
        } else {
            let expected_quantity = match (buys.first_price, buys.last_price) {
                (Some(first), Some(last)) => buys.per_order_budget / average(&[first, last]) * buys_placed as f64,
                _ => 0.0,
            };
            (SellPolicy::Projected { expected_quantity }, expected_quantity, true)
        };

        let share = if levels.is_empty() { 0.0 } else { total / levels.len() as f64 };
        let mut orders = Vec::with_capacity(levels.len());
        let mut skipped = Vec::new();
        for &(level_index, price) in &levels {
            // Only coin on hand bounds the share; projected sells round freely.
            let quantity = match policy {
                SellPolicy::Held { .. } => fit_quantity(base_asset, share, share),
                SellPolicy::Projected { .. } if share > 0.0 && share.is_finite() => round_quantity(base_asset, share),
                SellPolicy::Projected { .. } => 0.0,
            };
            if quantity > 0.0 {
                orders.push(OrderIntent { level_index, side: OrderSide::Sell, price, quantity, conditional });
            } else {
                skipped.push(SkippedLevel { level_index, side: OrderSide::Sell, price, raw_quantity: share });
            }
        }

        SellPlan { policy, orders, skipped }
    }

    /// Whole plan in one step, assuming every planned buy is accepted.
    pub fn build_plan(&self, rec: &Recommendation, quote_budget: f64, free_base: f64, base_asset: &str) -> GridPlan {
        let buys = self.plan_buys(rec, quote_budget, base_asset);
        let sells = self.plan_sells(rec, &buys, buys.orders.len(), free_base, base_asset);
        GridPlan { per_order_budget: buys.per_order_budget, buys, sells }
    }
}

/// Round half-up at the asset's precision. When that would exceed `cap`, round
/// the smaller of the two down at the same precision instead.
fn fit_quantity(base_asset: &str, raw_quantity: f64, cap: f64) -> f64 {
    if !(raw_quantity > 0.0) || !raw_quantity.is_finite() {
        return 0.0;
    }
    let rounded = round_quantity(base_asset, raw_quantity);
    if rounded <= cap {
        return rounded;
    }
    let decimals = quantity_decimals(base_asset, raw_quantity);
    round_down(raw_quantity.min(cap.max(0.0)), decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> GridAllocator {
        GridAllocator::new(&GridSettings::default())
    }

    fn rec(buys: &[f64], sells: &[f64]) -> Recommendation {
        Recommendation { buy_levels: buys.to_vec(), sell_levels: sells.to_vec(), ..Default::default() }
    }

    #[test]
    fn hundred_dollar_budget_at_two_cents() {
        let r = rec(&[0.02, 0.02, 0.02, 0.02, 0.02], &[0.03; 5]);
        let plan = allocator().plan_buys(&r, 100.0, "PEPE");
        assert!((plan.usable_budget - 80.0).abs() < 1e-9);
        assert!((plan.per_order_budget - 16.0).abs() < 1e-9);
        assert_eq!(plan.orders.len(), 5);
        assert!(plan.skipped.is_empty());
        for order in &plan.orders {
            assert!((order.quantity - 800.0).abs() < 1e-9);
            assert!(!order.conditional);
        }
    }

    #[test]
    fn fewer_valid_levels_get_larger_shares() {
        let r = rec(&[0.02, 0.0, 0.019, -1.0], &[]);
        let plan = allocator().plan_buys(&r, 100.0, "PEPE");
        assert!((plan.per_order_budget - 40.0).abs() < 1e-9);
        assert_eq!(plan.orders.iter().map(|o| o.level_index).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn only_levels_per_side_are_considered() {
        let r = rec(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], &[]);
        let plan = allocator().plan_buys(&r, 100.0, "XYZ");
        assert_eq!(plan.orders.len(), 5);
        assert!((plan.per_order_budget - 16.0).abs() < 1e-9);
    }

    #[test]
    fn buy_notional_never_exceeds_usable_budget() {
        let allocator = allocator();
        let ladders: [&[f64]; 5] = [
            &[0.0137],
            &[0.3333, 0.3211],
            &[1.97, 1.93, 1.89],
            &[0.000_017_7, 0.000_017_1, 0.000_016_9, 0.000_016_3],
            &[0.0449, 0.0447, 0.0443, 0.0441, 0.0437],
        ];
        for budget in [7.77, 33.0, 100.0, 1_234.56] {
            for &levels in &ladders {
                for asset in ["PEPE", "SOL", "BTC", "DOGE"] {
                    let plan = allocator.plan_buys(&rec(levels, &[]), budget, asset);
                    let spent: f64 = plan.orders.iter().map(OrderIntent::notional).sum();
                    assert!(spent <= plan.usable_budget + 1e-9, "{} {:?} {}: {} > {}", asset, levels, budget, spent, plan.usable_budget);
                }
            }
        }
    }

    #[test]
    fn buy_levels_round_half_up_while_budget_allows() {
        // 40 / 0.45 = 88.89 and 40 / 0.30 = 133.33 at one decimal.
        let plan = allocator().plan_buys(&rec(&[0.45, 0.30], &[]), 100.0, "XYZ");
        let quantities: Vec<f64> = plan.orders.iter().map(|o| o.quantity).collect();
        assert_eq!(quantities, vec![88.9, 133.3]);
        let spent: f64 = plan.orders.iter().map(OrderIntent::notional).sum();
        assert!(spent <= 80.0);
    }

    #[test]
    fn buy_rounds_down_once_the_running_total_would_overshoot() {
        // 114.29 -> 114.3 fits; 88.89 -> 88.9 would take the grid to 80.01.
        let plan = allocator().plan_buys(&rec(&[0.35, 0.45], &[]), 100.0, "XYZ");
        let quantities: Vec<f64> = plan.orders.iter().map(|o| o.quantity).collect();
        assert_eq!(quantities, vec![114.3, 88.8]);
        let spent: f64 = plan.orders.iter().map(OrderIntent::notional).sum();
        assert!(spent <= plan.usable_budget + 1e-9);
    }

    #[test]
    fn projected_sell_share_rounds_half_up() {
        let r = rec(&[1.0; 5], &[1.1, 1.2, 1.3]);
        let a = allocator();
        let buys = a.plan_buys(&r, 100.0, "XYZ");
        let sells = a.plan_sells(&r, &buys, 5, 0.0, "XYZ");

        // 16 per buy at 1.0, five placed, over three levels: 26.67 each.
        assert!(matches!(sells.policy, SellPolicy::Projected { .. }));
        let quantities: Vec<f64> = sells.orders.iter().map(|o| o.quantity).collect();
        assert_eq!(quantities, vec![26.7, 26.7, 26.7]);
    }

    #[test]
    fn too_small_levels_are_skipped_not_failed() {
        // $0.80 usable over one level at $5 is 0.16 BONK, which rounds to zero.
        let plan = allocator().plan_buys(&rec(&[5.0], &[]), 1.0, "BONK");
        assert!(plan.orders.is_empty());
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].level_index, 0);
    }

    #[test]
    fn held_coin_is_split_across_sell_levels() {
        let r = rec(&[0.02; 5], &[0.022, 0.024, 0.0, 0.026, 0.028]);
        let a = allocator();
        let buys = a.plan_buys(&r, 100.0, "PEPE");
        let sells = a.plan_sells(&r, &buys, 5, 1_000.0, "PEPE");

        assert_eq!(sells.policy, SellPolicy::Held { free_base: 1_000.0 });
        assert_eq!(sells.orders.len(), 4);
        assert!(sells.orders.iter().all(|o| (o.quantity - 250.0).abs() < 1e-9 && !o.conditional));
        assert_eq!(sells.orders.iter().map(|o| o.level_index).collect::<Vec<_>>(), vec![0, 1, 3, 4]);
    }

    #[test]
    fn held_sells_never_exceed_free_balance() {
        let r = rec(&[1.0], &[2.0, 2.1, 2.2]);
        let a = allocator();
        let buys = a.plan_buys(&r, 10.0, "XYZ");
        // 10.0 / 3 = 3.333.. at 2 decimals; half-up of 3.335 shares would overshoot.
        for free in [10.0, 10.005, 0.05] {
            let sells = a.plan_sells(&r, &buys, 1, free, "XYZ");
            let total: f64 = sells.orders.iter().map(|o| o.quantity).sum();
            assert!(total <= free + 1e-9, "{} > {}", total, free);
        }
    }

    #[test]
    fn nothing_held_projects_conditional_sells() {
        let r = rec(&[0.018, 0.019, 0.020, 0.021, 0.022], &[0.023, 0.024, 0.025, 0.026, 0.027]);
        let a = allocator();
        let buys = a.plan_buys(&r, 100.0, "PEPE");
        let sells = a.plan_sells(&r, &buys, 4, 0.0, "PEPE");

        // 16 / avg(0.018, 0.022) = 800 per buy, times 4 placed, over 5 levels.
        match sells.policy {
            SellPolicy::Projected { expected_quantity } => assert!((expected_quantity - 3_200.0).abs() < 1e-6),
            other => panic!("unexpected policy {:?}", other),
        }
        assert_eq!(sells.orders.len(), 5);
        for order in &sells.orders {
            assert!(order.conditional);
            assert!((order.quantity - 640.0).abs() < 1e-9);
        }
    }

    #[test]
    fn no_placed_buys_means_no_projected_sells() {
        let r = rec(&[0.02; 5], &[0.03; 5]);
        let a = allocator();
        let buys = a.plan_buys(&r, 100.0, "PEPE");
        let sells = a.plan_sells(&r, &buys, 0, 0.0, "PEPE");
        assert!(sells.orders.is_empty());
        assert_eq!(sells.skipped.len(), 5);
    }

    #[test]
    fn orders_keep_their_level_positions() {
        let r = rec(&[0.05, 0.04, 0.03, 0.02, 0.01], &[0.06, 0.07, 0.08, 0.09, 0.10]);
        let plan = allocator().build_plan(&r, 50.0, 0.0, "XYZ");
        for (i, order) in plan.buys.orders.iter().enumerate() {
            assert_eq!(order.level_index, i);
            assert_eq!(order.price, r.buy_levels[i]);
        }
        for (i, order) in plan.sells.orders.iter().enumerate() {
            assert_eq!(order.level_index, i);
            assert_eq!(order.price, r.sell_levels[i]);
        }
    }
}
