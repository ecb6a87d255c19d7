// Sequential order submission. Each submission is an externally visible side
// effect, so failures are recorded and never retried.
use std::time::Duration;

use super::PlacedOrder;
use crate::connectors::Trading;
use crate::grid::OrderIntent;

#[derive(Debug, Default)]
pub struct Submission {
    pub placed: Vec<PlacedOrder>,
    pub failed: Vec<(OrderIntent, String)>,
}

pub async fn submit_orders(trading: &dyn Trading, symbol: &str, intents: &[OrderIntent], pause: Duration) -> Submission {
    let mut submission = Submission::default();

    for (i, intent) in intents.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        match trading.place_limit_order(symbol, intent.side, intent.quantity, intent.price).await {
            Ok(order_id) => {
                tracing::info!(
                    symbol,
                    side = %intent.side,
                    level = intent.level_index + 1,
                    quantity = intent.quantity,
                    price = intent.price,
                    notional = intent.notional(),
                    order_id = %order_id,
                    "Order placed"
                );
                submission.placed.push(PlacedOrder { order_id, intent: intent.clone() });
            }
            Err(e) => {
                tracing::warn!(
                    symbol,
                    side = %intent.side,
                    level = intent.level_index + 1,
                    quantity = intent.quantity,
                    price = intent.price,
                    error = %e,
                    "Order rejected"
                );
                submission.failed.push((intent.clone(), e.to_string()));
            }
        }
    }
    submission
}
