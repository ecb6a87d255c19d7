// Order quantity precision per base asset.
use shared::utils::round_half_up;

/// Known lot precisions, checked before the magnitude fallback.
const ASSET_DECIMALS: [(&str, u32); 10] = [
    ("BTC", 6),
    ("ETH", 6),
    ("BNB", 6),
    ("ADA", 2),
    ("DOT", 2),
    ("LINK", 2),
    ("SOL", 2),
    ("DOGE", 0),
    ("SHIB", 0),
    ("BONK", 0),
];

/// Magnitude brackets for unlisted assets: raw quantity at or above the bound
/// gets that many decimals, anything smaller gets `FALLBACK_MIN_DECIMALS`.
const MAGNITUDE_DECIMALS: [(f64, u32); 2] = [(1_000.0, 0), (10.0, 1)];
const FALLBACK_MIN_DECIMALS: u32 = 2;

pub fn quantity_decimals(base_asset: &str, raw_quantity: f64) -> u32 {
    if let Some(&(_, decimals)) = ASSET_DECIMALS.iter().find(|&&(asset, _)| asset == base_asset) {
        return decimals;
    }
    MAGNITUDE_DECIMALS
        .iter()
        .find(|&&(bound, _)| raw_quantity >= bound)
        .map_or(FALLBACK_MIN_DECIMALS, |&(_, decimals)| decimals)
}

/// Half-up rounding at the asset's precision.
pub fn round_quantity(base_asset: &str, raw_quantity: f64) -> f64 {
    round_half_up(raw_quantity, quantity_decimals(base_asset, raw_quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_assets_use_their_own_precision() {
        assert_eq!(quantity_decimals("BTC", 0.0012345), 6);
        assert_eq!(round_quantity("BTC", 0.0012346), 0.001235);
        assert_eq!(round_quantity("SOL", 1.005_1), 1.01);
        assert_eq!(round_quantity("DOGE", 12.5), 13.0);
        assert_eq!(round_quantity("BONK", 0.4), 0.0);
    }

    #[test]
    fn fallback_brackets_by_raw_magnitude() {
        assert_eq!(quantity_decimals("PEPE", 1_000.0), 0);
        assert_eq!(quantity_decimals("PEPE", 999.9), 1);
        assert_eq!(quantity_decimals("PEPE", 10.0), 1);
        assert_eq!(quantity_decimals("PEPE", 9.99), 2);
        assert_eq!(round_quantity("PEPE", 800.0), 800.0);
        assert_eq!(round_quantity("PEPE", 1_234.5), 1_235.0);
        assert_eq!(round_quantity("PEPE", 0.004), 0.0);
        assert_eq!(round_quantity("PEPE", 0.005), 0.01);
    }

    #[test]
    fn rounding_is_idempotent() {
        for (asset, raw) in [("BTC", 0.123_456_78), ("PEPE", 1_234.56), ("PEPE", 56.78), ("XYZ", 3.14159), ("DOT", 7.777)] {
            let once = round_quantity(asset, raw);
            let decimals = quantity_decimals(asset, raw);
            assert_eq!(round_half_up(once, decimals), once, "{} {}", asset, raw);
        }
    }
}
