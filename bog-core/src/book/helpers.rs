//! Zero-allocation fixed-point helpers on raw price/size arrays: VWAP,
//! imbalance, spread. Kept free of any particular book representation so
//! both the live [`crate::book::Book`] and tests can use them directly.

use crate::core::types::fixed_point::SCALE;

#[inline]
pub fn vwap_u64(prices: &[u64], sizes: &[u64], max_levels: usize) -> Option<u64> {
    let max_levels = max_levels.min(prices.len().min(sizes.len()));

    let mut total_value: u128 = 0;
    let mut total_size: u128 = 0;

    for i in 0..max_levels {
        let size = sizes[i];
        if size == 0 {
            break;
        }
        total_value += prices[i] as u128 * size as u128;
        total_size += size as u128;
    }

    if total_size == 0 {
        return None;
    }

    Some((total_value / total_size) as u64)
}

/// Imbalance in `[-SCALE, +SCALE]`: `+SCALE` is 100% bid pressure.
#[inline]
pub fn imbalance(bid_sizes: &[u64], ask_sizes: &[u64], max_levels: usize) -> i64 {
    let max_levels = max_levels.min(bid_sizes.len().min(ask_sizes.len()));

    let mut bid_volume: u128 = 0;
    let mut ask_volume: u128 = 0;
    for i in 0..max_levels {
        bid_volume += bid_sizes[i] as u128;
        ask_volume += ask_sizes[i] as u128;
    }

    let total = bid_volume + ask_volume;
    if total == 0 {
        return 0;
    }

    let numerator = bid_volume as i128 - ask_volume as i128;
    ((numerator * SCALE as i128) / total as i128) as i64
}

#[inline(always)]
pub fn spread_bps_from_prices(bid_price: u64, ask_price: u64) -> u32 {
    if bid_price == 0 || ask_price <= bid_price {
        return 0;
    }
    let spread = ask_price - bid_price;
    ((spread as u128 * 10_000) / bid_price as u128) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vwap_weights_by_size() {
        let prices = [100, 90];
        let sizes = [1, 3];
        // (100*1 + 90*3) / 4 = 92
        assert_eq!(vwap_u64(&prices, &sizes, 2), Some(92));
    }

    #[test]
    fn vwap_none_when_no_liquidity() {
        assert_eq!(vwap_u64(&[100], &[0], 1), None);
    }

    #[test]
    fn imbalance_all_bid_is_full_scale() {
        assert_eq!(imbalance(&[10], &[0], 1), SCALE);
    }

    #[test]
    fn imbalance_balanced_is_zero() {
        assert_eq!(imbalance(&[10], &[10], 1), 0);
    }

    #[test]
    fn spread_bps_basic() {
        // 10 / 50_000 * 10_000 = 2 bps
        assert_eq!(spread_bps_from_prices(50_000, 50_010), 2);
    }
}
