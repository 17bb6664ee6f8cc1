use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::pricing::round_price;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Minimum gap between the best offer and the floor, in percent.
    pub need_diff_percent: Decimal,
    /// Collections with a floor above this are never flagged.
    pub max_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapAssessment {
    pub floor: Decimal,
    pub max_offer_price: Decimal,
    pub diff_percent: Decimal,
    pub comfort_price: Decimal,
    pub qualifies: bool,
}

impl GapAssessment {
    /// Price that cheaply re-enters above the best competitor.
    pub fn undercut_price(&self, price_step: Decimal) -> Decimal {
        round_price(self.max_offer_price + price_step)
    }
}

/// Measures how far the best competing offer sits below the floor.
/// Returns `None` for a non-positive floor, where the gap is undefined.
pub fn assess_gap(
    floor: Decimal,
    max_offer_price: Decimal,
    policy: &DiscountPolicy,
    price_step: Decimal,
) -> Option<GapAssessment> {
    if floor <= Decimal::ZERO {
        return None;
    }

    let max_offer_price = round_price(max_offer_price);
    let ratio = (max_offer_price + price_step).checked_div(floor)?;
    let diff_percent = round_price(dec!(100) - ratio * dec!(100));
    let comfort_price = round_price(floor - floor * (policy.need_diff_percent / dec!(100)));
    let qualifies = diff_percent > policy.need_diff_percent && floor <= policy.max_price;

    Some(GapAssessment {
        floor,
        max_offer_price,
        diff_percent,
        comfort_price,
        qualifies,
    })
}
