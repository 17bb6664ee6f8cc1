pub mod discount;
pub mod pricing;

pub use discount::{assess_gap, DiscountPolicy, GapAssessment};
pub use pricing::{decide, quote, round_price, Decision, PriceQuote, PricingError, PricingPolicy};
