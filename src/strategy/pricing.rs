use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::market::OfferSnapshot;

/// Rounds to cents, half away from zero.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub include_commission: bool,
    pub commission_rate: Decimal,
    pub price_step: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            include_commission: false,
            commission_rate: dec!(0.05),
            price_step: dec!(0.01),
        }
    }
}

impl PricingPolicy {
    /// Highest price worth paying: floor minus commission (if any) minus one step.
    pub fn ceiling(&self, floor: Decimal) -> Decimal {
        let commission = if self.include_commission {
            floor * self.commission_rate
        } else {
            Decimal::ZERO
        };

        round_price(floor - commission - self.price_step)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("collection {0} has no competing offers")]
    NoCompetitors(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub floor: Decimal,
    pub ceiling: Decimal,
    pub competitor_max: Decimal,
    pub target: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NoAction {
        quote: PriceQuote,
    },
    Update {
        offer_id: String,
        current: Decimal,
        quote: PriceQuote,
    },
    /// The operator no longer holds an offer in this collection.
    Stop,
}

impl Decision {
    pub fn target_price(&self) -> Option<Decimal> {
        match self {
            Decision::NoAction { quote } | Decision::Update { quote, .. } => Some(quote.target),
            Decision::Stop => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::NoAction { quote } => write!(f, "HOLD @ {}", quote.target),
            Decision::Update {
                current, quote, ..
            } => write!(f, "UPDATE {} -> {}", current, quote.target),
            Decision::Stop => write!(f, "STOP"),
        }
    }
}

/// Computes the target price one step above the best competitor, capped by the ceiling.
pub fn quote(
    floor: Decimal,
    competitor_max: Decimal,
    policy: &PricingPolicy,
) -> PriceQuote {
    let ceiling = policy.ceiling(floor);
    let competitor_max = round_price(competitor_max);

    let target = if competitor_max < ceiling {
        round_price(competitor_max + policy.price_step)
    } else {
        ceiling
    };

    PriceQuote {
        floor,
        ceiling,
        competitor_max,
        target,
    }
}

/// Pure pricing decision for one collection snapshot.
pub fn decide(
    snapshot: &OfferSnapshot,
    operator_id: i64,
    policy: &PricingPolicy,
) -> Result<Decision, PricingError> {
    let Some(own) = snapshot.own_offer(operator_id) else {
        return Ok(Decision::Stop);
    };

    let competitor_max = snapshot
        .max_competitor_amount(operator_id)
        .ok_or_else(|| PricingError::NoCompetitors(snapshot.collection_id.clone()))?;

    let floor = snapshot
        .floor_price()
        .unwrap_or(own.collection.floor_price);
    let quote = quote(floor, competitor_max, policy);
    let current = round_price(own.amount);

    if current == quote.target {
        Ok(Decision::NoAction { quote })
    } else {
        Ok(Decision::Update {
            offer_id: own.id.clone(),
            current,
            quote,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::snapshot::tests::offer;

    const ME: i64 = 7;

    fn snapshot(own: Option<Decimal>, competitors: &[Decimal], floor: Decimal) -> OfferSnapshot {
        let mut offers: Vec<_> = competitors
            .iter()
            .enumerate()
            .map(|(i, amount)| offer(&format!("c{}", i), 100 + i as i64, *amount, floor))
            .collect();
        if let Some(amount) = own {
            offers.push(offer("mine", ME, amount, floor));
        }
        OfferSnapshot::new("col", offers)
    }

    #[test]
    fn test_no_own_offer_stops() {
        let snap = snapshot(None, &[dec!(90), dec!(95)], dec!(100));
        assert_eq!(decide(&snap, ME, &PricingPolicy::default()), Ok(Decision::Stop));

        let empty = OfferSnapshot::new("col", vec![]);
        assert_eq!(decide(&empty, ME, &PricingPolicy::default()), Ok(Decision::Stop));
    }

    #[test]
    fn test_outbids_best_competitor_by_one_step() {
        let snap = snapshot(Some(dec!(80)), &[dec!(90), dec!(95)], dec!(100));

        let decision = decide(&snap, ME, &PricingPolicy::default()).unwrap();
        match decision {
            Decision::Update {
                offer_id,
                current,
                quote,
            } => {
                assert_eq!(offer_id, "mine");
                assert_eq!(current, dec!(80));
                assert_eq!(quote.ceiling, dec!(99.99));
                assert_eq!(quote.competitor_max, dec!(95));
                assert_eq!(quote.target, dec!(95.01));
            }
            other => panic!("expected update, got {}", other),
        }
    }

    #[test]
    fn test_capped_at_ceiling() {
        let snap = snapshot(Some(dec!(50)), &[dec!(99.99)], dec!(100));
        let decision = decide(&snap, ME, &PricingPolicy::default()).unwrap();
        assert_eq!(decision.target_price(), Some(dec!(99.99)));

        let above = snapshot(Some(dec!(50)), &[dec!(120)], dec!(100));
        let decision = decide(&above, ME, &PricingPolicy::default()).unwrap();
        assert_eq!(decision.target_price(), Some(dec!(99.99)));
    }

    #[test]
    fn test_commission_lowers_ceiling() {
        let policy = PricingPolicy {
            include_commission: true,
            ..PricingPolicy::default()
        };
        assert_eq!(policy.ceiling(dec!(100)), dec!(94.99));

        let snap = snapshot(Some(dec!(50)), &[dec!(95)], dec!(100));
        let decision = decide(&snap, ME, &policy).unwrap();
        assert_eq!(decision.target_price(), Some(dec!(94.99)));
    }

    #[test]
    fn test_matching_price_is_no_action() {
        let snap = snapshot(Some(dec!(95.01)), &[dec!(90), dec!(95)], dec!(100));
        let decision = decide(&snap, ME, &PricingPolicy::default()).unwrap();
        assert!(matches!(decision, Decision::NoAction { .. }));
    }

    #[test]
    fn test_applying_update_converges() {
        let policy = PricingPolicy::default();
        let snap = snapshot(Some(dec!(60)), &[dec!(70.333)], dec!(80));

        let first = decide(&snap, ME, &policy).unwrap();
        assert_eq!(first, decide(&snap, ME, &policy).unwrap());

        let target = first.target_price().unwrap();
        assert_eq!(target, dec!(70.34));

        let updated = snapshot(Some(target), &[dec!(70.333)], dec!(80));
        assert!(matches!(
            decide(&updated, ME, &policy).unwrap(),
            Decision::NoAction { .. }
        ));
    }

    #[test]
    fn test_alone_in_collection_is_error() {
        let snap = snapshot(Some(dec!(10)), &[], dec!(100));
        assert_eq!(
            decide(&snap, ME, &PricingPolicy::default()),
            Err(PricingError::NoCompetitors("col".to_string()))
        );
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        assert_eq!(round_price(dec!(1.005)), dec!(1.01));
        assert_eq!(round_price(dec!(1.004)), dec!(1.00));
        assert_eq!(round_price(dec!(2)), dec!(2.00));
    }
}
