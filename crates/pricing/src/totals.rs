//! Net/VAT/gross aggregation over offer line items.

use serde::{Deserialize, Serialize};

use tilbud_core::Money;
use tilbud_offers::LineItem;

/// Norwegian MVA rate applied to offer totals, in percent.
pub const VAT_RATE_PERCENT: u64 = 25;

/// Aggregated amounts for a set of line items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub net: Money,
    pub vat: Money,
    pub gross: Money,
    /// Number of line rows (not quantity-weighted).
    pub item_count: usize,
    /// Sum of line quantities.
    pub unit_count: i64,
}

/// Compute net, VAT and gross totals for a sequence of line items.
///
/// Pure and deterministic: equal inputs give identical outputs. Amounts are
/// accumulated left-to-right in integer øre; VAT is rounded once, on the
/// final net amount. Items are assumed validated (`quantity >= 1`); that is
/// the aggregate's job, not this function's.
pub fn compute_totals(items: &[LineItem]) -> Totals {
    let mut net = Money::ZERO;
    let mut unit_count: i64 = 0;

    for item in items {
        let quantity = u64::try_from(item.quantity).unwrap_or(0);
        net = net.saturating_add(item.unit_price.times(quantity));
        unit_count += item.quantity;
    }

    let vat = vat_of(net);

    Totals {
        net,
        vat,
        gross: net.saturating_add(vat),
        item_count: items.len(),
        unit_count,
    }
}

/// VAT on a net amount, rounded half-up at øre precision.
pub fn vat_of(net: Money) -> Money {
    let ore = net
        .as_ore()
        .saturating_mul(VAT_RATE_PERCENT)
        .saturating_add(50)
        / 100;
    Money::from_ore(ore)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use tilbud_core::AggregateId;
    use tilbud_offers::{LineItem, LineItemId};

    fn line(unit_price_ore: u64, quantity: i64) -> LineItem {
        LineItem {
            id: LineItemId::new(AggregateId::new()),
            line_no: 0,
            template_id: None,
            name: "Linje".to_string(),
            unit_price: Money::from_ore(unit_price_ore),
            quantity,
        }
    }

    #[test]
    fn totals_for_known_items() {
        // 100 kr x 2 + 50.50 kr x 1 = 250.50 net; 25% VAT rounds 62.625 up to 62.63.
        let items = vec![line(10_000, 2), line(5_050, 1)];

        let totals = compute_totals(&items);
        assert_eq!(totals.net, Money::from_ore(25_050));
        assert_eq!(totals.vat, Money::from_ore(6_263));
        assert_eq!(totals.gross, Money::from_ore(31_313));
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.unit_count, 3);
    }

    #[test]
    fn empty_items_give_all_zero() {
        let totals = compute_totals(&[]);
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn vat_rounds_half_up() {
        // 0.02 kr net -> 0.005 kr VAT -> 1 øre.
        assert_eq!(vat_of(Money::from_ore(2)), Money::from_ore(1));
        assert_eq!(vat_of(Money::from_ore(1)), Money::from_ore(0));
        assert_eq!(vat_of(Money::from_ore(4)), Money::from_ore(1));
        assert_eq!(vat_of(Money::ZERO), Money::ZERO);
    }

    #[test]
    fn zero_priced_lines_count_but_cost_nothing() {
        let items = vec![line(0, 5)];
        let totals = compute_totals(&items);
        assert_eq!(totals.net, Money::ZERO);
        assert_eq!(totals.item_count, 1);
        assert_eq!(totals.unit_count, 5);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: gross is exactly net plus VAT, never off by rounding.
        #[test]
        fn gross_equals_net_plus_vat(
            lines in prop::collection::vec((0u64..10_000_000u64, 1i64..1_000i64), 0..20)
        ) {
            let items: Vec<LineItem> = lines
                .iter()
                .map(|&(price, qty)| line(price, qty))
                .collect();

            let totals = compute_totals(&items);
            prop_assert_eq!(totals.gross, totals.net.saturating_add(totals.vat));
        }

        /// Property: net is additive over concatenation of item sequences.
        #[test]
        fn net_is_additive(
            first in prop::collection::vec((0u64..10_000_000u64, 1i64..1_000i64), 0..10),
            second in prop::collection::vec((0u64..10_000_000u64, 1i64..1_000i64), 0..10)
        ) {
            let a: Vec<LineItem> = first.iter().map(|&(p, q)| line(p, q)).collect();
            let b: Vec<LineItem> = second.iter().map(|&(p, q)| line(p, q)).collect();
            let mut combined = a.clone();
            combined.extend(b.iter().cloned());

            let totals_a = compute_totals(&a);
            let totals_b = compute_totals(&b);
            let totals_combined = compute_totals(&combined);

            prop_assert_eq!(
                totals_combined.net,
                totals_a.net.saturating_add(totals_b.net)
            );
            prop_assert_eq!(totals_combined.unit_count, totals_a.unit_count + totals_b.unit_count);
            prop_assert_eq!(totals_combined.item_count, totals_a.item_count + totals_b.item_count);
        }

        /// Property: computing twice over the same input is bit-identical.
        #[test]
        fn compute_is_idempotent(
            lines in prop::collection::vec((0u64..10_000_000u64, 1i64..1_000i64), 0..20)
        ) {
            let items: Vec<LineItem> = lines
                .iter()
                .map(|&(price, qty)| line(price, qty))
                .collect();

            prop_assert_eq!(compute_totals(&items), compute_totals(&items));
        }
    }
}
