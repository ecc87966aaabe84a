//! Order pricing using rust_decimal
//!
//! Totals are computed from the persisted menu only. The `priceChange` a
//! client echoes inside its selection is never trusted.

use rust_decimal::prelude::*;
use shared::models::MenuItem;

use super::specs::SelectionMap;

/// Rounding for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Base price plus the delta of every selected option.
///
/// Selections naming a specification or option the item does not have
/// contribute zero.
pub fn unit_price(item: &MenuItem, selection: &SelectionMap) -> Decimal {
    selection
        .iter()
        .filter_map(|(spec_name, option)| item.find_option(spec_name, &option.name))
        .fold(item.price, |acc, opt| acc + opt.price_change)
}

/// Σ quantity × unit price, rounded to cents
pub fn order_total<'a>(lines: impl IntoIterator<Item = (&'a MenuItem, i32, &'a SelectionMap)>) -> Decimal {
    lines
        .into_iter()
        .fold(Decimal::ZERO, |acc, (item, quantity, selection)| {
            acc + unit_price(item, selection) * Decimal::from(quantity)
        })
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{SelectedOption, SpecOption, Specification};

    fn latte() -> MenuItem {
        MenuItem {
            id: 10,
            merchant_id: 1,
            name: "Latte".into(),
            price: Decimal::from(26),
            original_price: None,
            description: None,
            image_url: None,
            is_available: true,
            specifications: vec![
                Specification {
                    id: 1,
                    name: "milk".into(),
                    options: vec![SpecOption {
                        id: 1,
                        name: "extra milk".into(),
                        price_change: Decimal::from(5),
                    }],
                },
                Specification {
                    id: 2,
                    name: "size".into(),
                    options: vec![SpecOption {
                        id: 2,
                        name: "small".into(),
                        price_change: Decimal::new(-25, 1),
                    }],
                },
            ],
        }
    }

    fn select(spec: &str, option: &str, echoed: i64) -> SelectionMap {
        let mut map = SelectionMap::new();
        map.insert(
            spec.into(),
            SelectedOption {
                id: None,
                name: option.into(),
                price_change: Some(Decimal::from(echoed)),
            },
        );
        map
    }

    #[test]
    fn two_lattes_with_extra_milk() {
        let item = latte();
        let selection = select("milk", "extra milk", 5);
        assert_eq!(order_total([(&item, 2, &selection)]), Decimal::from(62));
    }

    #[test]
    fn echoed_price_change_is_ignored() {
        let item = latte();
        let selection = select("milk", "extra milk", 500);
        assert_eq!(unit_price(&item, &selection), Decimal::from(31));
    }

    #[test]
    fn unknown_names_cost_nothing() {
        let item = latte();
        assert_eq!(unit_price(&item, &select("milk", "oat", 3)), Decimal::from(26));
        assert_eq!(unit_price(&item, &select("syrup", "vanilla", 3)), Decimal::from(26));
        assert_eq!(unit_price(&item, &SelectionMap::new()), Decimal::from(26));
    }

    #[test]
    fn negative_deltas_and_mixed_lines() {
        let item = latte();
        let small = select("size", "small", 0);
        let plain = SelectionMap::new();
        // 3 × 23.50 + 1 × 26
        assert_eq!(
            order_total([(&item, 3, &small), (&item, 1, &plain)]),
            Decimal::new(9650, 2)
        );
    }

    #[test]
    fn line_order_does_not_change_the_total() {
        let item = latte();
        let small = select("size", "small", 0);
        let plain = SelectionMap::new();
        let extra = select("milk", "extra milk", 0);
        let lines = [(3, &small), (1, &plain), (2, &extra)];
        // 3 × 23.50 + 1 × 26 + 2 × 31
        let expected = Decimal::new(15850, 2);

        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let total = order_total(order.iter().map(|&i| (&item, lines[i].0, lines[i].1)));
            assert_eq!(total, expected, "line order {order:?}");
        }
    }
}
