//! Property-based tests for receipt totals and status policy.
//!
//! These tests use proptest to check the arithmetic invariants over a wide
//! range of quantities, prices and fees.

use goods_receipts::{
    models::{sub_total, GoodsReceiptStatus, LineItem, LineItemInput},
    services::lifecycle,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn line_strategy() -> impl Strategy<Value = LineItemInput> {
    (
        prop_oneof!["A", "B", "C", "D"],
        1u32..10_000,
        price_strategy(),
        1u32..50,
        price_strategy(),
    )
        .prop_map(|(product, quantity, price, stack, fee)| {
            LineItemInput::new(product, quantity, price)
                .with_stack(stack)
                .with_fee(fee)
        })
}

fn status_strategy() -> impl Strategy<Value = GoodsReceiptStatus> {
    prop_oneof![
        Just(GoodsReceiptStatus::Draft),
        Just(GoodsReceiptStatus::Received),
        Just(GoodsReceiptStatus::Partial),
        Just(GoodsReceiptStatus::PartialCompleted),
        Just(GoodsReceiptStatus::Cancelled),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn line_total_is_quantity_times_price(input in line_strategy()) {
        let expected = Decimal::from(input.quantity) * input.unit_price;
        let item = LineItem::from_input(input).unwrap();
        prop_assert_eq!(item.total_price, expected);
    }

    #[test]
    fn subtotal_is_sum_of_line_totals_without_fees(inputs in prop::collection::vec(line_strategy(), 0..20)) {
        let items: Vec<LineItem> = inputs
            .into_iter()
            .map(|input| LineItem::from_input(input).unwrap())
            .collect();
        let expected: Decimal = items.iter().map(|i| i.total_price).sum();
        prop_assert_eq!(sub_total(&items).unwrap(), expected);
    }

    #[test]
    fn removing_a_line_lowers_subtotal_by_its_total(
        inputs in prop::collection::vec(line_strategy(), 1..20),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut items: Vec<LineItem> = inputs
            .into_iter()
            .map(|input| LineItem::from_input(input).unwrap())
            .collect();
        let before = sub_total(&items).unwrap();
        let removed = items.remove(pick.index(items.len()));
        prop_assert_eq!(sub_total(&items).unwrap(), before - removed.total_price);
    }

    #[test]
    fn only_drafts_expose_edit_and_approve(status in status_strategy()) {
        let actions = lifecycle::actions_for(status);
        prop_assert!(actions.view);
        prop_assert_eq!(actions.edit, status == GoodsReceiptStatus::Draft);
        prop_assert_eq!(actions.approve, status == GoodsReceiptStatus::Draft);
    }
}
