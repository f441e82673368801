//! Property-based tests for cart arithmetic, paging and money display.

use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_api::storefront::{
    browse::{paginate, PAGE_SIZE},
    money::{format_brl, parse_brl},
    Cart, CartItem, ShippingPolicy,
};
use uuid::Uuid;

fn line(id: Uuid, cents: u32, quantity: u32) -> CartItem {
    CartItem {
        product_id: id,
        name: "Produto".into(),
        price: Decimal::new(i64::from(cents), 2),
        image: None,
        quantity,
        shipping: None,
    }
}

proptest! {
    #[test]
    fn repeated_adds_merge_into_one_line(quantities in prop::collection::vec(1u32..50, 1..10)) {
        let id = Uuid::new_v4();
        let mut cart = Cart::default();
        for q in &quantities {
            cart.add(line(id, 1000, *q));
        }
        prop_assert_eq!(cart.items().len(), 1);
        prop_assert_eq!(cart.total_items(), quantities.iter().sum::<u32>());
    }

    #[test]
    fn total_is_sum_of_lines_without_shipping(lines in prop::collection::vec((1u32..100_000, 1u32..20), 0..8)) {
        let mut cart = Cart::new(ShippingPolicy::PerLine);
        let mut expected = Decimal::ZERO;
        for (cents, q) in &lines {
            cart.add(line(Uuid::new_v4(), *cents, *q));
            expected += Decimal::new(i64::from(*cents), 2) * Decimal::from(*q);
        }
        prop_assert_eq!(cart.total_price(), expected);
    }

    #[test]
    fn set_quantity_never_drops_below_one(q in 0u32..10) {
        let id = Uuid::new_v4();
        let mut cart = Cart::default();
        cart.add(line(id, 500, 3));
        cart.set_quantity(id, q);
        prop_assert_eq!(cart.items()[0].quantity, q.max(1));
    }

    #[test]
    fn pages_cover_every_item_once(len in 0usize..40, size in 1usize..10) {
        let items: Vec<usize> = (0..len).collect();
        let first = paginate(&items, 1, size);
        let mut seen = Vec::new();
        for page in 1..=first.total_pages {
            seen.extend(paginate(&items, page, size).items);
        }
        prop_assert_eq!(seen, items);
        prop_assert!(first.total_pages >= 1);
    }

    #[test]
    fn out_of_range_pages_are_clamped(len in 0usize..40, page in 0usize..100) {
        let items: Vec<usize> = (0..len).collect();
        let shown = paginate(&items, page, PAGE_SIZE);
        prop_assert!(shown.page >= 1 && shown.page <= shown.total_pages);
        prop_assert!(shown.items.len() <= PAGE_SIZE);
    }

    #[test]
    fn formatted_amounts_parse_back(cents in 0i64..1_000_000_000) {
        let amount = Decimal::new(cents, 2);
        prop_assert_eq!(parse_brl(&format_brl(amount)), Some(amount));
    }
}
