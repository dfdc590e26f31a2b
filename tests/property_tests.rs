//! Property-based tests for the pure arithmetic behind the order
//! lifecycle: the adjustment calculus that reconciles a revised item list
//! against committed stock, and the period window resolution.
//!
//! The helpers at the bottom mirror the production logic so the properties
//! stay fast and database-free.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;

// Strategies

fn quantity_strategy() -> impl Strategy<Value = i32> {
    0i32..50
}

fn line_set_strategy() -> impl Strategy<Value = Vec<(u8, i32)>> {
    // Product ids drawn from a tiny space so previous/revised sets overlap.
    prop::collection::vec((0u8..6, quantity_strategy()), 0..6)
}

fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    // 2000-01-01 .. ~2065
    (946_684_800i64..3_000_000_000).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

// Properties: adjustment calculus

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Whenever the pre-check passes, applying the deltas leaves every
    /// counter non-negative.
    #[test]
    fn validated_adjustments_never_drive_stock_negative(
        previous in line_set_strategy(),
        revised in line_set_strategy(),
        base_stock in 0i32..100,
    ) {
        let previous = dedupe(previous);
        let revised = dedupe(revised);

        // Stock as it stands after the previous quantities were consumed.
        let stock: HashMap<u8, i32> = (0u8..6).map(|p| (p, base_stock)).collect();

        let adjustments = compute_adjustments(&previous, &revised);
        if validate(&stock, &adjustments) {
            let after = apply(&stock, &adjustments);
            for (product, remaining) in &after {
                prop_assert!(
                    *remaining >= 0,
                    "product {} went negative: {}",
                    product,
                    remaining
                );
            }
        }
    }

    /// The pre-check rejects exactly the batches whose application would
    /// go negative.
    #[test]
    fn validation_agrees_with_application(
        previous in line_set_strategy(),
        revised in line_set_strategy(),
        base_stock in 0i32..20,
    ) {
        let previous = dedupe(previous);
        let revised = dedupe(revised);
        let stock: HashMap<u8, i32> = (0u8..6).map(|p| (p, base_stock)).collect();

        let adjustments = compute_adjustments(&previous, &revised);
        let after = apply(&stock, &adjustments);
        let any_negative = after.values().any(|remaining| *remaining < 0);

        prop_assert_eq!(validate(&stock, &adjustments), !any_negative);
    }

    /// Revising back to the committed quantities is a no-op on stock.
    #[test]
    fn identity_revision_moves_nothing(previous in line_set_strategy()) {
        let previous = dedupe(previous);
        let revised: Vec<(u8, i32)> = previous.iter().map(|(p, q)| (*p, *q)).collect();

        let adjustments = compute_adjustments(&previous, &revised);
        prop_assert!(adjustments.is_empty(), "got {:?}", adjustments);
    }

    /// Dropping every line returns exactly what was consumed.
    #[test]
    fn empty_revision_returns_all_consumed_units(previous in line_set_strategy()) {
        let previous = dedupe(previous);
        let adjustments = compute_adjustments(&previous, &[]);

        for (product, quantity) in &previous {
            if *quantity != 0 {
                let adjustment = adjustments
                    .iter()
                    .find(|(p, _)| p == product)
                    .map(|(_, a)| *a);
                prop_assert_eq!(adjustment, Some(-quantity));
            }
        }
    }

    /// Adjustments conserve units: consumed minus returned equals the net
    /// difference of the two item lists.
    #[test]
    fn adjustments_conserve_units(
        previous in line_set_strategy(),
        revised in line_set_strategy(),
    ) {
        let previous = dedupe(previous);
        let revised = dedupe(revised);

        let net: i32 = compute_adjustments(&previous, &revised)
            .iter()
            .map(|(_, adjustment)| adjustment)
            .sum();
        let revised_total: i32 = revised.iter().map(|(_, q)| q).sum();
        let previous_total: i32 = previous.iter().map(|(_, q)| q).sum();

        prop_assert_eq!(net, revised_total - previous_total);
    }
}

// Properties: period windows

proptest! {
    #[test]
    fn bounded_windows_are_well_ordered(now in instant_strategy()) {
        for days in [0i64, 1, 7, 30, 90, 365] {
            let (start, end) = bounded_window(now, days);
            prop_assert!(start < end);
            // Day-aligned on both sides.
            prop_assert_eq!(start.time(), chrono::NaiveTime::MIN);
            prop_assert_eq!(end.time(), chrono::NaiveTime::MIN);
        }
    }

    #[test]
    fn todays_window_contains_now(now in instant_strategy()) {
        let (start, end) = bounded_window(now, 0);
        prop_assert!(start <= now && now < end);
    }

    #[test]
    fn lookback_windows_contain_todays(now in instant_strategy()) {
        let (today_start, today_end) = bounded_window(now, 0);
        for days in [7i64, 30, 90, 365] {
            let (start, end) = bounded_window(now, days);
            prop_assert!(start <= today_start);
            prop_assert_eq!(end, today_end);
        }
    }
}

// Helper functions (mirror the production logic)

fn dedupe(lines: Vec<(u8, i32)>) -> Vec<(u8, i32)> {
    let mut seen = HashMap::new();
    for (product, quantity) in lines {
        seen.entry(product).or_insert(quantity);
    }
    let mut out: Vec<(u8, i32)> = seen.into_iter().collect();
    out.sort();
    out
}

fn compute_adjustments(previous: &[(u8, i32)], revised: &[(u8, i32)]) -> Vec<(u8, i32)> {
    let previous_map: HashMap<u8, i32> = previous.iter().copied().collect();
    let revised_ids: Vec<u8> = revised.iter().map(|(p, _)| *p).collect();

    let mut adjustments = Vec::new();
    for (product, quantity) in revised {
        let before = previous_map.get(product).copied().unwrap_or(0);
        let adjustment = quantity - before;
        if adjustment != 0 {
            adjustments.push((*product, adjustment));
        }
    }
    for (product, before) in previous {
        if !revised_ids.contains(product) && *before != 0 {
            adjustments.push((*product, -before));
        }
    }
    adjustments
}

fn validate(stock: &HashMap<u8, i32>, adjustments: &[(u8, i32)]) -> bool {
    adjustments.iter().all(|(product, adjustment)| {
        stock.get(product).copied().unwrap_or(0) - adjustment >= 0
    })
}

fn apply(stock: &HashMap<u8, i32>, adjustments: &[(u8, i32)]) -> HashMap<u8, i32> {
    let mut after = stock.clone();
    for (product, adjustment) in adjustments {
        *after.entry(*product).or_insert(0) -= adjustment;
    }
    after
}

fn day_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()
}

fn bounded_window(now: DateTime<Utc>, lookback_days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day_start(now) - Duration::days(lookback_days);
    let end = day_start(now) + Duration::days(1);
    (start, end)
}
