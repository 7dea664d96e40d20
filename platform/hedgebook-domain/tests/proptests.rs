use hedgebook_domain::services::consolidation::{consolidate, ConsolidationOptions};
use hedgebook_domain::value_objects::deal::{Deal, DealType, EntryType};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const PREFIX: &str = "AT-0010";

fn arb_deal() -> impl Strategy<Value = Deal> {
    (
        prop::option::of(prop::sample::select(vec!["P1", "P2", "P3"])),
        prop::option::of(prop::sample::select(vec!["O1", "O2"])),
        prop::option::of(prop::sample::select(vec!["D1", "D2", "D3", "D4"])),
        prop::sample::select(vec![
            EntryType::In,
            EntryType::Out,
            EntryType::Other("DEAL_ENTRY_INOUT".to_string()),
            EntryType::Unknown,
        ]),
        prop::sample::select(vec![DealType::Buy, DealType::Sell]),
        0u32..10_000,
        prop::option::of(0.0f64..10.0),
        prop::option::of(0.5f64..2_000.0),
        prop::option::of(-500.0f64..500.0),
        prop::sample::select(vec!["DEAL_REASON_CLIENT", "DEAL_REASON_SL", "DEAL_REASON_TP", ""]),
    )
        .prop_map(
            |(position, order, id, entry_type, deal_type, minute, volume, price, profit, reason)| {
                Deal {
                    position_id: position.map(str::to_string),
                    order_id: order.map(str::to_string),
                    id: id.map(str::to_string),
                    entry_type,
                    deal_type,
                    time: Some(format!(
                        "2025-09-{:02}T{:02}:{:02}:00Z",
                        1 + minute / 1440,
                        (minute / 60) % 24,
                        minute % 60
                    )),
                    symbol: Some("EURUSD".to_string()),
                    volume,
                    price,
                    profit,
                    reason: Some(reason.to_string()),
                    ..Deal::default()
                }
            },
        )
}

fn filtered_keys(deals: &[Deal]) -> BTreeSet<String> {
    deals
        .iter()
        .filter(|deal| deal.entry_type.is_trade_leg())
        .filter_map(|deal| deal.position_key().map(str::to_string))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn every_record_maps_back_to_an_input_position(deals in prop::collection::vec(arb_deal(), 0..40)) {
        let records = consolidate(&deals, &ConsolidationOptions::new(PREFIX));
        let expected = filtered_keys(&deals);
        let produced: BTreeSet<String> = records
            .iter()
            .map(|record| {
                record
                    .external_key
                    .strip_prefix(&format!("{PREFIX}-"))
                    .expect("prefixed key")
                    .to_string()
            })
            .collect();
        prop_assert_eq!(records.len(), produced.len());
        prop_assert_eq!(produced, expected);
    }

    #[test]
    fn total_profit_sums_every_leg_of_the_group(deals in prop::collection::vec(arb_deal(), 0..40)) {
        let records = consolidate(&deals, &ConsolidationOptions::new(PREFIX));
        let mut sums: BTreeMap<String, f64> = BTreeMap::new();
        for deal in deals.iter().filter(|deal| deal.entry_type.is_trade_leg()) {
            if let Some(key) = deal.position_key() {
                *sums.entry(key.to_string()).or_default() += deal.profit.unwrap_or(0.0);
            }
        }
        for record in &records {
            let expected = sums.get(&record.position_key).copied().unwrap_or(f64::NAN);
            prop_assert!((record.total_profit - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn aggregates_are_stable_under_reordering(
        deals in prop::collection::vec(arb_deal(), 1..30),
        seed in any::<u64>(),
    ) {
        let mut shuffled = deals.clone();
        let len = shuffled.len();
        let mut state = seed | 1;
        for idx in (1..len).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            shuffled.swap(idx, (state % (idx as u64 + 1)) as usize);
        }

        let original = consolidate(&deals, &ConsolidationOptions::new(PREFIX));
        let reordered = consolidate(&shuffled, &ConsolidationOptions::new(PREFIX));
        prop_assert_eq!(original.len(), reordered.len());
        for (a, b) in original.iter().zip(reordered.iter()) {
            prop_assert_eq!(&a.position_key, &b.position_key);
            prop_assert!((a.total_profit - b.total_profit).abs() < 1e-6);
            match (a.weighted_close_price, b.weighted_close_price) {
                (Some(x), Some(y)) => prop_assert!((x - y).abs() < 1e-6),
                (x, y) => prop_assert_eq!(x, y),
            }
            prop_assert_eq!(a.close_time, b.close_time);
        }
    }

    #[test]
    fn positions_without_exits_have_no_close_fields(deals in prop::collection::vec(arb_deal(), 0..40)) {
        let records = consolidate(&deals, &ConsolidationOptions::new(PREFIX));
        for record in records.iter().filter(|record| record.close_source.is_none()) {
            prop_assert!(record.close_price.is_none());
            prop_assert!(record.close_time.is_none());
            prop_assert!(record.outcome.is_none());
        }
    }
}
