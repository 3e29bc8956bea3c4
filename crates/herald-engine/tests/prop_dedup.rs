//! Property-based tests for deduplication and offset normalisation.

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use herald_engine::{dedup_occurrences, DayOffsets, Occurrence};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Small uid and hour pools so duplicates are common.
fn arb_occurrence() -> impl Strategy<Value = Occurrence> {
    (0usize..4, 0i64..6, "[a-z]{0,6}").prop_map(|(uid, hour, summary)| Occurrence {
        uid: format!("uid-{}", uid),
        summary,
        start_instant: Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap() + Duration::hours(hour),
        location: None,
        description: None,
        raw_rule: None,
    })
}

fn arb_offset_input() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            (-5i64..25).prop_map(|n| n.to_string()),
            "[a-z]{1,3}",
            Just(String::new()),
        ],
        0..8,
    )
    .prop_map(|parts| parts.join(","))
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn dedup_is_idempotent(input in prop::collection::vec(arb_occurrence(), 0..30)) {
        let once = dedup_occurrences(input);
        let twice = dedup_occurrences(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn dedup_leaves_unique_keys_in_first_seen_order(input in prop::collection::vec(arb_occurrence(), 0..30)) {
        let result = dedup_occurrences(input.clone());

        let mut seen = HashSet::new();
        let expected: Vec<_> = input
            .into_iter()
            .filter(|o| seen.insert(o.key()))
            .collect();
        prop_assert_eq!(result, expected);
    }

    #[test]
    fn offsets_always_normalised(raw in arb_offset_input()) {
        let offsets = DayOffsets::normalize(&raw);
        let values = offsets.as_slice();

        prop_assert!(!values.is_empty());
        prop_assert!(values.len() <= 4);
        prop_assert!(values.iter().all(|v| *v <= 15));
        prop_assert!(values.windows(2).all(|w| w[0] < w[1]), "not strictly ascending: {:?}", values);
    }
}
