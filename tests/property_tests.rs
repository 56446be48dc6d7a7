use proptest::prelude::*;
use serde_json::json;
use tui_snapshot_dash::config::AppConfig;
use tui_snapshot_dash::internal::coverage::coverage_percentage;
use tui_snapshot_dash::internal::models::TestSuite;
use tui_snapshot_dash::internal::state::KeyPathStore;
use tui_snapshot_dash::utils::datetime::{date_axis, parse_snapshot_date};

fn key_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,4}", 1..4).prop_map(|segments| segments.join("."))
}

proptest! {
    #[test]
    fn test_set_then_get_returns_value(path in key_path(), value in any::<i64>()) {
        let store = KeyPathStore::new();
        store.set(&path, value);
        prop_assert_eq!(store.get(&path), Some(json!(value)));
    }

    #[test]
    fn test_later_write_wins(path in key_path(), first in "[a-z]*", second in "[a-z]*") {
        let store = KeyPathStore::new();
        store.set(&path, first);
        store.set(&path, second.clone());
        prop_assert_eq!(store.get_str(&path), Some(second));
    }

    #[test]
    fn test_coverage_is_a_percentage(
        steps in prop::collection::vec((any::<bool>(), prop::sample::select(vec!["passed", "failed", "skipped"])), 0..40)
    ) {
        let steps: Vec<_> = steps
            .into_iter()
            .map(|(disabled, status)| json!({"disabled": disabled, "statusCode": status}))
            .collect();
        let suite: TestSuite = serde_json::from_value(json!({
            "testSuiteName": "DEV",
            "testCases": [{"testSteps": steps}]
        }))
        .unwrap();

        let pct = coverage_percentage(&suite);
        prop_assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn test_date_axis_length_and_order(days in 0usize..120, offset in 0i64..3000) {
        let end = parse_snapshot_date("2020-01-01").unwrap()
            .checked_add(jiff::Span::new().days(offset))
            .unwrap();
        let axis = date_axis(end, days);
        prop_assert_eq!(axis.len(), days);
        prop_assert!(axis.windows(2).all(|w| w[0] < w[1]));
        if days > 0 {
            prop_assert_eq!(axis.last().copied(), Some(end));
        }
    }

    #[test]
    fn test_parse_snapshot_date_no_panic(s in "\\PC*") {
        let _ = parse_snapshot_date(&s);
    }

    #[test]
    fn test_config_parse_no_panic(s in "\\PC*") {
        let _ = AppConfig::from_ron(&s);
    }
}
