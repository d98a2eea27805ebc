// tests/property/policy_test.rs

//! Property-based tests for policy resolution and argument-count checks

use proptest::prelude::*;
use serde_json::{Value, json};
use spineldb_admin::core::Policy;
use spineldb_admin::core::commands::command_spec::FUNCTIONS;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_any_non_negative_integer_timeout_resolves(ms in any::<u64>()) {
        let policy = Policy::resolve(&json!({ "timeout": ms })).unwrap();
        if ms == 0 {
            prop_assert_eq!(policy.timeout, None);
        } else {
            prop_assert_eq!(policy.timeout, Some(Duration::from_millis(ms)));
        }
    }

    #[test]
    fn test_negative_timeout_is_rejected(ms in i64::MIN..0i64) {
        let err = Policy::resolve(&json!({ "timeout": ms })).unwrap_err();
        prop_assert_eq!(err.code(), -2);
        prop_assert_eq!(err.msg(), "timeout is invalid");
    }

    #[test]
    fn test_fractional_timeout_is_rejected(ms in 0.0f64..1.0e9, frac in 0.01f64..0.99) {
        let value = ms.trunc() + frac;
        let err = Policy::resolve(&json!({ "timeout": value })).unwrap_err();
        prop_assert_eq!(err.msg(), "timeout is invalid");
    }

    #[test]
    fn test_unknown_keys_are_ignored(key in "[a-z_]{1,16}", value in any::<i32>()) {
        prop_assume!(key != "timeout");
        let mut raw = serde_json::Map::new();
        raw.insert(key, json!(value));
        let policy = Policy::resolve(&Value::Object(raw)).unwrap();
        prop_assert_eq!(policy, Policy::default());
    }

    #[test]
    fn test_non_mapping_policy_is_rejected(
        raw in prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            ".{0,20}".prop_map(Value::from),
            prop::collection::vec(any::<u32>(), 0..4).prop_map(|v| json!(v)),
        ]
    ) {
        let err = Policy::resolve(&raw).unwrap_err();
        prop_assert_eq!(err.msg(), "policy must be a dict");
    }

    #[test]
    fn test_arity_check_accepts_exactly_the_declared_range(
        index in 0..FUNCTIONS.len(),
        given in 0usize..10,
    ) {
        let spec = &FUNCTIONS[index];
        let result = spec.check_arity(given);
        let in_range = given >= spec.required && given <= spec.params.len();
        prop_assert_eq!(result.is_ok(), in_range);
        if given < spec.required {
            let msg = result.unwrap_err().to_string();
            prop_assert!(msg.starts_with("Required argument"));
            let expected = format!("'{}' (pos {})", spec.params[given], given + 1);
            prop_assert!(msg.contains(&expected));
        } else if given > spec.params.len() {
            let msg = result.unwrap_err().to_string();
            let expected = format!("({} given)", given);
            prop_assert!(msg.ends_with(&expected));
        }
    }
}
