//! Shared proptest generators for gateway client tests.

use proptest::prelude::*;
use serde_json::{Map, Value};
use std::time::Duration;

/// Generate capability names as gateways register them.
pub fn capability_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{2,30}"
}

/// Generate caller identities: emails, service accounts and opaque ids.
pub fn identity_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9._%+-]{1,20}@[a-z0-9-]{2,15}\\.[a-z]{2,4}",
        "[a-z][a-z0-9-]{2,20}".prop_map(|name| format!("svc:{name}")),
        "[a-f0-9]{32}",
    ]
}

/// Generate scalar JSON argument values.
pub fn argument_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,30}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Generate invocation argument maps with up to five entries.
pub fn arguments_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z][a-z0-9_]{0,15}", argument_value_strategy(), 0..5)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Generate HTTP error status codes.
pub fn http_error_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(400u16),
        Just(401u16),
        Just(403u16),
        Just(404u16),
        Just(422u16),
        Just(429u16),
        Just(500u16),
        Just(502u16),
        Just(503u16),
        Just(504u16),
    ]
}

/// Generate per-invocation timeouts (100ms to 30s).
pub fn timeout_strategy() -> impl Strategy<Value = Duration> {
    (100u64..30_000).prop_map(Duration::from_millis)
}

/// Generate circuit failure thresholds.
pub fn failure_threshold_strategy() -> impl Strategy<Value = u32> {
    1u32..20
}
