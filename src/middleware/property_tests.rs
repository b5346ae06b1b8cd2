//! Property-Based Tests for key derivation and lifetime selection

use proptest::prelude::*;
use std::time::Duration;

use axum::http::{Request, StatusCode, Uri};

use crate::middleware::{CacheKey, LifetimePolicy};

// == Strategies ==
fn path_strategy() -> impl Strategy<Value = String> {
    "(/[a-zA-Z0-9_.~-]{0,12}){1,4}"
}

fn query_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,6}=[a-zA-Z0-9]{0,8}(&[a-z]{1,6}=[a-zA-Z0-9]{0,8}){0,3}"
}

fn uri(path: &str, query: Option<&str>) -> Uri {
    match query {
        Some(query) => format!("{}?{}", path, query).parse().unwrap(),
        None => path.parse().unwrap(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Requests with identical URLs always share a key, whatever else differs.
    #[test]
    fn prop_key_determinism(
        path in path_strategy(),
        query in prop::option::of(query_strategy()),
        method in prop::sample::select(vec!["GET", "HEAD", "POST", "PUT"]),
        header_value in "[a-z]{0,10}"
    ) {
        let target = uri(&path, query.as_deref());
        let plain = Request::get(target.clone()).body(()).unwrap();
        let other = Request::builder()
            .method(method)
            .uri(target)
            .header("x-trace", header_value)
            .body(())
            .unwrap();

        let key = CacheKey::from_request(&plain);
        prop_assert_eq!(&key, &CacheKey::from_request(&other));
        prop_assert_eq!(key.as_str().len(), CacheKey::LEN);
    }

    // Distinct URLs, including query-only differences, get distinct keys.
    #[test]
    fn prop_key_separation(
        path in path_strategy(),
        query_a in query_strategy(),
        query_b in query_strategy()
    ) {
        prop_assume!(query_a != query_b);

        let bare = CacheKey::from_uri(&uri(&path, None));
        let a = CacheKey::from_uri(&uri(&path, Some(&query_a)));
        let b = CacheKey::from_uri(&uri(&path, Some(&query_b)));

        prop_assert_ne!(&a, &b);
        prop_assert_ne!(&bare, &a);
        prop_assert_ne!(&bare, &b);
    }

    // Status < 400 selects the success lifetime, everything else the negative one.
    #[test]
    fn prop_lifetime_selection(
        status in 100u16..=599,
        success_ms in 1u64..1_000_000,
        negative_ms in 1u64..1_000_000
    ) {
        let status = StatusCode::from_u16(status).unwrap();
        let success = Duration::from_millis(success_ms);
        let negative = Duration::from_millis(negative_ms);
        let policy = LifetimePolicy::new(success, negative);

        let expected = if status.as_u16() < 400 { success } else { negative };
        prop_assert_eq!(policy.lifetime_for(status), Some(expected));
    }

    // Non-positive configured seconds never reach the store as a lifetime.
    #[test]
    fn prop_non_positive_lifetime_disables(
        status in 100u16..=599,
        secs in i64::MIN..=0
    ) {
        let status = StatusCode::from_u16(status).unwrap();
        let policy = LifetimePolicy::from_secs(secs, secs);

        prop_assert_eq!(policy.lifetime_for(status), None);
    }
}
