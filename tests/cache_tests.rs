use ofrep_provider::{CachedFlag, ErrorCode, FlagCache, FlagValue};
use std::collections::HashMap;

fn flags(entries: Vec<CachedFlag>) -> HashMap<String, CachedFlag> {
    entries.into_iter().map(|f| (f.key.clone(), f)).collect()
}

#[test]
fn test_cached_flag_builder() {
    let flag = CachedFlag::new("checkout", FlagValue::String("v2".into()))
        .variant("new-flow")
        .reason("TARGETING_MATCH");

    assert_eq!(flag.key, "checkout");
    assert_eq!(flag.variant.as_deref(), Some("new-flow"));
    assert_eq!(flag.reason.as_deref(), Some("TARGETING_MATCH"));
    assert!(!flag.is_error());
}

#[test]
fn test_cached_flag_error() {
    let flag = CachedFlag::new("broken", FlagValue::Null)
        .error(ErrorCode::ParseError, Some("bad rule".to_string()));

    assert!(flag.is_error());
    assert_eq!(flag.error_code, Some(ErrorCode::ParseError));
}

#[test]
fn test_clones_share_snapshot() {
    let cache = FlagCache::new();
    let reader = cache.clone();

    cache.replace(flags(vec![CachedFlag::new("a", FlagValue::Bool(true))]));

    assert!(reader.has("a"));
    assert_eq!(reader.len(), 1);
}

#[test]
fn test_replace_with_empty_snapshot_clears() {
    let cache = FlagCache::new();
    cache.replace(flags(vec![
        CachedFlag::new("a", FlagValue::Integer(1)),
        CachedFlag::new("b", FlagValue::Integer(2)),
    ]));

    cache.replace(HashMap::new());

    assert!(cache.is_empty());
    assert!(cache.lookup("a").is_none());
}

#[test]
fn test_keys() {
    let cache = FlagCache::new();
    cache.replace(flags(vec![
        CachedFlag::new("a", FlagValue::Integer(1)),
        CachedFlag::new("b", FlagValue::Integer(2)),
    ]));

    let mut keys = cache.keys();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
}
