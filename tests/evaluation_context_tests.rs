use ofrep_provider::{EvaluationContext, FlagValue};
use serde_json::json;
use std::collections::HashMap;

#[test]
fn test_empty_context() {
    let context = EvaluationContext::new();

    assert!(context.targeting_key.is_none());
    assert!(context.attributes.is_empty());
    assert!(context.is_empty());
    assert!(!context.is_anonymous());
}

#[test]
fn test_context_with_targeting_key() {
    let context = EvaluationContext::with_targeting_key("user-123");

    assert_eq!(context.targeting_key.as_deref(), Some("user-123"));
    assert!(!context.is_empty());
}

#[test]
fn test_context_chained_methods() {
    let context = EvaluationContext::new()
        .targeting_key("user-456")
        .attribute("role", "admin")
        .attribute("count", 10_i32);

    assert_eq!(context.targeting_key.as_deref(), Some("user-456"));
    assert_eq!(context.get("role"), Some(&FlagValue::String("admin".into())));
    assert_eq!(context.get("count"), Some(&FlagValue::Integer(10)));
}

#[test]
fn test_context_with_attributes() {
    let mut attrs = HashMap::new();
    attrs.insert("key1".to_string(), FlagValue::String("value1".to_string()));
    attrs.insert("key2".to_string(), FlagValue::Bool(false));

    let context = EvaluationContext::new().attributes(attrs);

    assert_eq!(context.attributes.len(), 2);
    assert!(context.targeting_key.is_none());
}

#[test]
fn test_anonymous_flag() {
    assert!(EvaluationContext::new().attribute("anonymous", true).is_anonymous());
    assert!(!EvaluationContext::new().attribute("anonymous", false).is_anonymous());
    assert!(!EvaluationContext::new().attribute("anonymous", "yes").is_anonymous());
}

#[test]
fn test_serializes_flat_for_ofrep() {
    let context = EvaluationContext::with_targeting_key("user-1")
        .attribute("email", "john.doe@example.com")
        .attribute("age", 42_i64);

    let value = serde_json::to_value(&context).unwrap();
    assert_eq!(
        value,
        json!({"targetingKey": "user-1", "email": "john.doe@example.com", "age": 42})
    );
}

#[test]
fn test_missing_targeting_key_is_omitted() {
    let context = EvaluationContext::new().attribute("anonymous", true);
    let value = serde_json::to_value(&context).unwrap();
    assert_eq!(value, json!({"anonymous": true}));
}

#[test]
fn test_deserialize_round_trip() {
    let context: EvaluationContext =
        serde_json::from_value(json!({"targetingKey": "k", "plan": "pro"})).unwrap();

    assert_eq!(context.targeting_key.as_deref(), Some("k"));
    assert_eq!(context.get("plan").and_then(FlagValue::as_str), Some("pro"));
    assert!(context.get("targetingKey").is_none());
}
