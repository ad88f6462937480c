//! OFREP provider lab
//!
//! Verification script that drives the provider against an in-memory relay.
//! Run with: cargo run --example sdk-lab

use async_trait::async_trait;
use ofrep_provider::http::DATA_COLLECTOR_PATH;
use ofrep_provider::{
    EvaluationContext, FlagValue, HttpRequest, HttpResponse, Provider, ProviderOptions,
    ReadinessState, Transport,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const PASS: &str = "\x1b[32m[PASS]\x1b[0m";
const FAIL: &str = "\x1b[31m[FAIL]\x1b[0m";

/// Answers bulk evaluations with a fixed flag set and accepts every batch.
#[derive(Default)]
struct LabRelay {
    collected: Mutex<usize>,
}

#[async_trait]
impl Transport for LabRelay {
    async fn execute(&self, request: HttpRequest) -> ofrep_provider::Result<HttpResponse> {
        if request.url.ends_with(DATA_COLLECTOR_PATH) {
            let body: serde_json::Value =
                serde_json::from_slice(request.body.as_deref().unwrap_or_default())
                    .unwrap_or_default();
            let count = body["events"].as_array().map_or(0, Vec::len);
            *self.collected.lock() += count;
            return Ok(HttpResponse::new(200)
                .with_body(format!(r#"{{"ingestedContentCount":{}}}"#, count)));
        }

        let flags = serde_json::json!({
            "flags": [
                {"key": "lab-bool", "value": true, "reason": "STATIC", "variant": "on"},
                {"key": "lab-string", "value": "Hello Lab", "reason": "STATIC"},
                {"key": "lab-number", "value": 42, "reason": "STATIC"},
                {"key": "lab-json", "value": {"nested": true, "count": 100}, "reason": "STATIC"}
            ]
        });
        Ok(HttpResponse::new(200)
            .with_header("ETag", "\"lab\"")
            .with_body(flags.to_string()))
    }
}

#[tokio::main]
async fn main() {
    println!("=== OFREP Provider Lab ===\n");

    let mut passed = 0;
    let mut failed = 0;

    macro_rules! pass {
        ($test:expr) => {{
            println!("{} {}", PASS, $test);
            passed += 1;
        }};
    }

    macro_rules! fail {
        ($test:expr) => {{
            println!("{} {}", FAIL, $test);
            failed += 1;
        }};
    }

    println!("Testing initialization...");
    let relay = Arc::new(LabRelay::default());
    let options = ProviderOptions::builder("http://lab.local")
        .poll_interval(Duration::from_secs(60))
        .data_collector_interval(Duration::from_secs(600))
        .exporter_metadata("lab", true)
        .build();

    let transport: Arc<dyn Transport> = relay.clone();
    let provider = match Provider::with_transport(options, transport) {
        Ok(p) => p,
        Err(e) => {
            fail!(format!("Provider creation - {}", e));
            print_summary(passed, failed);
            std::process::exit(1);
        }
    };
    let mut lifecycle = provider.observe();

    let context = EvaluationContext::with_targeting_key("lab-user-123").attribute("plan", "premium");
    match provider.initialize(context).await {
        Ok(()) if provider.status() == ReadinessState::Ready => pass!("initialize()"),
        Ok(()) => fail!(format!("initialize() - status {}", provider.status())),
        Err(e) => fail!(format!("initialize() - {}", e)),
    }

    println!("\nTesting flag evaluation...");
    let bool_value = provider.get_boolean_evaluation("lab-bool", false);
    if bool_value.value && bool_value.variant.as_deref() == Some("on") {
        pass!("Boolean flag evaluation");
    } else {
        fail!(format!("Boolean flag - got {:?}", bool_value));
    }

    let string_value = provider.get_string_evaluation("lab-string", "");
    if string_value.value == "Hello Lab" {
        pass!("String flag evaluation");
    } else {
        fail!(format!("String flag - got '{}'", string_value.value));
    }

    let number_value = provider.get_double_evaluation("lab-number", 0.0);
    if (number_value.value - 42.0).abs() < f64::EPSILON {
        pass!("Number flag evaluation");
    } else {
        fail!(format!("Number flag - expected 42, got {}", number_value.value));
    }

    let json_value = provider.get_object_evaluation("lab-json", FlagValue::Null);
    match json_value.value.as_map() {
        Some(map) if map.get("nested") == Some(&FlagValue::Bool(true)) => {
            pass!("Object flag evaluation")
        }
        _ => fail!(format!("Object flag - unexpected value: {:?}", json_value.value)),
    }

    let missing = provider.get_boolean_evaluation("non-existent", true);
    if missing.value && missing.is_error() {
        pass!("Default value for missing flag");
    } else {
        fail!(format!("Missing flag - got {:?}", missing));
    }

    println!("\nTesting context change...");
    let old = provider.context();
    match provider
        .on_context_changed(Some(&old), EvaluationContext::with_targeting_key("lab-user-456"))
        .await
    {
        Ok(()) if provider.status() == ReadinessState::Ready => pass!("on_context_changed()"),
        other => fail!(format!("on_context_changed() - {:?}", other.err())),
    }

    let mut seen = Vec::new();
    while let Ok(state) = lifecycle.try_recv() {
        seen.push(state);
    }
    if seen == [ReadinessState::Ready, ReadinessState::Stale, ReadinessState::Ready] {
        pass!("Lifecycle events");
    } else {
        fail!(format!("Lifecycle events - got {:?}", seen));
    }

    println!("\nTesting usage collection...");
    let pending = provider.pending_events();
    match provider.flush_events().await {
        Ok(n) if n == pending && *relay.collected.lock() == pending => pass!("flush_events()"),
        Ok(n) => fail!(format!("flush_events() - {} of {} ingested", n, pending)),
        Err(e) => fail!(format!("flush_events() - {}", e)),
    }

    println!("\nTesting cleanup...");
    provider.shutdown().await;
    if provider.is_polling() {
        fail!("shutdown() - still polling");
    } else {
        pass!("shutdown()");
    }

    print_summary(passed, failed);

    if failed > 0 {
        println!("\n\x1b[31mSome verifications failed!\x1b[0m");
        std::process::exit(1);
    } else {
        println!("\n\x1b[32mAll verifications passed!\x1b[0m");
        std::process::exit(0);
    }
}

fn print_summary(passed: i32, failed: i32) {
    println!("\n{}", "=".repeat(40));
    println!("Results: {} passed, {} failed", passed, failed);
    println!("{}", "=".repeat(40));
}
