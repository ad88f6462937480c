#![allow(dead_code)]

use async_trait::async_trait;
use ofrep_provider::http::{BULK_EVALUATION_PATH, DATA_COLLECTOR_PATH};
use ofrep_provider::{
    HttpRequest, HttpResponse, Provider, ProviderOptions, ReadinessState, Result, Transport,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

pub const ENDPOINT: &str = "http://relay.test";

/// In-memory transport with a queue of canned responses per endpoint.
///
/// Bulk evaluations with nothing queued answer 500. Collector posts with
/// nothing queued answer 200 and report every event as ingested. A held
/// evaluation is not answered until its `Notify` fires.
#[derive(Default)]
pub struct ScriptedTransport {
    evaluations: Mutex<VecDeque<(HttpResponse, Option<Arc<Notify>>)>>,
    collections: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_evaluate(&self, response: HttpResponse) -> &Self {
        self.evaluations.lock().push_back((response, None));
        self
    }

    /// Queues a response that is only delivered once the returned handle is notified.
    pub fn on_evaluate_held(&self, response: HttpResponse) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        self.evaluations
            .lock()
            .push_back((response, Some(Arc::clone(&release))));
        release
    }

    pub fn on_collect(&self, response: HttpResponse) -> &Self {
        self.collections.lock().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn evaluate_requests(&self) -> Vec<HttpRequest> {
        self.requests_to(BULK_EVALUATION_PATH)
    }

    pub fn collect_requests(&self) -> Vec<HttpRequest> {
        self.requests_to(DATA_COLLECTOR_PATH)
    }

    fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request.clone());

        if request.url.ends_with(DATA_COLLECTOR_PATH) {
            if let Some(response) = self.collections.lock().pop_front() {
                return Ok(response);
            }
            let body: serde_json::Value =
                serde_json::from_slice(request.body.as_deref().unwrap_or_default())
                    .unwrap_or_default();
            let count = body["events"].as_array().map_or(0, Vec::len);
            return Ok(json_response(
                200,
                &serde_json::json!({ "ingestedContentCount": count }),
            ));
        }

        let next = self.evaluations.lock().pop_front();
        match next {
            Some((response, Some(release))) => {
                release.notified().await;
                Ok(response)
            }
            Some((response, None)) => Ok(response),
            None => Ok(HttpResponse::new(500)),
        }
    }
}

pub fn json_response(status: u16, body: &serde_json::Value) -> HttpResponse {
    HttpResponse::new(status).with_body(serde_json::to_vec(body).unwrap())
}

/// A 200 bulk evaluation carrying `flags`.
pub fn flags_response(flags: serde_json::Value) -> HttpResponse {
    json_response(200, &serde_json::json!({ "flags": flags }))
}

pub fn options() -> ProviderOptions {
    ProviderOptions::builder(ENDPOINT)
        .poll_interval(Duration::from_secs(60))
        .poll_jitter(Duration::ZERO)
        .data_collector_interval(Duration::ZERO)
        .build()
}

pub fn provider(transport: &Arc<ScriptedTransport>, options: ProviderOptions) -> Provider {
    let transport: Arc<dyn Transport> = transport.clone();
    Provider::with_transport(options, transport).unwrap()
}

/// Everything emitted on `rx` so far.
pub fn drain(rx: &mut broadcast::Receiver<ReadinessState>) -> Vec<ReadinessState> {
    let mut states = Vec::new();
    while let Ok(state) = rx.try_recv() {
        states.push(state);
    }
    states
}
