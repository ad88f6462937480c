mod client;
pub mod collector_api;
pub mod ofrep_api;

pub use client::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use collector_api::{CollectorApi, DataCollectorResponse, DATA_COLLECTOR_PATH, PROVIDER_METADATA};
pub use ofrep_api::{
    BulkEvaluation, BulkEvaluationResponse, EvaluationResponseFlag, OfrepApi, BULK_EVALUATION_PATH,
};
