use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "service": env!("CARGO_PKG_NAME"),
    }))
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Telegram Aggregator API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
