/**
 * Logs Route Handler
 * Frontend log batches, re-emitted through tracing
 */
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use tower_http::request_id::RequestId;

use crate::logging::config::{ClientLogBatch, ClientLogEntry, LogLevel, LogResponse};

/// POST /api/logs
#[tracing::instrument(skip_all, fields(batch_size = batch.logs.len()))]
pub async fn receive_client_logs(
    request_id: Option<Extension<RequestId>>,
    Json(batch): Json<ClientLogBatch>,
) -> impl IntoResponse {
    let req_id = request_id
        .as_ref()
        .and_then(|ext| ext.0.header_value().to_str().ok())
        .unwrap_or("unknown");

    let processed = batch
        .logs
        .iter()
        .filter(|entry| match emit(entry, req_id) {
            Ok(()) => true,
            Err(level) => {
                tracing::debug!(request_id = %req_id, level = %level, "unknown client log level");
                false
            }
        })
        .count();

    let received = batch.logs.len();
    (
        StatusCode::ACCEPTED,
        Json(LogResponse {
            success: true,
            received,
            processed,
            error: (processed < received)
                .then(|| format!("{} entries had an unknown level", received - processed)),
        }),
    )
}

/// Re-emits `entry` at its own level. Returns the raw level when it is unknown.
fn emit<'a>(entry: &'a ClientLogEntry, request_id: &str) -> Result<(), &'a str> {
    let level = LogLevel::parse(&entry.level).ok_or(entry.level.as_str())?;

    let span = tracing::info_span!(
        "client_log",
        request_id = %request_id,
        timestamp = %entry.timestamp,
        source = "client",
    );
    let _enter = span.enter();

    let message = entry.message.as_str();
    let context = &entry.context;
    let metadata = &entry.metadata;
    match level {
        LogLevel::Trace => tracing::trace!(client_message = %message, ?context, ?metadata, "client log"),
        LogLevel::Debug => tracing::debug!(client_message = %message, ?context, ?metadata, "client log"),
        LogLevel::Info => tracing::info!(client_message = %message, ?context, ?metadata, "client log"),
        LogLevel::Warn => tracing::warn!(client_message = %message, ?context, ?metadata, "client log"),
        LogLevel::Error => tracing::error!(client_message = %message, ?context, ?metadata, "client log"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::logging::config::LogResponse;
    use crate::test_support::{body_json, test_app};
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_levels_count_as_unprocessed() {
        let app = test_app().await;
        let body = serde_json::json!({
            "logs": [
                { "timestamp": "2026-01-01T00:00:00Z", "level": "warn", "message": "slow image" },
                { "timestamp": "2026-01-01T00:00:01Z", "level": "shout", "message": "??" }
            ]
        });
        let req = Request::builder()
            .method("POST")
            .uri("/api/logs")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        let parsed: LogResponse = body_json(res).await;
        assert_eq!(parsed.received, 2);
        assert_eq!(parsed.processed, 1);
        assert!(parsed.error.is_some());
    }
}
