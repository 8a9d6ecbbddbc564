//! HTTP transport
//!
//! A single JSON endpoint over the evaluator:
//!
//! - `POST /api/analyze_health_data` - assess one reading
//! - `GET  /health` - liveness probe
//!
//! The evaluator is built before the listener starts and shared read-only
//! between requests.

use crate::config::ServerConfig;
use crate::error::AssessError;
use crate::evaluator::RiskEvaluator;
use crate::forest::AnomalyClassifier;
use crate::types::{AssessmentResult, Reading};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, info_span};
use uuid::Uuid;

/// Route of the assessment endpoint
pub const ANALYZE_ROUTE: &str = "/api/analyze_health_data";

/// Error body returned as `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<AssessError> for ApiError {
    fn from(e: AssessError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "Request failed");
        } else {
            debug!(status = %self.status, error = %self.message, "Request rejected");
        }

        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Build the router around a shared evaluator
pub fn create_router<C>(evaluator: Arc<RiskEvaluator<C>>) -> Router
where
    C: AnomalyClassifier + 'static,
{
    Router::new()
        .route(ANALYZE_ROUTE, post(analyze_health_data::<C>))
        .route("/health", get(health))
        .with_state(evaluator)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            info_span!(
                "request",
                request_id = %Uuid::new_v4(),
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
}

/// Bind to `config` and serve until the process is stopped
pub async fn serve<C>(config: &ServerConfig, evaluator: Arc<RiskEvaluator<C>>) -> std::io::Result<()>
where
    C: AnomalyClassifier + 'static,
{
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(address = %listener.local_addr()?, "Server listening");
    axum::serve(listener, create_router(evaluator)).await
}

async fn analyze_health_data<C>(
    State(evaluator): State<Arc<RiskEvaluator<C>>>,
    payload: Result<Json<Reading>, JsonRejection>,
) -> Result<Json<AssessmentResult>, ApiError>
where
    C: AnomalyClassifier + 'static,
{
    let Json(reading) = payload?;
    let result = evaluator.evaluate(&reading)?;
    Ok(Json(result))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": crate::SERVICE_NAME,
        "version": crate::VERSION,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Verdict, Vitals};
    use axum::body::{to_bytes, Body};
    use axum::http::header::CONTENT_TYPE;
    use tower::ServiceExt;

    struct Fixed(Verdict);

    impl AnomalyClassifier for Fixed {
        fn predict(&self, _vitals: &Vitals) -> Verdict {
            self.0
        }
    }

    fn app() -> Router {
        create_router(Arc::new(RiskEvaluator::new(Fixed(Verdict::Anomalous))))
    }

    async fn post_json(body: &str) -> (StatusCode, serde_json::Value) {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri(ANALYZE_ROUTE)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let (status, body) = post_json(r#"{"heart_rate": 80, "blood_oxygen": 85}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_anomaly"], true);
        assert_eq!(body["risk_score"], 60.0);
        assert_eq!(
            body["recommendations"][0],
            "URGENT: Immediate medical attention required"
        );
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_analyze_missing_metric() {
        let (status, body) = post_json(r#"{"heart_rate": 80}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required health metrics");

        let (status, body) = post_json(r#"{"heart_rate": 0, "blood_oxygen": 97}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required health metrics");
    }

    #[tokio::test]
    async fn test_analyze_malformed_body() {
        let (status, body) = post_json("not valid json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_health() {
        let request = axum::http::Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
