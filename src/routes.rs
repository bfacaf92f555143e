use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::AppError;
use crate::mail::ReportMailer;
use crate::scorecard::pdf::PdfRenderer;
use crate::scorecard::AssessmentSubmission;

#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<AtomicBool>,
    pub metrics: PrometheusHandle,
    pub renderer: Arc<PdfRenderer>,
    pub mailer: Arc<dyn ReportMailer>,
}

#[derive(Debug, Serialize)]
pub struct GenerateReportResponse {
    pub message: String,
}

/// Assembles the service router. The CORS layer answers `OPTIONS` preflight
/// requests with permissive headers so browser front ends can post directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/generate-pdf", post(generate_pdf_endpoint))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Decode, render, deliver. Decode failures map to 400; render and delivery
/// failures to 500. The artifact guard drops inside the blocking task, so the
/// file is removed on every exit path, delivery failure included.
pub(crate) async fn generate_pdf_endpoint(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateReportResponse>, AppError> {
    let submission: AssessmentSubmission =
        serde_json::from_slice(&body).map_err(AppError::Decode)?;

    info!(
        recipient = %submission.email,
        score = submission.score,
        categories = submission.category_scores.len(),
        recommendations = submission.recommendations.len(),
        "rendering scorecard report"
    );

    let renderer = state.renderer.clone();
    let mailer = state.mailer.clone();
    tokio::task::spawn_blocking(move || -> Result<(), AppError> {
        let report = renderer.render(&submission)?;
        mailer.deliver(&submission.email, &report)?;
        Ok(())
    })
    .await??;

    Ok(Json(GenerateReportResponse {
        message: "PDF generated and emailed successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::DeliveryError;
    use crate::scorecard::pdf::RenderedReport;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum_prometheus::PrometheusMetricLayer;
    use std::sync::atomic::AtomicUsize;
    use std::sync::OnceLock;
    use tower::ServiceExt;

    fn metrics_handle() -> PrometheusHandle {
        static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
        HANDLE
            .get_or_init(|| PrometheusMetricLayer::pair().1)
            .clone()
    }

    #[derive(Default)]
    struct CountingMailer {
        deliveries: AtomicUsize,
    }

    impl ReportMailer for CountingMailer {
        fn deliver(&self, _recipient: &str, report: &RenderedReport) -> Result<(), DeliveryError> {
            assert!(report.path().exists(), "artifact must exist at delivery");
            self.deliveries.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn test_state(mailer: Arc<dyn ReportMailer>, output_dir: &std::path::Path) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(true)),
            metrics: metrics_handle(),
            renderer: Arc::new(PdfRenderer::new(output_dir)),
            mailer,
        }
    }

    #[tokio::test]
    async fn malformed_body_returns_400_without_delivery() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mailer = Arc::new(CountingMailer::default());
        let app = router(test_state(mailer.clone(), dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/generate-pdf")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mailer.deliveries.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn empty_body_returns_400() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mailer = Arc::new(CountingMailer::default());
        let app = router(test_state(mailer.clone(), dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/generate-pdf")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mailer.deliveries.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn preflight_is_answered_with_cors_headers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = router(test_state(Arc::new(CountingMailer::default()), dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/generate-pdf")
                    .header(header::ORIGIN, "https://scorecard.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = router(test_state(Arc::new(CountingMailer::default()), dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
