//! HTTP router.
//!
//! Returns a composable `Router` with every route nested under `/api/v1`.
//!
//! Layers (outermost → innermost): CORS → request tracing → body limit.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn api_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.settings.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    let v1 = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/classify", post(endpoints::classify::classify))
        .route("/documents/history", get(endpoints::history::list))
        .route("/documents/history/recent", get(endpoints::history::recent))
        .route(
            "/documents/history/by-label/:label",
            get(endpoints::history::by_label),
        )
        .route(
            "/documents/history/:id",
            get(endpoints::history::detail).delete(endpoints::history::delete),
        )
        .route("/documents/stats", get(endpoints::history::stats))
        .with_state(ctx);

    Router::new()
        .nest("/api/v1", v1)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use tower::ServiceExt;

    use crate::config::Settings;
    use crate::db::SqliteResultStore;
    use crate::models::{DocumentLabel, LabelConfidence};
    use crate::pipeline::classifier::{BaseClassifierAdapter, DecodingMockClassifier};
    use crate::pipeline::extraction::{MockOcrEngine, TextExtractionAdapter};
    use crate::pipeline::heuristic::HeuristicDetector;
    use crate::pipeline::llm::MockLlmClient;
    use crate::pipeline::reasoning::{MockReasoner, ReasoningOverrideAdapter};
    use crate::pipeline::resolver::OverrideResolver;
    use crate::pipeline::stage::StageExecutor;
    use crate::pipeline::summarize::{LlmSummarizer, SummarizationAdapter};
    use crate::pipeline::PipelineOrchestrator;

    const BOUNDARY: &str = "docsort-test-boundary";
    const RESUME_TEXT: &str = "Jordan Lee. Work Experience: analyst at Northwind, 2019-2023. \
        Education: BSc Economics. Skills: SQL, forecasting models.";

    fn pipeline(classifier: BaseClassifierAdapter, text: &str) -> PipelineOrchestrator {
        let executor = StageExecutor::new();
        let timeout = Duration::from_secs(5);
        PipelineOrchestrator::new(
            classifier,
            TextExtractionAdapter::new(Arc::new(MockOcrEngine::new(text)), executor.clone(), timeout),
            SummarizationAdapter::new(
                Arc::new(LlmSummarizer::new(
                    Arc::new(MockLlmClient::new("A one-line summary.")),
                    "mistral".into(),
                )),
                executor.clone(),
                timeout,
            ),
            OverrideResolver::new(
                HeuristicDetector::new(),
                ReasoningOverrideAdapter::new(
                    Arc::new(MockReasoner::failing("offline")),
                    executor.clone(),
                    timeout,
                    2000,
                ),
            ),
            executor,
        )
    }

    fn test_ctx(history: bool) -> ApiContext {
        let store = Arc::new(SqliteResultStore::in_memory().unwrap());
        let classifier = BaseClassifierAdapter::new(Arc::new(DecodingMockClassifier::new(
            LabelConfidence::new(DocumentLabel::Letter, 0.80),
        )));
        let mut orchestrator = pipeline(classifier, RESUME_TEXT);
        if history {
            orchestrator = orchestrator.with_store(store.clone());
        }
        ApiContext::new(
            Arc::new(orchestrator),
            history.then_some(store),
            Arc::new(Settings::default()),
        )
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, Rgb([240, 240, 240]));
        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn multipart_request(uri: &str, field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header("X-Owner-Id", "alice")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("X-Owner-Id", "alice")
            .body(Body::empty())
            .unwrap()
    }

    async fn json_of(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_model_state() {
        let app = api_router(test_ctx(true));
        let response = app.oneshot(get_request("/api/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model_loaded"], true);
        assert_eq!(json["version"], crate::config::APP_VERSION);
    }

    #[tokio::test]
    async fn health_is_degraded_without_classifier() {
        let ctx = ApiContext::new(
            Arc::new(pipeline(BaseClassifierAdapter::unavailable("missing"), "")),
            None,
            Arc::new(Settings::default()),
        );
        let response = api_router(ctx).oneshot(get_request("/api/v1/health")).await.unwrap();
        let json = json_of(response).await;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["model_loaded"], false);
    }

    #[tokio::test]
    async fn classify_runs_pipeline_and_persists() {
        let ctx = test_ctx(true);
        let store = ctx.history.clone().unwrap();
        let app = api_router(ctx);

        let response = app
            .oneshot(multipart_request("/api/v1/classify", "file", "cv.png", &png_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["label"], "Resume");
        assert_eq!(json["confidence"], "0.95");
        assert_eq!(json["override_reason"], "heuristic_override");
        assert_eq!(json["disagreement"], true);
        assert_eq!(json["summary"], "A one-line summary.");

        let id = json["document_id"].as_str().unwrap();
        let record = store.get(&id.parse().unwrap()).unwrap().unwrap();
        assert_eq!(record.owner_id, "alice");
        assert_eq!(record.filename, "cv.png");
    }

    #[tokio::test]
    async fn classify_without_save_returns_no_id() {
        let app = api_router(test_ctx(true));
        let response = app
            .oneshot(multipart_request(
                "/api/v1/classify?save=false",
                "file",
                "cv.png",
                &png_bytes(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_of(response).await["document_id"].is_null());
    }

    #[tokio::test]
    async fn classify_rejects_disallowed_extension() {
        let app = api_router(test_ctx(true));
        let response = app
            .oneshot(multipart_request("/api/v1/classify", "file", "doc.pdf", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"]["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn classify_rejects_missing_file_field() {
        let app = api_router(test_ctx(true));
        let response = app
            .oneshot(multipart_request("/api/v1/classify", "upload", "a.png", &png_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn classify_rejects_undecodable_image() {
        let app = api_router(test_ctx(true));
        let response = app
            .oneshot(multipart_request("/api/v1/classify", "file", "a.png", b"not a png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn classify_fails_when_classifier_unavailable() {
        let ctx = ApiContext::new(
            Arc::new(pipeline(BaseClassifierAdapter::unavailable("missing"), RESUME_TEXT)),
            None,
            Arc::new(Settings::default()),
        );
        let response = api_router(ctx)
            .oneshot(multipart_request("/api/v1/classify", "file", "a.png", &png_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_of(response).await["error"]["code"], "CLASSIFIER_UNAVAILABLE");
    }

    #[tokio::test]
    async fn history_routes_round_trip() {
        let ctx = test_ctx(true);
        let app = api_router(ctx);

        let response = app
            .clone()
            .oneshot(multipart_request("/api/v1/classify", "file", "cv.png", &png_bytes()))
            .await
            .unwrap();
        let id = json_of(response).await["document_id"]
            .as_str()
            .unwrap()
            .to_string();

        let list = json_of(
            app.clone()
                .oneshot(get_request("/api/v1/documents/history"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let by_label = json_of(
            app.clone()
                .oneshot(get_request("/api/v1/documents/history/by-label/resume"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(by_label.as_array().unwrap().len(), 1);

        let detail = app
            .clone()
            .oneshot(get_request(&format!("/api/v1/documents/history/{id}")))
            .await
            .unwrap();
        assert_eq!(detail.status(), StatusCode::OK);
        assert_eq!(json_of(detail).await["label"], "Resume");

        let stats = json_of(
            app.clone()
                .oneshot(get_request("/api/v1/documents/stats?owner=alice"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(stats["total_documents"], 1);
        assert_eq!(stats["disagreement_count"], 1);

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/documents/history/{id}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(delete).await.unwrap().status(), StatusCode::OK);

        let gone = app
            .oneshot(get_request(&format!("/api/v1/documents/history/{id}")))
            .await
            .unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn history_rejects_bad_input() {
        let app = api_router(test_ctx(true));

        let bad_id = app
            .clone()
            .oneshot(get_request("/api/v1/documents/history/12345"))
            .await
            .unwrap();
        assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);

        let bad_limit = app
            .clone()
            .oneshot(get_request("/api/v1/documents/history/recent?limit=51"))
            .await
            .unwrap();
        assert_eq!(bad_limit.status(), StatusCode::BAD_REQUEST);

        let bad_label = app
            .oneshot(get_request("/api/v1/documents/history/by-label/receipt"))
            .await
            .unwrap();
        assert_eq!(bad_label.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_disabled_returns_503() {
        let app = api_router(test_ctx(false));
        let response = app
            .oneshot(get_request("/api/v1/documents/history/recent"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = api_router(test_ctx(true));
        let response = app.oneshot(get_request("/api/v2/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
