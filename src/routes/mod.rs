//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - JSON API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/modes", get(http::http_modes))
        .route("/api/v1/generate", post(http::http_post_generate))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::DrillConfig;

    fn test_router() -> Router {
        build_router(Arc::new(AppState::with_config(DrillConfig::default(), None)))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_generate(payload: Value) -> Request<Body> {
        Request::post("/api/v1/generate")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn api_health() {
        let response = test_router()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let payload = json_body(response).await;
        assert_eq!(payload["ok"], true);
        assert_eq!(payload["ai_enabled"], false);
    }

    #[tokio::test]
    async fn api_modes_lists_all_codes() {
        let response = test_router()
            .oneshot(Request::get("/api/v1/modes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let payload = json_body(response).await;
        let codes: Vec<u64> = payload["modes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["code"].as_u64().unwrap())
            .collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 7]);
        assert_eq!(payload["modes"][0]["label"], "inline-blank-easy");
        assert_eq!(payload["modes"][0]["ai_supported"], false);
    }

    #[tokio::test]
    async fn api_generate_inline_blanks() {
        let src = "def f(x):\n    if x > 0:\n        return x\n    else:\n        return -x";
        let response = test_router()
            .oneshot(post_generate(serde_json::json!({
                "content": src, "mode": 1, "blank_count": 2, "seed": 3
            })))
            .await
            .unwrap();
        assert!(response.status().is_success());
        let payload = json_body(response).await;
        assert_eq!(payload["method"], "local");
        assert_eq!(payload["items"], 2);
        assert_eq!(payload["degraded"], false);
        assert!(!payload["session_id"].as_str().unwrap().is_empty());
        let key = &payload["session"]["answer_key"];
        assert_eq!(key["1"], "x > 0");
        assert_eq!(key["2"], "-x");
        assert_eq!(key["_total"], 2);
        assert_eq!(payload["session"]["original_text"], src);
    }

    #[tokio::test]
    async fn api_generate_unknown_mode_is_unsupported_session() {
        let response = test_router()
            .oneshot(post_generate(serde_json::json!({ "content": "x = 1", "mode": 9 })))
            .await
            .unwrap();
        assert!(response.status().is_success());
        let payload = json_body(response).await;
        assert_eq!(payload["items"], 0);
        assert_eq!(payload["session"]["answer_key"]["_type"], "unsupported_mode");
    }

    #[tokio::test]
    async fn api_generate_mode_outside_byte_range_is_unsupported_session() {
        for mode in [serde_json::json!(300), serde_json::json!("blanks")] {
            let response = test_router()
                .oneshot(post_generate(serde_json::json!({ "content": "x = 1", "mode": mode })))
                .await
                .unwrap();
            assert!(response.status().is_success());
            let payload = json_body(response).await;
            assert_eq!(payload["session"]["answer_key"]["_type"], "unsupported_mode");
            assert_eq!(payload["session"]["original_text"], "x = 1");
        }
        let response = test_router()
            .oneshot(post_generate(serde_json::json!({ "content": "x = 1", "mode": 300 })))
            .await
            .unwrap();
        let payload = json_body(response).await;
        assert_eq!(payload["session"]["mode"], 300);
        assert_eq!(payload["session"]["question_text"], "Mode 300 is not supported.");
    }

    #[tokio::test]
    async fn api_generate_clamps_out_of_range_difficulty() {
        let response = test_router()
            .oneshot(post_generate(serde_json::json!({
                "content": "def f(x):\n    return x + 1\n", "mode": 1, "difficulty": 99, "seed": 1
            })))
            .await
            .unwrap();
        assert!(response.status().is_success());
        let payload = json_body(response).await;
        assert_eq!(payload["degraded"], false);
        assert_eq!(payload["session"]["mode"], 1);
    }

    #[tokio::test]
    async fn api_generate_rejects_missing_content() {
        let response = test_router()
            .oneshot(post_generate(serde_json::json!({ "mode": 1 })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
