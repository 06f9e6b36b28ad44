//! HTTP routes
//!
//! Every chat endpoint answers 200 with a natural-language `bot_reply`; turn
//! failures are already folded into the reply by the dispatcher.

use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;
use uuid::Uuid;

use farah_core::{ChatRequest, Dispatcher, WELCOME_MESSAGE};

const FALLBACK_INDEX: &str = "<!DOCTYPE html>\n<html><head><title>Farah</title></head>\n<body><h1>Farah</h1><p>Your Muslim-friendly travel assistant. POST to <code>/chat</code> to start a conversation.</p></body></html>\n";

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub static_dir: PathBuf,
}

/// Body of `/chat` and `/chat_with_file`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub thread_id: String,
    pub message: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ChatBody {
    /// A blank thread id starts a new conversation
    fn into_request(self) -> ChatRequest {
        let thread_id = match self.thread_id.trim() {
            "" => Uuid::new_v4().to_string(),
            id => id.to_string(),
        };
        let request = ChatRequest::new(thread_id, self.message);
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => request.at(lat, lng),
            _ => request,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub bot_reply: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

#[derive(Debug, Serialize)]
pub struct WelcomeReply {
    pub bot_reply: &'static str,
}

pub fn build_router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    Router::new()
        .route("/", get(index))
        .route("/welcome", get(welcome))
        .route("/chat", post(chat))
        .route("/chat_with_file", post(chat_with_file))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Landing page unavailable, serving fallback");
            Html(FALLBACK_INDEX.to_string())
        }
    }
}

async fn welcome() -> Json<WelcomeReply> {
    Json(WelcomeReply {
        bot_reply: WELCOME_MESSAGE,
    })
}

async fn chat(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Json<ChatReply> {
    let request = body.into_request();
    let bot_reply = state.dispatcher.handle(&request).await;
    Json(ChatReply {
        bot_reply,
        thread_id: request.thread_id,
    })
}

async fn chat_with_file(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Json<ChatReply> {
    let request = body.into_request();
    let bot_reply = state.dispatcher.handle_with_documents(&request).await;
    Json(ChatReply {
        bot_reply,
        thread_id: request.thread_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use farah_core::testing::{FakeGeocoder, FakeHalalTrip, FakeOracle, ScriptedClassifier};
    use farah_core::{FarahConfig, Intent};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::path::Path;
    use tower::ServiceExt;

    fn app(static_dir: &Path) -> Router {
        let mut config = FarahConfig::default();
        config.documents.dir = static_dir.join("files");

        let api = FakeHalalTrip::new().with_listing(
            "mosques",
            vec![vec![json!({"id": 1, "name": "Masjid Sultan", "address": "3 Muscat St, Singapore",
                             "latitude": 1.3022, "longitude": 103.8590})]],
        );
        let classifier = ScriptedClassifier::new()
            .on("Hi", Intent::Greeting)
            .on("Mosques near me", Intent::MosqueNearMe);

        let dispatcher = Dispatcher::new(
            &config,
            Arc::new(FakeOracle::new()),
            Arc::new(classifier),
            Arc::new(FakeGeocoder::new()),
            Arc::new(api),
        );
        build_router(AppState {
            dispatcher: Arc::new(dispatcher),
            static_dir: static_dir.to_path_buf(),
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_welcome() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::builder().uri("/welcome").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["bot_reply"], WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_chat_echoes_thread_id() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(post_json("/chat", json!({"threadId": "abc", "message": "Hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["threadId"], "abc");
        assert_eq!(body["bot_reply"], WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_blank_thread_id_gets_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(post_json("/chat", json!({"threadId": " ", "message": "Hi"})))
            .await
            .unwrap();
        let body = json_body(response).await;
        let thread_id = body["threadId"].as_str().unwrap();
        assert!(Uuid::parse_str(thread_id).is_ok());
    }

    #[tokio::test]
    async fn test_chat_passes_location() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(post_json(
                "/chat",
                json!({"threadId": "t", "message": "Mosques near me",
                       "latitude": 1.3022, "longitude": 103.8590}),
            ))
            .await
            .unwrap();
        let reply = json_body(response).await["bot_reply"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(reply.contains("Masjid Sultan"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(post_json("/chat", json!({"threadId": "t"})))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_chat_with_file_without_documents_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(post_json("/chat_with_file", json!({"threadId": "t", "message": "Hi"})))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["bot_reply"], WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_index_page_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("POST to <code>/chat</code>"));

        std::fs::write(dir.path().join("index.html"), "<h1>Custom landing</h1>").unwrap();
        let response = app(dir.path())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<h1>Custom landing</h1>");
    }
}
