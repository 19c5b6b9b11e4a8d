// ./api/src/main.rs
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
    routing::{get, post},
};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use application::{ApplicationError, DocumentService, StatsService};
use domain::{Document, SearchRequest};
use infrastructure::InMemoryDocumentRepository;

#[derive(Clone)]
struct AppState {
    document_service: Arc<DocumentService>,
    stats_service: Arc<StatsService>,
}

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    let port = resolve_port(env::var("PORT").ok());

    // --- Dependency Injection ---
    let repository = Arc::new(InMemoryDocumentRepository::new());
    let app_state = AppState {
        document_service: Arc::new(DocumentService::new(repository.clone())),
        stats_service: Arc::new(StatsService::new(repository)),
    };
    info!("Application services initialized.");

    let app = router(app_state);

    // --- Server Startup ---
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Port from the `PORT` variable, falling back to [`DEFAULT_PORT`].
fn resolve_port(raw: Option<String>) -> u16 {
    match raw {
        Some(port_str) => match u16::from_str(&port_str) {
            Ok(port_num) => {
                info!("Using port {} from environment variable PORT.", port_num);
                port_num
            }
            Err(_) => {
                warn!(
                    "Invalid PORT value '{}' in environment variable. Using default port {}.",
                    port_str, DEFAULT_PORT
                );
                DEFAULT_PORT
            }
        },
        None => {
            info!(
                "PORT environment variable not set. Using default port {}.",
                DEFAULT_PORT
            );
            DEFAULT_PORT
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats_handler))
        .route(
            "/documents",
            post(save_document_handler).get(list_documents_handler),
        )
        .route("/documents/search", post(search_documents_handler))
        .route("/documents/:doc_id", get(get_document_handler))
        .with_state(state)
}

// --- API Handlers ---

async fn health_check() -> impl IntoResponse {
    info!("Health check endpoint called");
    (StatusCode::OK, "OK")
}

/// Handler for upserting a document (POST /documents). A `null` body is rejected.
async fn save_document_handler(
    State(state): State<AppState>,
    Json(payload): Json<Option<Document>>,
) -> Response {
    info!(has_document = payload.is_some(), "Received request to save document");
    match state.document_service.save(payload).await {
        Ok(document) => (StatusCode::OK, JsonResponse(document)).into_response(),
        Err(e) => {
            error!("Failed to save document via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for fetching a document (GET /documents/:doc_id).
async fn get_document_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Response {
    info!(doc_id = %doc_id, "Received request to get document");
    match state.document_service.find_by_id(Some(doc_id.as_str())).await {
        Ok(Some(document)) => (StatusCode::OK, JsonResponse(document)).into_response(),
        Ok(None) => map_application_error_to_response(ApplicationError::NotFound(doc_id)),
        Err(e) => {
            error!(doc_id = %doc_id, "Failed to get document via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler listing every stored document (GET /documents).
async fn list_documents_handler(State(state): State<AppState>) -> Response {
    info!("Received request to list documents");
    search(&state, None).await
}

/// Handler for filtered search (POST /documents/search). A `null` body matches everything.
async fn search_documents_handler(
    State(state): State<AppState>,
    Json(request): Json<Option<SearchRequest>>,
) -> Response {
    info!(has_request = request.is_some(), "Received search request via POST");
    search(&state, request).await
}

async fn search(state: &AppState, request: Option<SearchRequest>) -> Response {
    match state.document_service.search_documents(request).await {
        Ok(response) => {
            info!("Search completed successfully via handler, {} total hits", response.total_hits);
            (StatusCode::OK, JsonResponse(response)).into_response()
        }
        Err(e) => {
            error!("Failed to search documents via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

async fn get_stats_handler(State(state): State<AppState>) -> Response {
    info!("Received request to get statistics");
    match state.stats_service.get_stats().await {
        Ok(stats_response) => (StatusCode::OK, JsonResponse(stats_response)).into_response(),
        Err(e) => {
            error!("Failed to get statistics via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Maps ApplicationError to an HTTP status code and response body.
fn map_application_error_to_response(err: ApplicationError) -> Response {
    let (status, body) = match err {
        ApplicationError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg),
        ApplicationError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("Document '{}' not found", id),
        ),
        ApplicationError::InfrastructureError(msg) => {
            error!("Underlying infrastructure error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred".to_string(),
            )
        }
    };
    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let repository = Arc::new(InMemoryDocumentRepository::new());
        router(AppState {
            document_service: Arc::new(DocumentService::new(repository.clone())),
            stats_service: Arc::new(StatsService::new(repository)),
        })
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn document_json(title: &str, created: &str) -> Value {
        json!({
            "title": title,
            "content": "Sample Content",
            "author": { "id": "a1", "name": "Author Name" },
            "created": created,
        })
    }

    #[test]
    fn resolve_port_falls_back_on_missing_or_invalid_value() {
        assert_eq!(resolve_port(None), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("not-a-port".to_string())), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("8080".to_string())), 8080);
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn null_document_is_bad_request() {
        let response = app()
            .oneshot(json_request("POST", "/documents", Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn saved_document_can_be_fetched_by_generated_id() {
        let app = app();
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/documents",
                document_json("Unique Title", "2024-03-01T12:00:00Z"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let saved = body_json(response).await;
        let id = saved["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let response = app
            .oneshot(get_request(&format!("/documents/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, saved);
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let response = app()
            .oneshot(get_request("/documents/does-not-exist"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_endpoint_applies_filters() {
        let app = app();
        for (title, created) in [
            ("Unique Title", "2024-03-01T12:00:00Z"),
            ("Other", "2024-03-01T13:00:00Z"),
        ] {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/documents", document_json(title, created)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/documents/search",
                json!({ "created_from": "2024-03-01T12:30:00Z" }),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["total_hits"], 1);
        assert_eq!(body["documents"][0]["title"], "Other");

        let response = app
            .clone()
            .oneshot(json_request("POST", "/documents/search", Value::Null))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["total_hits"], 2);

        let response = app.oneshot(get_request("/documents")).await.unwrap();
        assert_eq!(body_json(response).await["total_hits"], 2);
    }
}
