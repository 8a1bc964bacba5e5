use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;
use crate::error::AppError;
use crate::model::RequestData;
use crate::service::TicketResponse;

mod assets;
mod canvas;
mod config;
mod dash;
mod error;
mod font_metrics;
mod model;
mod pagination;
mod pdf;
mod qr;
mod service;
mod storage;
mod ticket;
mod timestamp;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticket_pdf=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;

    let app = app(Arc::new(settings));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Ticket PDF service listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn app(settings: Arc<Settings>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/generate", post(generate))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(settings)
}

async fn generate(
    State(settings): State<Arc<Settings>>,
    Json(requests): Json<Vec<RequestData>>,
) -> Result<Json<TicketResponse>, AppError> {
    let response = service::generate_tickets(settings, requests).await?;
    Ok(Json(response))
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FontSettings, ServerSettings, StorageSettings};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::path::{Path, PathBuf};
    use tower::ServiceExt;

    fn settings(dir: &Path) -> Arc<Settings> {
        Arc::new(Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                worker_limit: 4,
            },
            storage: StorageSettings {
                local_save: true,
                dir_name: dir.to_path_buf(),
                upload: false,
                endpoint: "storage.example.com".to_string(),
                bucket: "tickets-bucket".to_string(),
                region: "us-east-1".to_string(),
                access_key_id: String::new(),
                secret_access_key: String::new(),
                use_ssl: true,
            },
            fonts: FontSettings {
                regular: PathBuf::new(),
                bold: PathBuf::new(),
                builtin: true,
            },
        })
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/generate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let tmp = tempfile::tempdir().unwrap();
        let response = app(settings(tmp.path()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_generate_returns_file_map() {
        let tmp = tempfile::tempdir().unwrap();
        let body = r#"[{
            "ticket": {
                "id": 123, "price": "450.00", "currency": "USD",
                "itineraries": [{"segments": [{
                    "departure_time": "2024-05-01T08:00:00Z", "arrival_time": "2024-05-01T11:30:00Z",
                    "departure_airport": "JFK", "arrival_airport": "LAX", "carrier": "AA100"
                }]}]
            },
            "user": {"adults": [{"first_name": "JOHN", "last_name": "DOE"}]}
        }]"#;

        let response = app(settings(tmp.path())).oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["files"]["JOHN-DOE-local-pdf"], "123-JOHN-DOE.pdf");
        assert_eq!(json["errors"], serde_json::json!({}));
        assert!(tmp.path().join("123-JOHN-DOE.pdf").exists());
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_body() {
        let tmp = tempfile::tempdir().unwrap();
        let response = app(settings(tmp.path())).oneshot(post_json("[]")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].is_string());
    }
}
