use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use http_body_util::Full;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::SasConfig;
use crate::dtos::ApiResponse;
use crate::error::AppError;
use crate::handlers;
use crate::middleware::{request_id_middleware, response_log_middleware, REQUEST_ID_HEADER};
use crate::services::{AzureBlobStore, BlobStore, Resolver, SasSigner, TokenVerifier};

/// Shared application state. Everything in here is read-only after
/// startup, so handlers clone it freely.
#[derive(Clone)]
pub struct AppState {
    pub verifier: TokenVerifier,
    pub resolver: Resolver,
    pub signer: SasSigner,
    pub store: Arc<dyn BlobStore>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/sas/report/:entity_id", get(handlers::report_sas))
        .route(
            "/sas/certificate/:entity_id",
            get(handlers::certificate_sas),
        )
        .fallback(unknown_route)
        .with_state(state)
        .layer(from_fn(response_log_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
}

/// Every unmatched path gets the same JSON envelope as a known route.
async fn unknown_route() -> AppError {
    AppError::NotFound
}

/// Converts an escaped panic into the standard failure envelope. Panic
/// detail is logged but never sent to the caller.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response<Full<Bytes>> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Handler panicked: {}", detail);

    let body = serde_json::to_string(&ApiResponse::failure("Internal Server Error"))
        .unwrap_or_else(|_| {
            r#"{"code":0,"message":"Internal Server Error","data":null}"#.to_string()
        });

    let mut response = Response::new(Full::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: SasConfig) -> Result<Self, AppError> {
        let verifier = TokenVerifier::from_pem_file(&config.jwt_public_key_path);
        let signer = SasSigner::new(&config.storage, config.sas_ttl_min);
        let store: Arc<dyn BlobStore> = Arc::new(AzureBlobStore::new(signer.clone())?);
        let resolver = Resolver::new(
            config.report_containers,
            config.certificate_containers,
            config.default_region,
        );

        let state = AppState {
            verifier,
            resolver,
            signer,
            store,
        };
        let app = build_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
