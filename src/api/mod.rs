use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{ScorecardPayload, derive_scorecard};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("scorecard API listening on http://{addr}");
    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/api/derive", post(derive_handler))
        .fallback(not_found_handler)
}

async fn derive_handler(Json(body): Json<Value>) -> Response {
    // Any JSON object is a valid payload; wrong-typed fields degrade through
    // the engine's fallback chains instead of rejecting the request.
    let payload = ScorecardPayload::from_value(body);
    json_response(StatusCode::OK, derive_scorecard(&payload))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
