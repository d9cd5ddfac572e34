use std::sync::Arc;

use axum::{
    body::{boxed, Bytes},
    handler::Handler,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Extension, Router,
};
use hyper::{Body, Uri};
use miette::Diagnostic;
use rishta_core::jwt;
use serde_json::json;

mod json;
pub mod v1;

pub use json::Json;

use crate::{auth, repository::Repository};

pub fn build(
    repository: Repository,
    jwt_generator: Arc<jwt::Generator>,
    jwt_verifier: Arc<jwt::Verifier>,
) -> Router {
    Router::new()
        .merge(v1::router())
        .layer(middleware::from_fn(auth::middleware))
        .layer(Extension(repository))
        .layer(Extension(jwt_generator))
        .layer(Extension(jwt_verifier))
        .layer(middleware::from_fn(error_middleware))
        .fallback(not_found_handler.into_service())
}

async fn not_found_handler(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "result": "failure",
            "message": "not found",
            "uri": uri.to_string()
        })),
    )
}

async fn error_middleware<B>(req: Request<B>, next: Next<B>) -> Response {
    let response = next.run(req).await;
    let (head, body) = response.into_parts();
    let body_bytes = hyper::body::to_bytes(body)
        .await
        .expect("failed to convert error response into bytes");

    let body = if head.status == StatusCode::UNPROCESSABLE_ENTITY {
        let json_body = serde_json::to_string(&json!({
            "result": "failure",
            "message": std::str::from_utf8(&body_bytes).expect("failed to parse error response"),
        }))
        .expect("failed to create error JSON body");

        Body::from(Bytes::from(json_body.as_bytes().to_vec()))
    } else {
        Body::from(body_bytes)
    };

    Response::from_parts(head, boxed(body))
}

pub enum ReportType {
    Graphical,
    Json,
    Narratable,
}

/// Renders a [`Diagnostic`] with the given miette report handler, for error
/// output on the console or in structured logs.
pub struct ReportRenderer<'a>(pub ReportType, pub &'a dyn Diagnostic);

impl std::fmt::Display for ReportRenderer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            ReportType::Graphical => {
                miette::GraphicalReportHandler::new().render_report(f, self.1)
            }
            ReportType::Json => miette::JSONReportHandler::new().render_report(f, self.1),
            ReportType::Narratable => {
                miette::NarratableReportHandler::new().render_report(f, self.1)
            }
        }
    }
}
