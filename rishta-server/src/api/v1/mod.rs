use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::{
    api::Json,
    app::App,
    auth::{AuthError, Identity},
    export::ExportError,
    repository::RepositoryError,
};

use super::{ReportRenderer, ReportType};

pub mod admin;
pub mod auth;
pub mod profiles;

pub const HEALTH_URI: &str = "/health";

#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("repository error")]
    #[diagnostic(code(rishta::error::repository))]
    Repository(#[from] RepositoryError),
    #[error("invalid filter: {0}")]
    #[diagnostic(code(rishta::error::invalid_filter))]
    InvalidFilter(String),
    #[error("invalid credentials")]
    #[diagnostic(code(rishta::error::invalid_credentials))]
    InvalidCredentials,
    #[error("access denied")]
    #[diagnostic(code(rishta::error::forbidden))]
    Forbidden,
    #[error("credential handling failed")]
    #[diagnostic(code(rishta::error::auth))]
    Auth(#[from] AuthError),
    #[error("token issuance failed")]
    #[diagnostic(code(rishta::error::token))]
    Token(#[from] rishta_core::Error),
    #[error("report generation failed")]
    #[diagnostic(code(rishta::error::export))]
    Export(#[from] ExportError),
}

pub fn router() -> Router {
    Router::new()
        .route("/api/v1/identity", get(identity_handler))
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/profiles", get(profiles::read_all))
        .route("/api/v1/profiles", post(profiles::create))
        .route("/api/v1/profiles/me", get(profiles::me))
        .route("/api/v1/profiles/:id", get(profiles::read_one))
        .route("/api/v1/admin/accounts", get(admin::read_all_accounts))
        .route("/api/v1/admin/accounts/:id", delete(admin::delete_account))
        .route("/api/v1/admin/profiles", get(admin::read_all_profiles))
        .route("/api/v1/admin/profiles/:id", patch(admin::update_profile))
        .route("/api/v1/admin/profiles/:id", delete(admin::delete_profile))
        .route(
            "/api/v1/admin/profiles/:id/approve",
            post(admin::approve_profile),
        )
        .route(
            "/api/v1/admin/profiles/:id/reject",
            post(admin::reject_profile),
        )
        .route("/api/v1/admin/stats", get(admin::stats))
        .route(
            "/api/v1/admin/reports/profiles.csv",
            get(admin::export_profiles_csv),
        )
        .route(
            "/api/v1/admin/reports/profiles.pdf",
            get(admin::export_profiles_pdf),
        )
        .route(HEALTH_URI, get(health_handler))
}

async fn health_handler() -> &'static str {
    "UP"
}

async fn identity_handler(identity: Identity) -> impl IntoResponse {
    Json(identity)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut details: Vec<String> = Vec::new();

        let (status, message) = match self {
            ApiError::Repository(e) => {
                if e.is_unique_constraint_violation() {
                    (
                        StatusCode::CONFLICT,
                        "already exists with this email or owner".to_string(),
                    )
                } else {
                    match e {
                        RepositoryError::NotFound { .. } => {
                            (StatusCode::NOT_FOUND, format!("{}", e))
                        }
                        e => {
                            if App::json_output() {
                                println!("{}", ReportRenderer(ReportType::Json, &e));
                            } else {
                                println!("Error: {}", ReportRenderer(ReportType::Graphical, &e));
                            }

                            let mut messages: Vec<String> =
                                format!("{}", ReportRenderer(ReportType::Narratable, &e))
                                    .split('\n')
                                    .map(|s| s.trim())
                                    .filter(|s| !s.is_empty())
                                    .map(|s| s.to_string())
                                    .collect();

                            let message = messages.remove(0);
                            for detail in messages.into_iter() {
                                details.push(detail);
                            }

                            (StatusCode::INTERNAL_SERVER_ERROR, message)
                        }
                    }
                }
            }
            ApiError::InvalidFilter(reason) => {
                (StatusCode::BAD_REQUEST, format!("invalid filter: {}", reason))
            }
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid credentials".to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "access denied".to_string()),
            ApiError::Auth(e) => {
                tracing::error!(error = e.to_string(), "credential handling failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            ApiError::Token(e) => {
                tracing::error!(error = e.to_string(), "token issuance failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            ApiError::Export(e) => {
                tracing::error!(error = e.to_string(), "report rendering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "report generation failed".to_string(),
                )
            }
        };

        let body = if details.is_empty() {
            Json(json!({
                "result": "failure",
                "message": message
            }))
        } else {
            Json(json!({
                "result": "failure",
                "message": message,
                "details": details
            }))
        };

        (status, body).into_response()
    }
}
