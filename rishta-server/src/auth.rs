use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, RequestParts},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use miette::Diagnostic;
use rishta_core::auth::Role;
use rishta_core::jwt::{Claims, Verifier};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::shortid::ShortId;

/// Issued tokens are valid for a week, matching the original session length.
pub const TOKEN_EXPIRY_HOURS: i64 = 168;

pub const ADMIN_EMAIL_ENV: &str = "ADMIN_EMAIL";
pub const ADMIN_PASSWORD_ENV: &str = "ADMIN_PASSWORD";

#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    #[diagnostic(code(rishta::error::password_hash))]
    PasswordHashError(#[from] argon2::password_hash::Error),
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(password_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// The authenticated caller, resolved from a verified bearer token and
/// carried as a request extension. Handlers receive it explicitly; there is
/// no ambient session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub account: ShortId,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn account_uuid(&self) -> &Uuid {
        self.account.as_uuid()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_administrator(&self) -> bool {
        self.has_role(Role::Administrator)
    }
}

impl TryFrom<&Claims> for Identity {
    type Error = ();

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        let subject = claims.subject.as_deref().ok_or(())?;
        let account: ShortId = subject.parse().map_err(|_| ())?;
        Ok(Self {
            account,
            roles: claims.roles.clone(),
        })
    }
}

#[async_trait]
impl<B> FromRequest<B> for Identity
where
    B: Send,
{
    type Rejection = Response;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        req.extensions()
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| unauthorized("authentication required"))
    }
}

/// Verifies a bearer token, if one was presented, and attaches the resulting
/// [`Identity`] to the request. Requests without a token pass through
/// anonymously; handlers that need a caller reject those themselves.
pub async fn middleware<B>(mut req: Request<B>, next: Next<B>) -> Response {
    let verifier = req
        .extensions()
        .get::<Arc<Verifier>>()
        .cloned()
        .expect("JWT verifier extension not registered");

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .map(str::to_owned);

    if let Some(auth_header) = auth_header {
        let token = match auth_header.strip_prefix("Bearer ") {
            Some(token) => token,
            None => return unauthorized("unsupported authorization scheme"),
        };

        match verifier.verify(token) {
            Ok(claims) => match Identity::try_from(&claims) {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                }
                Err(_) => return unauthorized("token subject is not a valid account"),
            },
            Err(e) => {
                tracing::debug!(error = e.to_string(), "bearer token rejected");
                return unauthorized("invalid bearer token");
            }
        }
    }

    next.run(req).await
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "result": "failure",
            "message": message
        })),
    )
        .into_response()
}
