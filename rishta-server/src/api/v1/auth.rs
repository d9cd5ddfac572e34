use std::sync::Arc;

use axum::{http::StatusCode, Extension};
use chrono::{DateTime, Utc};
use miette::Result;
use rishta_core::auth::Role;
use rishta_core::jwt;
use serde::{Deserialize, Serialize};

use crate::api::v1::ApiError;
use crate::api::Json;
use crate::auth;
use crate::mask;
use crate::repository::{account::CreateAccount, profile::Gender, Repository};
use crate::shortid::ShortId;

/// Handler for `POST /api/v1/auth/register`
pub async fn register(
    Extension(repository): Extension<Repository>,
    request: Json<RegisterAccount>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let password_hash = auth::hash_password(&request.password)?;

    let account = repository
        .account()
        .create(CreateAccount {
            name: request.name.clone(),
            email: request.email.clone(),
            password_hash,
            gender: request.gender,
        })
        .await?;

    let account: Account = account.into();
    Ok((StatusCode::CREATED, account.into()))
}

/// Handler for `POST /api/v1/auth/login`
pub async fn login(
    Extension(repository): Extension<Repository>,
    Extension(jwt_generator): Extension<Arc<jwt::Generator>>,
    request: Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let account = repository
        .account()
        .find_by_email(&request.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !auth::verify_password(&request.password, &account.password_hash)? {
        tracing::debug!(email = mask::email(&request.email), "login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let subject = ShortId::from_uuid(&account.uuid).to_string();
    let token = jwt_generator.generate(
        &subject,
        auth::TOKEN_EXPIRY_HOURS,
        Some(vec![account.role.into()]),
    )?;

    tracing::debug!(email = mask::email(&request.email), "login succeeded");

    Ok(Json(LoginResponse {
        token,
        account: account.into(),
    }))
}

/// Conversion from repository [`crate::repository::account::Account`] to
/// API [`Account`].
impl From<crate::repository::account::Account> for Account {
    fn from(account: crate::repository::account::Account) -> Self {
        Self {
            id: account.uuid.into(),
            name: account.name,
            email: account.email,
            gender: account.gender,
            role: account.role.into(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Body for `POST /api/v1/auth/register`
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub gender: Option<Gender>,
}

/// Body for `POST /api/v1/auth/login`
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub account: Account,
}

/// An API [`Account`] type. Password hashes never leave the repository
/// layer.
#[derive(Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: ShortId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
