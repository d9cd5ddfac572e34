use axum::{
    body::Empty,
    extract::{Path, Query},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{NaiveDate, Utc};
use miette::Result;
use serde::{Deserialize, Serialize};

use crate::api::v1::auth::Account;
use crate::api::v1::profiles::Profile;
use crate::api::v1::ApiError;
use crate::api::Json;
use crate::auth::Identity;
use crate::export;
use crate::repository::profile::{self, Gender, ProfileFilter, ReviewStatus};
use crate::repository::Repository;
use crate::shortid::ShortId;

fn authorize(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_administrator() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Handler for `GET /api/v1/admin/profiles`
///
/// With no parameters this lists every profile; any combination of the
/// filter parameters narrows the result conjunctively.
pub async fn read_all_profiles(
    identity: Identity,
    Query(params): Query<FilterParams>,
    Extension(repository): Extension<Repository>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    authorize(&identity)?;

    let filter = params.try_into_filter()?;
    let profiles: Vec<Profile> = repository
        .profile()
        .search(&filter)
        .await?
        .into_iter()
        .map(|record| record.into())
        .collect();

    Ok(profiles.into())
}

/// Handler for `PATCH /api/v1/admin/profiles/:id`
pub async fn update_profile(
    identity: Identity,
    Path(id): Path<ShortId>,
    Extension(repository): Extension<Repository>,
    request: Json<UpdateProfile>,
) -> Result<Json<Profile>, ApiError> {
    authorize(&identity)?;

    let record = repository
        .profile()
        .update(id.as_uuid(), request.0.into())
        .await?;
    let profile: Profile = record.into();
    Ok(profile.into())
}

/// Handler for `DELETE /api/v1/admin/profiles/:id`
pub async fn delete_profile(
    identity: Identity,
    Path(id): Path<ShortId>,
    Extension(repository): Extension<Repository>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&identity)?;

    repository.profile().delete(id.as_uuid()).await?;
    Ok(Empty::new())
}

/// Handler for `POST /api/v1/admin/profiles/:id/approve`
pub async fn approve_profile(
    identity: Identity,
    Path(id): Path<ShortId>,
    Extension(repository): Extension<Repository>,
) -> Result<Json<Profile>, ApiError> {
    set_review_status(identity, id, repository, ReviewStatus::Approved).await
}

/// Handler for `POST /api/v1/admin/profiles/:id/reject`
pub async fn reject_profile(
    identity: Identity,
    Path(id): Path<ShortId>,
    Extension(repository): Extension<Repository>,
) -> Result<Json<Profile>, ApiError> {
    set_review_status(identity, id, repository, ReviewStatus::Rejected).await
}

async fn set_review_status(
    identity: Identity,
    id: ShortId,
    repository: Repository,
    status: ReviewStatus,
) -> Result<Json<Profile>, ApiError> {
    authorize(&identity)?;

    let record = repository
        .profile()
        .set_review_status(id.as_uuid(), status)
        .await?;
    let profile: Profile = record.into();
    Ok(profile.into())
}

/// Handler for `GET /api/v1/admin/accounts`
pub async fn read_all_accounts(
    identity: Identity,
    Extension(repository): Extension<Repository>,
) -> Result<Json<Vec<Account>>, ApiError> {
    authorize(&identity)?;

    let accounts: Vec<Account> = repository
        .account()
        .read_all()
        .await?
        .into_iter()
        .map(|record| record.into())
        .collect();

    Ok(accounts.into())
}

/// Handler for `DELETE /api/v1/admin/accounts/:id`
pub async fn delete_account(
    identity: Identity,
    Path(id): Path<ShortId>,
    Extension(repository): Extension<Repository>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&identity)?;

    repository.account().delete(id.as_uuid()).await?;
    Ok(Empty::new())
}

/// Handler for `GET /api/v1/admin/stats`
pub async fn stats(
    identity: Identity,
    Extension(repository): Extension<Repository>,
) -> Result<Json<Stats>, ApiError> {
    authorize(&identity)?;

    let stats = repository.account().member_stats().await?;
    Ok(Json(Stats {
        total_members: stats.total_members,
        male: stats.male,
        female: stats.female,
    }))
}

/// Handler for `GET /api/v1/admin/reports/profiles.csv`
pub async fn export_profiles_csv(
    identity: Identity,
    Query(params): Query<FilterParams>,
    Extension(repository): Extension<Repository>,
) -> Result<Response, ApiError> {
    authorize(&identity)?;

    let filter = params.try_into_filter()?;
    let profiles = repository.profile().search(&filter).await?;

    let mut buffer = Vec::new();
    let count = export::write_csv(&profiles, &mut buffer)?;

    tracing::debug!(count = count, "delimited profile report exported");

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=\"profiles.csv\"",
            ),
        ],
        buffer,
    )
        .into_response())
}

/// Handler for `GET /api/v1/admin/reports/profiles.pdf`
pub async fn export_profiles_pdf(
    identity: Identity,
    Query(params): Query<FilterParams>,
    Extension(repository): Extension<Repository>,
) -> Result<Response, ApiError> {
    authorize(&identity)?;

    let filter = params.try_into_filter()?;
    let profiles = repository.profile().search(&filter).await?;

    let document = export::write_pdf(&profiles, Utc::now())?;

    tracing::debug!(
        count = profiles.len(),
        pages = export::page_count(profiles.len()),
        "printable profile report exported"
    );

    Ok((
        [
            (CONTENT_TYPE, "application/pdf"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=\"profiles.pdf\"",
            ),
        ],
        document,
    )
        .into_response())
}

/// Query parameters accepted by the profile filter and report endpoints.
///
/// Values arrive as raw strings; parsing failures reject the request rather
/// than silently widening the search.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterParams {
    pub city: Option<String>,
    pub sect: Option<String>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub caste: Option<String>,
    pub income: Option<String>,
    pub min_age: Option<String>,
    pub max_age: Option<String>,
}

impl FilterParams {
    pub fn try_into_filter(self) -> Result<ProfileFilter, ApiError> {
        Ok(ProfileFilter {
            city: non_empty(self.city),
            sect: non_empty(self.sect),
            gender: parse_gender(self.gender)?,
            occupation: non_empty(self.occupation),
            caste: non_empty(self.caste),
            income: non_empty(self.income),
            min_age: parse_age(self.min_age, "min_age")?,
            max_age: parse_age(self.max_age, "max_age")?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_age(value: Option<String>, name: &str) -> Result<Option<u32>, ApiError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse::<u32>().map(Some).map_err(|_| {
            ApiError::InvalidFilter(format!("{} must be a whole number, got '{}'", name, v))
        }),
    }
}

fn parse_gender(value: Option<String>) -> Result<Option<Gender>, ApiError> {
    match non_empty(value) {
        None => Ok(None),
        Some(v) => v.parse::<Gender>().map(Some).map_err(|_| {
            ApiError::InvalidFilter(format!("gender must be 'male' or 'female', got '{}'", v))
        }),
    }
}

impl From<UpdateProfile> for profile::UpdateProfile {
    fn from(request: UpdateProfile) -> Self {
        Self {
            name: request.name,
            gender: request.gender,
            date_of_birth: request.date_of_birth,
            marital_status: request.marital_status,
            mobile: request.mobile,
            whatsapp: request.whatsapp,
            sect: request.sect,
            mother_tongue: request.mother_tongue,
            country: request.country,
            state: request.state,
            city: request.city,
            education: request.education,
            occupation: request.occupation,
            income: request.income,
            complexion: request.complexion,
            caste: request.caste,
            height: request.height,
            diet: request.diet,
            father_name: request.father_name,
            mother_name: request.mother_name,
            father_occupation: request.father_occupation,
            mother_occupation: request.mother_occupation,
            siblings: request.siblings,
            family_type: request.family_type,
            about: request.about,
            photo: request.photo,
        }
    }
}

/// Body for `PATCH /api/v1/admin/profiles/:id`; absent fields are left
/// untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub marital_status: Option<String>,
    pub mobile: Option<String>,
    pub whatsapp: Option<String>,
    pub sect: Option<String>,
    pub mother_tongue: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub education: Option<String>,
    pub occupation: Option<String>,
    pub income: Option<String>,
    pub complexion: Option<String>,
    pub caste: Option<String>,
    pub height: Option<String>,
    pub diet: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub father_occupation: Option<String>,
    pub mother_occupation: Option<String>,
    pub siblings: Option<String>,
    pub family_type: Option<String>,
    pub about: Option<String>,
    pub photo: Option<String>,
}

/// Response for `GET /api/v1/admin/stats`
#[derive(Debug, Serialize, Deserialize)]
pub struct Stats {
    pub total_members: i64,
    pub male: i64,
    pub female: i64,
}
