use axum::{extract::Path, http::StatusCode, Extension};
use chrono::{DateTime, NaiveDate, Utc};
use miette::Result;
use serde::{Deserialize, Serialize};

use crate::api::v1::ApiError;
use crate::api::Json;
use crate::auth::Identity;
use crate::repository::profile::{self, Gender, ReviewStatus};
use crate::repository::Repository;
use crate::shortid::ShortId;

/// Handler for `GET /api/v1/profiles`
///
/// Administrators see every profile; everyone else sees the approved set.
pub async fn read_all(
    identity: Option<Identity>,
    Extension(repository): Extension<Repository>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    let is_administrator = identity
        .as_ref()
        .map(Identity::is_administrator)
        .unwrap_or(false);

    let records = if is_administrator {
        repository.profile().read_all().await?
    } else {
        repository.profile().read_approved().await?
    };

    let profiles = records
        .into_iter()
        .map(|record| {
            let is_owner = identity
                .as_ref()
                .map(|i| i.account_uuid() == &record.account_uuid)
                .unwrap_or(false);
            let profile: Profile = record.into();
            if is_administrator || is_owner {
                profile
            } else {
                profile.redacted()
            }
        })
        .collect();

    Ok(Json(profiles))
}

/// Handler for `GET /api/v1/profiles/:id`
///
/// Visible to administrators, the owner, or anyone once approved.
pub async fn read_one(
    Path(id): Path<ShortId>,
    identity: Option<Identity>,
    Extension(repository): Extension<Repository>,
) -> Result<Json<Profile>, ApiError> {
    let record = repository.profile().read_one(id.as_uuid()).await?;

    let is_administrator = identity
        .as_ref()
        .map(Identity::is_administrator)
        .unwrap_or(false);
    let is_owner = identity
        .as_ref()
        .map(|i| i.account_uuid() == &record.account_uuid)
        .unwrap_or(false);

    if !(is_administrator || is_owner || record.review_status.is_approved()) {
        return Err(ApiError::Forbidden);
    }

    let profile: Profile = record.into();
    Ok(Json(if is_administrator || is_owner {
        profile
    } else {
        profile.redacted()
    }))
}

/// Handler for `GET /api/v1/profiles/me`
pub async fn me(
    identity: Identity,
    Extension(repository): Extension<Repository>,
) -> Result<Json<Profile>, ApiError> {
    let record = repository
        .profile()
        .read_by_account(identity.account_uuid())
        .await?;
    let profile: Profile = record.into();
    Ok(profile.into())
}

/// Handler for `POST /api/v1/profiles`
pub async fn create(
    identity: Identity,
    Extension(repository): Extension<Repository>,
    request: Json<CreateProfile>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let record = repository
        .profile()
        .create(identity.account_uuid(), request.0.into())
        .await?;
    let profile: Profile = record.into();
    Ok((StatusCode::CREATED, profile.into()))
}

/// Conversion from repository [`profile::Profile`] to API [`Profile`]. The
/// age a client sees is always derived from the stored birthdate.
impl From<profile::Profile> for Profile {
    fn from(record: profile::Profile) -> Self {
        let age = record
            .date_of_birth
            .map(|dob| profile::age_on(dob, Utc::now().date_naive()));
        Self {
            id: record.uuid.into(),
            owner_id: record.account_uuid.into(),
            owner_email: Some(record.owner_email),
            name: record.name,
            gender: record.gender,
            date_of_birth: record.date_of_birth,
            age,
            marital_status: record.marital_status,
            profile_created_by: record.profile_created_by,
            mobile: record.mobile,
            whatsapp: record.whatsapp,
            sect: record.sect,
            mother_tongue: record.mother_tongue,
            country: record.country,
            state: record.state,
            city: record.city,
            education: record.education,
            occupation: record.occupation,
            income: record.income,
            complexion: record.complexion,
            caste: record.caste,
            height: record.height,
            diet: record.diet,
            father_name: record.father_name,
            mother_name: record.mother_name,
            father_occupation: record.father_occupation,
            mother_occupation: record.mother_occupation,
            siblings: record.siblings,
            family_type: record.family_type,
            about: record.about,
            photo: record.photo,
            review_status: record.review_status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<CreateProfile> for profile::CreateProfile {
    fn from(request: CreateProfile) -> Self {
        Self {
            name: request.name,
            gender: request.gender,
            date_of_birth: request.date_of_birth,
            marital_status: request.marital_status,
            profile_created_by: request.profile_created_by,
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

/// Body for `POST /api/v1/profiles`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProfile {
    pub gender: Gender,
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub marital_status: Option<String>,
    pub profile_created_by: Option<String>,
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

/// An API [`Profile`] type.
#[derive(Debug, Serialize, Deserialize)]
pub struct Profile {
    pub id: ShortId,
    pub owner_id: ShortId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_tongue: Option<String>,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caste: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    pub diet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siblings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub review_status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Strips attributes not meant for other members' eyes.
    pub fn redacted(mut self) -> Self {
        self.owner_email = None;
        self
    }
}
