use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    database::Database,
    repository::{account::AccountRepository, RepositoryError, Result},
    shortid::ShortId,
};

const ENTITY_PROFILE: &str = "profile";

/// Birthdates before this year are treated as unrepresentable; an age filter
/// with no upper bound starts here.
const EARLIEST_BIRTH_YEAR: i32 = 1900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "gender", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => anyhow::bail!("unsupported gender '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "review_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewStatus::Approved)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub uuid: Uuid,
    pub account_uuid: Uuid,
    pub owner_email: String,
    pub name: Option<String>,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub marital_status: Option<String>,
    pub profile_created_by: Option<String>,
    pub mobile: Option<String>,
    pub whatsapp: Option<String>,
    pub sect: Option<String>,
    pub mother_tongue: Option<String>,
    pub country: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub education: Option<String>,
    pub occupation: Option<String>,
    pub income: Option<String>,
    pub complexion: Option<String>,
    pub caste: Option<String>,
    pub height: Option<String>,
    pub diet: String,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub father_occupation: Option<String>,
    pub mother_occupation: Option<String>,
    pub siblings: Option<String>,
    pub family_type: Option<String>,
    pub about: Option<String>,
    pub photo: Option<String>,
    pub review_status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct CreateProfile {
    pub name: Option<String>,
    pub gender: Gender,
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

#[derive(Default)]
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

/// Conjunctive filter over stored profiles. An absent field imposes no
/// constraint; string fields match the stored value exactly.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProfileFilter {
    pub city: Option<String>,
    pub sect: Option<String>,
    pub gender: Option<Gender>,
    pub occupation: Option<String>,
    pub caste: Option<String>,
    pub income: Option<String>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
}

impl ProfileFilter {
    /// Translates the age bounds into an inclusive date-of-birth range.
    ///
    /// Reversed bounds are swapped. A missing minimum age admits birthdates
    /// up to today; a missing maximum age reaches back to
    /// [`EARLIEST_BIRTH_YEAR`]. Returns `None` when no age bound is set.
    pub fn date_of_birth_bounds(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        if self.min_age.is_none() && self.max_age.is_none() {
            return None;
        }

        let (min_age, max_age) = match (self.min_age, self.max_age) {
            (Some(min), Some(max)) if min > max => (Some(max), Some(min)),
            other => other,
        };

        let latest = match min_age {
            Some(years) => years_before(today, years),
            None => today,
        };
        let earliest = match max_age {
            Some(years) => years_before(today, years),
            None => earliest_birth_date(),
        };

        Some((earliest, latest))
    }
}

fn earliest_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(EARLIEST_BIRTH_YEAR, 1, 1).unwrap()
}

fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or_else(earliest_birth_date)
}

/// Whole years between a birthdate and the given day.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

const SELECT_PROFILE: &str = r"
    SELECT
        p.*,
        a.uuid AS account_uuid,
        a.email AS owner_email
    FROM
        profiles p
        INNER JOIN accounts a ON a.id = p.account_id
";

#[derive(Clone)]
pub struct ProfileRepository {
    database: Database,
    account: AccountRepository,
}

impl ProfileRepository {
    pub fn new(database: Database, account: AccountRepository) -> Self {
        Self { database, account }
    }

    pub async fn read_one(&self, uuid: &Uuid) -> Result<Profile> {
        let mut conn = self.database.connection().await?;

        tracing::trace!(uuid = uuid.to_string(), "reading profile");

        let sql = format!(
            r"{SELECT_PROFILE}
            WHERE
                p.uuid = $1
                AND
                p.deleted = false
            "
        );

        sqlx::query_as(&sql)
            .bind(uuid)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity_type: ENTITY_PROFILE.to_string(),
                id: ShortId::from_uuid(uuid).to_string(),
            })
    }

    pub async fn read_by_account(&self, account_uuid: &Uuid) -> Result<Profile> {
        let mut conn = self.database.connection().await?;

        tracing::trace!(
            account_uuid = account_uuid.to_string(),
            "reading profile by owner"
        );

        let sql = format!(
            r"{SELECT_PROFILE}
            WHERE
                a.uuid = $1
                AND
                p.deleted = false
            "
        );

        sqlx::query_as(&sql)
            .bind(account_uuid)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity_type: ENTITY_PROFILE.to_string(),
                id: ShortId::from_uuid(account_uuid).to_string(),
            })
    }

    pub async fn read_all(&self) -> Result<Vec<Profile>> {
        self.search(&ProfileFilter::default()).await
    }

    pub async fn read_approved(&self) -> Result<Vec<Profile>> {
        let mut conn = self.database.connection().await?;

        tracing::trace!("reading approved profiles");

        let sql = format!(
            r"{SELECT_PROFILE}
            WHERE
                p.deleted = false
                AND
                p.review_status = 'APPROVED'
            ORDER BY
                p.id
            "
        );

        Ok(sqlx::query_as(&sql).fetch_all(&mut *conn).await?)
    }

    /// Selects every non-deleted profile satisfying all supplied filters.
    ///
    /// Age bounds are evaluated against today's date; profiles without a
    /// recorded birthdate never match an age-constrained search.
    pub async fn search(&self, filter: &ProfileFilter) -> Result<Vec<Profile>> {
        let mut conn = self.database.connection().await?;

        tracing::trace!(filter = format!("{:?}", filter), "searching profiles");

        let (born_on_or_after, born_on_or_before) =
            match filter.date_of_birth_bounds(Utc::now().date_naive()) {
                Some((earliest, latest)) => (Some(earliest), Some(latest)),
                None => (None, None),
            };

        let sql = format!(
            r"{SELECT_PROFILE}
            WHERE
                p.deleted = false
                AND ($1::text IS NULL OR p.city = $1)
                AND ($2::text IS NULL OR p.sect = $2)
                AND ($3::gender IS NULL OR p.gender = $3)
                AND ($4::text IS NULL OR p.occupation = $4)
                AND ($5::text IS NULL OR p.caste = $5)
                AND ($6::text IS NULL OR p.income = $6)
                AND ($7::date IS NULL OR p.date_of_birth BETWEEN $7 AND $8)
            ORDER BY
                p.id
            "
        );

        Ok(sqlx::query_as(&sql)
            .bind(filter.city.as_ref())
            .bind(filter.sect.as_ref())
            .bind(filter.gender)
            .bind(filter.occupation.as_ref())
            .bind(filter.caste.as_ref())
            .bind(filter.income.as_ref())
            .bind(born_on_or_after)
            .bind(born_on_or_before)
            .fetch_all(&mut *conn)
            .await?)
    }

    pub async fn create(&self, account_uuid: &Uuid, request: CreateProfile) -> Result<Profile> {
        let account_id = self.account.get_id(account_uuid).await?;

        let mut tx = self.database.transaction().await?;

        let id = Uuid::new_v4();

        let sql = r"
            INSERT INTO profiles (
                uuid,
                account_id,
                name,
                gender,
                date_of_birth,
                marital_status,
                profile_created_by,
                mobile,
                whatsapp,
                sect,
                mother_tongue,
                country,
                state,
                city,
                education,
                occupation,
                income,
                complexion,
                caste,
                height,
                diet,
                father_name,
                mother_name,
                father_occupation,
                mother_occupation,
                siblings,
                family_type,
                about,
                photo
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, COALESCE($12, 'India'), $13, $14, $15, $16, $17, $18, $19, $20,
                COALESCE($21, 'Halal'), $22, $23, $24, $25, $26, $27, $28, $29
            )
        ";

        sqlx::query(sql)
            .bind(id)
            .bind(account_id)
            .bind(request.name.as_ref())
            .bind(request.gender)
            .bind(request.date_of_birth)
            .bind(request.marital_status.as_ref())
            .bind(request.profile_created_by.as_ref())
            .bind(request.mobile.as_ref())
            .bind(request.whatsapp.as_ref())
            .bind(request.sect.as_ref())
            .bind(request.mother_tongue.as_ref())
            .bind(request.country.as_ref())
            .bind(request.state.as_ref())
            .bind(request.city.as_ref())
            .bind(request.education.as_ref())
            .bind(request.occupation.as_ref())
            .bind(request.income.as_ref())
            .bind(request.complexion.as_ref())
            .bind(request.caste.as_ref())
            .bind(request.height.as_ref())
            .bind(request.diet.as_ref())
            .bind(request.father_name.as_ref())
            .bind(request.mother_name.as_ref())
            .bind(request.father_occupation.as_ref())
            .bind(request.mother_occupation.as_ref())
            .bind(request.siblings.as_ref())
            .bind(request.family_type.as_ref())
            .bind(request.about.as_ref())
            .bind(request.photo.as_ref())
            .execute(&mut tx)
            .await?;

        tx.commit().await?;

        tracing::trace!(
            account_uuid = account_uuid.to_string(),
            uuid = id.to_string(),
            "profile created"
        );

        self.read_one(&id).await
    }

    /// Partial update; absent fields keep their stored value.
    pub async fn update(&self, uuid: &Uuid, request: UpdateProfile) -> Result<Profile> {
        let mut tx = self.database.transaction().await?;

        let sql = r"
            UPDATE
                profiles
            SET
                name = COALESCE($2, name),
                gender = COALESCE($3, gender),
                date_of_birth = COALESCE($4, date_of_birth),
                marital_status = COALESCE($5, marital_status),
                mobile = COALESCE($6, mobile),
                whatsapp = COALESCE($7, whatsapp),
                sect = COALESCE($8, sect),
                mother_tongue = COALESCE($9, mother_tongue),
                country = COALESCE($10, country),
                state = COALESCE($11, state),
                city = COALESCE($12, city),
                education = COALESCE($13, education),
                occupation = COALESCE($14, occupation),
                income = COALESCE($15, income),
                complexion = COALESCE($16, complexion),
                caste = COALESCE($17, caste),
                height = COALESCE($18, height),
                diet = COALESCE($19, diet),
                father_name = COALESCE($20, father_name),
                mother_name = COALESCE($21, mother_name),
                father_occupation = COALESCE($22, father_occupation),
                mother_occupation = COALESCE($23, mother_occupation),
                siblings = COALESCE($24, siblings),
                family_type = COALESCE($25, family_type),
                about = COALESCE($26, about),
                photo = COALESCE($27, photo),
                updated_at = NOW()
            WHERE
                uuid = $1
                AND
                deleted = false
            RETURNING uuid
        ";

        let updated: Option<(Uuid,)> = sqlx::query_as(sql)
            .bind(uuid)
            .bind(request.name.as_ref())
            .bind(request.gender)
            .bind(request.date_of_birth)
            .bind(request.marital_status.as_ref())
            .bind(request.mobile.as_ref())
            .bind(request.whatsapp.as_ref())
            .bind(request.sect.as_ref())
            .bind(request.mother_tongue.as_ref())
            .bind(request.country.as_ref())
            .bind(request.state.as_ref())
            .bind(request.city.as_ref())
            .bind(request.education.as_ref())
            .bind(request.occupation.as_ref())
            .bind(request.income.as_ref())
            .bind(request.complexion.as_ref())
            .bind(request.caste.as_ref())
            .bind(request.height.as_ref())
            .bind(request.diet.as_ref())
            .bind(request.father_name.as_ref())
            .bind(request.mother_name.as_ref())
            .bind(request.father_occupation.as_ref())
            .bind(request.mother_occupation.as_ref())
            .bind(request.siblings.as_ref())
            .bind(request.family_type.as_ref())
            .bind(request.about.as_ref())
            .bind(request.photo.as_ref())
            .fetch_optional(&mut tx)
            .await?;

        tx.commit().await?;

        if updated.is_none() {
            return Err(RepositoryError::NotFound {
                entity_type: ENTITY_PROFILE.to_string(),
                id: ShortId::from_uuid(uuid).to_string(),
            });
        }

        tracing::trace!(uuid = uuid.to_string(), "profile updated");

        self.read_one(uuid).await
    }

    pub async fn set_review_status(&self, uuid: &Uuid, status: ReviewStatus) -> Result<Profile> {
        let mut tx = self.database.transaction().await?;

        let sql = r"
            UPDATE
                profiles
            SET
                review_status = $2,
                updated_at = NOW()
            WHERE
                uuid = $1
                AND
                deleted = false
            RETURNING uuid
        ";

        let updated: Option<(Uuid,)> = sqlx::query_as(sql)
            .bind(uuid)
            .bind(status)
            .fetch_optional(&mut tx)
            .await?;

        tx.commit().await?;

        if updated.is_none() {
            return Err(RepositoryError::NotFound {
                entity_type: ENTITY_PROFILE.to_string(),
                id: ShortId::from_uuid(uuid).to_string(),
            });
        }

        tracing::trace!(
            uuid = uuid.to_string(),
            status = format!("{:?}", status),
            "profile review status set"
        );

        self.read_one(uuid).await
    }

    pub async fn delete(&self, uuid: &Uuid) -> Result<bool> {
        let mut tx = self.database.transaction().await?;

        let sql = r"
            UPDATE profiles
            SET
                deleted = true,
                deleted_at = NOW()
            WHERE
                uuid = $1
                AND
                deleted = false
        ";

        let deleted = sqlx::query(sql)
            .bind(uuid)
            .execute(&mut tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;

        if deleted {
            tracing::trace!(uuid = uuid.to_string(), "profile deleted");
        } else {
            tracing::trace!(uuid = uuid.to_string(), "no such profile, nothing deleted");
        }

        Ok(deleted)
    }
}
