use chrono::{DateTime, Utc};
use rishta_core::auth::Role;
use uuid::Uuid;

use crate::{
    database::Database,
    mask,
    repository::{profile::Gender, RepositoryError, Result},
    shortid::ShortId,
};

const ENTITY_ACCOUNT: &str = "account";

#[derive(sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub gender: Option<Gender>,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    Administrator,
    Member,
}

impl From<AccountRole> for Role {
    fn from(role: AccountRole) -> Self {
        match role {
            AccountRole::Administrator => Role::Administrator,
            AccountRole::Member => Role::Member,
        }
    }
}

pub struct CreateAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub gender: Option<Gender>,
}

pub struct MemberStats {
    pub total_members: i64,
    pub male: i64,
    pub female: i64,
}

#[derive(Clone)]
pub struct AccountRepository {
    database: Database,
}

impl AccountRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn read_one(&self, uuid: &Uuid) -> Result<Account> {
        let mut conn = self.database.connection().await?;

        tracing::trace!(uuid = uuid.to_string(), "reading account");

        let sql = r"
            SELECT
                *
            FROM
                accounts
            WHERE
                uuid = $1
                AND
                deleted = false
        ";

        sqlx::query_as(sql)
            .bind(uuid)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity_type: ENTITY_ACCOUNT.to_string(),
                id: ShortId::from_uuid(uuid).to_string(),
            })
    }

    pub async fn read_all(&self) -> Result<Vec<Account>> {
        let mut conn = self.database.connection().await?;

        tracing::trace!("reading accounts");

        let sql = r"
            SELECT
                *
            FROM
                accounts
            WHERE
                deleted = false
            ORDER BY
                id
        ";

        Ok(sqlx::query_as(sql).fetch_all(&mut *conn).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let mut conn = self.database.connection().await?;

        tracing::trace!(email = mask::email(email), "looking up account by email");

        let sql = r"
            SELECT
                *
            FROM
                accounts
            WHERE
                email = $1
                AND
                deleted = false
        ";

        Ok(sqlx::query_as(sql)
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?)
    }

    /// Internal primary key lookup used when inserting rows that reference an
    /// account.
    pub(crate) async fn get_id(&self, uuid: &Uuid) -> Result<i64> {
        let mut conn = self.database.connection().await?;

        let sql = r"
            SELECT
                id
            FROM
                accounts
            WHERE
                uuid = $1
                AND
                deleted = false
        ";

        let result: Option<(i64,)> = sqlx::query_as(sql)
            .bind(uuid)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(result) = result {
            Ok(result.0)
        } else {
            Err(RepositoryError::NotFound {
                entity_type: ENTITY_ACCOUNT.to_string(),
                id: ShortId::from_uuid(uuid).to_string(),
            })
        }
    }

    pub async fn create(&self, request: CreateAccount) -> Result<Account> {
        let mut tx = self.database.transaction().await?;

        let id = Uuid::new_v4();

        let sql = r"
            INSERT INTO accounts (
                uuid,
                name,
                email,
                password_hash,
                gender
            ) VALUES (
                $1,
                $2,
                $3,
                $4,
                $5
            ) RETURNING *
        ";

        let account: Account = sqlx::query_as(sql)
            .bind(id)
            .bind(&request.name)
            .bind(&request.email)
            .bind(&request.password_hash)
            .bind(request.gender)
            .fetch_one(&mut tx)
            .await?;

        tx.commit().await?;

        tracing::trace!(
            uuid = id.to_string(),
            email = mask::email(&request.email),
            "account created"
        );

        Ok(account)
    }

    /// Insert-or-promote the bootstrap administrator account. Resolved once
    /// at startup; login then uses the ordinary account path.
    pub async fn ensure_administrator(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Account> {
        let mut tx = self.database.transaction().await?;

        let id = Uuid::new_v4();

        let sql = r"
            INSERT INTO accounts (
                uuid,
                name,
                email,
                password_hash,
                role
            ) VALUES (
                $1,
                $2,
                $3,
                $4,
                'ADMINISTRATOR'
            )
            ON CONFLICT (email) WHERE deleted = false
            DO UPDATE SET
                role = 'ADMINISTRATOR',
                password_hash = EXCLUDED.password_hash,
                updated_at = NOW()
            RETURNING *
        ";

        let account: Account = sqlx::query_as(sql)
            .bind(id)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&mut tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            uuid = account.uuid.to_string(),
            email = mask::email(email),
            "administrator account resolved"
        );

        Ok(account)
    }

    /// Soft-deletes the account and any profile it owns.
    pub async fn delete(&self, uuid: &Uuid) -> Result<bool> {
        let mut tx = self.database.transaction().await?;

        let sql = r"
            UPDATE accounts
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

        if deleted {
            let sql = r"
                UPDATE profiles
                SET
                    deleted = true,
                    deleted_at = NOW()
                WHERE
                    deleted = false
                    AND
                    account_id = (SELECT id FROM accounts WHERE uuid = $1)
            ";

            sqlx::query(sql).bind(uuid).execute(&mut tx).await?;
        }

        tx.commit().await?;

        if deleted {
            tracing::trace!(uuid = uuid.to_string(), "account deleted");
        } else {
            tracing::trace!(uuid = uuid.to_string(), "no such account, nothing deleted");
        }

        Ok(deleted)
    }

    pub async fn member_stats(&self) -> Result<MemberStats> {
        let mut conn = self.database.connection().await?;

        let sql = r"
            SELECT
                COUNT(*) FILTER (WHERE role = 'MEMBER') AS total_members,
                COUNT(*) FILTER (WHERE role = 'MEMBER' AND gender = 'MALE') AS male,
                COUNT(*) FILTER (WHERE role = 'MEMBER' AND gender = 'FEMALE') AS female
            FROM
                accounts
            WHERE
                deleted = false
        ";

        let (total_members, male, female): (i64, i64, i64) =
            sqlx::query_as(sql).fetch_one(&mut *conn).await?;

        Ok(MemberStats {
            total_members,
            male,
            female,
        })
    }
}
