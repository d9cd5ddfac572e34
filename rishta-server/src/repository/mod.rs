use miette::Diagnostic;
use thiserror::Error;

use crate::database::Database;

pub mod account;
pub mod profile;

use account::AccountRepository;
use profile::ProfileRepository;

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, Error, Diagnostic)]
pub enum RepositoryError {
    #[error("{entity_type} with ID {id} does not exist")]
    #[diagnostic(code(rishta::error::not_found))]
    NotFound { entity_type: String, id: String },
    #[error("query failed: {0}")]
    #[diagnostic(code(rishta::error::database))]
    DatabaseError(#[from] sqlx::Error),
}

impl RepositoryError {
    pub fn is_unique_constraint_violation(&self) -> bool {
        if let RepositoryError::DatabaseError(sqlx::Error::Database(e)) = self {
            matches!(e.code().as_deref(), Some("23505"))
        } else {
            false
        }
    }
}

#[derive(Clone)]
pub struct Repository {
    account: AccountRepository,
    profile: ProfileRepository,
}

impl Repository {
    pub fn new(database: Database) -> Self {
        let account = AccountRepository::new(database.clone());
        let profile = ProfileRepository::new(database, account.clone());
        Self { account, profile }
    }

    pub fn account(&self) -> &AccountRepository {
        &self.account
    }

    pub fn profile(&self) -> &ProfileRepository {
        &self.profile
    }
}
