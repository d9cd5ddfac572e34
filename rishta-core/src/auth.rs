use serde::{Deserialize, Serialize};

/// Role carried in the `roles` claim of an issued token.
///
/// Administrators review, edit and export profiles; members own at most one
/// profile of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Administrator,
    Member,
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        match self {
            Role::Administrator => "ADMINISTRATOR",
            Role::Member => "MEMBER",
        }
    }
}
