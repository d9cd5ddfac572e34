use std::str::FromStr;

use harsh::Harsh;
use lazy_static::lazy_static;
use miette::Diagnostic;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

lazy_static! {
    static ref HARSH: Harsh = Harsh::builder().salt("app.rishta").build().unwrap();
}

/// Obfuscated public identifier for a UUID-keyed row.
#[derive(Debug, Clone, Copy)]
pub struct ShortId(Uuid);

impl ShortId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: &Uuid) -> Self {
        id.into()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for ShortId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ShortId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<&Uuid> for ShortId {
    fn from(id: &Uuid) -> Self {
        Self(*id)
    }
}

impl From<ShortId> for Uuid {
    fn from(id: ShortId) -> Self {
        id.0
    }
}

impl From<&ShortId> for Uuid {
    fn from(id: &ShortId) -> Self {
        id.0
    }
}

impl FromStr for ShortId {
    type Err = ParseShortIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = HARSH
            .decode(s)
            .map_err(|_| ParseShortIdError::DecodeFailure)?;
        if decoded.len() != 2 {
            return Err(ParseShortIdError::DecodeFailure);
        }
        Ok(Self(Uuid::from_u128(
            decoded[0] as u128 | ((decoded[1] as u128) << 64),
        )))
    }
}

impl ToString for ShortId {
    fn to_string(&self) -> String {
        let n = self.0.as_u128();
        let hi = (n >> 64) as u64;
        let lo = n as u64;
        HARSH.encode(&[lo, hi])
    }
}

impl PartialEq for ShortId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseShortIdError {
    #[error("not a valid identifier")]
    #[diagnostic(code(rishta::error::bad_argument))]
    DecodeFailure,
}

impl Serialize for ShortId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ShortId {
    fn deserialize<D>(deserializer: D) -> Result<ShortId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
