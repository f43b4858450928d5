// ABOUTME: Revision identity types: validated commit hashes and ref kinds.
// ABOUTME: Ensures shas are well-formed hex before they enter a deployment record.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShaError {
    #[error("sha cannot be empty")]
    Empty,

    #[error("sha must be between 7 and 40 characters, got {0}")]
    BadLength(usize),

    #[error("invalid character in sha: '{0}'")]
    InvalidChar(char),
}

/// A git commit hash, full or abbreviated (7 to 40 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha(String);

impl Sha {
    pub fn new(value: &str) -> Result<Self, ShaError> {
        if value.is_empty() {
            return Err(ShaError::Empty);
        }
        if value.len() < 7 || value.len() > 40 {
            return Err(ShaError::BadLength(value.len()));
        }
        for c in value.chars() {
            if !c.is_ascii_hexdigit() || c.is_ascii_uppercase() {
                return Err(ShaError::InvalidChar(c));
            }
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The abbreviated form shown in listings: the first 7 characters.
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Sha {
    type Error = ShaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Sha::new(&value)
    }
}

impl From<Sha> for String {
    fn from(sha: Sha) -> Self {
        sha.0
    }
}

/// What kind of reference the requester asked to deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Branch,
    Tag,
    Sha,
}

impl RefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefType::Branch => "branch",
            RefType::Tag => "tag",
            RefType::Sha => "sha",
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RefType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "branch" => Ok(RefType::Branch),
            "tag" => Ok(RefType::Tag),
            "sha" => Ok(RefType::Sha),
            other => Err(format!("unknown ref type: {other}")),
        }
    }
}
