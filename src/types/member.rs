// ABOUTME: Identity of a person interacting with deployments.
// ABOUTME: Carried on records as deployer/approver and used for permission checks.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::MemberId;

/// A person known to the project: the requester of a deployment, its approver,
/// or the subject of a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(id),
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
