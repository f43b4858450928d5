// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Phantom-typed ids, revision identity, and member identity.

mod id;
mod member;
mod revision;

pub use id::{DeploymentId, EnvironmentId, Id, JobToken, MemberId};
pub use member::Member;
pub use revision::{RefType, Sha, ShaError};
