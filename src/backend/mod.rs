// ABOUTME: Consumed collaborator boundaries, defined as async traits.
// ABOUTME: Access control, job dispatch, notification, and environment lookups.

mod access;
mod dispatch;
mod environment;
mod notify;

pub use access::AccessControl;
pub use dispatch::{DispatchError, JobDispatcher};
pub use environment::{CommitDetails, EnvironmentBackend, EnvironmentError, ProjectMember};
pub use notify::{Notifier, NotifyError};
