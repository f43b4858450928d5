// ABOUTME: In-memory deployment record store with environment-scoped queries.
// ABOUTME: Records are never deleted; a submitted deployment is permanent audit history.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{DeploymentId, EnvironmentId};

use super::deployment::Deployment;

/// Holds every deployment record. The persistence mechanics behind a real
/// CMS/ORM are out of scope; this store keeps the same contract: get,
/// persist, query by environment, never delete.
#[derive(Default)]
pub struct DeploymentStore {
    records: RwLock<HashMap<DeploymentId, Deployment>>,
    next_id: AtomicU64,
}

impl DeploymentStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next record id.
    pub fn allocate_id(&self) -> DeploymentId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        DeploymentId::new(n.to_string())
    }

    pub fn get(&self, id: &DeploymentId) -> Option<Deployment> {
        self.records.read().get(id).cloned()
    }

    /// Insert or overwrite the record.
    pub fn persist(&self, deployment: &Deployment) {
        self.records
            .write()
            .insert(deployment.id.clone(), deployment.clone());
    }

    /// Finished deployments for an environment, most recently started first.
    pub fn history(&self, environment: &EnvironmentId) -> Vec<Deployment> {
        let mut list: Vec<Deployment> = self
            .records
            .read()
            .values()
            .filter(|d| &d.environment == environment && d.state.is_terminal())
            .cloned()
            .collect();
        list.sort_by(|a, b| b.started_or_created().cmp(&a.started_or_created()));
        list
    }

    /// Deployments for an environment that have not finished yet, oldest first.
    pub fn upcoming(&self, environment: &EnvironmentId) -> Vec<Deployment> {
        let mut list: Vec<Deployment> = self
            .records
            .read()
            .values()
            .filter(|d| &d.environment == environment && !d.state.is_terminal())
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created.cmp(&b.created));
        list
    }

    /// The deployment currently holding the environment busy (queued or
    /// running), excluding the given record.
    pub fn active_for_environment(
        &self,
        environment: &EnvironmentId,
        excluding: &DeploymentId,
    ) -> Option<Deployment> {
        self.records
            .read()
            .values()
            .find(|d| &d.environment == environment && &d.id != excluding && d.state.is_active())
            .cloned()
    }
}
