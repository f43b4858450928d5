// ABOUTME: Deployment strategy: requested options plus the computed diff.
// ABOUTME: Pure planning against an environment snapshot; lossless option-map round trip.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{DeploymentId, EnvironmentId, Member, RefType, Sha};

use super::State;
use super::deployment::Deployment;

const KEY_SHA: &str = "sha";
const KEY_REF_TYPE: &str = "ref_type";
const KEY_BRANCH: &str = "branch";
const KEY_SUMMARY: &str = "summary";

/// Errors decoding a flat option map into strategy options.
#[derive(Debug, thiserror::Error)]
pub enum OptionMapError {
    #[error("missing required option: {0}")]
    MissingKey(&'static str),

    #[error("invalid ref type: {0}")]
    BadRefType(String),
}

/// What the requester asked to deploy.
///
/// `revision` is the reference as requested (branch name, tag, or sha); the
/// plan resolves it to a concrete commit. Extra caller-supplied parameters
/// survive the option-map round trip untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyOptions {
    pub revision: String,
    pub ref_type: RefType,
    pub branch: String,
    pub summary: String,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl StrategyOptions {
    pub fn new(revision: impl Into<String>, ref_type: RefType, branch: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            ref_type,
            branch: branch.into(),
            summary: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Decode from a flat string map. The four core keys are required; any
    /// other keys are kept as extra parameters.
    pub fn from_option_map(map: &BTreeMap<String, String>) -> Result<Self, OptionMapError> {
        let mut extra = map.clone();
        let revision = extra
            .remove(KEY_SHA)
            .ok_or(OptionMapError::MissingKey(KEY_SHA))?;
        let ref_type = extra
            .remove(KEY_REF_TYPE)
            .ok_or(OptionMapError::MissingKey(KEY_REF_TYPE))?
            .parse::<RefType>()
            .map_err(OptionMapError::BadRefType)?;
        let branch = extra
            .remove(KEY_BRANCH)
            .ok_or(OptionMapError::MissingKey(KEY_BRANCH))?;
        let summary = extra
            .remove(KEY_SUMMARY)
            .ok_or(OptionMapError::MissingKey(KEY_SUMMARY))?;

        Ok(Self {
            revision,
            ref_type,
            branch,
            summary,
            extra,
        })
    }

    /// Encode to a flat string map. Inverse of [`from_option_map`]: encoding
    /// then decoding yields an equal option set.
    ///
    /// [`from_option_map`]: StrategyOptions::from_option_map
    pub fn to_option_map(&self) -> BTreeMap<String, String> {
        let mut map = self.extra.clone();
        map.insert(KEY_SHA.to_string(), self.revision.clone());
        map.insert(KEY_REF_TYPE.to_string(), self.ref_type.as_str().to_string());
        map.insert(KEY_BRANCH.to_string(), self.branch.clone());
        map.insert(KEY_SUMMARY.to_string(), self.summary.clone());
        map
    }
}

/// One entry in the diff between the current build and the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub name: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// What the orchestrator needs to know about an environment to plan against
/// it: its current build and the resolved target commit.
#[derive(Debug, Clone)]
pub struct EnvironmentSnapshot {
    pub environment: EnvironmentId,
    pub current_build: Option<Deployment>,
    pub resolved_sha: Sha,
}

/// The computed plan for a candidate deployment: requested options, the
/// resolved target commit, and how it differs from the current build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStrategy {
    pub environment: EnvironmentId,
    pub options: StrategyOptions,
    pub sha: Sha,
    pub changes: Vec<Change>,
}

impl DeploymentStrategy {
    /// Compute the plan. Pure: the same snapshot and options always produce
    /// the same strategy.
    pub fn plan(snapshot: &EnvironmentSnapshot, options: StrategyOptions) -> Self {
        let current = snapshot.current_build.as_ref();

        let mut changes = Vec::new();
        push_change(
            &mut changes,
            "Code version",
            current.map(|d| d.sha.to_string()),
            Some(snapshot.resolved_sha.to_string()),
        );
        push_change(
            &mut changes,
            "Branch",
            current.map(|d| d.branch.clone()),
            Some(options.branch.clone()),
        );
        push_change(
            &mut changes,
            "Ref type",
            current.map(|d| d.ref_type.as_str().to_string()),
            Some(options.ref_type.as_str().to_string()),
        );

        Self {
            environment: snapshot.environment.clone(),
            options,
            sha: snapshot.resolved_sha.clone(),
            changes,
        }
    }

    /// Materialize a new deployment record in state `Created`.
    ///
    /// The record is not yet persisted or submitted; the orchestrator does
    /// both as part of the submit operation.
    pub fn create_deployment(
        &self,
        id: DeploymentId,
        deployer: Member,
        approver: Option<Member>,
    ) -> Deployment {
        let now = Utc::now();
        Deployment {
            id,
            environment: self.environment.clone(),
            sha: self.sha.clone(),
            branch: self.options.branch.clone(),
            ref_type: self.options.ref_type,
            summary: self.options.summary.clone(),
            strategy: self.clone(),
            state: State::Created,
            deployer,
            approver,
            job_token: None,
            signal: None,
            created: now,
            requested: None,
            started: None,
            last_updated: now,
        }
    }
}

/// Record a diff entry, skipping fields that did not change.
fn push_change(
    changes: &mut Vec<Change>,
    name: &str,
    from: Option<String>,
    to: Option<String>,
) {
    if from != to {
        changes.push(Change {
            name: name.to_string(),
            from,
            to,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> StrategyOptions {
        let mut opts = StrategyOptions::new("main", RefType::Branch, "main")
            .with_summary("release the fix");
        opts.extra
            .insert("bypass_approval".to_string(), "1".to_string());
        opts
    }

    #[test]
    fn option_map_round_trips() {
        let opts = options();
        let map = opts.to_option_map();
        let decoded = StrategyOptions::from_option_map(&map).unwrap();
        assert_eq!(decoded, opts);
        assert_eq!(decoded.to_option_map(), map);
    }

    #[test]
    fn missing_core_key_is_rejected() {
        let mut map = options().to_option_map();
        map.remove("ref_type");
        let err = StrategyOptions::from_option_map(&map).unwrap_err();
        assert!(matches!(err, OptionMapError::MissingKey("ref_type")));
    }

    #[test]
    fn bad_ref_type_is_rejected() {
        let mut map = options().to_option_map();
        map.insert("ref_type".to_string(), "bogus".to_string());
        let err = StrategyOptions::from_option_map(&map).unwrap_err();
        assert!(matches!(err, OptionMapError::BadRefType(_)));
    }

    #[test]
    fn plan_against_empty_environment_lists_all_fields() {
        let snapshot = EnvironmentSnapshot {
            environment: EnvironmentId::new("uat"),
            current_build: None,
            resolved_sha: Sha::new("abc1234def5678").unwrap(),
        };
        let strategy = DeploymentStrategy::plan(&snapshot, options());
        assert!(!strategy.changes.is_empty());
        assert_eq!(strategy.changes[0].name, "Code version");
        assert_eq!(strategy.changes[0].from, None);
        assert_eq!(
            strategy.changes[0].to,
            Some("abc1234def5678".to_string())
        );
    }

    #[test]
    fn plan_is_deterministic() {
        let snapshot = EnvironmentSnapshot {
            environment: EnvironmentId::new("uat"),
            current_build: None,
            resolved_sha: Sha::new("abc1234def5678").unwrap(),
        };
        let first = DeploymentStrategy::plan(&snapshot, options());
        let second = DeploymentStrategy::plan(&snapshot, options());
        assert_eq!(first, second);
    }
}
