// ABOUTME: The deployment lifecycle core: records, state machine, strategy, log, store.
// ABOUTME: Exports the orchestrator as the externally callable surface.

mod deployment;
mod log;
mod machine;
mod orchestrator;
mod state;
mod store;
mod strategy;

pub use deployment::{AbortSignal, Deployment};
pub use log::{DeploymentLog, LogDirectory, LogError, NO_ACTIVITY};
pub use machine::StateMachine;
pub use orchestrator::{JobOutcome, Orchestrator};
pub use state::{State, Transition};
pub use store::DeploymentStore;
pub use strategy::{
    Change, DeploymentStrategy, EnvironmentSnapshot, OptionMapError, StrategyOptions,
};
