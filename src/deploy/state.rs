// ABOUTME: Deployment lifecycle states and the explicit transition table.
// ABOUTME: Every state change is validated against this table; nothing bypasses it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a deployment is in its life, from planning to a terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Strategy attached, not yet submitted.
    Created,
    /// Awaiting approval or queueing.
    Submitted,
    /// Handed to the job dispatcher.
    Queued,
    /// The job dispatcher reported the job has started.
    Running,
    /// Terminal: the job finished successfully.
    Completed,
    /// Terminal: the job failed, or enqueueing it did.
    Failed,
    /// Terminal: the job stopped in response to an abort signal.
    Aborted,
}

impl State {
    /// States that hold an environment busy: at most one deployment per
    /// environment may be in one of these at a time.
    pub fn is_active(&self) -> bool {
        matches!(self, State::Queued | State::Running)
    }

    /// Terminal states never leave again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Completed | State::Failed | State::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Created => "created",
            State::Submitted => "submitted",
            State::Queued => "queued",
            State::Running => "running",
            State::Completed => "completed",
            State::Failed => "failed",
            State::Aborted => "aborted",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested change to a deployment's lifecycle.
///
/// `Submit`, `Queue`, and `Abort` are driven by callers; the `Mark*` rows are
/// driven by the external job runner reporting progress and outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Queue,
    Abort,
    MarkRunning,
    MarkCompleted,
    MarkFailed,
    MarkAborted,
}

impl Transition {
    /// The states this transition may be applied from.
    ///
    /// Queue also accepts `Created` for bypass/auto-approve flows.
    pub fn valid_from(&self) -> &'static [State] {
        match self {
            Transition::Submit => &[State::Created],
            Transition::Queue => &[State::Submitted, State::Created],
            Transition::Abort => &[State::Queued, State::Running],
            Transition::MarkRunning => &[State::Queued],
            Transition::MarkCompleted => &[State::Running],
            Transition::MarkFailed => &[State::Queued, State::Running],
            Transition::MarkAborted => &[State::Queued, State::Running],
        }
    }

    /// The state this transition moves the record into.
    ///
    /// Abort returns `None`: it only sets the advisory signal, and the
    /// terminal state arrives later from the job-outcome report.
    pub fn target(&self) -> Option<State> {
        match self {
            Transition::Submit => Some(State::Submitted),
            Transition::Queue => Some(State::Queued),
            Transition::Abort => None,
            Transition::MarkRunning => Some(State::Running),
            Transition::MarkCompleted => Some(State::Completed),
            Transition::MarkFailed => Some(State::Failed),
            Transition::MarkAborted => Some(State::Aborted),
        }
    }

    pub fn permits(&self, from: State) -> bool {
        self.valid_from().contains(&from)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Submit => "submit",
            Transition::Queue => "queue",
            Transition::Abort => "abort",
            Transition::MarkRunning => "mark-running",
            Transition::MarkCompleted => "mark-completed",
            Transition::MarkFailed => "mark-failed",
            Transition::MarkAborted => "mark-aborted",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [State; 7] = [
        State::Created,
        State::Submitted,
        State::Queued,
        State::Running,
        State::Completed,
        State::Failed,
        State::Aborted,
    ];

    #[test]
    fn submit_only_from_created() {
        for state in ALL_STATES {
            assert_eq!(Transition::Submit.permits(state), state == State::Created);
        }
    }

    #[test]
    fn queue_from_submitted_or_created() {
        for state in ALL_STATES {
            let expected = matches!(state, State::Submitted | State::Created);
            assert_eq!(Transition::Queue.permits(state), expected);
        }
    }

    #[test]
    fn abort_only_from_active_states() {
        for state in ALL_STATES {
            assert_eq!(Transition::Abort.permits(state), state.is_active());
        }
    }

    #[test]
    fn terminal_states_permit_nothing() {
        let transitions = [
            Transition::Submit,
            Transition::Queue,
            Transition::Abort,
            Transition::MarkRunning,
            Transition::MarkCompleted,
            Transition::MarkFailed,
            Transition::MarkAborted,
        ];
        for state in ALL_STATES.into_iter().filter(State::is_terminal) {
            for transition in transitions {
                assert!(
                    !transition.permits(state),
                    "{transition} should not be valid from {state}"
                );
            }
        }
    }

    #[test]
    fn abort_has_no_target_state() {
        assert_eq!(Transition::Abort.target(), None);
    }
}
