//! Lifecycle of a persistence session.
//!
//! ```text
//! NotStarted ──> CommitStarted ──> Committed
//!     │               ├──> PrepareFailed ──┐
//!     │               └──> CommitFailed ───┤
//!     └────────────────────────────────────┴──> RollingBack ──> RolledBack
//!                                                    └──> RollbackFailed
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PersistError, PersistResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    NotStarted,
    CommitStarted,
    PrepareFailed,
    Committed,
    CommitFailed,
    RollingBack,
    RolledBack,
    RollbackFailed,
}

impl SessionState {
    pub const ALL: [SessionState; 8] = [
        Self::NotStarted,
        Self::CommitStarted,
        Self::PrepareFailed,
        Self::Committed,
        Self::CommitFailed,
        Self::RollingBack,
        Self::RolledBack,
        Self::RollbackFailed,
    ];

    /// Returns `true` if `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (NotStarted, CommitStarted)
                | (NotStarted, RollingBack)
                | (CommitStarted, PrepareFailed)
                | (CommitStarted, Committed)
                | (CommitStarted, CommitFailed)
                | (PrepareFailed, RollingBack)
                | (CommitFailed, RollingBack)
                | (RollingBack, RolledBack)
                | (RollingBack, RollbackFailed)
        )
    }

    /// The state after `self -> to`, or [`PersistError::IllegalTransition`].
    pub fn transition(self, to: SessionState) -> PersistResult<SessionState> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(PersistError::IllegalTransition { from: self, to })
        }
    }

    /// Rollback may start from here.
    pub fn can_rollback(self) -> bool {
        self.can_transition_to(Self::RollingBack)
    }

    /// Operations and reads are accepted only before commit starts.
    pub fn is_open(self) -> bool {
        self == Self::NotStarted
    }

    /// No further transition is possible.
    pub fn is_terminal(self) -> bool {
        Self::ALL.iter().all(|to| !self.can_transition_to(*to))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::CommitStarted => "commit started",
            Self::PrepareFailed => "prepare failed",
            Self::Committed => "committed",
            Self::CommitFailed => "commit failed",
            Self::RollingBack => "rolling back",
            Self::RolledBack => "rolled back",
            Self::RollbackFailed => "rollback failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;
    use super::*;

    #[test]
    fn legal_transitions_are_exactly_the_lifecycle() {
        let legal = [
            (NotStarted, CommitStarted),
            (NotStarted, RollingBack),
            (CommitStarted, PrepareFailed),
            (CommitStarted, Committed),
            (CommitStarted, CommitFailed),
            (PrepareFailed, RollingBack),
            (CommitFailed, RollingBack),
            (RollingBack, RolledBack),
            (RollingBack, RollbackFailed),
        ];
        for from in SessionState::ALL {
            for to in SessionState::ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(from.can_transition_to(to), expected, "{from} -> {to}");
                match from.transition(to) {
                    Ok(next) => {
                        assert!(expected);
                        assert_eq!(next, to);
                    }
                    Err(e) => {
                        assert!(!expected);
                        assert_eq!(e, PersistError::IllegalTransition { from, to });
                    }
                }
            }
        }
    }

    #[test]
    fn rollback_is_allowed_only_before_or_after_a_failed_commit() {
        let allowed: Vec<_> = SessionState::ALL
            .into_iter()
            .filter(|s| s.can_rollback())
            .collect();
        assert_eq!(allowed, vec![NotStarted, PrepareFailed, CommitFailed]);
    }

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = SessionState::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![Committed, RolledBack, RollbackFailed]);
        assert!(NotStarted.is_open());
        assert!(!CommitStarted.is_open());
    }
}
