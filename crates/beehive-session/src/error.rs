use beehive_api::ApiError;
use beehive_core::{ActionErrorKind, RatingError, SessionPhaseKind, SessionTransitionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Action(#[from] ActionErrorKind),
    #[error(transparent)]
    Transition(#[from] SessionTransitionError),
    #[error(transparent)]
    Rating(#[from] RatingError),
    #[error("cannot {operation} while the session is in phase {phase:?}")]
    NotAllowed {
        operation: &'static str,
        phase: SessionPhaseKind,
    },
    #[error("another session request is still in flight")]
    Busy,
    #[error("failed to load work: {0}")]
    Fetch(ApiError),
}

impl SessionError {
    pub fn action_kind(&self) -> Option<ActionErrorKind> {
        match self {
            Self::Action(kind) => Some(*kind),
            _ => None,
        }
    }
}
