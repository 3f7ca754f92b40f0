//! Pure work-session core: error taxonomy, rating collection, deadline
//! arithmetic, and the session state machine. Nothing here performs I/O.

pub mod clock;
pub mod error;
pub mod ratings;
pub mod session;
pub mod state;

pub use clock::{DeadlineClock, DeadlineSnapshot, DEFAULT_MAX_WORK_DURATION};
pub use error::{server_error_message, ActionErrorKind};
pub use ratings::{RatingEntry, RatingError, RatingRequest, UserRatings, MAX_FEEDBACK_CHARS};
pub use session::{
    apply_session_transition, ActiveStep, SessionEvent, SessionEventKind, SessionPhase,
    SessionPhaseKind, SessionTransitionError,
};
pub use state::{SessionState, WorkFetchError};
