//! Async work-session controller over the Beehive API gateway.

mod clock;
mod controller;
mod error;
mod ratings;
mod review;
mod ticker;

pub use clock::{SessionClock, SystemClock};
pub use controller::{LoadOutcome, LoadRequest, SessionController, Skipped};
pub use error::SessionError;
pub use ratings::submit_ratings;
pub use review::resolve_review;
pub use ticker::{CheckpointLoop, DeadlineTicker};
