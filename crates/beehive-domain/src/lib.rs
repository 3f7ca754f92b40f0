//! Wire and domain types shared by the Beehive client crates.

pub mod error;
pub mod identifiers;
pub mod legacy;
pub mod pull_request;
pub mod rating;
pub mod review;
pub mod work;

pub use error::DomainError;
pub use identifiers::{WorkId, WorkRecordId};
pub use legacy::parse_legacy_task_metadata;
pub use pull_request::{parse_pull_request_url, validate_pull_request_url, PullRequestUrl};
pub use rating::{RatingSubject, ReviewOutcome};
pub use review::{AutomatedReview, CategoryReview, ReviewCategory};
pub use work::{Priority, TaskMetadata, WorkItem, WorkRecord, WorkType};
