use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("priority must be between 1 and 4, got {0}")]
    InvalidPriority(u8),
    #[error("unknown rating subject '{0}'")]
    UnknownRatingSubject(String),
}
