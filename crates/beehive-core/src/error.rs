use std::fmt;

use serde::{Deserialize, Serialize};

const UNKNOWN_ERROR_MESSAGE: &str = "Something went wrong. Please try again later.";

/// User-facing failure of the last session action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    Rating,
    RatingInvalid,
    QaToggle,
    AnalyzeNoChanges,
    AnalyzeUnexpectedError,
    ReviewWorkRecordNotFound,
    ReviewWorkUnauthorized,
    ReviewUnexpectedError,
    PackageBuiltin,
    SolutionUrlMissing,
    SolutionUrlInvalid,
    FeedbackMissing,
    Unknown,
}

impl ActionErrorKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::RatingInvalid => "rating_invalid",
            Self::QaToggle => "qa_toggle",
            Self::AnalyzeNoChanges => "analyze_no_changes",
            Self::AnalyzeUnexpectedError => "analyze_unexpected_error",
            Self::ReviewWorkRecordNotFound => "review_work_record_not_found",
            Self::ReviewWorkUnauthorized => "review_work_unauthorized",
            Self::ReviewUnexpectedError => "review_unexpected_error",
            Self::PackageBuiltin => "package_builtin",
            Self::SolutionUrlMissing => "solution_url_missing",
            Self::SolutionUrlInvalid => "solution_url_invalid",
            Self::FeedbackMissing => "feedback_missing",
            Self::Unknown => "unknown",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Rating => "We could not save your rating. Please try again.",
            Self::RatingInvalid => "Please rate every item before continuing.",
            Self::QaToggle => "Please choose whether to approve the solution or request modifications.",
            Self::AnalyzeNoChanges => {
                "No changes were detected since the last analysis. Push new commits and try again."
            }
            Self::AnalyzeUnexpectedError => "The analysis failed unexpectedly. Please try again.",
            Self::ReviewWorkRecordNotFound => "This review link does not match any submitted work.",
            Self::ReviewWorkUnauthorized => "You are not allowed to review this work.",
            Self::ReviewUnexpectedError => "The review could not be opened. Please try again.",
            Self::PackageBuiltin => {
                "Your solution modifies a built-in package. Please revert those changes before submitting."
            }
            Self::SolutionUrlMissing => "Please enter the URL of your pull request.",
            Self::SolutionUrlInvalid => {
                "Please enter a valid pull request URL, e.g. https://github.com/org/repo/pull/1."
            }
            Self::FeedbackMissing => "Please describe the problem before submitting.",
            Self::Unknown => UNKNOWN_ERROR_MESSAGE,
        }
    }

    /// Maps an error code reported by the server for a finish or rating call.
    pub fn from_server_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            Some("package_builtin") => Self::PackageBuiltin,
            Some("rating_invalid") => Self::RatingInvalid,
            Some("rating") => Self::Rating,
            Some("qa_toggle") => Self::QaToggle,
            Some("review_work_record_not_found") => Self::ReviewWorkRecordNotFound,
            Some("review_work_unauthorized") => Self::ReviewWorkUnauthorized,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ActionErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.message())
    }
}

impl std::error::Error for ActionErrorKind {}

/// User-facing sentence for a domain error code returned by the backend.
pub fn server_error_message(code: &str) -> &'static str {
    match code.trim() {
        "email_exists" => "An account with this email address already exists.",
        "invalid_registration_code" => "The registration code is invalid or has expired.",
        "invalid_credentials" => "The email address or password is incorrect.",
        "unauthorized" => "Your session has expired. Please sign in again.",
        "work_not_found" => "This task is no longer available.",
        "work_already_active" => "You already have a task in progress.",
        "rate_limited" => "Too many requests. Please wait a moment and try again.",
        "invalid_solution_url" => ActionErrorKind::SolutionUrlInvalid.message(),
        other => ActionErrorKind::from_server_code(Some(other)).message(),
    }
}
