use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Closed set of things a contributor can rate.
///
/// Variants are declared in key order so the derived `Ord` matches the
/// lexicographic order of [`RatingSubject::as_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingSubject {
    CodeQuality,
    Documentation,
    Functionality,
    Solution,
    TestCoverage,
    WorkDescription,
}

impl RatingSubject {
    pub const ALL: [RatingSubject; 6] = [
        RatingSubject::CodeQuality,
        RatingSubject::Documentation,
        RatingSubject::Functionality,
        RatingSubject::Solution,
        RatingSubject::TestCoverage,
        RatingSubject::WorkDescription,
    ];

    pub fn as_key(self) -> &'static str {
        match self {
            RatingSubject::CodeQuality => "code_quality",
            RatingSubject::Documentation => "documentation",
            RatingSubject::Functionality => "functionality",
            RatingSubject::Solution => "solution",
            RatingSubject::TestCoverage => "test_coverage",
            RatingSubject::WorkDescription => "work_description",
        }
    }
}

impl fmt::Display for RatingSubject {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_key())
    }
}

impl FromStr for RatingSubject {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim();
        RatingSubject::ALL
            .into_iter()
            .find(|subject| subject.as_key() == key)
            .ok_or_else(|| DomainError::UnknownRatingSubject(key.to_owned()))
    }
}

/// Decision a reviewer takes on somebody else's solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Approve,
    RequestModifications,
}
