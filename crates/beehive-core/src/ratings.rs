use std::collections::BTreeMap;

use beehive_domain::RatingSubject;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ActionErrorKind;

pub const MAX_SCORE: u8 = 5;
pub const MAX_FEEDBACK_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error("'{0}' is not rated in this form")]
    UnknownSubject(RatingSubject),
    #[error("rating score must be between 1 and 5, got {0}")]
    ScoreOutOfRange(u8),
    #[error("feedback is limited to 512 characters, got {0}")]
    FeedbackTooLong(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingEntry {
    /// 0 means the contributor has not picked a score yet.
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// One rating-submission request as sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub subject: RatingSubject,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub code: String,
}

/// Scores and optional feedback for a fixed set of rating subjects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserRatings {
    entries: BTreeMap<RatingSubject, RatingEntry>,
}

impl UserRatings {
    pub fn init(subjects: &[RatingSubject]) -> Self {
        Self {
            entries: subjects
                .iter()
                .map(|subject| (*subject, RatingEntry::default()))
                .collect(),
        }
    }

    pub fn subjects(&self) -> impl Iterator<Item = RatingSubject> + '_ {
        self.entries.keys().copied()
    }

    pub fn entry(&self, subject: RatingSubject) -> Option<&RatingEntry> {
        self.entries.get(&subject)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_score(&mut self, subject: RatingSubject, score: u8) -> Result<(), RatingError> {
        if score == 0 || score > MAX_SCORE {
            return Err(RatingError::ScoreOutOfRange(score));
        }
        let entry = self
            .entries
            .get_mut(&subject)
            .ok_or(RatingError::UnknownSubject(subject))?;
        entry.score = score;
        Ok(())
    }

    pub fn set_feedback(
        &mut self,
        subject: RatingSubject,
        feedback: impl Into<String>,
    ) -> Result<(), RatingError> {
        let feedback = feedback.into();
        let length = feedback.chars().count();
        if length > MAX_FEEDBACK_CHARS {
            return Err(RatingError::FeedbackTooLong(length));
        }
        let entry = self
            .entries
            .get_mut(&subject)
            .ok_or(RatingError::UnknownSubject(subject))?;
        entry.feedback = if feedback.trim().is_empty() {
            None
        } else {
            Some(feedback)
        };
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.entries.values().all(|entry| entry.score != 0)
    }

    /// Requests for the whole map in subject-key order. Nothing is produced if
    /// any subject is still unrated.
    pub fn rating_requests(
        &self,
        authorization_code: &str,
    ) -> Result<Vec<RatingRequest>, ActionErrorKind> {
        if !self.is_complete() {
            return Err(ActionErrorKind::RatingInvalid);
        }

        Ok(self
            .entries
            .iter()
            .filter(|(_, entry)| entry.score != 0)
            .map(|(subject, entry)| RatingRequest {
                subject: *subject,
                score: entry.score,
                feedback: entry.feedback.clone(),
                code: authorization_code.to_owned(),
            })
            .collect())
    }
}
