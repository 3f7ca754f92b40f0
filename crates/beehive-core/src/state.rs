use beehive_domain::{RatingSubject, ReviewOutcome, WorkItem, WorkRecord};
use serde::{Deserialize, Serialize};

use crate::error::ActionErrorKind;
use crate::ratings::UserRatings;
use crate::session::{apply_session_transition, SessionEvent, SessionPhase, SessionTransitionError};

pub const DESCRIPTION_SUBJECTS: &[RatingSubject] = &[RatingSubject::WorkDescription];

/// Why the last work fetch failed, kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkFetchError {
    pub status: Option<u16>,
    pub error: Option<String>,
    pub message: String,
}

/// Everything the UI needs about the current work session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub loading: bool,
    pub work_fetched: bool,
    pub work_error: Option<WorkFetchError>,
    pub last_action_error: Option<ActionErrorKind>,
    pub solution_url: String,
    pub feedback: String,
    pub review_outcome: Option<ReviewOutcome>,
    pub description_ratings: UserRatings,
    pub solution_ratings: UserRatings,
    /// The solution ratings of the current attempt were accepted by the server.
    pub solution_ratings_submitted: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::NoWork,
            loading: false,
            work_fetched: false,
            work_error: None,
            last_action_error: None,
            solution_url: String::new(),
            feedback: String::new(),
            review_outcome: None,
            description_ratings: UserRatings::init(DESCRIPTION_SUBJECTS),
            solution_ratings: UserRatings::default(),
            solution_ratings_submitted: false,
        }
    }
}

impl SessionState {
    pub fn work(&self) -> Option<&WorkItem> {
        self.phase.work()
    }

    pub fn record(&self) -> Option<&WorkRecord> {
        self.phase.record()
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn is_done(&self) -> bool {
        self.phase.is_done()
    }

    pub fn start_time_ms(&self) -> i64 {
        self.phase.start_time_ms()
    }

    /// Runs the transition and resets the ephemeral fields the event invalidates.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), SessionTransitionError> {
        let reset_all = matches!(event, SessionEvent::WorkLoaded { .. });
        let activated = matches!(event, SessionEvent::Activated { .. });
        let leaves_active = matches!(event, SessionEvent::Cancelled | SessionEvent::Finished);

        let phase = apply_session_transition(&self.phase, event)?;

        if reset_all {
            let loading = self.loading;
            *self = Self::default();
            self.loading = loading;
            self.work_fetched = true;
            self.solution_ratings = solution_ratings_for(phase.record());
        }
        if activated {
            self.solution_url.clear();
            self.feedback.clear();
            self.review_outcome = None;
            self.solution_ratings = solution_ratings_for(phase.record());
            self.solution_ratings_submitted = false;
        }
        if leaves_active {
            self.solution_url.clear();
            self.feedback.clear();
            self.review_outcome = None;
        }

        self.phase = phase;
        Ok(())
    }

    pub fn record_fetch_failure(&mut self, error: WorkFetchError) {
        let loading = self.loading;
        *self = Self::default();
        self.loading = loading;
        self.work_fetched = true;
        self.work_error = Some(error);
    }
}

fn solution_ratings_for(record: Option<&WorkRecord>) -> UserRatings {
    record
        .map(|record| UserRatings::init(&record.rating_subjects))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beehive_domain::{Priority, WorkId, WorkRecordId, WorkType};

    fn work(id: &str) -> WorkItem {
        WorkItem {
            id: WorkId::new(id),
            title: "Add retries".to_owned(),
            description: String::new(),
            skills: Vec::new(),
            priority: Priority::Low,
            task: None,
            work_type: WorkType::Code,
        }
    }

    fn record_with_subjects(subjects: Vec<RatingSubject>) -> WorkRecord {
        WorkRecord {
            id: WorkRecordId::new("rec-1"),
            work_id: WorkId::new("w1"),
            started_at_ms: 99,
            duration_ms: 0,
            rating_code: Some("code".to_owned()),
            rating_subjects: subjects,
            review: None,
        }
    }

    #[test]
    fn loading_new_work_resets_ephemeral_fields() {
        let mut state = SessionState {
            solution_url: "https://github.com/o/r/pull/1".to_owned(),
            last_action_error: Some(ActionErrorKind::Rating),
            review_outcome: Some(ReviewOutcome::Approve),
            ..SessionState::default()
        };
        state
            .description_ratings
            .set_score(RatingSubject::WorkDescription, 3)
            .expect("score description");

        state
            .apply(SessionEvent::WorkLoaded {
                work: Some(work("w2")),
                record: None,
            })
            .expect("load");

        assert!(!state.is_active());
        assert!(!state.is_done());
        assert_eq!(state.start_time_ms(), 0);
        assert!(state.work_fetched);
        assert_eq!(state.solution_url, "");
        assert_eq!(state.last_action_error, None);
        assert_eq!(state.review_outcome, None);
        assert!(!state.description_ratings.is_complete());
    }

    #[test]
    fn loaded_record_rehydrates_solution_ratings() {
        let mut state = SessionState::default();
        state
            .apply(SessionEvent::WorkLoaded {
                work: Some(work("w1")),
                record: Some(record_with_subjects(vec![
                    RatingSubject::Functionality,
                    RatingSubject::CodeQuality,
                ])),
            })
            .expect("load");

        assert!(state.is_active());
        assert_eq!(state.start_time_ms(), 99);
        assert_eq!(
            state.solution_ratings.subjects().collect::<Vec<_>>(),
            vec![RatingSubject::CodeQuality, RatingSubject::Functionality]
        );
    }

    #[test]
    fn activation_clears_done_and_solution_url() {
        let mut state = SessionState::default();
        state
            .apply(SessionEvent::WorkLoaded {
                work: Some(work("w1")),
                record: None,
            })
            .expect("load");
        state.solution_url = "github.com/o/r/pull/9".to_owned();

        state
            .apply(SessionEvent::Activated {
                started_at_ms: 500,
                record: Some(record_with_subjects(vec![RatingSubject::Solution])),
            })
            .expect("activate");

        assert!(state.is_active());
        assert!(!state.is_done());
        assert_eq!(state.solution_url, "");
        assert_eq!(state.start_time_ms(), 500);
        assert_eq!(state.solution_ratings.len(), 1);
    }

    #[test]
    fn submitted_solution_ratings_flag_resets_per_attempt() {
        let mut state = SessionState {
            solution_ratings_submitted: true,
            ..SessionState::default()
        };
        state
            .apply(SessionEvent::WorkLoaded {
                work: Some(work("w1")),
                record: None,
            })
            .expect("load");
        assert!(!state.solution_ratings_submitted);

        state.solution_ratings_submitted = true;
        state
            .apply(SessionEvent::Activated {
                started_at_ms: 1,
                record: Some(record_with_subjects(vec![RatingSubject::Solution])),
            })
            .expect("activate");
        assert!(!state.solution_ratings_submitted);
    }

    #[test]
    fn fetch_failure_keeps_error_and_clears_work() {
        let mut state = SessionState::default();
        state
            .apply(SessionEvent::WorkLoaded {
                work: Some(work("w1")),
                record: None,
            })
            .expect("load");

        state.record_fetch_failure(WorkFetchError {
            status: Some(500),
            error: None,
            message: "boom".to_owned(),
        });
        assert_eq!(state.work(), None);
        assert!(state.work_fetched);
        assert_eq!(
            state.work_error.as_ref().map(|error| error.status),
            Some(Some(500))
        );
    }
}
