use beehive_domain::{AutomatedReview, WorkItem, WorkRecord, WorkRecordId, WorkType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveStep {
    /// Ordinary coding work: the contributor iterates on a solution and may
    /// request automated analysis any number of times.
    Analyzing,
    /// Review work: the contributor evaluates someone else's solution.
    AwaitingReview,
}

impl ActiveStep {
    pub fn for_work(work: &WorkItem) -> Self {
        if work.work_type.is_review() {
            Self::AwaitingReview
        } else {
            Self::Analyzing
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    NoWork,
    TaskOffered {
        work: WorkItem,
    },
    Active {
        work: WorkItem,
        record: Option<WorkRecord>,
        started_at_ms: i64,
        step: ActiveStep,
    },
    Done {
        work: WorkItem,
        rating_code: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhaseKind {
    NoWork,
    TaskOffered,
    Active,
    Done,
}

impl SessionPhase {
    pub fn kind(&self) -> SessionPhaseKind {
        match self {
            Self::NoWork => SessionPhaseKind::NoWork,
            Self::TaskOffered { .. } => SessionPhaseKind::TaskOffered,
            Self::Active { .. } => SessionPhaseKind::Active,
            Self::Done { .. } => SessionPhaseKind::Done,
        }
    }

    pub fn work(&self) -> Option<&WorkItem> {
        match self {
            Self::NoWork => None,
            Self::TaskOffered { work } | Self::Active { work, .. } | Self::Done { work, .. } => {
                Some(work)
            }
        }
    }

    pub fn record(&self) -> Option<&WorkRecord> {
        match self {
            Self::Active { record, .. } => record.as_ref(),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Start of the active attempt, or 0 when nothing is active.
    pub fn start_time_ms(&self) -> i64 {
        match self {
            Self::Active { started_at_ms, .. } => *started_at_ms,
            _ => 0,
        }
    }

    /// Applies a server-accepted work-type correction to the current item.
    pub fn set_work_type(&mut self, work_type: WorkType) -> bool {
        match self {
            Self::NoWork => false,
            Self::TaskOffered { work } | Self::Done { work, .. } => {
                work.work_type = work_type;
                true
            }
            Self::Active { work, step, .. } => {
                work.work_type = work_type;
                *step = ActiveStep::for_work(work);
                true
            }
        }
    }

    pub fn rating_code(&self) -> Option<&str> {
        match self {
            Self::Active { record, .. } => record
                .as_ref()
                .and_then(|record| record.rating_code.as_deref()),
            Self::Done { rating_code, .. } => rating_code.as_deref(),
            _ => None,
        }
    }
}

/// Server-confirmed facts that move the session between phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    WorkLoaded {
        work: Option<WorkItem>,
        record: Option<WorkRecord>,
    },
    Activated {
        started_at_ms: i64,
        record: Option<WorkRecord>,
    },
    AnalysisCompleted {
        review: AutomatedReview,
    },
    Cancelled,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEventKind {
    WorkLoaded,
    Activated,
    AnalysisCompleted,
    Cancelled,
    Finished,
}

impl SessionEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            Self::WorkLoaded { .. } => SessionEventKind::WorkLoaded,
            Self::Activated { .. } => SessionEventKind::Activated,
            Self::AnalysisCompleted { .. } => SessionEventKind::AnalysisCompleted,
            Self::Cancelled => SessionEventKind::Cancelled,
            Self::Finished => SessionEventKind::Finished,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionTransitionError {
    #[error("session event '{event:?}' is not valid in phase '{from:?}'")]
    InvalidTransition {
        from: SessionPhaseKind,
        event: SessionEventKind,
    },
}

pub fn apply_session_transition(
    from: &SessionPhase,
    event: SessionEvent,
) -> Result<SessionPhase, SessionTransitionError> {
    let invalid = SessionTransitionError::InvalidTransition {
        from: from.kind(),
        event: event.kind(),
    };

    match (from, event) {
        (_, SessionEvent::WorkLoaded { work, record }) => Ok(match (work, record) {
            (None, _) => SessionPhase::NoWork,
            (Some(work), None) => SessionPhase::TaskOffered { work },
            (Some(work), Some(record)) => SessionPhase::Active {
                step: ActiveStep::for_work(&work),
                started_at_ms: record.started_at_ms,
                record: Some(record),
                work,
            },
        }),
        (
            SessionPhase::TaskOffered { work },
            SessionEvent::Activated {
                started_at_ms,
                record,
            },
        ) => Ok(SessionPhase::Active {
            step: ActiveStep::for_work(work),
            started_at_ms,
            record,
            work: work.clone(),
        }),
        (
            SessionPhase::Active {
                work,
                record,
                started_at_ms,
                step,
            },
            SessionEvent::AnalysisCompleted { review },
        ) => {
            let mut record = record.clone().unwrap_or_else(|| WorkRecord {
                id: WorkRecordId::new(format!("local-{}", work.id)),
                work_id: work.id.clone(),
                started_at_ms: *started_at_ms,
                duration_ms: 0,
                rating_code: None,
                rating_subjects: Vec::new(),
                review: None,
            });
            record.review = Some(review);
            Ok(SessionPhase::Active {
                work: work.clone(),
                record: Some(record),
                started_at_ms: *started_at_ms,
                step: *step,
            })
        }
        (SessionPhase::Active { work, .. }, SessionEvent::Cancelled) => {
            Ok(SessionPhase::TaskOffered { work: work.clone() })
        }
        (SessionPhase::Active { work, record, .. }, SessionEvent::Finished) => {
            Ok(SessionPhase::Done {
                work: work.clone(),
                rating_code: record.as_ref().and_then(|record| record.rating_code.clone()),
            })
        }
        _ => Err(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beehive_domain::{Priority, WorkId, WorkType};

    fn work(id: &str, work_type: WorkType) -> WorkItem {
        WorkItem {
            id: WorkId::new(id),
            title: format!("Task {id}"),
            description: String::new(),
            skills: vec!["rust".to_owned()],
            priority: Priority::Medium,
            task: None,
            work_type,
        }
    }

    fn record(work_id: &str, started_at_ms: i64) -> WorkRecord {
        WorkRecord {
            id: WorkRecordId::new(format!("rec-{work_id}")),
            work_id: WorkId::new(work_id),
            started_at_ms,
            duration_ms: 0,
            rating_code: Some("rate-me".to_owned()),
            rating_subjects: Vec::new(),
            review: None,
        }
    }

    #[test]
    fn load_with_record_resumes_active_work() {
        let next = apply_session_transition(
            &SessionPhase::NoWork,
            SessionEvent::WorkLoaded {
                work: Some(work("w1", WorkType::Review)),
                record: Some(record("w1", 1_234)),
            },
        )
        .expect("load is valid from any phase");

        assert!(next.is_active());
        assert_eq!(next.start_time_ms(), 1_234);
        assert!(matches!(
            next,
            SessionPhase::Active {
                step: ActiveStep::AwaitingReview,
                ..
            }
        ));
    }

    #[test]
    fn load_without_work_is_no_work_even_from_done() {
        let done = SessionPhase::Done {
            work: work("w1", WorkType::Code),
            rating_code: None,
        };
        let next = apply_session_transition(
            &done,
            SessionEvent::WorkLoaded {
                work: None,
                record: None,
            },
        )
        .expect("load is valid from done");
        assert_eq!(next, SessionPhase::NoWork);
        assert_eq!(next.start_time_ms(), 0);
    }

    #[test]
    fn activation_requires_an_offered_task() {
        let error = apply_session_transition(
            &SessionPhase::NoWork,
            SessionEvent::Activated {
                started_at_ms: 10,
                record: None,
            },
        )
        .expect_err("nothing to activate");
        assert_eq!(
            error,
            SessionTransitionError::InvalidTransition {
                from: SessionPhaseKind::NoWork,
                event: SessionEventKind::Activated,
            }
        );

        let active = apply_session_transition(
            &SessionPhase::TaskOffered {
                work: work("w1", WorkType::Code),
            },
            SessionEvent::Activated {
                started_at_ms: 10,
                record: None,
            },
        )
        .expect("offered task activates");
        assert!(active.is_active());
        assert!(!active.is_done());
        assert_eq!(active.start_time_ms(), 10);
    }

    #[test]
    fn analysis_without_record_synthesizes_one() {
        let active = SessionPhase::Active {
            work: work("w1", WorkType::Code),
            record: None,
            started_at_ms: 5,
            step: ActiveStep::Analyzing,
        };
        let next = apply_session_transition(
            &active,
            SessionEvent::AnalysisCompleted {
                review: AutomatedReview::default(),
            },
        )
        .expect("analysis is valid while active");
        let record = next.record().expect("record synthesized");
        assert_eq!(record.work_id, WorkId::new("w1"));
        assert_eq!(record.review, Some(AutomatedReview::default()));
    }

    #[test]
    fn finishing_keeps_rating_code_for_next() {
        let active = SessionPhase::Active {
            work: work("w1", WorkType::Code),
            record: Some(record("w1", 5)),
            started_at_ms: 5,
            step: ActiveStep::Analyzing,
        };
        let done = apply_session_transition(&active, SessionEvent::Finished)
            .expect("finish is valid while active");
        assert!(done.is_done());
        assert_eq!(done.rating_code(), Some("rate-me"));
        assert_eq!(done.record(), None);
    }

    #[test]
    fn work_type_correction_updates_active_step() {
        let mut active = SessionPhase::Active {
            work: work("w1", WorkType::Code),
            record: None,
            started_at_ms: 5,
            step: ActiveStep::Analyzing,
        };
        assert!(active.set_work_type(WorkType::Review));
        assert!(matches!(
            active,
            SessionPhase::Active {
                step: ActiveStep::AwaitingReview,
                ..
            }
        ));
        assert!(!SessionPhase::NoWork.set_work_type(WorkType::Review));
    }

    #[test]
    fn cancel_returns_to_offered_task() {
        let active = SessionPhase::Active {
            work: work("w1", WorkType::Code),
            record: Some(record("w1", 5)),
            started_at_ms: 5,
            step: ActiveStep::Analyzing,
        };
        let offered =
            apply_session_transition(&active, SessionEvent::Cancelled).expect("cancel is valid");
        assert_eq!(
            offered,
            SessionPhase::TaskOffered {
                work: work("w1", WorkType::Code)
            }
        );
        assert!(apply_session_transition(&offered, SessionEvent::Cancelled).is_err());
        assert!(apply_session_transition(&offered, SessionEvent::Finished).is_err());
    }
}
