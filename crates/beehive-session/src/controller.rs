use std::sync::Arc;
use std::time::Duration;

use beehive_api::{
    ApiError, BeehiveApi, FinishOutcome, FinishWorkRequest, SkipWorkRequest, StartWorkRequest,
    WorkFetch,
};
use beehive_core::{
    ActionErrorKind, DeadlineClock, DeadlineSnapshot, SessionEvent, SessionPhaseKind,
    SessionState, WorkFetchError,
};
use beehive_domain::{
    parse_pull_request_url, AutomatedReview, RatingSubject, ReviewOutcome, WorkId, WorkType,
};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{SessionClock, SystemClock};
use crate::error::SessionError;
use crate::ratings::submit_ratings;
use crate::ticker::CheckpointLoop;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    /// Any item from the queue, optionally skipping the one just handled.
    Available { exclude: Option<WorkId> },
    Specific(WorkId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Offered,
    Resumed,
    Exhausted,
    /// A specific item was requested but the server offered another one.
    Unavailable,
    /// A specific item was requested but another attempt is already active.
    OtherWorkInProgress,
}

/// A completed skip: the outcome of the re-fetch and the skip notification,
/// which may still be in flight.
#[derive(Debug)]
pub struct Skipped {
    pub outcome: LoadOutcome,
    pub notification: JoinHandle<()>,
}

/// Drives the current work session against the backend.
///
/// Every operation reads the shared [`SessionState`], issues its requests
/// through the injected [`BeehiveApi`], and publishes the resulting state to
/// subscribers. While a request is in flight `loading` is set and further
/// request-issuing operations fail with [`SessionError::Busy`].
#[derive(Clone)]
pub struct SessionController {
    api: Arc<dyn BeehiveApi>,
    clock: Arc<dyn SessionClock>,
    state: Arc<RwLock<SessionState>>,
    updates: Arc<watch::Sender<SessionState>>,
}

impl SessionController {
    pub fn new(api: Arc<dyn BeehiveApi>) -> Self {
        Self::with_state(api, Arc::new(SystemClock), SessionState::default())
    }

    pub fn with_state(
        api: Arc<dyn BeehiveApi>,
        clock: Arc<dyn SessionClock>,
        initial: SessionState,
    ) -> Self {
        let (updates, _) = watch::channel(initial.clone());
        Self {
            api,
            clock,
            state: Arc::new(RwLock::new(initial)),
            updates: Arc::new(updates),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn load(&self, request: LoadRequest) -> Result<LoadOutcome, SessionError> {
        self.begin_request("load", None).await?;

        let fetched = match &request {
            LoadRequest::Available { exclude } => {
                self.api.fetch_available_work(exclude.as_ref()).await
            }
            LoadRequest::Specific(work_id) => self.api.fetch_work(work_id).await,
        };
        let fetch = match fetched {
            Ok(fetch) => fetch,
            Err(error) => {
                warn!(error = %error, "work fetch failed");
                self.complete(|state| state.record_fetch_failure(fetch_error(&error)))
                    .await;
                return Err(SessionError::Fetch(error));
            }
        };

        let outcome = load_outcome(&request, &fetch);
        let WorkFetch { work, record } = fetch;
        let work_id = work.as_ref().map(|work| work.id.clone());
        self.complete(|state| state.apply(SessionEvent::WorkLoaded { work, record }))
            .await?;
        info!(work_id = ?work_id, outcome = ?outcome, "work loaded");
        Ok(outcome)
    }

    pub async fn activate(
        &self,
        started_at_ms: i64,
        timezone: impl Into<String>,
    ) -> Result<(), SessionError> {
        let snapshot = self
            .begin_request("activate", Some(&[SessionPhaseKind::TaskOffered]))
            .await?;
        let work_id = current_work_id(&snapshot)?;

        let request = StartWorkRequest {
            started_at_ms,
            timezone: timezone.into(),
        };
        match self.api.start_work(&work_id, request).await {
            Ok(record) => {
                self.complete(|state| {
                    state.apply(SessionEvent::Activated {
                        started_at_ms,
                        record,
                    })
                })
                .await?;
                info!(work_id = %work_id, started_at_ms, "work activated");
                Ok(())
            }
            Err(error) => {
                warn!(work_id = %work_id, error = %error, "work activation failed");
                Err(self.fail(server_kind(&error)).await)
            }
        }
    }

    /// Notifies the server that the offered item is skipped and loads the
    /// next one. The notification outcome never blocks the re-fetch; callers
    /// about to exit await [`Skipped::notification`].
    pub async fn skip(
        &self,
        skipped_at_ms: i64,
        timezone: impl Into<String>,
    ) -> Result<Skipped, SessionError> {
        let work_id = {
            let state = self.state.read().await;
            ensure_phase(&state, "skip", &[SessionPhaseKind::TaskOffered])?;
            if state.loading {
                return Err(SessionError::Busy);
            }
            current_work_id(&state)?
        };

        let notification = self.api.skip_work(
            &work_id,
            SkipWorkRequest {
                skipped_at_ms,
                timezone: timezone.into(),
            },
        );
        let skipped = work_id.clone();
        let notification = tokio::spawn(async move {
            if let Err(error) = notification.await {
                warn!(work_id = %skipped, error = %error, "skip notification failed");
            }
        });

        let outcome = self
            .load(LoadRequest::Available {
                exclude: Some(work_id),
            })
            .await?;
        Ok(Skipped {
            outcome,
            notification,
        })
    }

    pub async fn analyze(&self, solution_url: &str) -> Result<AutomatedReview, SessionError> {
        let snapshot = self
            .begin_request("analyze", Some(&[SessionPhaseKind::Active]))
            .await?;
        let work_id = current_work_id(&snapshot)?;
        let solution_url = match validated_solution_url(solution_url) {
            Ok(url) => url,
            Err(kind) => return Err(self.fail(kind).await),
        };

        match self.api.analyze_work(&work_id, &solution_url).await {
            Ok(review) => {
                let stored = review.clone();
                self.complete(move |state| {
                    state.solution_url = solution_url;
                    state.apply(SessionEvent::AnalysisCompleted { review: stored })
                })
                .await?;
                debug!(work_id = %work_id, average = review.average_score(), "analysis stored");
                Ok(review)
            }
            Err(error) => {
                warn!(work_id = %work_id, error = %error, "analysis failed");
                let kind = if error.is_rate_limited() {
                    ActionErrorKind::AnalyzeNoChanges
                } else {
                    ActionErrorKind::AnalyzeUnexpectedError
                };
                Err(self.fail(kind).await)
            }
        }
    }

    /// Issues a checkpoint for the active attempt without waiting on it.
    ///
    /// Returns `None` when nothing is active. The returned handle resolves once
    /// the server answered; failures are logged and never surfaced.
    pub async fn checkpoint(&self) -> Option<JoinHandle<()>> {
        let (work_id, duration_ms) = {
            let state = self.state.read().await;
            if !state.is_active() {
                return None;
            }
            let work_id = state.work()?.id.clone();
            (work_id, self.elapsed_ms(&state))
        };

        let issued = self.api.checkpoint_work(&work_id, duration_ms);
        Some(tokio::spawn(async move {
            match issued.await {
                Ok(()) => debug!(work_id = %work_id, duration_ms, "checkpoint persisted"),
                Err(error) => {
                    warn!(work_id = %work_id, duration_ms, error = %error, "checkpoint failed")
                }
            }
        }))
    }

    pub fn spawn_checkpoint_loop(&self, interval: Duration) -> CheckpointLoop {
        CheckpointLoop::spawn(self.clone(), interval)
    }

    /// Persists elapsed time, then abandons the active attempt.
    pub async fn cancel(&self) -> Result<(), SessionError> {
        let snapshot = self
            .begin_request("cancel", Some(&[SessionPhaseKind::Active]))
            .await?;
        let work_id = current_work_id(&snapshot)?;

        let _checkpoint = self.checkpoint().await;
        match self.api.cancel_work(&work_id).await {
            Ok(()) => {
                self.complete(|state| state.apply(SessionEvent::Cancelled))
                    .await?;
                info!(work_id = %work_id, "work cancelled");
                Ok(())
            }
            Err(error) => {
                warn!(work_id = %work_id, error = %error, "work cancellation failed");
                Err(self.fail(server_kind(&error)).await)
            }
        }
    }

    /// Finishes the active attempt with a solution or, for review work, a
    /// decision together with the solution ratings.
    pub async fn submit(&self) -> Result<(), SessionError> {
        let snapshot = self
            .begin_request("submit", Some(&[SessionPhaseKind::Active]))
            .await?;
        let work_id = current_work_id(&snapshot)?;
        let is_review = snapshot
            .work()
            .is_some_and(|work| work.work_type.is_review());

        let outcome = if is_review {
            let Some(decision) = snapshot.review_outcome else {
                return Err(self.fail(ActionErrorKind::QaToggle).await);
            };
            if !snapshot.solution_ratings.is_complete() {
                return Err(self.fail(ActionErrorKind::RatingInvalid).await);
            }
            if !snapshot.solution_ratings.is_empty() && !snapshot.solution_ratings_submitted {
                let Some(code) = snapshot.phase.rating_code() else {
                    warn!(work_id = %work_id, "no rating code for review work; ratings not sent");
                    return Err(self.fail(ActionErrorKind::Rating).await);
                };
                if let Err(kind) =
                    submit_ratings(self.api.as_ref(), &snapshot.solution_ratings, code).await
                {
                    return Err(self.fail(kind).await);
                }
                // A failed finish must not resend the batch on retry.
                self.mutate(|state| state.solution_ratings_submitted = true)
                    .await;
            }
            FinishOutcome::Review { decision }
        } else {
            match validated_solution_url(&snapshot.solution_url) {
                Ok(solution_url) => FinishOutcome::Solution { solution_url },
                Err(kind) => return Err(self.fail(kind).await),
            }
        };

        self.finish(&snapshot, work_id, outcome).await
    }

    /// Finishes the active attempt by reporting a problem instead of a solution.
    pub async fn submit_feedback(&self, feedback: impl Into<String>) -> Result<(), SessionError> {
        let feedback = feedback.into();
        self.mutate(|state| state.feedback = feedback).await;

        let snapshot = self
            .begin_request("submit feedback", Some(&[SessionPhaseKind::Active]))
            .await?;
        let work_id = current_work_id(&snapshot)?;
        let feedback = snapshot.feedback.trim();
        if feedback.is_empty() {
            return Err(self.fail(ActionErrorKind::FeedbackMissing).await);
        }

        let outcome = FinishOutcome::Feedback {
            feedback: feedback.to_owned(),
        };
        self.finish(&snapshot, work_id, outcome).await
    }

    /// Submits the description ratings for the finished item and loads the
    /// next one.
    pub async fn next(&self) -> Result<LoadOutcome, SessionError> {
        let snapshot = self
            .begin_request("move on", Some(&[SessionPhaseKind::Done]))
            .await?;
        let work_id = current_work_id(&snapshot)?;
        if !snapshot.description_ratings.is_complete() {
            return Err(self.fail(ActionErrorKind::RatingInvalid).await);
        }

        match snapshot.phase.rating_code() {
            Some(code) => {
                if let Err(kind) =
                    submit_ratings(self.api.as_ref(), &snapshot.description_ratings, code).await
                {
                    return Err(self.fail(kind).await);
                }
            }
            None => warn!(work_id = %work_id, "no rating code for finished work; ratings not sent"),
        }
        self.complete(|_| ()).await;

        self.load(LoadRequest::Available {
            exclude: Some(work_id),
        })
        .await
    }

    /// Submits a work-type correction for the offered or active item.
    pub async fn correct_work_type(&self, work_type: WorkType) -> Result<(), SessionError> {
        let snapshot = self
            .begin_request(
                "correct work type",
                Some(&[SessionPhaseKind::TaskOffered, SessionPhaseKind::Active]),
            )
            .await?;
        let work_id = current_work_id(&snapshot)?;

        match self.api.correct_work_type(&work_id, work_type).await {
            Ok(()) => {
                self.complete(|state| {
                    state.phase.set_work_type(work_type);
                })
                .await;
                info!(work_id = %work_id, work_type = ?work_type, "work type corrected");
                Ok(())
            }
            Err(error) => {
                warn!(work_id = %work_id, error = %error, "work type correction failed");
                Err(self.fail(server_kind(&error)).await)
            }
        }
    }

    /// Stores the typed solution URL. Returns whether it is currently valid;
    /// invalid input is kept so typing is never blocked.
    pub async fn set_solution_url(&self, solution_url: impl Into<String>) -> bool {
        let solution_url = solution_url.into();
        let valid = parse_pull_request_url(&solution_url).is_some();
        self.mutate(|state| state.solution_url = solution_url).await;
        valid
    }

    pub async fn set_review_outcome(&self, outcome: Option<ReviewOutcome>) {
        self.mutate(|state| state.review_outcome = outcome).await;
    }

    pub async fn rate_description(
        &self,
        subject: RatingSubject,
        score: u8,
    ) -> Result<(), SessionError> {
        self.mutate(|state| state.description_ratings.set_score(subject, score))
            .await?;
        Ok(())
    }

    pub async fn rate_solution(&self, subject: RatingSubject, score: u8) -> Result<(), SessionError> {
        self.mutate(|state| state.solution_ratings.set_score(subject, score))
            .await?;
        Ok(())
    }

    pub async fn set_description_feedback(
        &self,
        subject: RatingSubject,
        feedback: impl Into<String>,
    ) -> Result<(), SessionError> {
        let feedback = feedback.into();
        self.mutate(|state| state.description_ratings.set_feedback(subject, feedback))
            .await?;
        Ok(())
    }

    pub async fn set_solution_feedback(
        &self,
        subject: RatingSubject,
        feedback: impl Into<String>,
    ) -> Result<(), SessionError> {
        let feedback = feedback.into();
        self.mutate(|state| state.solution_ratings.set_feedback(subject, feedback))
            .await?;
        Ok(())
    }

    pub async fn set_feedback(&self, feedback: impl Into<String>) {
        let feedback = feedback.into();
        self.mutate(|state| state.feedback = feedback).await;
    }

    pub async fn clear_error(&self) {
        self.mutate(|state| state.last_action_error = None).await;
    }

    pub async fn deadline(&self, clock: &DeadlineClock) -> Option<DeadlineSnapshot> {
        let state = self.state.read().await;
        if !state.is_active() {
            return None;
        }
        Some(clock.snapshot(state.start_time_ms(), self.clock.now_ms()))
    }

    async fn finish(
        &self,
        snapshot: &SessionState,
        work_id: WorkId,
        outcome: FinishOutcome,
    ) -> Result<(), SessionError> {
        let request = FinishWorkRequest {
            duration_ms: self.elapsed_ms(snapshot),
            outcome,
        };
        match self.api.finish_work(&work_id, request).await {
            Ok(()) => {
                self.complete(|state| state.apply(SessionEvent::Finished))
                    .await?;
                info!(work_id = %work_id, "work finished");
                Ok(())
            }
            Err(error) => {
                warn!(work_id = %work_id, error = %error, "finishing work failed");
                Err(self.fail(server_kind(&error)).await)
            }
        }
    }

    fn elapsed_ms(&self, state: &SessionState) -> u64 {
        let elapsed = self.clock.now_ms().saturating_sub(state.start_time_ms());
        u64::try_from(elapsed).unwrap_or(0)
    }

    /// Marks a request as in flight and returns the state it started from.
    async fn begin_request(
        &self,
        operation: &'static str,
        allowed: Option<&[SessionPhaseKind]>,
    ) -> Result<SessionState, SessionError> {
        let mut state = self.state.write().await;
        if let Some(allowed) = allowed {
            ensure_phase(&state, operation, allowed)?;
        }
        if state.loading {
            return Err(SessionError::Busy);
        }
        state.loading = true;
        state.last_action_error = None;
        self.updates.send_replace(state.clone());
        Ok(state.clone())
    }

    async fn mutate<R>(&self, change: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.write().await;
        let result = change(&mut state);
        self.updates.send_replace(state.clone());
        result
    }

    async fn complete<R>(&self, change: impl FnOnce(&mut SessionState) -> R) -> R {
        self.mutate(|state| {
            state.loading = false;
            change(state)
        })
        .await
    }

    async fn fail(&self, kind: ActionErrorKind) -> SessionError {
        self.complete(|state| state.last_action_error = Some(kind))
            .await;
        SessionError::Action(kind)
    }
}

fn ensure_phase(
    state: &SessionState,
    operation: &'static str,
    allowed: &[SessionPhaseKind],
) -> Result<(), SessionError> {
    let phase = state.phase.kind();
    if allowed.contains(&phase) {
        Ok(())
    } else {
        Err(SessionError::NotAllowed { operation, phase })
    }
}

fn current_work_id(state: &SessionState) -> Result<WorkId, SessionError> {
    state
        .work()
        .map(|work| work.id.clone())
        .ok_or(SessionError::NotAllowed {
            operation: "address current work",
            phase: state.phase.kind(),
        })
}

fn validated_solution_url(input: &str) -> Result<String, ActionErrorKind> {
    if input.trim().is_empty() {
        return Err(ActionErrorKind::SolutionUrlMissing);
    }
    parse_pull_request_url(input)
        .map(|url| url.canonical())
        .ok_or(ActionErrorKind::SolutionUrlInvalid)
}

fn server_kind(error: &ApiError) -> ActionErrorKind {
    ActionErrorKind::from_server_code(error.error_code())
}

fn fetch_error(error: &ApiError) -> WorkFetchError {
    WorkFetchError {
        status: error.status(),
        error: error.error_code().map(str::to_owned),
        message: error.to_string(),
    }
}

fn load_outcome(request: &LoadRequest, fetch: &WorkFetch) -> LoadOutcome {
    let Some(work) = fetch.work.as_ref() else {
        return LoadOutcome::Exhausted;
    };
    if let LoadRequest::Specific(requested) = request {
        if &work.id != requested {
            return if fetch.record.is_some() {
                LoadOutcome::OtherWorkInProgress
            } else {
                LoadOutcome::Unavailable
            };
        }
    }
    if fetch.record.is_some() {
        LoadOutcome::Resumed
    } else {
        LoadOutcome::Offered
    }
}
