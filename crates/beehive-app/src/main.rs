mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use beehive_api::{ApiConfig, FileTokenStore, ReqwestBeehiveApi};
use beehive_config::BeehiveConfig;
use beehive_core::{DeadlineClock, DeadlineSnapshot, SessionState};
use beehive_domain::{RatingSubject, WorkItem};
use beehive_session::{
    resolve_review, DeadlineTicker, LoadOutcome, LoadRequest, SessionClock, SessionController,
    SessionError, SystemClock,
};
use serde_json::{json, Value};

use crate::cli::{parse_command, print_help, Command};

const ENV_BEEHIVE_PASSWORD: &str = "BEEHIVE_PASSWORD";

#[tokio::main]
async fn main() -> Result<()> {
    let command = parse_command(std::env::args().skip(1))?;
    if command == Command::Help {
        print_help();
        return Ok(());
    }

    let config = beehive_config::load_from_env()?;
    init_file_logging(&config.data_dir())?;

    let api_runtime = config.api_runtime();
    let api = Arc::new(ReqwestBeehiveApi::new(
        ApiConfig {
            api_url: api_runtime.api_url,
            request_timeout: api_runtime.request_timeout,
        },
        Arc::new(FileTokenStore::new(api_runtime.token_path)),
    )?);

    let output = run(command, &config, api).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(command: Command, config: &BeehiveConfig, api: Arc<ReqwestBeehiveApi>) -> Result<Value> {
    match command {
        Command::Help => Ok(Value::Null),
        Command::Login { email } => {
            let password = std::env::var(ENV_BEEHIVE_PASSWORD)
                .with_context(|| format!("{ENV_BEEHIVE_PASSWORD} must hold the account password"))?;
            api.sign_in(&email, &password).await?;
            tracing::info!("signed in");
            Ok(json!({ "signed_in": true }))
        }
        Command::Logout => {
            api.sign_out()?;
            tracing::info!("signed out");
            Ok(json!({ "signed_in": false }))
        }
        Command::Review { code } => {
            let redirect_url = resolve_review(api.as_ref(), &code)
                .await
                .map_err(|kind| anyhow!("{kind}"))?;
            Ok(json!({ "redirect_url": redirect_url }))
        }
        Command::Load { work } => {
            let controller = SessionController::new(api);
            let request = match work {
                Some(work_id) => LoadRequest::Specific(work_id),
                None => LoadRequest::Available { exclude: None },
            };
            let outcome = controller.load(request).await.map_err(user_error)?;
            view(&controller, config, Some(outcome)).await
        }
        session_command => {
            let controller = SessionController::new(api);
            let outcome = controller
                .load(LoadRequest::Available { exclude: None })
                .await
                .map_err(user_error)?;
            let outcome = run_session_command(&controller, config, session_command)
                .await
                .map_err(user_error)?
                .or(Some(outcome));
            view(&controller, config, outcome).await
        }
    }
}

async fn run_session_command(
    controller: &SessionController,
    config: &BeehiveConfig,
    command: Command,
) -> Result<Option<LoadOutcome>, SessionError> {
    let timezone = config.timezone.clone();
    match command {
        Command::Status => Ok(None),
        Command::Start => {
            controller.activate(SystemClock.now_ms(), timezone).await?;
            Ok(None)
        }
        Command::Skip => {
            let skipped = controller.skip(SystemClock.now_ms(), timezone).await?;
            // The process exits after printing; let the notification land first.
            if let Err(error) = skipped.notification.await {
                tracing::warn!(error = %error, "skip notification task failed");
            }
            Ok(Some(skipped.outcome))
        }
        Command::Watch => {
            watch_active_session(controller, config).await?;
            Ok(None)
        }
        Command::Analyze { solution_url } => {
            controller.analyze(&solution_url).await?;
            Ok(None)
        }
        Command::Submit {
            solution_url,
            decision,
            ratings,
        } => {
            if let Some(solution_url) = solution_url {
                controller.set_solution_url(solution_url).await;
            }
            controller.set_review_outcome(decision).await;
            let mut rates_description = false;
            for (subject, score) in ratings {
                if subject == RatingSubject::WorkDescription {
                    controller.rate_description(subject, score).await?;
                    rates_description = true;
                } else {
                    controller.rate_solution(subject, score).await?;
                }
            }
            controller.submit().await?;
            if rates_description {
                return controller.next().await.map(Some);
            }
            Ok(None)
        }
        Command::Feedback { text } => {
            controller.submit_feedback(text).await?;
            Ok(None)
        }
        Command::Cancel => {
            controller.cancel().await?;
            Ok(None)
        }
        Command::Help
        | Command::Login { .. }
        | Command::Logout
        | Command::Load { .. }
        | Command::Review { .. } => Ok(None),
    }
}

/// Prints the deadline on every refresh and checkpoints periodically until
/// the attempt ends or the user interrupts.
async fn watch_active_session(
    controller: &SessionController,
    config: &BeehiveConfig,
) -> Result<(), SessionError> {
    let state = controller.snapshot().await;
    if !state.is_active() {
        return Err(SessionError::NotAllowed {
            operation: "watch",
            phase: state.phase.kind(),
        });
    }

    let runtime = config.session_runtime();
    let ticker = DeadlineTicker::spawn(
        controller.clone(),
        DeadlineClock::new(runtime.max_work_duration),
        runtime.clock_refresh,
    );
    let checkpoints = controller.spawn_checkpoint_loop(runtime.checkpoint_interval);
    let mut snapshots = ticker.subscribe();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = &mut interrupted => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(snapshot) = snapshots.borrow_and_update().clone() else {
                    break;
                };
                println!("{}", deadline_json(&snapshot));
            }
        }
    }

    checkpoints.stop().await;
    ticker.stop().await;
    tracing::info!("stopped watching the active session");
    Ok(())
}

fn deadline_json(snapshot: &DeadlineSnapshot) -> Value {
    json!({
        "elapsed_secs": snapshot.elapsed.as_secs(),
        "remaining": snapshot.remaining_label,
        "deadline": snapshot.deadline_label,
        "overdue": snapshot.overdue,
    })
}

async fn view(
    controller: &SessionController,
    config: &BeehiveConfig,
    outcome: Option<LoadOutcome>,
) -> Result<Value> {
    let state = controller.snapshot().await;
    let clock = DeadlineClock::new(config.session_runtime().max_work_duration);
    let deadline = controller
        .deadline(&clock)
        .await
        .map(|snapshot| deadline_json(&snapshot));

    Ok(json!({
        "outcome": outcome.map(|outcome| format!("{outcome:?}")),
        "phase": serde_json::to_value(state.phase.kind())?,
        "work": state.work().map(work_summary),
        "deadline": deadline,
        "session": session_summary(&state)?,
    }))
}

fn work_summary(work: &WorkItem) -> Value {
    json!({
        "id": work.id,
        "title": work.title,
        "priority": work.priority,
        "work_type": work.work_type,
        "skills": work.skills,
        "repository": work.repository(),
        "branch": work.branch(),
        "base_branch": work.base_branch(),
    })
}

fn session_summary(state: &SessionState) -> Result<Value> {
    Ok(json!({
        "rating_code": state.phase.rating_code(),
        "review": state.record().and_then(|record| record.review.as_ref()),
        "solution_ratings": serde_json::to_value(&state.solution_ratings)?,
        "work_error": state.work_error,
    }))
}

fn user_error(error: SessionError) -> anyhow::Error {
    match error.action_kind() {
        Some(kind) => anyhow!("{} ({})", kind.message(), kind.key()),
        None => anyhow::Error::new(error),
    }
}

fn init_file_logging(data_dir: &Path) -> Result<()> {
    if !data_dir.as_os_str().is_empty() {
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!(
                "failed to create beehive log directory '{}'",
                data_dir.display()
            )
        })?;
    }

    let log_path = data_dir.join("beehive.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open beehive log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}
