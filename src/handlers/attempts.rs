// src/handlers/attempts.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    engine::{AttemptRegistry, ExamAttempt, IntegritySignals, SessionError, SignalAction},
    error::AppError,
    handlers::sessions::load_owned,
    models::violation::ViolationKind,
    store::SharedStore,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize, Validate)]
pub struct SelectOptionRequest {
    #[validate(length(min = 1, max = 500))]
    pub option: String,
}

#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    pub kind: ViolationKind,
}

/// Looks up the caller's attempt for a session.
async fn owned_attempt(
    attempts: &AttemptRegistry,
    id: Uuid,
    claims: &Claims,
) -> Result<ExamAttempt, AppError> {
    attempts
        .get(id)
        .await
        .filter(|a| a.owner_id() == claims.sub)
        .ok_or_else(|| SessionError::NoAttempt.into())
}

/// Starts a timed attempt on an active session.
pub async fn start_attempt(
    State(store): State<SharedStore>,
    State(attempts): State<AttemptRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    load_owned(&store, id, &claims).await?;

    let attempt = attempts
        .start(id, store.clone(), &config.attempt_settings())
        .await?;

    Ok((StatusCode::CREATED, Json(attempt.view().await)))
}

pub async fn get_attempt(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = owned_attempt(&attempts, id, &claims).await?;
    Ok(Json(attempt.view().await))
}

pub async fn select_option(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let attempt = owned_attempt(&attempts, id, &claims).await?;
    Ok(Json(attempt.select_option(&payload.option).await?))
}

pub async fn confirm_answer(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = owned_attempt(&attempts, id, &claims).await?;
    Ok(Json(attempt.confirm_answer().await?))
}

pub async fn skip_question(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = owned_attempt(&attempts, id, &claims).await?;
    Ok(Json(attempt.skip_question().await?))
}

/// Next question, or submission after the last one.
pub async fn advance(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = owned_attempt(&attempts, id, &claims).await?;
    Ok(Json(attempt.advance().await?))
}

/// Manual submission. A failed write to the store still answers 200: the
/// view carries the local result and a `syncError` notice.
pub async fn submit_attempt(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = owned_attempt(&attempts, id, &claims).await?;
    attempt.submit().await?;
    Ok(Json(attempt.view().await))
}

pub async fn retry_sync(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = owned_attempt(&attempts, id, &claims).await?;
    attempt.retry_sync().await?;
    Ok(Json(attempt.view().await))
}

/// Hides the sync-error notice.
pub async fn dismiss_sync_error(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = owned_attempt(&attempts, id, &claims).await?;
    attempt.dismiss_sync_error().await;
    Ok(StatusCode::NO_CONTENT)
}

/// Integrity signal forwarded by the browser.
///
/// Answers whether the default action (copy, paste, context menu) should be
/// cancelled. Signals arriving after the attempt is gone are let through.
pub async fn report_signal(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SignalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = match owned_attempt(&attempts, id, &claims).await {
        Ok(attempt) => attempt,
        Err(_) => {
            return Ok(Json(json!({
                "action": SignalAction::Allow,
                "violationCount": 0,
                "warning": null,
            })));
        }
    };
    let action = attempt.signals().on_signal(payload.kind);

    Ok(Json(json!({
        "action": action,
        "violationCount": attempt.signals().violation_count(),
        "warning": attempt.signals().active_warning(),
    })))
}

/// Navigation away: drops the attempt and releases its timer and monitor.
pub async fn abandon_attempt(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    owned_attempt(&attempts, id, &claims).await?;
    attempts.close(id).await;
    Ok(StatusCode::NO_CONTENT)
}
