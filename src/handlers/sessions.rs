// src/handlers/sessions.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::AttemptRegistry,
    error::AppError,
    models::{
        answer::AnswerRecord,
        question::Question,
        result::{ExamResult, Submission},
        session::{CreateSessionRequest, ExamSession, ProcessSessionRequest},
        violation::ViolationRecord,
    },
    store::SharedStore,
    utils::jwt::Claims,
};

/// Fetches a session and hides it from anyone but its owner.
pub(crate) async fn load_owned(
    store: &SharedStore,
    id: Uuid,
    claims: &Claims,
) -> Result<ExamSession, AppError> {
    let session = store.fetch(id).await?;
    if session.owner_id != claims.sub {
        return Err(AppError::NotFound("Session not found".to_string()));
    }
    Ok(session)
}

/// Lists the caller's sessions for the study history, newest first.
pub async fn list_sessions(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = store.list_for_owner(&claims.sub).await?;
    Ok(Json(sessions))
}

/// Creates an empty draft session waiting for generated questions.
pub async fn create_session(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let session = store
        .create(ExamSession::new_draft(&claims.sub, payload))
        .await?;
    tracing::info!("Session {} created by {}", session.id, claims.sub);

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = load_owned(&store, id, &claims).await?;
    let review = session
        .results
        .as_ref()
        .map(|result| result.review(&session.questions));

    Ok(Json(serde_json::json!({ "session": session, "review": review })))
}

/// Deletes a session. A running attempt on it is abandoned first.
pub async fn delete_session(
    State(store): State<SharedStore>,
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    load_owned(&store, id, &claims).await?;

    attempts.close(id).await;
    store.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Attaches the questions produced by the generation service to a draft.
///
/// * Validates every question (options, answer key).
/// * Moves the session from draft to active.
pub async fn process_session(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProcessSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    load_owned(&store, id, &claims).await?;
    payload.validate()?;

    let questions = payload
        .questions
        .into_iter()
        .enumerate()
        .map(|(idx, q)| {
            q.into_question()
                .map_err(|e| AppError::BadRequest(format!("questions[{}]: {}", idx, e)))
        })
        .collect::<Result<Vec<Question>, AppError>>()?;

    let session = store.activate(id, questions).await?;
    tracing::info!(
        "Session {} activated with {} questions",
        id,
        session.questions.len()
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "questions": session.questions,
    })))
}

/// One answer as reported by a client that ran the quiz itself.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    /// Falls back to the position in the list.
    pub question_index: Option<usize>,
    pub selected_option: Option<String>,
}

/// DTO for the store's submit contract.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSessionRequest {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
    pub answers: Vec<SubmittedAnswer>,
    #[serde(default)]
    pub violations: Vec<ViolationRecord>,
}

/// Stores a result computed by the client.
///
/// The answers are graded again against the stored answer keys; the claimed
/// score, total and percentage must agree with that grading.
pub async fn submit_session(
    State(store): State<SharedStore>,
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = load_owned(&store, id, &claims).await?;

    if attempts.contains(id).await {
        return Err(AppError::Conflict(
            "Session is being attempted on the server".to_string(),
        ));
    }

    let total = session.questions.len() as u32;
    let records = req
        .answers
        .iter()
        .enumerate()
        .map(|(pos, a)| {
            let idx = a.question_index.unwrap_or(pos);
            let question = session
                .questions
                .get(idx)
                .ok_or_else(|| AppError::BadRequest(format!("No question at index {}", idx)))?;
            Ok(AnswerRecord::grade(idx, question, a.selected_option.as_deref()))
        })
        .collect::<Result<Vec<AnswerRecord>, AppError>>()?;

    let result = ExamResult::from_answers(total, records).map_err(AppError::BadRequest)?;
    if (req.score, req.total_questions, req.percentage)
        != (result.score(), result.total_questions(), result.percentage())
    {
        tracing::warn!(
            "Rejected submission for session {}: claimed {}/{} ({}%), graded {}/{} ({}%)",
            id,
            req.score,
            req.total_questions,
            req.percentage,
            result.score(),
            result.total_questions(),
            result.percentage()
        );
        return Err(AppError::BadRequest(
            "Submitted score does not match the graded answers".to_string(),
        ));
    }

    let submission = Submission {
        result,
        violations: req.violations,
    };
    store.submit(id, &submission).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "results": submission.result,
    })))
}
