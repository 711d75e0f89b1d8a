// src/handlers/quiz.rs

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{PgPool, types::Json as SqlJson};
use uuid::Uuid;

use crate::{
    config::MAX_TAB_SWITCHES,
    error::AppError,
    models::submission::{
        FocusLossRequest, FocusLossResponse, QuizView, ResultView, Submission,
        SubmitAnswersRequest, SubmitAnswersResponse, check_answers, normalize_answers,
        score_answers,
    },
};

pub(crate) const SUBMISSION_COLUMNS: &str = "id, class_id, student_name, student_nim, \
    student_email, code, questions, answers, score, time_limit_minutes, tab_switch_count, \
    auto_submitted, started_at, created_at, completed_at";

/// Loads a submission or returns 404.
pub(crate) async fn fetch_submission(pool: &PgPool, id: Uuid) -> Result<Submission, AppError> {
    let sql = format!("SELECT {} FROM submissions WHERE id = $1", SUBMISSION_COLUMNS);

    sqlx::query_as::<_, Submission>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch submission {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Submission not found".to_string()))
}

/// Stores answers and score and stamps `completed_at`.
///
/// Only an unfinished submission is updated, so concurrent finishers (timer,
/// focus-loss, submit button) complete it at most once. Returns whether this
/// call was the one that completed it.
async fn finalize(
    pool: &PgPool,
    id: Uuid,
    answers: Vec<i32>,
    score: i32,
    auto_submitted: bool,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET answers = $2, score = $3, auto_submitted = $4, completed_at = NOW()
        WHERE id = $1 AND completed_at IS NULL
        "#,
    )
    .bind(id)
    .bind(SqlJson(answers))
    .bind(score)
    .bind(auto_submitted)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to finalize submission {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(result.rows_affected() == 1)
}

/// Finalizes on the student's behalf with whatever answers are known.
async fn auto_submit(
    pool: &PgPool,
    submission: &Submission,
    answers: Option<Vec<i32>>,
) -> Result<bool, AppError> {
    let answers = normalize_answers(submission.questions.len(), answers);
    let (_, score) = score_answers(&submission.questions, &answers);
    tracing::info!(
        "Auto-submitting submission {} with score {}",
        submission.id,
        score
    );
    finalize(pool, submission.id, answers, score, true).await
}

/// Returns the quiz for a student, without the answer key.
///
/// A completed quiz is a 409. A quiz whose time limit has passed is finalized
/// with no answers and also reported as a 409.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let submission = fetch_submission(&pool, id).await?;

    if submission.is_completed() {
        return Err(AppError::Conflict("Quiz already completed".to_string()));
    }

    let now = Utc::now();
    if submission.is_expired(now) {
        auto_submit(&pool, &submission, None).await?;
        return Err(AppError::Conflict(
            "Quiz time has expired; it was submitted automatically".to_string(),
        ));
    }

    Ok(Json(QuizView::new(&submission, now)))
}

/// Records that the quiz tab lost focus.
///
/// Reaching `MAX_TAB_SWITCHES` auto-submits the quiz with the answers in the body.
pub async fn report_focus_loss(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // The beacon sent on tab hide may carry no body at all.
    let req: FocusLossRequest = if body.is_empty() {
        FocusLossRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    let submission = fetch_submission(&pool, id).await?;

    if submission.is_completed() {
        return Err(AppError::Conflict("Quiz already completed".to_string()));
    }

    let count: i32 = sqlx::query_scalar(
        r#"
        UPDATE submissions
        SET tab_switch_count = tab_switch_count + 1
        WHERE id = $1 AND completed_at IS NULL
        RETURNING tab_switch_count
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record focus loss for {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::Conflict("Quiz already completed".to_string()))?;

    tracing::warn!("Submission {} lost focus ({}x)", id, count);

    let auto_submitted =
        count >= MAX_TAB_SWITCHES && auto_submit(&pool, &submission, req.answers).await?;

    let warning = if auto_submitted {
        "Too many tab switches! The quiz has been submitted automatically.".to_string()
    } else {
        format!(
            "Warning: do not switch tabs or windows! ({}x, the quiz is submitted automatically at {})",
            count, MAX_TAB_SWITCHES
        )
    };

    Ok(Json(FocusLossResponse {
        tab_switch_count: count,
        auto_submitted,
        warning,
    }))
}

/// Scores and stores a student's answers.
///
/// The answer sheet must have one entry per question (`-1` for unanswered).
/// A submission arriving after the deadline is accepted but flagged as auto-submitted.
#[utoipa::path(
    post,
    path = "/api/submit-answers",
    request_body = SubmitAnswersRequest,
    responses(
        (status = 200, body = SubmitAnswersResponse),
        (status = 400, description = "Answer sheet does not match the quiz"),
        (status = 404, description = "Unknown submission"),
        (status = 409, description = "Quiz already completed")
    )
)]
pub async fn submit_answers(
    State(pool): State<PgPool>,
    req: Result<Json<SubmitAnswersRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = req?;
    let submission = fetch_submission(&pool, req.submission_id).await?;

    if submission.is_completed() {
        return Err(AppError::Conflict("Quiz already completed".to_string()));
    }

    check_answers(submission.questions.len(), &req.answers).map_err(AppError::BadRequest)?;

    let late = submission.is_expired(Utc::now());
    if late {
        tracing::warn!("Submission {} answered after its deadline", submission.id);
    }

    let (correct_count, score) = score_answers(&submission.questions, &req.answers);
    let total_questions = req.answers.len();

    if !finalize(&pool, submission.id, req.answers, score, late).await? {
        return Err(AppError::Conflict("Quiz already completed".to_string()));
    }

    Ok(Json(SubmitAnswersResponse {
        score,
        correct_count,
        total_questions,
    }))
}

/// Returns the score and per-question review of a completed quiz.
pub async fn get_result(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let submission = fetch_submission(&pool, id).await?;

    ResultView::from_submission(&submission)
        .map(Json)
        .ok_or(AppError::Conflict("Quiz not completed yet".to_string()))
}
