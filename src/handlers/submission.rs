// src/handlers/submission.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{PgPool, types::Json as SqlJson};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    generator::QuestionGenerator,
    handlers::generate::EMPTY_CODE_MESSAGE,
    models::submission::{CreateSubmissionRequest, CreateSubmissionResponse},
    utils::html::strip_tags,
};

/// Starts a quiz attempt.
///
/// Generates the questions from the submitted code first, so a failed
/// generation never leaves a half-created submission behind.
#[utoipa::path(
    post,
    path = "/api/submissions",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, body = CreateSubmissionResponse),
        (status = 400, description = "Invalid identity fields, unknown class or empty code"),
        (status = 500, description = "Question generation failed")
    )
)]
pub async fn create_submission(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(generator): State<Arc<QuestionGenerator>>,
    payload: Result<Json<CreateSubmissionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.code.trim().is_empty() {
        return Err(AppError::BadRequest(EMPTY_CODE_MESSAGE.to_string()));
    }

    let student_name = strip_tags(&payload.student_name);
    let student_nim = strip_tags(&payload.student_nim);
    if student_name.is_empty() || student_nim.is_empty() {
        return Err(AppError::BadRequest(
            "Name and NIM must contain text".to_string(),
        ));
    }

    if let Some(class_id) = payload.class_id {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM classes WHERE id = $1")
            .bind(class_id)
            .fetch_optional(&pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::BadRequest("Unknown class".to_string()));
        }
    }

    let questions = generator.generate(&payload.code).await?;
    let question_count = questions.len();

    let id = Uuid::new_v4();
    let started_at = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO submissions
        (id, class_id, student_name, student_nim, student_email, code, questions,
         time_limit_minutes, started_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(payload.class_id)
    .bind(&student_name)
    .bind(&student_nim)
    .bind(payload.student_email.trim())
    .bind(&payload.code)
    .bind(SqlJson(&questions))
    .bind(config.quiz_time_limit_minutes)
    .bind(started_at)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "Submission {} created for {} ({} questions)",
        id,
        student_nim,
        question_count
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateSubmissionResponse {
            id,
            question_count,
            time_limit_minutes: config.quiz_time_limit_minutes,
            started_at,
        }),
    ))
}
