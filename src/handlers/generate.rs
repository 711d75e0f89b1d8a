// src/handlers/generate.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    generator::QuestionGenerator,
    models::question::{GenerateQuestionsRequest, GenerationErrorBody, QuizResponse},
};

pub const EMPTY_CODE_MESSAGE: &str = "HTML code must not be empty";

/// Generates multiple-choice questions from a piece of student HTML/CSS.
///
/// * Rejects empty or whitespace-only code with 400.
/// * Retries the model up to three times on transport, parse and shape failures.
/// * Terminal failure is a 500 with `error`, `details` and `hint`.
#[utoipa::path(
    post,
    path = "/api/generate-questions",
    request_body = GenerateQuestionsRequest,
    responses(
        (status = 200, body = QuizResponse),
        (status = 400, description = "Empty code or malformed body"),
        (status = 500, body = GenerationErrorBody)
    )
)]
pub async fn generate_questions(
    State(generator): State<Arc<QuestionGenerator>>,
    payload: Result<Json<GenerateQuestionsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    if payload.code.trim().is_empty() {
        return Err(AppError::BadRequest(EMPTY_CODE_MESSAGE.to_string()));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let questions = generator.generate(&payload.code).await?;

    Ok(Json(QuizResponse { questions }))
}
