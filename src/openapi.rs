// src/openapi.rs

use axum::Json;
use utoipa::OpenApi;

use crate::handlers::{generate, quiz, submission};
use crate::models::question::{GenerationErrorBody, Question, QuizResponse};

/// OpenAPI document for the public JSON endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(
        generate::generate_questions,
        submission::create_submission,
        quiz::submit_answers
    ),
    components(schemas(Question, QuizResponse, GenerationErrorBody)),
    tags((name = "codequiz", description = "HTML/CSS quiz generation and grading"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
