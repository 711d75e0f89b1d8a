// src/models/question.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// A generated multiple-choice question.
/// Stored inside the `submissions.questions` JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Question {
    /// The prompt shown to the student.
    pub question: String,

    /// Exactly four answer options.
    pub options: Vec<String>,

    /// Index (0..=3) into `options`.
    pub correct_answer: i32,
}

/// DTO for sending a question to the student (excludes the answer key).
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicQuestion {
    pub question: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            question: q.question.clone(),
            options: q.options.clone(),
        }
    }
}

/// Successful body of the generation endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuizResponse {
    pub questions: Vec<Question>,
}

/// DTO for the generation endpoint.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GenerateQuestionsRequest {
    #[serde(default)]
    #[validate(length(max = 100000, message = "Code must be at most 100000 characters."))]
    pub code: String,
}

/// Error body returned when generation fails after all retries.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationErrorBody {
    pub error: String,
    pub details: String,
    pub hint: String,
}
