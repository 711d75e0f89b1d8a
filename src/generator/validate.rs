// src/generator/validate.rs

use serde_json::Value;

use crate::{
    config::{MIN_ACCEPTED_QUESTIONS, OPTION_COUNT, QUESTION_COUNT},
    models::question::Question,
};

use super::GenerationError;

/// Shape-checks a parsed model response and turns it into questions.
///
/// More than `QUESTION_COUNT` questions are truncated. Fewer than
/// `MIN_ACCEPTED_QUESTIONS` fail the attempt unless it is the final one,
/// in which case whatever arrived is accepted.
pub fn validate_quiz(value: &Value, final_attempt: bool) -> Result<Vec<Question>, GenerationError> {
    let items = value
        .get("questions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            GenerationError::InvalidStructure(
                "Invalid response structure: missing questions array".to_string(),
            )
        })?;

    if items.is_empty() {
        return Err(GenerationError::InvalidStructure(
            "Invalid response structure: questions array is empty".to_string(),
        ));
    }

    if items.len() != QUESTION_COUNT {
        tracing::warn!(
            "Got {} questions instead of {}",
            items.len(),
            QUESTION_COUNT
        );

        if items.len() < MIN_ACCEPTED_QUESTIONS && !final_attempt {
            return Err(GenerationError::TooFewQuestions(items.len()));
        }
    }

    items
        .iter()
        .take(QUESTION_COUNT)
        .enumerate()
        .map(|(i, item)| parse_question(i + 1, item))
        .collect()
}

fn parse_question(number: usize, item: &Value) -> Result<Question, GenerationError> {
    let invalid = || {
        GenerationError::InvalidStructure(format!(
            "Question #{} is invalid: missing required fields",
            number
        ))
    };

    let question = item
        .get("question")
        .and_then(Value::as_str)
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(invalid)?;

    let options = item
        .get("options")
        .and_then(Value::as_array)
        .filter(|opts| opts.len() == OPTION_COUNT)
        .ok_or_else(invalid)?
        .iter()
        .map(|opt| opt.as_str().map(str::to_string))
        .collect::<Option<Vec<String>>>()
        .ok_or_else(invalid)?;

    let correct_answer = item
        .get("correct_answer")
        .and_then(Value::as_i64)
        .filter(|idx| (0..OPTION_COUNT as i64).contains(idx))
        .ok_or_else(|| {
            GenerationError::InvalidStructure(format!(
                "Question #{} has invalid correct_answer",
                number
            ))
        })?;

    Ok(Question {
        question: question.to_string(),
        options,
        correct_answer: correct_answer as i32,
    })
}
