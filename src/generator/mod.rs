// src/generator/mod.rs

//! Question generation pipeline: prompt, completion call, cleanup, validation, retries.

pub mod client;
pub mod prompt;
pub mod sanitize;
pub mod validate;

use std::{fmt, sync::Arc, time::Duration};

use crate::{
    config::{GENERATION_RETRY_DELAY, MAX_GENERATION_ATTEMPTS},
    models::question::Question,
};

pub use client::{ChatCompletionClient, CompletionClient};
pub use prompt::{ChatMessage, build_messages};
pub use sanitize::clean_json_response;
pub use validate::validate_quiz;

const LOG_PREVIEW_CHARS: usize = 500;

#[derive(Debug)]
pub enum GenerationError {
    /// The HTTP call to the provider could not be completed.
    Transport(String),
    /// The provider answered with a non-success status.
    Provider { status: u16, body: String },
    /// The cleaned completion is not valid JSON.
    Parse(String),
    InvalidStructure(String),
    TooFewQuestions(usize),
    /// Every attempt failed; carries the last failure.
    Exhausted {
        attempts: u32,
        last: Box<GenerationError>,
    },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Transport(msg) => write!(f, "Completion request failed: {}", msg),
            GenerationError::Provider { status, body } => {
                write!(f, "Completion provider returned {}: {}", status, body)
            }
            GenerationError::Parse(msg) => write!(f, "Failed to parse JSON: {}", msg),
            GenerationError::InvalidStructure(msg) => write!(f, "{}", msg),
            GenerationError::TooFewQuestions(n) => {
                write!(f, "Too few questions generated: got {}", n)
            }
            GenerationError::Exhausted { attempts, last } => {
                write!(f, "Failed after {} attempts: {}", attempts, last)
            }
        }
    }
}

impl std::error::Error for GenerationError {}

/// Drives the completion client until it yields a usable quiz or attempts run out.
pub struct QuestionGenerator {
    client: Arc<dyn CompletionClient>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl QuestionGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            max_attempts: MAX_GENERATION_ATTEMPTS,
            retry_delay: GENERATION_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn generate(&self, code: &str) -> Result<Vec<Question>, GenerationError> {
        let messages = build_messages(code);
        let mut attempt = 1;

        loop {
            tracing::info!(
                "Attempt {}/{} to generate questions...",
                attempt,
                self.max_attempts
            );

            let final_attempt = attempt >= self.max_attempts;
            match self.attempt(&messages, final_attempt).await {
                Ok(questions) => {
                    tracing::info!("Successfully generated {} questions", questions.len());
                    return Ok(questions);
                }
                Err(err) => {
                    tracing::warn!("Error on attempt {}: {}", attempt, err);
                    if final_attempt {
                        return Err(GenerationError::Exhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }
                }
            }

            tokio::time::sleep(self.retry_delay).await;
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        messages: &[ChatMessage],
        final_attempt: bool,
    ) -> Result<Vec<Question>, GenerationError> {
        let raw = self.client.complete(messages).await?;
        tracing::debug!("Raw response: {}", preview(&raw));

        let cleaned = clean_json_response(&raw);
        tracing::debug!("Cleaned response: {}", preview(&cleaned));

        let value: serde_json::Value =
            serde_json::from_str(&cleaned).map_err(|e| GenerationError::Parse(e.to_string()))?;

        validate_quiz(&value, final_attempt)
    }
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}
