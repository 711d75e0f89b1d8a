// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Number of questions requested from the model for every quiz.
pub const QUESTION_COUNT: usize = 10;

/// Below this many questions a non-final generation attempt is retried.
pub const MIN_ACCEPTED_QUESTIONS: usize = 5;

/// Every generated question carries exactly this many options.
pub const OPTION_COUNT: usize = 4;

pub const MAX_GENERATION_ATTEMPTS: u32 = 3;
pub const GENERATION_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// A quiz is auto-submitted when the tab loses focus this many times.
pub const MAX_TAB_SWITCHES: i32 = 3;

/// Marker stored in the answers array for an unanswered question.
pub const UNANSWERED: i32 = -1;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub quiz_time_limit_minutes: i32,
    /// Requests per second allowed per client IP on the generation routes.
    /// `None` disables rate limiting.
    pub generation_rate_limit: Option<u64>,
    pub port: u16,
    /// Origins allowed by CORS (the quiz and dashboard frontends).
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let llm_api_key = env::var("LLM_API_KEY")
            .or_else(|_| env::var("GROQ_API_KEY"))
            .expect("LLM_API_KEY must be set");

        let llm_base_url = env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string());
        Url::parse(&llm_base_url).expect("LLM_BASE_URL must be a valid URL");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 86_400),
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            llm_api_key,
            llm_base_url: llm_base_url.trim_end_matches('/').to_string(),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            quiz_time_limit_minutes: parse_or("QUIZ_TIME_LIMIT_MINUTES", 15),
            generation_rate_limit: env::var("GENERATION_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0),
            port: parse_or("PORT", 3000),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}, using default", key);
            default
        }),
        Err(_) => default,
    }
}
