// src/models/submission.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{MAX_TAB_SWITCHES, OPTION_COUNT, UNANSWERED},
    models::question::{PublicQuestion, Question},
};

/// Represents the 'submissions' table in the database.
/// One row per quiz attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub class_id: Option<Uuid>,
    pub student_name: String,
    pub student_nim: String,
    pub student_email: String,

    /// The submitted HTML (with internal CSS).
    pub code: String,

    /// Generated questions, stored as a JSON array.
    pub questions: Json<Vec<Question>>,

    /// One entry per question, `-1` for unanswered. `None` until completion.
    pub answers: Option<Json<Vec<i32>>>,

    /// 0..=100. `None` until completion.
    pub score: Option<i32>,

    pub time_limit_minutes: i32,
    pub tab_switch_count: i32,

    /// Finalized by the timer or by the focus-loss rule rather than by the student.
    pub auto_submitted: bool,

    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + Duration::minutes(i64::from(self.time_limit_minutes))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }

    /// Whole seconds left before the time limit, rounded up and never negative.
    /// Zero exactly when the quiz is expired.
    pub fn time_left_seconds(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.deadline() - now).num_milliseconds();
        if millis <= 0 { 0 } else { (millis + 999) / 1000 }
    }
}

/// Row for the admin listing. `class_name` comes from a join on `classes`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubmissionSummary {
    pub id: Uuid,
    pub class_id: Option<Uuid>,
    pub class_name: Option<String>,
    pub student_name: String,
    pub student_nim: String,
    pub student_email: String,
    pub score: Option<i32>,
    pub tab_switch_count: i32,
    pub auto_submitted: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Letter grade shown as a badge on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    #[serde(rename = "in_progress")]
    InProgress,
    A,
    B,
    C,
    #[serde(rename = "D/E")]
    DE,
}

impl Grade {
    pub fn from_score(score: Option<i32>) -> Self {
        match score {
            None => Grade::InProgress,
            Some(s) if s >= 80 => Grade::A,
            Some(s) if s >= 70 => Grade::B,
            Some(s) if s >= 60 => Grade::C,
            Some(_) => Grade::DE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionListItem {
    #[serde(flatten)]
    pub submission: SubmissionSummary,
    pub grade: Grade,
}

impl From<SubmissionSummary> for SubmissionListItem {
    fn from(submission: SubmissionSummary) -> Self {
        let grade = Grade::from_score(submission.score);
        Self { submission, grade }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionListResponse {
    pub total: usize,
    pub submissions: Vec<SubmissionListItem>,
}

/// Query string for the admin listing.
#[derive(Debug, Deserialize)]
pub struct SubmissionFilter {
    /// Absent or "all" lists every class.
    pub class_id: Option<String>,
}

/// DTO for starting a quiz: identity fields and the code to be quizzed on.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSubmissionRequest {
    #[validate(length(min = 1, max = 100, message = "Name length must be between 1 and 100 characters."))]
    pub student_name: String,
    #[validate(length(min = 1, max = 30, message = "NIM length must be between 1 and 30 characters."))]
    pub student_nim: String,
    #[validate(email(message = "Email must be a valid address."))]
    pub student_email: String,
    pub class_id: Option<Uuid>,
    #[validate(length(max = 100000, message = "Code must be at most 100000 characters."))]
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateSubmissionResponse {
    pub id: Uuid,
    pub question_count: usize,
    pub time_limit_minutes: i32,
    pub started_at: DateTime<Utc>,
}

/// DTO for submitting answers.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswersRequest {
    #[serde(rename = "submissionId")]
    pub submission_id: Uuid,
    pub answers: Vec<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswersResponse {
    pub score: i32,
    pub correct_count: usize,
    pub total_questions: usize,
}

/// Reported by the quiz page whenever the tab becomes hidden.
/// Carries the current answers so an auto-submit records them.
#[derive(Debug, Default, Deserialize)]
pub struct FocusLossRequest {
    #[serde(default)]
    pub answers: Option<Vec<i32>>,
}

#[derive(Debug, Serialize)]
pub struct FocusLossResponse {
    pub tab_switch_count: i32,
    pub auto_submitted: bool,
    pub warning: String,
}

/// How close the student is to running out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUrgency {
    Normal,
    Warning,
    Critical,
}

impl TimeUrgency {
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds < 300 {
            TimeUrgency::Critical
        } else if seconds < 600 {
            TimeUrgency::Warning
        } else {
            TimeUrgency::Normal
        }
    }
}

/// What the student sees while taking the quiz.
#[derive(Debug, Serialize)]
pub struct QuizView {
    pub id: Uuid,
    pub student_name: String,
    pub questions: Vec<PublicQuestion>,
    pub time_left_seconds: i64,
    pub time_display: String,
    pub urgency: TimeUrgency,
    pub tab_switch_count: i32,
    pub max_tab_switches: i32,
}

impl QuizView {
    pub fn new(submission: &Submission, now: DateTime<Utc>) -> Self {
        let time_left_seconds = submission.time_left_seconds(now);
        Self {
            id: submission.id,
            student_name: submission.student_name.clone(),
            questions: submission.questions.iter().map(PublicQuestion::from).collect(),
            time_left_seconds,
            time_display: format_time(time_left_seconds),
            urgency: TimeUrgency::from_seconds(time_left_seconds),
            tab_switch_count: submission.tab_switch_count,
            max_tab_switches: MAX_TAB_SWITCHES,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionReview {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    pub chosen: i32,
    pub is_correct: bool,
}

/// Result page for a completed submission.
#[derive(Debug, Serialize)]
pub struct ResultView {
    pub id: Uuid,
    pub student_name: String,
    pub score: i32,
    pub correct_count: usize,
    pub total_questions: usize,
    pub auto_submitted: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub review: Vec<QuestionReview>,
}

impl ResultView {
    /// `None` while the submission is still in progress.
    pub fn from_submission(submission: &Submission) -> Option<Self> {
        let score = submission.score?;
        let answers = submission.answers.as_ref()?;

        let review: Vec<QuestionReview> = submission
            .questions
            .iter()
            .zip(answers.iter())
            .map(|(q, &chosen)| QuestionReview {
                question: q.question.clone(),
                options: q.options.clone(),
                correct_answer: q.correct_answer,
                chosen,
                is_correct: chosen == q.correct_answer,
            })
            .collect();

        Some(Self {
            id: submission.id,
            student_name: submission.student_name.clone(),
            score,
            correct_count: review.iter().filter(|r| r.is_correct).count(),
            total_questions: review.len(),
            auto_submitted: submission.auto_submitted,
            completed_at: submission.completed_at,
            review,
        })
    }
}

/// Checks an answer sheet against the quiz it belongs to.
pub fn check_answers(question_count: usize, answers: &[i32]) -> Result<(), String> {
    if answers.len() != question_count {
        return Err(format!(
            "Expected {} answers, got {}",
            question_count,
            answers.len()
        ));
    }

    if let Some((i, a)) = answers
        .iter()
        .enumerate()
        .find(|(_, a)| **a != UNANSWERED && !(0..OPTION_COUNT as i32).contains(*a))
    {
        return Err(format!("Answer #{} is out of range: {}", i + 1, a));
    }

    Ok(())
}

/// Fits a possibly partial answer sheet to the quiz, marking gaps as unanswered.
/// Used when the server finalizes a quiz on the student's behalf.
pub fn normalize_answers(question_count: usize, answers: Option<Vec<i32>>) -> Vec<i32> {
    let mut answers = answers.unwrap_or_default();
    answers.resize(question_count, UNANSWERED);
    for a in answers.iter_mut() {
        if !(0..OPTION_COUNT as i32).contains(&*a) {
            *a = UNANSWERED;
        }
    }
    answers
}

/// Returns `(correct_count, score)` where score is a rounded percentage.
pub fn score_answers(questions: &[Question], answers: &[i32]) -> (usize, i32) {
    if questions.is_empty() {
        return (0, 0);
    }

    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| q.correct_answer == **a)
        .count();

    let score = (correct as f64 * 100.0 / questions.len() as f64).round() as i32;
    (correct, score)
}

/// Formats seconds as `m:ss`.
pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
