// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::quiz::fetch_submission,
    models::submission::{
        SubmissionFilter, SubmissionListItem, SubmissionListResponse, SubmissionSummary,
    },
    utils::html::PREVIEW_CSP,
};

/// Lists submissions, newest first, optionally filtered by class.
/// Admin only.
pub async fn list_submissions(
    State(pool): State<PgPool>,
    Query(filter): Query<SubmissionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let class_id = match filter.class_id.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| AppError::BadRequest("Invalid class_id".to_string()))?,
        ),
    };

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT
            s.id, s.class_id, c.name AS class_name,
            s.student_name, s.student_nim, s.student_email,
            s.score, s.tab_switch_count, s.auto_submitted,
            s.created_at, s.completed_at
        FROM submissions s
        LEFT JOIN classes c ON c.id = s.class_id
        "#,
    );

    if let Some(class_id) = class_id {
        builder.push(" WHERE s.class_id = ");
        builder.push_bind(class_id);
    }

    builder.push(" ORDER BY s.created_at DESC");

    let rows: Vec<SubmissionSummary> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list submissions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let submissions: Vec<SubmissionListItem> = rows.into_iter().map(Into::into).collect();

    Ok(Json(SubmissionListResponse {
        total: submissions.len(),
        submissions,
    }))
}

/// Returns the full submission, including code, questions and answers.
/// Admin only.
pub async fn get_submission(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let submission = fetch_submission(&pool, id).await?;
    Ok(Json(submission))
}

/// Serves the submitted HTML for the preview pane.
///
/// The CSP `sandbox` directive makes the browser treat it as an opaque,
/// script-less origin.
/// Admin only.
pub async fn preview_submission(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let submission = fetch_submission(&pool, id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CONTENT_SECURITY_POLICY, PREVIEW_CSP),
        ],
        submission.code,
    ))
}

/// Deletes a submission by ID.
/// Admin only.
pub async fn delete_submission(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM submissions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete submission: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Submission not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
