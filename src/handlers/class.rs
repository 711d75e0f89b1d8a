// src/handlers/class.rs

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::class::{Class, CreateClassRequest},
    utils::html::strip_tags,
};

/// Lists all classes ordered by name.
/// Public: the student start form needs it too.
pub async fn list_classes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let classes = sqlx::query_as::<_, Class>("SELECT id, name, created_at FROM classes ORDER BY name")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list classes: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(classes))
}

/// Creates a class.
/// Admin only.
pub async fn create_class(
    State(pool): State<PgPool>,
    payload: Result<Json<CreateClassRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let name = strip_tags(&payload.name);
    if name.is_empty() {
        return Err(AppError::BadRequest("Class name must contain text".to_string()));
    }

    let class = sqlx::query_as::<_, Class>(
        r#"
        INSERT INTO classes (id, name)
        VALUES ($1, $2)
        RETURNING id, name, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Class '{}' already exists", name))
        } else {
            tracing::error!("Failed to create class: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(class)))
}

/// Deletes a class. Its submissions are kept and become unassigned.
/// Admin only.
pub async fn delete_class(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM classes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete class: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Class not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
