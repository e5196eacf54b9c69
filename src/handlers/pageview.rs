// src/handlers/pageview.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::pageview::{PageViewParams, PageViewResponse},
};

fn require_post_id(params: PageViewParams) -> Result<String, AppError> {
    params
        .id
        .filter(|id| !id.is_empty())
        .ok_or(AppError::BadRequest("Missing post id".to_string()))
}

/// Current view count of a post; zero if it was never viewed.
pub async fn get_views(
    State(pool): State<PgPool>,
    Query(params): Query<PageViewParams>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = require_post_id(params)?;

    let views = sqlx::query_scalar::<_, i64>(
        "SELECT views FROM pageviews WHERE post_id = $1",
    )
    .bind(&post_id)
    .fetch_optional(&pool)
    .await?
    .unwrap_or(0);

    Ok(Json(PageViewResponse { views }))
}

/// Count one view and return the new total.
pub async fn record_view(
    State(pool): State<PgPool>,
    Query(params): Query<PageViewParams>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = require_post_id(params)?;

    let views = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO pageviews (post_id, views)
        VALUES ($1, 1)
        ON CONFLICT (post_id)
        DO UPDATE SET views = pageviews.views + 1, updated_at = NOW()
        RETURNING views
        "#,
    )
    .bind(&post_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record view for {}: {:?}", post_id, e);
        AppError::from(e)
    })?;

    Ok(Json(PageViewResponse { views }))
}
