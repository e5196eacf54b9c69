// src/handlers/comments.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::comment::{
        Comment, CommentListParams, CreateCommentRequest, CreatedCommentResponse,
        MAX_REPLY_DEPTH,
    },
    utils::{
        comment_tree::assemble_comment_tree,
        throttle::{SubmissionThrottle, client_key},
    },
};

/// List the comment thread of a post.
///
/// Rows are loaded oldest first and assembled into a reply tree:
/// newest root comment first, replies in the order they were written.
pub async fn list_comments(
    State(pool): State<PgPool>,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = params
        .post_id
        .filter(|id| !id.is_empty())
        .ok_or(AppError::BadRequest("Missing postId".to_string()))?;

    let rows = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, parent_id, nickname, content, created_at
        FROM comments
        WHERE post_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(&post_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list comments for {}: {:?}", post_id, e);
        AppError::from(e)
    })?;

    Ok(Json(assemble_comment_tree(rows)))
}

/// Submit a new comment or reply.
///
/// Checks run in order: per-client throttle, required fields, length
/// bounds, then the parent must exist within the same post and sit above
/// `MAX_REPLY_DEPTH`.
pub async fn create_comment(
    State(pool): State<PgPool>,
    State(throttle): State<Arc<dyn SubmissionThrottle>>,
    headers: HeaderMap,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let client = client_key(&headers);
    if !throttle.try_acquire(&client).await {
        tracing::debug!("Throttled comment submission from {}", client);
        return Err(AppError::TooManyRequests(
            "Too many comments, please try again later".to_string(),
        ));
    }

    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let new_comment = payload.into_new_comment().ok_or(AppError::BadRequest(
        "Nickname and content are required".to_string(),
    ))?;
    new_comment.check()?;

    let mut tx = pool.begin().await?;

    if let Some(parent_id) = new_comment.parent_id {
        // Lock the parent so it cannot disappear before the reply lands.
        let (_, parent_post_id) = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, post_id FROM comments WHERE id = $1 FOR KEY SHARE",
        )
        .bind(parent_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::BadRequest("Parent comment not found".to_string()))?;

        if parent_post_id != new_comment.post_id {
            return Err(AppError::BadRequest(
                "Cannot reply to a comment on a different post".to_string(),
            ));
        }

        // Number of ancestors above the parent, walked no further than the cap.
        let parent_depth = sqlx::query_scalar::<_, Option<i64>>(
            r#"
            WITH RECURSIVE ancestors (id, parent_id, depth) AS (
                SELECT id, parent_id, 0::BIGINT
                FROM comments
                WHERE id = $1
              UNION ALL
                SELECT c.id, c.parent_id, a.depth + 1
                FROM comments c
                JOIN ancestors a ON c.id = a.parent_id
                WHERE a.depth < $2
            )
            SELECT MAX(depth) FROM ancestors
            "#,
        )
        .bind(parent_id)
        .bind(MAX_REPLY_DEPTH)
        .fetch_one(&mut *tx)
        .await?
        .unwrap_or(0);

        if parent_depth >= MAX_REPLY_DEPTH {
            return Err(AppError::BadRequest(format!(
                "Replies cannot be nested more than {} levels deep",
                MAX_REPLY_DEPTH
            )));
        }
    }

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (post_id, parent_id, nickname, content)
        VALUES ($1, $2, $3, $4)
        RETURNING id, post_id, parent_id, nickname, content, created_at
        "#,
    )
    .bind(&new_comment.post_id)
    .bind(new_comment.parent_id)
    .bind(&new_comment.nickname)
    .bind(&new_comment.content)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create comment: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    tracing::info!(
        "New comment {} on {} by {}",
        comment.id,
        comment.post_id,
        comment.nickname
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedCommentResponse {
            success: true,
            comment,
        }),
    ))
}
