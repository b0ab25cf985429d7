use axum::{extract::State, response::IntoResponse};
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::{
    config::settings::Settings,
    context::{RequestContext, Viewer},
    error::{db_error, is_unique_violation, AppError},
    extract::{Path, Query},
    likes::{Like, LikeActionResponse, LikeFromDb, LikeResponse, ALREADY_LIKED, NOT_LIKED},
    pagination::{PageQuery, Pagination},
    posts::handler::post_author,
    response::ApiResponse,
};

/// POST /api/posts/:id/like
pub async fn like_post(
    mut ctx: RequestContext,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // NotFound when the post is gone
    post_author(ctx.conn(), post_id).await?;

    let like = sqlx::query_as::<_, Like>(
        "INSERT INTO likes (id, profile_id, post_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(ctx.profile_id)
    .bind(post_id)
    .fetch_one(ctx.conn())
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::BadRequest(ALREADY_LIKED.to_string())
        } else {
            db_error(e)
        }
    })?;

    tracing::debug!("profile {} liked post {} ({})", like.profile_id, like.post_id, like.id);

    let likes_count = likes_count(ctx.conn(), post_id).await?;
    ctx.commit().await?;

    Ok(ApiResponse::success(LikeActionResponse {
        liked: true,
        likes_count,
    })
    .created())
}

/// DELETE /api/posts/:id/like
pub async fn unlike_post(
    mut ctx: RequestContext,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    post_author(ctx.conn(), post_id).await?;

    let result = sqlx::query("DELETE FROM likes WHERE profile_id = $1 AND post_id = $2")
        .bind(ctx.profile_id)
        .bind(post_id)
        .execute(ctx.conn())
        .await
        .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(NOT_LIKED.to_string()));
    }

    let likes_count = likes_count(ctx.conn(), post_id).await?;
    ctx.commit().await?;

    Ok(ApiResponse::success(LikeActionResponse {
        liked: false,
        likes_count,
    }))
}

/// Who liked a post, most recent first
/// GET /api/posts/:id/likes
pub async fn get_post_likes(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    _viewer: Viewer,
    Path(post_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::resolve(&page, &settings)?;

    post_author(&pool, post_id).await?;

    let total = likes_count(&pool, post_id).await?;

    let likes = sqlx::query_as::<_, LikeFromDb>(
        r#"
        SELECT l.id, l.post_id, l.created_at, l.profile_id, a.username, p.profile_picture
        FROM likes l
        JOIN profiles p ON p.id = l.profile_id
        JOIN accounts a ON a.id = l.profile_id
        WHERE l.post_id = $1
        ORDER BY l.created_at DESC, l.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(post_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&pool)
    .await
    .map_err(db_error)?;

    let results = likes.into_iter().map(LikeResponse::from).collect();

    Ok(ApiResponse::success(pagination.into_page(results, total)))
}

async fn likes_count<'e, E>(executor: E, post_id: Uuid) -> Result<i64, AppError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query("SELECT COUNT(*) AS count FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(executor)
        .await
        .map_err(db_error)?;

    Ok(row.get("count"))
}
