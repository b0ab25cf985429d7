use axum::{extract::State, response::IntoResponse};
use sqlx::{FromRow, PgExecutor, PgPool, Row};
use uuid::Uuid;
use validator::Validate;

use crate::{
    comments::{Comment, CommentPayload, CommentResponse},
    config::settings::Settings,
    context::{RequestContext, Viewer},
    error::{db_error, AppError},
    extract::{Json, Path, Query},
    pagination::{PageQuery, Pagination},
    posts::handler::post_author,
    profiles::ProfileSummary,
    response::ApiResponse,
};

/// Helper struct for fetching comments with author info from database
#[derive(FromRow)]
struct CommentFromDb {
    id: Uuid,
    post_id: Uuid,
    content: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    // Author fields
    profile_id: Uuid,
    username: String,
    profile_picture: Option<String>,
}

impl From<CommentFromDb> for CommentResponse {
    fn from(c: CommentFromDb) -> Self {
        CommentResponse {
            id: c.id,
            post_id: c.post_id,
            author: ProfileSummary {
                id: c.profile_id,
                username: c.username,
                profile_picture: c.profile_picture,
            },
            content: c.content,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

const COMMENT_SELECT: &str = r#"
    SELECT
        c.id, c.post_id, c.content, c.created_at, c.updated_at,
        c.profile_id, a.username, p.profile_picture
    FROM comments c
    JOIN profiles p ON p.id = c.profile_id
    JOIN accounts a ON a.id = c.profile_id
"#;

/// Create a new comment on a post
/// POST /api/posts/:id/comments
pub async fn create_comment(
    mut ctx: RequestContext,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    post_author(ctx.conn(), post_id).await?;

    let now = chrono::Utc::now();

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, profile_id, post_id, content, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(ctx.profile_id)
    .bind(post_id)
    .bind(&payload.content)
    .bind(now)
    .bind(now)
    .fetch_one(ctx.conn())
    .await
    .map_err(db_error)?;

    let response = get_comment_response(ctx.conn(), comment.id).await?;
    ctx.commit().await?;

    Ok(ApiResponse::success(response).created())
}

/// Comments on a post, newest first
/// GET /api/posts/:id/comments
pub async fn get_post_comments(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    _viewer: Viewer,
    Path(post_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::resolve(&page, &settings)?;

    post_author(&pool, post_id).await?;

    let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM comments WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .map_err(db_error)?
        .get("count");

    let query_str = format!(
        "{} WHERE c.post_id = $1 ORDER BY c.created_at DESC, c.id DESC LIMIT $2 OFFSET $3",
        COMMENT_SELECT
    );

    let comments = sqlx::query_as::<_, CommentFromDb>(&query_str)
        .bind(post_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch comments: {:?}", e);
            AppError::InternalServerError
        })?;

    let results = comments.into_iter().map(CommentResponse::from).collect();

    Ok(ApiResponse::success(pagination.into_page(results, total)))
}

/// GET /api/comments/:id
pub async fn get_comment(
    State(pool): State<PgPool>,
    _viewer: Viewer,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let response = get_comment_response(&pool, comment_id).await?;
    Ok(ApiResponse::success(response))
}

/// Update a comment (author only)
/// PUT /api/comments/:id
pub async fn update_comment(
    mut ctx: RequestContext,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = comment_author(ctx.conn(), comment_id).await?;
    ctx.ensure_owner(author_id, "You can only edit your own comments")?;

    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    sqlx::query("UPDATE comments SET content = $1, updated_at = NOW() WHERE id = $2")
        .bind(&payload.content)
        .bind(comment_id)
        .execute(ctx.conn())
        .await
        .map_err(db_error)?;

    let response = get_comment_response(ctx.conn(), comment_id).await?;
    ctx.commit().await?;

    Ok(ApiResponse::success(response))
}

/// Delete a comment (author only)
/// DELETE /api/comments/:id
pub async fn delete_comment(
    mut ctx: RequestContext,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = comment_author(ctx.conn(), comment_id).await?;
    ctx.ensure_owner(author_id, "You can only delete your own comments")?;

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(ctx.conn())
        .await
        .map_err(db_error)?;

    ctx.commit().await?;

    Ok(ApiResponse::ok("Comment deleted"))
}

async fn comment_author<'e, E>(executor: E, comment_id: Uuid) -> Result<Uuid, AppError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query("SELECT profile_id FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(executor)
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    Ok(row.get("profile_id"))
}

async fn get_comment_response<'e, E>(
    executor: E,
    comment_id: Uuid,
) -> Result<CommentResponse, AppError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, CommentFromDb>(&format!("{} WHERE c.id = $1", COMMENT_SELECT))
        .bind(comment_id)
        .fetch_optional(executor)
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    Ok(CommentResponse::from(row))
}
