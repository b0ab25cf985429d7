use axum::{extract::State, response::IntoResponse};
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::jwt,
    config::settings::Settings,
    context::{RequestContext, Viewer},
    error::{db_error, AppError},
    extract::{Json, Path, Query},
    pagination::{PageQuery, Pagination},
    posts::{
        CreatePost, Post, PostFilter, PostFromDb, PostResponse, UpdatePost, FEED_SCOPE,
        POST_ORDER, POST_SELECT,
    },
    response::ApiResponse,
};

/// POST /api/posts
pub async fn create_post(
    mut ctx: RequestContext,
    Json(payload): Json<CreatePost>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let now = chrono::Utc::now();

    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, author_id, content, media_url, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(ctx.profile_id)
    .bind(&payload.content)
    .bind(&payload.media_url)
    .bind(now)
    .bind(now)
    .fetch_one(ctx.conn())
    .await
    .map_err(db_error)?;

    let response = get_post_response(ctx.conn(), post.id).await?;
    ctx.commit().await?;

    Ok(ApiResponse::success(response).created())
}

/// GET /api/posts
pub async fn list_posts(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    _viewer: Viewer,
    Query(page): Query<PageQuery>,
    Query(filter): Query<PostFilter>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::resolve(&page, &settings)?;

    let total: i64 = sqlx::query(
        "SELECT COUNT(*) AS count FROM posts p WHERE ($1::uuid IS NULL OR p.author_id = $1)",
    )
    .bind(filter.author)
    .fetch_one(&pool)
    .await
    .map_err(db_error)?
    .get("count");

    let query_str = format!(
        "{} WHERE ($1::uuid IS NULL OR p.author_id = $1) {} LIMIT $2 OFFSET $3",
        POST_SELECT, POST_ORDER
    );

    let rows = sqlx::query_as::<_, PostFromDb>(&query_str)
        .bind(filter.author)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Post list error: {:?}", e);
            AppError::InternalServerError
        })?;

    let results = rows.into_iter().map(PostResponse::from).collect();

    Ok(ApiResponse::success(pagination.into_page(results, total)))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(pool): State<PgPool>,
    _viewer: Viewer,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let response = get_post_response(&pool, id).await?;
    Ok(ApiResponse::success(response))
}

/// PUT /api/posts/:id
pub async fn update_post(
    mut ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePost>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = post_author(ctx.conn(), id).await?;
    ctx.ensure_owner(author_id, "You can only edit your own posts")?;

    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    sqlx::query(
        r#"
        UPDATE posts SET
            content = COALESCE($1, content),
            media_url = CASE WHEN $2 THEN $3 ELSE media_url END,
            updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(&payload.content)
    .bind(payload.media_url.is_some())
    .bind(payload.media_url.as_ref().and_then(|url| url.as_deref()))
    .bind(id)
    .execute(ctx.conn())
    .await
    .map_err(db_error)?;

    let response = get_post_response(ctx.conn(), id).await?;
    ctx.commit().await?;

    Ok(ApiResponse::success(response))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    mut ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = post_author(ctx.conn(), id).await?;
    ctx.ensure_owner(author_id, "You can only delete your own posts")?;

    for statement in [
        "DELETE FROM comments WHERE post_id = $1",
        "DELETE FROM likes WHERE post_id = $1",
        "DELETE FROM posts WHERE id = $1",
    ] {
        sqlx::query(statement)
            .bind(id)
            .execute(ctx.conn())
            .await
            .map_err(db_error)?;
    }

    ctx.commit().await?;

    Ok(ApiResponse::ok("Post deleted"))
}

/// Own posts plus posts of followed profiles, newest first
/// GET /api/feed
pub async fn get_feed(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    claims: jwt::Claims,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::resolve(&page, &settings)?;

    let total: i64 = sqlx::query(&format!(
        "SELECT COUNT(*) AS count FROM posts p WHERE {}",
        FEED_SCOPE
    ))
    .bind(claims.sub)
    .fetch_one(&pool)
    .await
    .map_err(db_error)?
    .get("count");

    let query_str = format!(
        "{} WHERE {} {} LIMIT $2 OFFSET $3",
        POST_SELECT, FEED_SCOPE, POST_ORDER
    );

    let rows = sqlx::query_as::<_, PostFromDb>(&query_str)
        .bind(claims.sub)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Feed error: {:?}", e);
            AppError::InternalServerError
        })?;

    let results = rows.into_iter().map(PostResponse::from).collect();

    Ok(ApiResponse::success(pagination.into_page(results, total)))
}

/// Author of a post, or NotFound.
pub(crate) async fn post_author<'e, E>(executor: E, post_id: Uuid) -> Result<Uuid, AppError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query("SELECT author_id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(executor)
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(row.get("author_id"))
}

async fn get_post_response<'e, E>(executor: E, post_id: Uuid) -> Result<PostResponse, AppError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, PostFromDb>(&format!("{} WHERE p.id = $1", POST_SELECT))
        .bind(post_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            tracing::error!("Fetch post error: {:?}", e);
            AppError::InternalServerError
        })?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(PostResponse::from(row))
}
