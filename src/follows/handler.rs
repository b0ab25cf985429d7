use axum::{extract::State, response::IntoResponse};
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::{
    config::settings::Settings,
    context::{RequestContext, Viewer},
    error::{db_error, is_check_violation, is_unique_violation, AppError},
    extract::{Path, Query},
    follows::{
        check_follow_target, Follow, FollowActionResponse, FollowFromDb, FollowListFilter,
        FollowProfileResponse, FollowResponse, ALREADY_FOLLOWING, FOLLOW_SELECT, NOT_FOLLOWING,
        SELF_FOLLOW,
    },
    pagination::{PageQuery, Pagination},
    response::ApiResponse,
};

/// Follow a profile
/// POST /api/follow/:id
pub async fn follow_profile(
    mut ctx: RequestContext,
    Path(followee_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    check_follow_target(ctx.profile_id, followee_id)?;

    // Verify target profile exists
    sqlx::query("SELECT id FROM profiles WHERE id = $1")
        .bind(followee_id)
        .fetch_optional(ctx.conn())
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    let existing = sqlx::query("SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2")
        .bind(ctx.profile_id)
        .bind(followee_id)
        .fetch_optional(ctx.conn())
        .await
        .map_err(db_error)?;

    if existing.is_some() {
        return Err(AppError::BadRequest(ALREADY_FOLLOWING.to_string()));
    }

    // A concurrent follow of the same pair loses on the unique constraint.
    sqlx::query("INSERT INTO follows (id, follower_id, followee_id) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(ctx.profile_id)
        .bind(followee_id)
        .execute(ctx.conn())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::BadRequest(ALREADY_FOLLOWING.to_string())
            } else if is_check_violation(&e) {
                AppError::BadRequest(SELF_FOLLOW.to_string())
            } else {
                db_error(e)
            }
        })?;

    let followers_count = followers_count(ctx.conn(), followee_id).await?;
    ctx.commit().await?;

    Ok(ApiResponse::success_with_message(
        "Followed",
        FollowActionResponse {
            following: true,
            followers_count,
        },
    )
    .created())
}

/// Unfollow a profile. Unfollowing someone you do not follow is an error.
/// DELETE /api/follow/:id
pub async fn unfollow_profile(
    mut ctx: RequestContext,
    Path(followee_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
        .bind(ctx.profile_id)
        .bind(followee_id)
        .execute(ctx.conn())
        .await
        .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(NOT_FOLLOWING.to_string()));
    }

    let followers_count = followers_count(ctx.conn(), followee_id).await?;
    ctx.commit().await?;

    Ok(ApiResponse::success_with_message(
        "Unfollowed",
        FollowActionResponse {
            following: false,
            followers_count,
        },
    ))
}

/// Get a profile's followers
/// GET /api/profiles/:id/followers
pub async fn get_followers(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    _viewer: Viewer,
    Path(profile_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    list_connections(&pool, &settings, profile_id, &page, Direction::Followers).await
}

/// Get profiles that a profile is following
/// GET /api/profiles/:id/following
pub async fn get_following(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    _viewer: Viewer,
    Path(profile_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    list_connections(&pool, &settings, profile_id, &page, Direction::Following).await
}

/// List follow edges, optionally narrowed to one follower and/or followee
/// GET /api/follows
pub async fn list_follows(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    _viewer: Viewer,
    Query(page): Query<PageQuery>,
    Query(filter): Query<FollowListFilter>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::resolve(&page, &settings)?;

    let where_clause = "WHERE ($1::uuid IS NULL OR f.follower_id = $1) \
                        AND ($2::uuid IS NULL OR f.followee_id = $2)";

    let total: i64 = sqlx::query(&format!(
        "SELECT COUNT(*) AS count FROM follows f {}",
        where_clause
    ))
    .bind(filter.follower)
    .bind(filter.followee)
    .fetch_one(&pool)
    .await
    .map_err(db_error)?
    .get("count");

    let query_str = format!(
        "{} {} ORDER BY f.created_at DESC, f.id DESC LIMIT $3 OFFSET $4",
        FOLLOW_SELECT, where_clause
    );

    let rows = sqlx::query_as::<_, FollowFromDb>(&query_str)
        .bind(filter.follower)
        .bind(filter.followee)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&pool)
        .await
        .map_err(db_error)?;

    let results = rows.into_iter().map(FollowResponse::from).collect();

    Ok(ApiResponse::success(pagination.into_page(results, total)))
}

/// GET /api/follows/:id
pub async fn get_follow(
    State(pool): State<PgPool>,
    _viewer: Viewer,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query_as::<_, FollowFromDb>(&format!("{} WHERE f.id = $1", FOLLOW_SELECT))
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Follow not found".to_string()))?;

    Ok(ApiResponse::success(FollowResponse::from(row)))
}

/// Only the follower can remove an edge
/// DELETE /api/follows/:id
pub async fn delete_follow(
    mut ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let follow = sqlx::query_as::<_, Follow>("SELECT * FROM follows WHERE id = $1")
        .bind(id)
        .fetch_optional(ctx.conn())
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Follow not found".to_string()))?;

    ctx.ensure_owner(follow.follower_id, "You can only remove your own follows")?;

    sqlx::query("DELETE FROM follows WHERE id = $1")
        .bind(id)
        .execute(ctx.conn())
        .await
        .map_err(db_error)?;

    ctx.commit().await?;

    Ok(ApiResponse::ok("Follow removed"))
}

#[derive(Clone, Copy)]
enum Direction {
    Followers,
    Following,
}

async fn list_connections(
    pool: &PgPool,
    settings: &Settings,
    profile_id: Uuid,
    page: &PageQuery,
    direction: Direction,
) -> Result<ApiResponse<crate::pagination::Page<FollowProfileResponse>>, AppError> {
    let pagination = Pagination::resolve(page, settings)?;

    sqlx::query("SELECT id FROM profiles WHERE id = $1")
        .bind(profile_id)
        .fetch_optional(pool)
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    // (column matched against the profile, column joined to the listed profiles)
    let (anchor, other) = match direction {
        Direction::Followers => ("followee_id", "follower_id"),
        Direction::Following => ("follower_id", "followee_id"),
    };

    let total: i64 = sqlx::query(&format!(
        "SELECT COUNT(*) AS count FROM follows WHERE {} = $1",
        anchor
    ))
    .bind(profile_id)
    .fetch_one(pool)
    .await
    .map_err(db_error)?
    .get("count");

    let query_str = format!(
        r#"
        SELECT p.id, a.username, p.bio, p.profile_picture, f.created_at AS followed_at
        FROM follows f
        JOIN profiles p ON p.id = f.{other}
        JOIN accounts a ON a.id = p.id
        WHERE f.{anchor} = $1
        ORDER BY f.created_at DESC, f.id DESC
        LIMIT $2 OFFSET $3
        "#,
        other = other,
        anchor = anchor
    );

    let users = sqlx::query_as::<_, FollowProfileResponse>(&query_str)
        .bind(profile_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(pool)
        .await
        .map_err(db_error)?;

    Ok(ApiResponse::success(pagination.into_page(users, total)))
}

async fn followers_count<'e, E>(executor: E, profile_id: Uuid) -> Result<i64, AppError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query("SELECT COUNT(*) AS count FROM follows WHERE followee_id = $1")
        .bind(profile_id)
        .fetch_one(executor)
        .await
        .map_err(db_error)?;

    Ok(row.get("count"))
}
