use axum::{extract::State, response::IntoResponse};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::settings::Settings,
    context::{RequestContext, Viewer},
    error::{db_error, AppError},
    extract::{Json, Path, Query},
    pagination::{PageQuery, Pagination},
    profiles::{
        delete_profile_cascade, fetch_profile, Profile, ProfileDetailResponse, ProfileResponse,
        UpdateProfile, PROFILE_COLUMNS,
    },
    response::ApiResponse,
};

/// Helper struct for fetching a profile together with its counters
#[derive(FromRow)]
struct ProfileStatsRow {
    #[sqlx(flatten)]
    profile: Profile,
    followers_count: i64,
    following_count: i64,
    posts_count: i64,
    is_following: bool,
}

/// List profiles, newest first
/// GET /api/profiles
pub async fn list_profiles(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::resolve(&query, &settings)?;

    let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM profiles")
        .fetch_one(&pool)
        .await
        .map_err(db_error)?
        .get("count");

    let query_str = format!(
        r#"
        SELECT {}
        FROM profiles p
        JOIN accounts a ON a.id = p.id
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $1 OFFSET $2
        "#,
        PROFILE_COLUMNS
    );

    let profiles = sqlx::query_as::<_, Profile>(&query_str)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&pool)
        .await
        .map_err(db_error)?;

    let results = profiles
        .into_iter()
        .map(|p| ProfileResponse::for_viewer(p, viewer.profile_id()))
        .collect();

    Ok(ApiResponse::success(pagination.into_page(results, total)))
}

/// Get a profile with follow stats
/// GET /api/profiles/:id
pub async fn get_profile(
    State(pool): State<PgPool>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let query_str = format!(
        r#"
        SELECT {},
            (SELECT COUNT(*) FROM follows WHERE followee_id = p.id) AS followers_count,
            (SELECT COUNT(*) FROM follows WHERE follower_id = p.id) AS following_count,
            (SELECT COUNT(*) FROM posts WHERE author_id = p.id) AS posts_count,
            EXISTS (
                SELECT 1 FROM follows WHERE follower_id = $2 AND followee_id = p.id
            ) AS is_following
        FROM profiles p
        JOIN accounts a ON a.id = p.id
        WHERE p.id = $1
        "#,
        PROFILE_COLUMNS
    );

    let row = sqlx::query_as::<_, ProfileStatsRow>(&query_str)
        .bind(id)
        .bind(viewer.profile_id())
        .fetch_optional(&pool)
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    Ok(ApiResponse::success(ProfileDetailResponse {
        profile: ProfileResponse::for_viewer(row.profile, viewer.profile_id()),
        followers_count: row.followers_count,
        following_count: row.following_count,
        posts_count: row.posts_count,
        is_following: row.is_following,
    }))
}

/// Update own profile
/// PUT /api/profiles/:id
pub async fn update_profile(
    mut ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfile>,
) -> Result<impl IntoResponse, AppError> {
    ctx.ensure_owner(id, "You can only update your own profile")?;

    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    // Each nullable column takes a (present, value) pair of binds.
    let mut update = sqlx::query(
        r#"
        UPDATE profiles SET
            bio = CASE WHEN $1 THEN $2 ELSE bio END,
            location = CASE WHEN $3 THEN $4 ELSE location END,
            website = CASE WHEN $5 THEN $6 ELSE website END,
            cover_photo = CASE WHEN $7 THEN $8 ELSE cover_photo END,
            profile_picture = CASE WHEN $9 THEN $10 ELSE profile_picture END,
            updated_at = NOW()
        WHERE id = $11
        "#,
    );
    for field in [
        &payload.bio,
        &payload.location,
        &payload.website,
        &payload.cover_photo,
        &payload.profile_picture,
    ] {
        update = update
            .bind(field.is_some())
            .bind(field.as_ref().and_then(|value| value.as_deref()));
    }

    update
        .bind(id)
        .execute(ctx.conn())
        .await
        .map_err(db_error)?;

    let profile = fetch_profile(ctx.conn(), id)
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    let viewer = ctx.profile_id;
    ctx.commit().await?;

    Ok(ApiResponse::success(ProfileResponse::for_viewer(
        profile,
        Some(viewer),
    )))
}

/// Delete own profile together with everything it owns
/// DELETE /api/profiles/:id
pub async fn delete_profile(
    mut ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    ctx.ensure_owner(id, "You can only delete your own profile")?;

    delete_profile_cascade(ctx.conn(), id)
        .await
        .map_err(db_error)?;

    ctx.commit().await?;

    tracing::info!("profile {} deleted", id);

    Ok(ApiResponse::ok("Profile deleted"))
}
