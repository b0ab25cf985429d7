use axum::{extract::State, response::IntoResponse};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{jwt, utils, Account, AuthResponse, LoginAccount, RegisterAccount},
    config::settings::Settings,
    error::{db_error, is_unique_violation, AppError},
    extract::Json,
    profiles::{fetch_profile, ProfileResponse},
    response::ApiResponse,
};

/// Create an account and its profile, and hand back a token
/// POST /api/auth/register
pub async fn register(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Json(payload): Json<RegisterAccount>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let password_hash =
        utils::hash_password(&payload.password).map_err(|_| AppError::InternalServerError)?;

    let account_id = Uuid::new_v4();

    let mut tx = pool.begin().await.map_err(db_error)?;

    sqlx::query(
        "INSERT INTO accounts (id, username, email, password_hash) VALUES ($1, $2, $3, $4)",
    )
    .bind(account_id)
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&password_hash)
    .execute(&mut *tx)
    .await
    .map_err(|e: sqlx::Error| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username or Email already exists".to_string())
        } else {
            db_error(e)
        }
    })?;

    sqlx::query("INSERT INTO profiles (id, bio) VALUES ($1, $2)")
        .bind(account_id)
        .bind(&payload.bio)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

    let profile = fetch_profile(&mut *tx, account_id)
        .await
        .map_err(db_error)?
        .ok_or(AppError::InternalServerError)?;

    tx.commit().await.map_err(db_error)?;

    let token = jwt::create_token(account_id, &settings.jwt_secret, settings.jwt_ttl_hours)
        .map_err(|_| AppError::InternalServerError)?;

    tracing::info!("registered profile {} ({})", account_id, payload.username);

    Ok(ApiResponse::success(AuthResponse {
        token,
        profile: ProfileResponse::for_viewer(profile, Some(account_id)),
    })
    .created())
}

/// POST /api/auth/login
pub async fn login(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Json(payload): Json<LoginAccount>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let (column, identifier) = payload.identifier().ok_or_else(|| {
        AppError::UnprocessableEntity("Username or email is required".to_string())
    })?;

    let query_str = format!("SELECT * FROM accounts WHERE lower({}) = lower($1)", column);
    let account = sqlx::query_as::<_, Account>(&query_str)
        .bind(identifier)
        .fetch_optional(&pool)
        .await
        .map_err(db_error)?
        .ok_or(AppError::Unauthorized)?;

    utils::verify_password(&account.password_hash, &payload.password)
        .map_err(|_| AppError::Unauthorized)?;

    let profile = fetch_profile(&pool, account.id)
        .await
        .map_err(db_error)?
        .ok_or(AppError::Unauthorized)?;

    let token = jwt::create_token(account.id, &settings.jwt_secret, settings.jwt_ttl_hours)
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(AuthResponse {
        token,
        profile: ProfileResponse::for_viewer(profile, Some(account.id)),
    }))
}

/// GET /api/auth/me
pub async fn get_me(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let profile = fetch_profile(&pool, claims.sub)
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    Ok(ApiResponse::success(ProfileResponse::for_viewer(
        profile,
        Some(claims.sub),
    )))
}
