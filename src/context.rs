//! Per-request context handed to handlers instead of ambient globals.
//!
//! Mutating handlers take a [`RequestContext`]: the authenticated profile plus
//! a transaction that lives exactly as long as the request. Dropping it without
//! calling [`RequestContext::commit`] rolls the transaction back.
//! Read handlers take a [`Viewer`], which honours the `PUBLIC_READS` setting.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    auth::jwt::Claims,
    config::settings::Settings,
    error::{db_error, AppError},
};

pub struct RequestContext {
    pub profile_id: Uuid,
    tx: Transaction<'static, Postgres>,
}

impl RequestContext {
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await.map_err(db_error)
    }

    /// Rejects the request unless the authenticated profile owns the record.
    pub fn ensure_owner(&self, owner_id: Uuid, message: &str) -> Result<(), AppError> {
        ensure_owner(self.profile_id, owner_id, message)
    }
}

pub fn ensure_owner(actor_id: Uuid, owner_id: Uuid, message: &str) -> Result<(), AppError> {
    if actor_id == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(message.to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
    PgPool: FromRef<S>,
    Settings: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;

        let pool = PgPool::from_ref(state);
        let mut tx = pool.begin().await.map_err(db_error)?;

        // A token can outlive the profile it was issued for.
        sqlx::query("SELECT 1 FROM profiles WHERE id = $1")
            .bind(claims.sub)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or(AppError::Unauthorized)?;

        Ok(Self {
            profile_id: claims.sub,
            tx,
        })
    }
}

/// The caller of a read endpoint, if any.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<Uuid>);

impl Viewer {
    pub fn profile_id(&self) -> Option<Uuid> {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    Settings: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A token that is present must be valid, even on public reads.
        if parts.headers.contains_key(AUTHORIZATION) {
            let claims = Claims::from_request_parts(parts, state).await?;
            return Ok(Viewer(Some(claims.sub)));
        }

        if Settings::from_ref(state).public_reads {
            Ok(Viewer(None))
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_passes_and_others_are_forbidden() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(ensure_owner(a, a, "nope").is_ok());
        match ensure_owner(a, b, "You can only delete your own posts") {
            Err(AppError::Forbidden(msg)) => assert_eq!(msg, "You can only delete your own posts"),
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }
}
