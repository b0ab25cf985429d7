use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::profiles::ProfileSummary;

pub mod handler;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Like {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub post_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub profile: ProfileSummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Response for like/unlike actions
#[derive(Debug, Serialize)]
pub struct LikeActionResponse {
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(FromRow)]
pub(crate) struct LikeFromDb {
    id: Uuid,
    post_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    profile_id: Uuid,
    username: String,
    profile_picture: Option<String>,
}

impl From<LikeFromDb> for LikeResponse {
    fn from(l: LikeFromDb) -> Self {
        LikeResponse {
            id: l.id,
            post_id: l.post_id,
            profile: ProfileSummary {
                id: l.profile_id,
                username: l.username,
                profile_picture: l.profile_picture,
            },
            created_at: l.created_at,
        }
    }
}

pub const ALREADY_LIKED: &str = "You have already liked this post";
pub const NOT_LIKED: &str = "You have not liked this post";
