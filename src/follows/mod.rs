use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{error::AppError, profiles::ProfileSummary};

pub mod handler;

/// Database model for a follow edge (follower -> followee)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub followee_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A follow edge with both ends resolved
#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub id: Uuid,
    pub follower: ProfileSummary,
    pub followee: ProfileSummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A profile in a followers/following list
#[derive(Debug, Serialize, FromRow)]
pub struct FollowProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub followed_at: chrono::DateTime<chrono::Utc>,
}

/// Filters for the follow edge listing
#[derive(Debug, Deserialize)]
pub struct FollowListFilter {
    pub follower: Option<Uuid>,
    pub followee: Option<Uuid>,
}

/// Response for follow/unfollow actions
#[derive(Debug, Serialize)]
pub struct FollowActionResponse {
    pub following: bool,
    pub followers_count: i64,
}

#[derive(FromRow)]
pub(crate) struct FollowFromDb {
    id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    follower_id: Uuid,
    follower_username: String,
    follower_picture: Option<String>,
    followee_id: Uuid,
    followee_username: String,
    followee_picture: Option<String>,
}

impl From<FollowFromDb> for FollowResponse {
    fn from(f: FollowFromDb) -> Self {
        FollowResponse {
            id: f.id,
            follower: ProfileSummary {
                id: f.follower_id,
                username: f.follower_username,
                profile_picture: f.follower_picture,
            },
            followee: ProfileSummary {
                id: f.followee_id,
                username: f.followee_username,
                profile_picture: f.followee_picture,
            },
            created_at: f.created_at,
        }
    }
}

pub(crate) const FOLLOW_SELECT: &str = r#"
    SELECT
        f.id, f.created_at,
        f.follower_id, fa.username AS follower_username, fp.profile_picture AS follower_picture,
        f.followee_id, ea.username AS followee_username, ep.profile_picture AS followee_picture
    FROM follows f
    JOIN accounts fa ON fa.id = f.follower_id
    JOIN profiles fp ON fp.id = f.follower_id
    JOIN accounts ea ON ea.id = f.followee_id
    JOIN profiles ep ON ep.id = f.followee_id
"#;

pub const SELF_FOLLOW: &str = "You cannot follow yourself";
pub const ALREADY_FOLLOWING: &str = "You are already following this profile";
pub const NOT_FOLLOWING: &str = "You are not following this profile";

/// A profile may follow anyone but itself.
pub fn check_follow_target(follower_id: Uuid, followee_id: Uuid) -> Result<(), AppError> {
    if follower_id == followee_id {
        return Err(AppError::BadRequest(SELF_FOLLOW.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_follow_is_a_validation_error() {
        let p = Uuid::new_v4();
        match check_follow_target(p, p) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, SELF_FOLLOW),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn following_someone_else_is_allowed() {
        assert!(check_follow_target(Uuid::new_v4(), Uuid::new_v4()).is_ok());
    }

    #[test]
    fn edge_response_keeps_direction() {
        let follower_id = Uuid::new_v4();
        let followee_id = Uuid::new_v4();
        let response = FollowResponse::from(FollowFromDb {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            follower_id,
            follower_username: "testuser1".to_string(),
            follower_picture: None,
            followee_id,
            followee_username: "testuser2".to_string(),
            followee_picture: None,
        });
        assert_eq!(response.follower.id, follower_id);
        assert_eq!(response.followee.username, "testuser2");
    }
}
