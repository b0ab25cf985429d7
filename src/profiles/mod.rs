use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;
use validator::Validate;

use crate::extract::nullable;

pub mod handler;

/// Database row for a profile joined with its account.
#[derive(Debug, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub cover_photo: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub(crate) const PROFILE_COLUMNS: &str = r#"
    p.id, a.username, a.email, p.bio, p.location, p.website, p.cover_photo,
    p.profile_picture, p.created_at, p.updated_at
"#;

/// Partial update. An absent field is left alone, `null` clears it.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfile {
    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(url(message = "Cover photo must be a valid URL"))]
    pub cover_photo: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(url(message = "Profile picture must be a valid URL"))]
    pub profile_picture: Option<Option<String>>,
}

/// Public view of a profile. The email is only shown to its owner.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub cover_photo: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ProfileResponse {
    pub fn for_viewer(profile: Profile, viewer: Option<Uuid>) -> Self {
        let email = (viewer == Some(profile.id)).then_some(profile.email);
        ProfileResponse {
            id: profile.id,
            username: profile.username,
            email,
            bio: profile.bio,
            location: profile.location,
            website: profile.website,
            cover_photo: profile.cover_photo,
            profile_picture: profile.profile_picture,
            created_at: profile.created_at,
        }
    }
}

/// Profile with relationship stats
#[derive(Debug, Serialize)]
pub struct ProfileDetailResponse {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub is_following: bool, // Whether the viewer follows this profile
}

/// Compact author block embedded in posts, comments and likes.
#[derive(Debug, Serialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub username: String,
    pub profile_picture: Option<String>,
}

pub async fn fetch_profile<'e, E>(executor: E, id: Uuid) -> Result<Option<Profile>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        "SELECT {} FROM profiles p JOIN accounts a ON a.id = p.id WHERE p.id = $1",
        PROFILE_COLUMNS
    );
    sqlx::query_as::<_, Profile>(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Dependent rows are removed explicitly, children before parents, so a
/// profile never disappears while something still points at it.
const PROFILE_CASCADE: [&str; 6] = [
    "DELETE FROM comments WHERE profile_id = $1 OR post_id IN (SELECT id FROM posts WHERE author_id = $1)",
    "DELETE FROM likes WHERE profile_id = $1 OR post_id IN (SELECT id FROM posts WHERE author_id = $1)",
    "DELETE FROM posts WHERE author_id = $1",
    "DELETE FROM follows WHERE follower_id = $1 OR followee_id = $1",
    "DELETE FROM profiles WHERE id = $1",
    "DELETE FROM accounts WHERE id = $1",
];

pub async fn delete_profile_cascade(
    conn: &mut PgConnection,
    profile_id: Uuid,
) -> Result<(), sqlx::Error> {
    for statement in PROFILE_CASCADE {
        let result = sqlx::query(statement)
            .bind(profile_id)
            .execute(&mut *conn)
            .await?;
        tracing::debug!(
            "cascade for profile {}: {} rows from `{}`",
            profile_id,
            result.rows_affected(),
            statement
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: Uuid) -> Profile {
        let now = chrono::Utc::now();
        Profile {
            id,
            username: "testuser1".to_string(),
            email: "test1@example.com".to_string(),
            bio: Some("Test user bio".to_string()),
            location: Some("Test City".to_string()),
            website: None,
            cover_photo: None,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn email_is_only_visible_to_owner() {
        let id = Uuid::new_v4();

        let own = ProfileResponse::for_viewer(profile(id), Some(id));
        assert_eq!(own.email.as_deref(), Some("test1@example.com"));

        let other = ProfileResponse::for_viewer(profile(id), Some(Uuid::new_v4()));
        assert!(other.email.is_none());

        let anonymous = serde_json::to_value(ProfileResponse::for_viewer(profile(id), None)).unwrap();
        assert!(anonymous.get("email").is_none());
        assert_eq!(anonymous["location"], "Test City");
    }

    #[test]
    fn update_rejects_bad_urls_and_long_bio() {
        let bad = UpdateProfile {
            bio: Some(Some("x".repeat(501))),
            location: None,
            website: Some(Some("not a url".to_string())),
            cover_photo: None,
            profile_picture: None,
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("bio"));
        assert!(fields.contains_key("website"));

        let good = UpdateProfile {
            bio: Some(Some("hello".to_string())),
            location: Some(Some("Lagos".to_string())),
            website: Some(Some("https://example.com".to_string())),
            cover_photo: None,
            profile_picture: Some(Some("https://example.com/me.png".to_string())),
        };
        assert!(good.validate().is_ok());
    }

    #[test]
    fn null_clears_and_absent_keeps() {
        let update: UpdateProfile =
            serde_json::from_str(r#"{"bio":null,"website":"https://example.com"}"#).unwrap();
        assert_eq!(update.bio, Some(None));
        assert_eq!(update.website, Some(Some("https://example.com".to_string())));
        assert_eq!(update.location, None);
        assert!(update.validate().is_ok());
    }

    #[test]
    fn cascade_clears_children_before_the_profile() {
        let position = |needle: &str| {
            PROFILE_CASCADE
                .iter()
                .position(|s| s.starts_with(needle))
                .unwrap()
        };
        assert!(position("DELETE FROM comments") < position("DELETE FROM posts"));
        assert!(position("DELETE FROM likes") < position("DELETE FROM posts"));
        assert!(position("DELETE FROM posts") < position("DELETE FROM profiles"));
        assert!(position("DELETE FROM follows") < position("DELETE FROM profiles"));
        assert!(position("DELETE FROM profiles") < position("DELETE FROM accounts"));
    }
}
