use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::profiles::ProfileSummary;

pub mod handler;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub media_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePost {
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: String,
    #[validate(url(message = "Media URL must be a valid URL"))]
    pub media_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePost {
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: Option<String>,
    /// `null` clears the media, absent leaves it untouched
    #[serde(default, deserialize_with = "crate::extract::nullable")]
    #[validate(url(message = "Media URL must be a valid URL"))]
    pub media_url: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author: ProfileSummary,
    pub content: String,
    pub media_url: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PostFilter {
    pub author: Option<Uuid>,
}

/// Post joined with its author and interaction counters
#[derive(Debug, FromRow)]
pub(crate) struct PostFromDb {
    id: Uuid,
    content: String,
    media_url: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    // author fields
    author_id: Uuid,
    username: String,
    profile_picture: Option<String>,
    // counters
    likes_count: i64,
    comments_count: i64,
}

impl From<PostFromDb> for PostResponse {
    fn from(p: PostFromDb) -> Self {
        PostResponse {
            id: p.id,
            author: ProfileSummary {
                id: p.author_id,
                username: p.username,
                profile_picture: p.profile_picture,
            },
            content: p.content,
            media_url: p.media_url,
            likes_count: p.likes_count,
            comments_count: p.comments_count,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

pub(crate) const POST_SELECT: &str = r#"
    SELECT
        p.id, p.content, p.media_url, p.created_at, p.updated_at,
        p.author_id, a.username, pr.profile_picture,
        (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count
    FROM posts p
    JOIN profiles pr ON pr.id = p.author_id
    JOIN accounts a ON a.id = p.author_id
"#;

/// Newest first; the id keeps posts created in the same instant in a stable order.
pub(crate) const POST_ORDER: &str = "ORDER BY p.created_at DESC, p.id DESC";

/// Authors visible in a profile's feed: the profile itself and everyone it follows.
pub(crate) const FEED_SCOPE: &str = r#"
    p.author_id = $1
    OR p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = $1)
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_content_and_valid_media() {
        let empty = CreatePost {
            content: String::new(),
            media_url: None,
        };
        assert!(empty.validate().is_err());

        let bad_media = CreatePost {
            content: "Test post content".to_string(),
            media_url: Some("ftp//broken".to_string()),
        };
        assert!(bad_media.validate().is_err());

        let ok = CreatePost {
            content: "Test post content".to_string(),
            media_url: Some("https://cdn.example.com/cat.png".to_string()),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn update_may_leave_fields_untouched() {
        let noop = UpdatePost {
            content: None,
            media_url: None,
        };
        assert!(noop.validate().is_ok());

        let blank = UpdatePost {
            content: Some(String::new()),
            media_url: None,
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn update_can_clear_media() {
        let clear: UpdatePost = serde_json::from_str(r#"{"media_url":null}"#).unwrap();
        assert_eq!(clear.media_url, Some(None));
        assert!(clear.validate().is_ok());

        let keep: UpdatePost = serde_json::from_str(r#"{"content":"edited"}"#).unwrap();
        assert_eq!(keep.media_url, None);

        let bad: UpdatePost = serde_json::from_str(r#"{"media_url":"not a url"}"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn response_nests_author() {
        let now = chrono::Utc::now();
        let author_id = Uuid::new_v4();
        let response = PostResponse::from(PostFromDb {
            id: Uuid::new_v4(),
            content: "hello".to_string(),
            media_url: None,
            created_at: now,
            updated_at: now,
            author_id,
            username: "testuser2".to_string(),
            profile_picture: None,
            likes_count: 2,
            comments_count: 1,
        });

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["author"]["id"], author_id.to_string());
        assert_eq!(value["author"]["username"], "testuser2");
        assert_eq!(value["likes_count"], 2);
        assert_eq!(value["comments_count"], 1);
    }

    #[test]
    fn feed_scope_covers_self_and_followees() {
        assert!(FEED_SCOPE.contains("p.author_id = $1"));
        assert!(FEED_SCOPE.contains("follower_id = $1"));
        assert!(POST_ORDER.contains("created_at DESC"));
    }
}
