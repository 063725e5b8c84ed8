//! Domain model
//!
//! Shapes mirror the JSON the blog API returns. Fields the API sometimes
//! omits are optional and defaulted so a sparse payload still decodes.

use crate::ids::{CategoryId, CommentId, PostId, UserId};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl User {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            username: None,
            image_url: None,
            gender: None,
            bio: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Name to show next to content authored by this user
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("Unknown")
    }

    pub fn profile(&self) -> Profile {
        Profile {
            id: Some(self.id.clone()),
            username: self.username.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

/// Public author card embedded in posts and comments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Post category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
}

/// Blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_id: Option<UserId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default, alias = "cover_image_url")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "profiles")]
    pub author: Option<Profile>,
}

impl Post {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|p| p.username.as_deref())
            .unwrap_or("Unknown")
    }
}

/// Comment on a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default, alias = "text")]
    pub content: String,
    #[serde(default)]
    pub author_id: Option<UserId>,
    #[serde(default, rename = "profiles")]
    pub author: Option<Profile>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// Placeholder rendered before the server has confirmed the comment
    pub fn pending(content: impl Into<String>, author: &User) -> Self {
        Self {
            id: CommentId::pending(),
            content: content.into(),
            author_id: Some(author.id.clone()),
            author: Some(author.profile()),
            created_at: Some(Utc::now()),
        }
    }
}

/// Bookmark row: the bookmarked post is nested under `posts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(rename = "posts")]
    pub post: Post,
}

/// One edge of the follow graph as returned by the followers/following lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowEdge {
    #[serde(default)]
    pub follower_id: Option<UserId>,
    #[serde(default)]
    pub following_id: Option<UserId>,
    #[serde(default, rename = "profiles")]
    pub profile: Option<Profile>,
}

impl FollowEdge {
    /// The user on the far side of the edge
    pub fn user_id(&self) -> Option<&UserId> {
        self.profile
            .as_ref()
            .and_then(|p| p.id.as_ref())
            .or(self.follower_id.as_ref())
            .or(self.following_id.as_ref())
    }

    pub fn username(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.username.as_deref())
            .unwrap_or("Unknown")
    }
}

/// Access/refresh token pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// Active session.
///
/// Tokens and user travel together: there is no way to hold one without the
/// other, and "no session" is `Option::None` at the store level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub user: User,
}

/// Body of `/auth/login` and `/auth/signup`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl AuthResponse {
    pub fn into_session(self) -> Session {
        Session {
            credentials: Credentials {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
            },
            user: self.user,
        }
    }
}

/// Advisory ownership check; the API enforces the real one.
pub fn is_author(viewer: Option<&User>, author_id: Option<&UserId>) -> bool {
    match (viewer, author_id) {
        (Some(viewer), Some(author)) => &viewer.id == author,
        _ => false,
    }
}

/// Timestamps come back as RFC 3339 or as naive UTC; anything else is dropped
/// rather than failing the whole payload.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}
