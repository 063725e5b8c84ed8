//! Likes, bookmarks and the follow graph

use crate::envelope;
use crate::BlogApi;
use tracing::debug;
use wblog_core::{FollowEdge, PostId, Result, UserId};
use wblog_session::ApiRequest;

/// Followers and followees of one user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FollowGraph {
    pub followers: Vec<FollowEdge>,
    pub following: Vec<FollowEdge>,
}

impl FollowGraph {
    pub fn has_follower(&self, user: &UserId) -> bool {
        self.followers.iter().any(|e| e.user_id() == Some(user))
    }
}

impl BlogApi {
    pub async fn like_count(&self, post: &PostId) -> Result<u64> {
        let value = self.value(ApiRequest::get(format!("posts/{post}/likes"))).await?;
        Ok(envelope::count(&value))
    }

    /// Whether the viewer likes `post`
    pub async fn is_liked(&self, post: &PostId) -> Result<bool> {
        let value = self
            .value(ApiRequest::get(format!("posts/{post}/likes/check")))
            .await?;
        Ok(envelope::flag(&value, "liked"))
    }

    pub async fn like(&self, post: &PostId) -> Result<()> {
        self.call(ApiRequest::post(format!("posts/{post}/likes"))).await?;
        debug!(post = %post, "liked");
        Ok(())
    }

    pub async fn unlike(&self, post: &PostId) -> Result<()> {
        self.call(ApiRequest::delete(format!("posts/{post}/likes"))).await?;
        debug!(post = %post, "unliked");
        Ok(())
    }

    pub async fn is_bookmarked(&self, post: &PostId) -> Result<bool> {
        let value = self
            .value(ApiRequest::get(format!("posts/{post}/is-bookmarked")))
            .await?;
        Ok(envelope::flag(&value, "bookmarked"))
    }

    pub async fn bookmark(&self, post: &PostId) -> Result<()> {
        self.call(ApiRequest::post(format!("posts/{post}/bookmark"))).await?;
        debug!(post = %post, "bookmarked");
        Ok(())
    }

    pub async fn unbookmark(&self, post: &PostId) -> Result<()> {
        self.call(ApiRequest::delete(format!("posts/{post}/bookmark"))).await?;
        debug!(post = %post, "bookmark removed");
        Ok(())
    }

    pub async fn follow(&self, user: &UserId) -> Result<()> {
        self.call(ApiRequest::post(format!("users/{user}/follow"))).await?;
        debug!(user = %user, "followed");
        Ok(())
    }

    pub async fn unfollow(&self, user: &UserId) -> Result<()> {
        self.call(ApiRequest::delete(format!("users/{user}/follow"))).await?;
        debug!(user = %user, "unfollowed");
        Ok(())
    }

    pub async fn is_following(&self, user: &UserId) -> Result<bool> {
        let value = self
            .value(ApiRequest::get(format!("users/{user}/is-following")))
            .await?;
        Ok(envelope::flag(&value, "is_following"))
    }

    pub async fn followers(&self, user: &UserId) -> Result<Vec<FollowEdge>> {
        envelope::list(
            self.value(ApiRequest::get(format!("users/{user}/followers"))).await?,
            &["followers", "res"],
        )
    }

    pub async fn following(&self, user: &UserId) -> Result<Vec<FollowEdge>> {
        envelope::list(
            self.value(ApiRequest::get(format!("users/{user}/following"))).await?,
            &["following", "res"],
        )
    }

    /// Both directions of the follow graph, fetched concurrently
    pub async fn follow_graph(&self, user: &UserId) -> Result<FollowGraph> {
        let (followers, following) = tokio::try_join!(self.followers(user), self.following(user))?;
        Ok(FollowGraph {
            followers,
            following,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::logged_in;
    use serde_json::json;
    use wblog_core::{PostId, UserId};
    use wblog_session::testing::Reply;
    use wblog_session::Method;

    #[tokio::test]
    async fn test_like_count_shapes() {
        let (transport, api) = logged_in();
        let post = PostId::new("1");
        transport
            .on(Method::Get, "posts/1/likes", Reply::ok(json!(10)))
            .on(Method::Get, "posts/1/likes", Reply::ok(json!({"count": 4})))
            .on(Method::Get, "posts/1/likes", Reply::ok(json!({"likes": []})));

        assert_eq!(api.like_count(&post).await.unwrap(), 10);
        assert_eq!(api.like_count(&post).await.unwrap(), 4);
        assert_eq!(api.like_count(&post).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_flags() {
        let (transport, api) = logged_in();
        let post = PostId::new("1");
        transport.on(Method::Get, "posts/1/likes/check", Reply::ok(json!({"liked": true})));
        transport.on(Method::Get, "posts/1/is-bookmarked", Reply::ok(json!({})));
        transport.on(
            Method::Get,
            "users/u2/is-following",
            Reply::ok(json!({"is_following": true})),
        );

        assert!(api.is_liked(&post).await.unwrap());
        assert!(!api.is_bookmarked(&post).await.unwrap());
        assert!(api.is_following(&UserId::new("u2")).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_endpoints() {
        let (transport, api) = logged_in();
        let post = PostId::new("3");
        let user = UserId::new("u2");
        for (method, path) in [
            (Method::Post, "posts/3/likes"),
            (Method::Delete, "posts/3/likes"),
            (Method::Post, "posts/3/bookmark"),
            (Method::Delete, "posts/3/bookmark"),
            (Method::Post, "users/u2/follow"),
            (Method::Delete, "users/u2/follow"),
        ] {
            transport.on(method, path, Reply::ok(json!({"message": "ok"})));
        }

        api.like(&post).await.unwrap();
        api.unlike(&post).await.unwrap();
        api.bookmark(&post).await.unwrap();
        api.unbookmark(&post).await.unwrap();
        api.follow(&user).await.unwrap();
        api.unfollow(&user).await.unwrap();

        assert_eq!(transport.calls().len(), 6);
    }

    #[tokio::test]
    async fn test_follow_graph() {
        let (transport, api) = logged_in();
        transport.on(
            Method::Get,
            "users/u2/followers",
            Reply::ok(json!({"followers": [
                {"follower_id": "u1", "profiles": {"username": "ann"}}
            ]})),
        );
        transport.on(Method::Get, "users/u2/following", Reply::ok(json!({"following": []})));

        let graph = api.follow_graph(&UserId::new("u2")).await.unwrap();
        assert_eq!(graph.followers.len(), 1);
        assert!(graph.following.is_empty());
        assert!(graph.has_follower(&UserId::new("u1")));
    }
}
