//! Posts, categories and profiles

use crate::envelope;
use crate::forms::PostForm;
use crate::BlogApi;
use tracing::{debug, info};
use wblog_core::{Bookmark, Category, CategoryId, Post, PostId, Result, User, UserId};
use wblog_session::ApiRequest;

impl BlogApi {
    /// The feed, optionally filtered to one category
    pub async fn posts(&self, category: Option<&CategoryId>) -> Result<Vec<Post>> {
        let request = match category {
            Some(category) => ApiRequest::get("feed").query("category_id", category.as_str()),
            None => ApiRequest::get("posts"),
        };
        let posts: Vec<Post> = envelope::list(self.value(request).await?, &["posts", "res"])?;
        debug!(count = posts.len(), "loaded feed");
        Ok(posts)
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        envelope::list(
            self.value(ApiRequest::get("categories")).await?,
            &["categories", "res"],
        )
    }

    pub async fn post(&self, id: &PostId) -> Result<Post> {
        envelope::one(
            self.value(ApiRequest::get(format!("posts/{id}"))).await?,
            &["post", "res"],
        )
    }

    /// Posts written by `author`
    pub async fn posts_by(&self, author: &UserId) -> Result<Vec<Post>> {
        envelope::list(
            self.value(ApiRequest::get(format!("posts/all/{author}"))).await?,
            &["posts", "res"],
        )
    }

    /// The viewer's bookmarked posts
    pub async fn bookmarks(&self) -> Result<Vec<Bookmark>> {
        envelope::list(
            self.value(ApiRequest::get("bookmarks")).await?,
            &["bookmarks", "res"],
        )
    }

    /// Create a post. Returns the created post when the server echoes it.
    pub async fn create_post(&self, form: &PostForm) -> Result<Option<Post>> {
        let request = ApiRequest::post("posts/").multipart(form.create_parts()?);
        let value = self.value(request).await?;
        info!("post created");
        Ok(envelope::one(value, &["post", "res"]).ok())
    }

    /// Update a post; only the fields set on `form` are sent
    pub async fn update_post(&self, id: &PostId, form: &PostForm) -> Result<Post> {
        let request = ApiRequest::put(format!("posts/{id}")).multipart(form.update_parts()?);
        let post = envelope::one(self.value(request).await?, &["res", "post"])?;
        info!(post = %id, "post updated");
        Ok(post)
    }

    pub async fn delete_post(&self, id: &PostId) -> Result<()> {
        self.call(ApiRequest::delete(format!("posts/{id}"))).await?;
        info!(post = %id, "post deleted");
        Ok(())
    }

    /// Public profile of another user
    pub async fn profile(&self, user: &UserId) -> Result<User> {
        envelope::one(
            self.value(ApiRequest::get(format!("profiles/{user}"))).await?,
            &["res", "profile"],
        )
    }

    /// The viewer's own profile
    pub async fn my_profile(&self) -> Result<User> {
        envelope::one(
            self.value(ApiRequest::get("profile/me")).await?,
            &["res", "profile"],
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{anonymous, logged_in};
    use crate::{PostForm, Upload};
    use serde_json::json;
    use wblog_core::{CategoryId, Error, PostId, UserId};
    use wblog_session::testing::Reply;
    use wblog_session::{Body, Method};

    #[tokio::test]
    async fn test_feed_all_and_by_category() {
        let (transport, api) = anonymous();
        transport.on(Method::Get, "posts", Reply::ok(json!({"res": [{"id": 1}, {"id": 2}]})));
        transport.on(Method::Get, "feed", Reply::ok(json!({"posts": [{"id": 3}]})));

        assert_eq!(api.posts(None).await.unwrap().len(), 2);

        let filtered = api.posts(Some(&CategoryId::new("4"))).await.unwrap();
        assert_eq!(filtered[0].id, PostId::new("3"));
        let sent = transport.last(Method::Get, "feed").unwrap();
        assert_eq!(sent.query, vec![("category_id".to_string(), "4".to_string())]);
    }

    #[tokio::test]
    async fn test_categories() {
        let (transport, api) = anonymous();
        transport.on(
            Method::Get,
            "categories",
            Reply::ok(json!({"categories": [{"id": 1, "name": "Tech"}]})),
        );
        let categories = api.categories().await.unwrap();
        assert_eq!(categories[0].name, "Tech");
    }

    #[tokio::test]
    async fn test_post_envelopes() {
        let (transport, api) = anonymous();
        transport.on(Method::Get, "posts/5", Reply::ok(json!({"post": {"id": 5, "title": "T"}})));
        assert_eq!(api.post(&PostId::new("5")).await.unwrap().title, "T");

        let err = api.post(&PostId::new("6")).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_create_post_validation_skips_network() {
        let (transport, api) = logged_in();
        let err = api.create_post(&PostForm::new("", "")).await.unwrap_err();
        assert_eq!(err.user_message("Failed to create post"), "Please fill all fields!");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_post_with_image() {
        let (transport, api) = logged_in();
        transport.on(Method::Post, "posts/", Reply::ok(json!({"res": {"id": 11, "title": "T"}})));

        let form = PostForm::new("T", "Body")
            .category("2")
            .image(Upload::new("c.jpg", "image/jpeg", vec![0xff]));
        let created = api.create_post(&form).await.unwrap();

        assert_eq!(created.unwrap().id, PostId::new("11"));
        let sent = transport.last(Method::Post, "posts/").unwrap();
        assert!(matches!(sent.body, Body::Multipart(ref parts) if parts.len() == 4));
    }

    #[tokio::test]
    async fn test_update_and_delete_post() {
        let (transport, api) = logged_in();
        transport.on(
            Method::Put,
            "posts/5",
            Reply::ok(json!({"res": {"id": 5, "title": "New"}})),
        );
        transport.on(Method::Delete, "posts/5", Reply::ok(json!({"message": "deleted"})));

        let form = PostForm {
            title: Some("New".to_string()),
            ..Default::default()
        };
        let updated = api.update_post(&PostId::new("5"), &form).await.unwrap();
        assert_eq!(updated.title, "New");

        api.delete_post(&PostId::new("5")).await.unwrap();
        assert_eq!(transport.count(Method::Delete, "posts/5"), 1);
    }

    #[tokio::test]
    async fn test_profiles_and_lists() {
        let (transport, api) = logged_in();
        transport
            .on(
                Method::Get,
                "profiles/u2",
                Reply::ok(json!({"res": {"id": "u2", "username": "zed"}})),
            )
            .on(
                Method::Get,
                "profile/me",
                Reply::ok(json!({"res": {"id": "u1", "username": "ann"}})),
            );
        transport.on(Method::Get, "posts/all/u2", Reply::ok(json!({"posts": [{"id": 1}]})));
        transport.on(
            Method::Get,
            "bookmarks",
            Reply::ok(json!({"bookmarks": [{"posts": {"id": 9, "title": "Saved"}}]})),
        );

        assert_eq!(api.profile(&UserId::new("u2")).await.unwrap().display_name(), "zed");
        assert_eq!(api.my_profile().await.unwrap().display_name(), "ann");
        assert_eq!(api.posts_by(&UserId::new("u2")).await.unwrap().len(), 1);
        assert_eq!(api.bookmarks().await.unwrap()[0].post.title, "Saved");
    }
}
