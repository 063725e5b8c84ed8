//! Single post: edit, delete, compose

use crate::notice::Notices;
use crate::optimistic::{Optimistic, Outcome};
use crate::scope::ViewScope;
use tokio::sync::watch;
use tracing::info;
use wblog_api::{BlogApi, PostForm};
use wblog_core::{is_author, Error, Post, PostId, Result};

/// A post being viewed. Deleting it empties the view.
pub struct PostView {
    api: BlogApi,
    id: PostId,
    post: Optimistic<Option<Post>>,
    notices: Notices,
}

impl PostView {
    pub fn new(api: BlogApi, post: Post, scope: ViewScope, notices: Notices) -> Self {
        Self {
            api,
            id: post.id.clone(),
            post: Optimistic::new(Some(post), scope),
            notices,
        }
    }

    pub async fn load(
        api: BlogApi,
        id: &PostId,
        scope: ViewScope,
        notices: Notices,
    ) -> Result<Self> {
        match api.post(id).await {
            Ok(post) => Ok(Self::new(api, post, scope, notices)),
            Err(e) => {
                notices.failure(&e, "Failed to load post");
                Err(e)
            }
        }
    }

    pub fn id(&self) -> &PostId {
        &self.id
    }

    pub fn post(&self) -> Option<Post> {
        self.post.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Post>> {
        self.post.subscribe()
    }

    /// Whether the viewer may edit or delete this post
    pub fn can_modify(&self) -> bool {
        self.check_owned().is_ok()
    }

    fn check_owned(&self) -> Result<()> {
        let viewer = self.api.viewer().ok_or(Error::NotLoggedIn)?;
        let post = self
            .post
            .get()
            .ok_or_else(|| Error::InvalidInput("Post was deleted".to_string()))?;
        if !is_author(Some(&viewer), post.author_id.as_ref()) {
            return Err(Error::NotAuthor("post"));
        }
        Ok(())
    }

    /// Apply an edit locally, send it, then take the server's copy
    pub async fn edit(&self, form: &PostForm) -> Result<Outcome<Post>> {
        let (api, id) = (&self.api, &self.id);
        if let Err(e) = self.check_owned() {
            self.notices.failure(&e, "Failed to update post");
            return Err(e);
        }

        let result = self
            .post
            .mutate(
                |post| {
                    if let Some(post) = post {
                        if let Some(title) = filled(&form.title) {
                            post.title = title.to_string();
                        }
                        if let Some(content) = filled(&form.content) {
                            post.content = content.to_string();
                        }
                    }
                },
                |_| async move { api.update_post(id, form).await },
                |post, fresh| {
                    let mut fresh = fresh.clone();
                    // updates come back without the embedded author card
                    if fresh.author.is_none() {
                        fresh.author = post.as_ref().and_then(|p| p.author.clone());
                    }
                    *post = Some(fresh);
                },
            )
            .await;

        match &result {
            Ok(Outcome::Applied(_)) => self.notices.success("Post updated"),
            Ok(Outcome::Superseded) => {}
            Err(e) => self.notices.failure(e, "Failed to update post"),
        }
        result
    }

    pub async fn delete(&self) -> Result<Outcome<()>> {
        let (api, id) = (&self.api, &self.id);
        if let Err(e) = self.check_owned() {
            self.notices.failure(&e, "Failed to delete post");
            return Err(e);
        }

        let result = self
            .post
            .mutate(
                |post| {
                    post.take();
                },
                |_| async move { api.delete_post(id).await },
                |_, _| {},
            )
            .await;

        match &result {
            Ok(Outcome::Applied(())) => self.notices.success("Post deleted successfully"),
            Ok(Outcome::Superseded) => {}
            Err(e) => self.notices.failure(e, "Failed to delete post"),
        }
        result
    }
}

fn filled(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Publish a new post
pub async fn compose_post(
    api: &BlogApi,
    form: &PostForm,
    notices: &Notices,
) -> Result<Option<Post>> {
    let result = match api.viewer() {
        None => Err(Error::NotLoggedIn),
        Some(_) => api.create_post(form).await,
    };

    match &result {
        Ok(created) => {
            info!(post = ?created.as_ref().map(|p| p.id.as_str()), "composed post");
            notices.success("Post created successfully!");
        }
        Err(e) => notices.failure(e, "Failed to create post"),
    }
    result
}
