//! Comments
//!
//! Note the asymmetric routes: comments are created under the post
//! (`posts/{post}/comments`) but edited and deleted under their own id
//! (`posts/{comment}/comments`).

use crate::envelope;
use crate::BlogApi;
use serde_json::json;
use tracing::debug;
use wblog_core::{Comment, CommentId, Error, PostId, Result};
use wblog_session::ApiRequest;

fn require_text(content: &str) -> Result<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::InvalidInput("Comment cannot be empty".to_string()));
    }
    Ok(content)
}

fn server_id(id: &CommentId) -> Result<&str> {
    if id.is_pending() {
        return Err(Error::InvalidInput(
            "Comment is still being posted".to_string(),
        ));
    }
    Ok(id.as_str())
}

impl BlogApi {
    pub async fn comments(&self, post: &PostId) -> Result<Vec<Comment>> {
        envelope::list(
            self.value(ApiRequest::get(format!("posts/{post}/comments"))).await?,
            &["res", "comments"],
        )
    }

    pub async fn create_comment(&self, post: &PostId, content: &str) -> Result<()> {
        let content = require_text(content)?;
        let request =
            ApiRequest::post(format!("posts/{post}/comments")).json(json!({ "content": content }));
        self.call(request).await?;
        debug!(post = %post, "comment created");
        Ok(())
    }

    pub async fn update_comment(&self, id: &CommentId, content: &str) -> Result<()> {
        let content = require_text(content)?;
        let request = ApiRequest::put(format!("posts/{}/comments", server_id(id)?))
            .json(json!({ "content": content }));
        self.call(request).await?;
        debug!(comment = %id.as_str(), "comment updated");
        Ok(())
    }

    pub async fn delete_comment(&self, id: &CommentId) -> Result<()> {
        self.call(ApiRequest::delete(format!("posts/{}/comments", server_id(id)?)))
            .await?;
        debug!(comment = %id.as_str(), "comment deleted");
        Ok(())
    }
}
