//! Comment thread under a post

use crate::notice::Notices;
use crate::optimistic::{Optimistic, Outcome};
use crate::scope::ViewScope;
use tokio::sync::watch;
use tracing::warn;
use wblog_api::BlogApi;
use wblog_core::{is_author, Comment, CommentId, Error, PostId, Result};

pub struct CommentThread {
    api: BlogApi,
    post: PostId,
    comments: Optimistic<Vec<Comment>>,
    notices: Notices,
}

impl CommentThread {
    pub fn new(
        api: BlogApi,
        post: PostId,
        initial: Vec<Comment>,
        scope: ViewScope,
        notices: Notices,
    ) -> Self {
        Self {
            api,
            post,
            comments: Optimistic::new(initial, scope),
            notices,
        }
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.comments.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Comment>> {
        self.comments.subscribe()
    }

    /// Re-read the thread from the server
    pub async fn reload(&self) -> Result<()> {
        match self.api.comments(&self.post).await {
            Ok(list) => {
                self.comments.replace(list).await;
                Ok(())
            }
            Err(e) => {
                self.notices.failure(&e, "Failed to load comments");
                Err(e)
            }
        }
    }

    /// Post a comment. A placeholder is shown at the top right away; once
    /// the server accepts it the whole thread is re-read, which assigns real
    /// ids and order.
    pub async fn add(&self, content: &str) -> Result<Outcome<()>> {
        let (api, post) = (&self.api, &self.post);
        let content = content.trim().to_string();
        let viewer = match api.viewer() {
            None => return self.reject(Error::NotLoggedIn, "Failed to add comment"),
            Some(_) if content.is_empty() => {
                return self.reject(
                    Error::InvalidInput("Comment cannot be empty".to_string()),
                    "Failed to add comment",
                )
            }
            Some(viewer) => viewer,
        };

        let result = self
            .comments
            .mutate(
                |list| {
                    list.insert(0, Comment::pending(content.clone(), &viewer));
                    content.clone()
                },
                |content| async move {
                    api.create_comment(post, &content).await?;
                    let fresh = match api.comments(post).await {
                        Ok(list) => Some(list),
                        Err(e) => {
                            warn!(
                                post = %post,
                                error = %e,
                                "comment saved but thread reload failed"
                            );
                            None
                        }
                    };
                    Ok::<_, Error>(fresh)
                },
                |list, fresh| {
                    if let Some(fresh) = fresh {
                        *list = fresh.clone();
                    }
                },
            )
            .await;

        self.report(
            result.map(|o| map_outcome(o, |_| ())),
            "Comment added",
            "Failed to add comment",
        )
    }

    /// Edit one of the viewer's own comments
    pub async fn edit(&self, id: &CommentId, content: &str) -> Result<Outcome<()>> {
        let api = &self.api;
        let content = content.trim().to_string();
        if let Err(e) = self.check_owned(id) {
            return self.reject(e, "Failed to update comment");
        }
        if content.is_empty() {
            return self.reject(
                Error::InvalidInput("Comment cannot be empty".to_string()),
                "Failed to update comment",
            );
        }

        let result = self
            .comments
            .mutate(
                |list| {
                    if let Some(comment) = list.iter_mut().find(|c| &c.id == id) {
                        comment.content = content.clone();
                    }
                    content.clone()
                },
                |content| async move { api.update_comment(id, &content).await },
                |_, _| {},
            )
            .await;

        self.report(result, "Comment updated", "Failed to update comment")
    }

    /// Delete one of the viewer's own comments
    pub async fn delete(&self, id: &CommentId) -> Result<Outcome<()>> {
        let api = &self.api;
        if let Err(e) = self.check_owned(id) {
            return self.reject(e, "Failed to delete comment");
        }

        let result = self
            .comments
            .mutate(
                |list| list.retain(|c| &c.id != id),
                |_| async move { api.delete_comment(id).await },
                |_, _| {},
            )
            .await;

        self.report(result, "Comment deleted", "Failed to delete comment")
    }

    fn check_owned(&self, id: &CommentId) -> Result<()> {
        let viewer = self.api.viewer().ok_or(Error::NotLoggedIn)?;
        let list = self.comments.get();
        let comment = list
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| Error::InvalidInput("Comment not found".to_string()))?;

        if comment.id.is_pending() {
            return Err(Error::InvalidInput(
                "Comment is still being posted".to_string(),
            ));
        }
        if !is_author(Some(&viewer), comment.author_id.as_ref()) {
            return Err(Error::NotAuthor("comment"));
        }
        Ok(())
    }

    fn reject<T>(&self, error: Error, fallback: &str) -> Result<T> {
        self.notices.failure(&error, fallback);
        Err(error)
    }

    fn report(
        &self,
        result: Result<Outcome<()>>,
        success: &str,
        fallback: &str,
    ) -> Result<Outcome<()>> {
        match &result {
            Ok(Outcome::Applied(())) => self.notices.success(success),
            Ok(Outcome::Superseded) => {}
            Err(e) => self.notices.failure(e, fallback),
        }
        result
    }
}

fn map_outcome<R, S>(outcome: Outcome<R>, f: impl FnOnce(R) -> S) -> Outcome<S> {
    match outcome {
        Outcome::Applied(r) => Outcome::Applied(f(r)),
        Outcome::Superseded => Outcome::Superseded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::{notices, NoticeLevel};
    use wblog_api::testing::logged_in;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Notify;
    use wblog_core::UserId;
    use wblog_session::testing::{Reply, ScriptedTransport};
    use wblog_session::Method;

    fn comment(id: &str, author: &str, content: &str) -> Comment {
        serde_json::from_value(json!({"id": id, "author_id": author, "content": content}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_shows_placeholder_then_server_list() {
        let (transport, api) = logged_in();
        let gate = Arc::new(Notify::new());
        transport.on(
            Method::Post,
            "posts/1/comments",
            Reply::ok(json!({})).held(gate.clone()),
        );
        transport.on(
            Method::Get,
            "posts/1/comments",
            Reply::ok(json!({"res": [
                {"id": 50, "author_id": "u1", "content": "hello"},
                {"id": 7, "author_id": "u2", "content": "older"}
            ]})),
        );
        let (tx, mut rx) = notices();
        let thread = CommentThread::new(
            api,
            PostId::new("1"),
            vec![comment("7", "u2", "older")],
            ViewScope::new(),
            tx,
        );

        let (outcome, _) = tokio::join!(thread.add("  hello "), async {
            let list = thread.comments();
            assert_eq!(list.len(), 2);
            assert_eq!(list[0].content, "hello");
            assert!(list[0].id.is_pending());
            assert_eq!(list[0].author_id, Some(UserId::new("u1")));
            gate.notify_one();
        });

        assert_eq!(outcome.unwrap(), Outcome::Applied(()));
        let list = thread.comments();
        assert_eq!(list[0].id, CommentId::server("50"));
        assert_eq!(list[1].id, CommentId::server("7"));
        let notice = rx.try_recv().unwrap();
        assert_eq!(
            (notice.level, notice.message.as_str()),
            (NoticeLevel::Success, "Comment added")
        );
    }

    #[tokio::test]
    async fn test_add_failure_removes_placeholder() {
        let (transport, api) = logged_in();
        transport.on(Method::Post, "posts/1/comments", Reply::network("reset"));
        let (tx, mut rx) = notices();
        let thread = CommentThread::new(api, PostId::new("1"), Vec::new(), ViewScope::new(), tx);

        assert!(thread.add("hello").await.is_err());
        assert!(thread.comments().is_empty());
        assert_eq!(rx.try_recv().unwrap().message, "Failed to add comment");
        assert_eq!(transport.count(Method::Get, "posts/1/comments"), 0);
    }

    #[tokio::test]
    async fn test_add_keeps_placeholder_when_reload_fails() {
        let (transport, api) = logged_in();
        transport.on(Method::Post, "posts/1/comments", Reply::ok(json!({})));
        transport.on(Method::Get, "posts/1/comments", Reply::status(500, json!({})));
        let (tx, _rx) = notices();
        let thread = CommentThread::new(api, PostId::new("1"), Vec::new(), ViewScope::new(), tx);

        assert!(thread.add("hello").await.unwrap().is_applied());
        assert_eq!(thread.comments().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_comment_rejected() {
        let (transport, api) = logged_in();
        let (tx, _rx) = notices();
        let thread = CommentThread::new(api, PostId::new("1"), Vec::new(), ViewScope::new(), tx);

        assert!(matches!(thread.add("   ").await, Err(Error::InvalidInput(_))));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_edit_in_place() {
        let (transport, api) = logged_in();
        transport.on(Method::Put, "posts/7/comments", Reply::ok(json!({})));
        let (tx, mut rx) = notices();
        let thread = CommentThread::new(
            api,
            PostId::new("1"),
            vec![comment("7", "u1", "old")],
            ViewScope::new(),
            tx,
        );

        thread.edit(&CommentId::server("7"), "new").await.unwrap();
        assert_eq!(thread.comments()[0].content, "new");
        assert_eq!(rx.try_recv().unwrap().message, "Comment updated");
    }

    #[tokio::test]
    async fn test_delete_rolls_back_on_failure() {
        let (transport, api) = logged_in();
        transport.on(
            Method::Delete,
            "posts/7/comments",
            Reply::status(403, json!({"detail": "Not allowed"})),
        );
        let (tx, mut rx) = notices();
        let before = vec![comment("8", "u2", "a"), comment("7", "u1", "b")];
        let thread =
            CommentThread::new(api, PostId::new("1"), before.clone(), ViewScope::new(), tx);

        assert!(thread.delete(&CommentId::server("7")).await.is_err());
        assert_eq!(thread.comments(), before);
        assert_eq!(rx.try_recv().unwrap().message, "Not allowed");
    }

    #[tokio::test]
    async fn test_only_author_may_modify() {
        let (transport, api) = logged_in();
        let (tx, _rx) = notices();
        let thread = CommentThread::new(
            api,
            PostId::new("1"),
            vec![comment("8", "u2", "theirs")],
            ViewScope::new(),
            tx,
        );

        let err = thread.delete(&CommentId::server("8")).await.unwrap_err();
        assert!(matches!(err, Error::NotAuthor("comment")));
        assert!(thread.edit(&CommentId::server("8"), "mine now").await.is_err());
        assert_eq!(thread.comments()[0].content, "theirs");
        assert!(transport.calls().is_empty());
    }

    fn reloaded_thread(transport: &ScriptedTransport, gate: Arc<Notify>) {
        transport
            .on(
                Method::Post,
                "posts/1/comments",
                Reply::ok(json!({})).held(gate),
            )
            .on(
                Method::Get,
                "posts/1/comments",
                Reply::ok(json!({"res": [
                    {"id": 50, "author_id": "u1", "content": "hello"},
                    {"id": 7, "author_id": "u1", "content": "mine"}
                ]})),
            );
    }

    fn ids(thread: &CommentThread) -> Vec<CommentId> {
        thread.comments().into_iter().map(|c| c.id).collect()
    }

    #[tokio::test]
    async fn test_delete_queued_behind_add_outlives_reload() {
        let (transport, api) = logged_in();
        let gate = Arc::new(Notify::new());
        reloaded_thread(&transport, gate.clone());
        transport.on(Method::Delete, "posts/7/comments", Reply::ok(json!({})));
        let (tx, _rx) = notices();
        let thread = CommentThread::new(
            api,
            PostId::new("1"),
            vec![comment("7", "u1", "mine")],
            ViewScope::new(),
            tx,
        );
        let seven = CommentId::server("7");

        let (added, deleted, _) = tokio::join!(thread.add("hello"), thread.delete(&seven), async {
            // placeholder on top, deleted comment already gone
            let list = thread.comments();
            assert_eq!(list.len(), 1);
            assert!(list[0].id.is_pending());
            gate.notify_one();
        });

        assert_eq!(added.unwrap(), Outcome::Applied(()));
        assert_eq!(deleted.unwrap(), Outcome::Applied(()));
        assert_eq!(ids(&thread), vec![CommentId::server("50")]);
        assert_eq!(transport.count(Method::Delete, "posts/7/comments"), 1);
    }

    #[tokio::test]
    async fn test_failed_delete_behind_add_restores_server_list() {
        let (transport, api) = logged_in();
        let gate = Arc::new(Notify::new());
        reloaded_thread(&transport, gate.clone());
        transport.on(Method::Delete, "posts/7/comments", Reply::status(500, json!({})));
        let (tx, _rx) = notices();
        let thread = CommentThread::new(
            api,
            PostId::new("1"),
            vec![comment("7", "u1", "mine")],
            ViewScope::new(),
            tx,
        );
        let seven = CommentId::server("7");

        let (added, deleted, _) = tokio::join!(thread.add("hello"), thread.delete(&seven), async {
            gate.notify_one();
        });

        assert!(added.unwrap().is_applied());
        assert!(deleted.is_err());
        assert_eq!(ids(&thread), vec![CommentId::server("50"), seven]);
        assert!(thread.comments().iter().all(|c| !c.id.is_pending()));
    }

    #[tokio::test]
    async fn test_edit_queued_behind_add_outlives_reload() {
        let (transport, api) = logged_in();
        let gate = Arc::new(Notify::new());
        reloaded_thread(&transport, gate.clone());
        transport.on(Method::Put, "posts/7/comments", Reply::ok(json!({})));
        let (tx, _rx) = notices();
        let thread = CommentThread::new(
            api,
            PostId::new("1"),
            vec![comment("7", "u1", "mine")],
            ViewScope::new(),
            tx,
        );
        let seven = CommentId::server("7");

        let (added, edited, _) = tokio::join!(
            thread.add("hello"),
            thread.edit(&seven, "mine, edited"),
            async { gate.notify_one() }
        );

        assert!(added.unwrap().is_applied());
        assert!(edited.unwrap().is_applied());
        let list = thread.comments();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, CommentId::server("50"));
        assert_eq!(list[1].content, "mine, edited");
    }
}
