//! Page loaders
//!
//! Each page fires its reads concurrently. Only the primary resource is
//! required; secondary reads fall back to empty state and are logged.

use crate::comments::CommentThread;
use crate::notice::Notices;
use crate::post::PostView;
use crate::scope::ViewScope;
use crate::toggles::{BookmarkToggle, FollowState, FollowToggle, LikeState, LikeToggle};
use tracing::warn;
use wblog_api::BlogApi;
use wblog_core::{Bookmark, Error, Post, PostId, Result, User, UserId};

fn or_default<T: Default>(result: Result<T>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "could not load {}", what);
        T::default()
    })
}

/// Post detail page
pub struct PostPage {
    pub view: PostView,
    pub like: LikeToggle,
    pub bookmark: BookmarkToggle,
    pub comments: CommentThread,
}

impl PostPage {
    pub async fn open(
        api: &BlogApi,
        id: &PostId,
        scope: ViewScope,
        notices: Notices,
    ) -> Result<Self> {
        let signed_in = api.viewer().is_some();

        let (post, count, liked, bookmarked, comments) = tokio::join!(
            api.post(id),
            api.like_count(id),
            async {
                if signed_in {
                    api.is_liked(id).await
                } else {
                    Ok(false)
                }
            },
            async {
                if signed_in {
                    api.is_bookmarked(id).await
                } else {
                    Ok(false)
                }
            },
            api.comments(id),
        );

        let post = match post {
            Ok(post) => post,
            Err(e) => {
                notices.failure(&e, "Failed to load post");
                return Err(e);
            }
        };
        let like = LikeState {
            liked: or_default(liked, "like state"),
            count: or_default(count, "like count"),
        };
        let comments = comments.unwrap_or_else(|e| {
            notices.failure(&e, "Failed to load comments");
            Vec::new()
        });

        Ok(Self {
            view: PostView::new(api.clone(), post, scope.clone(), notices.clone()),
            like: LikeToggle::new(api.clone(), id.clone(), like, scope.clone(), notices.clone()),
            bookmark: BookmarkToggle::new(
                api.clone(),
                id.clone(),
                or_default(bookmarked, "bookmark state"),
                scope.clone(),
                notices.clone(),
            ),
            comments: CommentThread::new(api.clone(), id.clone(), comments, scope, notices),
        })
    }
}

/// Profile page. `bookmarks` is only filled on the viewer's own profile.
pub struct ProfilePage {
    pub user: User,
    pub own: bool,
    pub follow: FollowToggle,
    pub posts: Vec<Post>,
    pub bookmarks: Vec<Bookmark>,
}

impl ProfilePage {
    /// Open `user`'s profile, or the viewer's own when `user` is `None`
    pub async fn open(
        api: &BlogApi,
        user: Option<&UserId>,
        scope: ViewScope,
        notices: Notices,
    ) -> Result<Self> {
        let viewer = api.viewer();
        let target = match (user, &viewer) {
            (Some(id), _) => id.clone(),
            (None, Some(viewer)) => viewer.id.clone(),
            (None, None) => {
                let e = Error::NotLoggedIn;
                notices.failure(&e, "Failed to load profile");
                return Err(e);
            }
        };
        let own = viewer.as_ref().is_some_and(|v| v.id == target);
        let can_follow = viewer.is_some() && !own;

        let (profile, graph, following, posts, bookmarks) = tokio::join!(
            async {
                if own {
                    api.my_profile().await
                } else {
                    api.profile(&target).await
                }
            },
            api.follow_graph(&target),
            async {
                if can_follow {
                    api.is_following(&target).await
                } else {
                    Ok(false)
                }
            },
            api.posts_by(&target),
            async {
                if own {
                    api.bookmarks().await
                } else {
                    Ok(Vec::new())
                }
            },
        );

        let user = match profile {
            Ok(user) => user,
            Err(e) => {
                notices.failure(&e, "Failed to load profile");
                return Err(e);
            }
        };
        let state = FollowState::new(
            or_default(following, "follow state"),
            or_default(graph, "follow lists"),
        );

        Ok(Self {
            user,
            own,
            follow: FollowToggle::new(api.clone(), target, state, scope, notices),
            posts: or_default(posts, "posts"),
            bookmarks: or_default(bookmarks, "bookmarks"),
        })
    }
}
