//! Like, bookmark and follow toggles
//!
//! Each toggle decides its direction from the local flag, including any
//! optimistic change still in flight, never from the last server read.

use crate::notice::Notices;
use crate::optimistic::{step, Optimistic, Outcome};
use crate::scope::ViewScope;
use tokio::sync::watch;
use tracing::warn;
use wblog_api::{BlogApi, FollowGraph};
use wblog_core::{Error, PostId, Result, UserId};

/// Liked flag and like counter; they always move together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub count: u64,
}

pub struct LikeToggle {
    api: BlogApi,
    post: PostId,
    state: Optimistic<LikeState>,
    notices: Notices,
}

impl LikeToggle {
    pub fn new(
        api: BlogApi,
        post: PostId,
        initial: LikeState,
        scope: ViewScope,
        notices: Notices,
    ) -> Self {
        Self {
            api,
            post,
            state: Optimistic::new(initial, scope),
            notices,
        }
    }

    pub fn state(&self) -> LikeState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<LikeState> {
        self.state.subscribe()
    }

    /// Flip the like. Returns the new liked value when the server accepted it.
    pub async fn toggle(&self) -> Result<Outcome<bool>> {
        let (api, post) = (&self.api, &self.post);
        if api.viewer().is_none() {
            let error = Error::NotLoggedIn;
            self.notices.failure(&error, "Failed to update like");
            return Err(error);
        }

        let result = self
            .state
            .mutate(
                |s| {
                    s.liked = !s.liked;
                    s.count = step(s.count, s.liked);
                    s.liked
                },
                |liking| async move {
                    if liking {
                        api.like(post).await?;
                    } else {
                        api.unlike(post).await?;
                    }
                    Ok::<_, Error>(liking)
                },
                |_, _| {},
            )
            .await;

        if let Err(e) = &result {
            self.notices.failure(e, "Failed to update like");
        }
        result
    }
}

pub struct BookmarkToggle {
    api: BlogApi,
    post: PostId,
    state: Optimistic<bool>,
    notices: Notices,
}

impl BookmarkToggle {
    pub fn new(
        api: BlogApi,
        post: PostId,
        bookmarked: bool,
        scope: ViewScope,
        notices: Notices,
    ) -> Self {
        Self {
            api,
            post,
            state: Optimistic::new(bookmarked, scope),
            notices,
        }
    }

    pub fn is_bookmarked(&self) -> bool {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    pub async fn toggle(&self) -> Result<Outcome<bool>> {
        let (api, post) = (&self.api, &self.post);
        if api.viewer().is_none() {
            let error = Error::NotLoggedIn;
            self.notices.failure(&error, "Failed to update bookmark");
            return Err(error);
        }

        let result = self
            .state
            .mutate(
                |b| {
                    *b = !*b;
                    *b
                },
                |saving| async move {
                    if saving {
                        api.bookmark(post).await?;
                    } else {
                        api.unbookmark(post).await?;
                    }
                    Ok::<_, Error>(saving)
                },
                |_, _| {},
            )
            .await;

        match &result {
            Ok(Outcome::Applied(true)) => self.notices.success("Post bookmarked"),
            Ok(Outcome::Applied(false)) => self.notices.success("Bookmark removed"),
            Ok(Outcome::Superseded) => {}
            Err(e) => self.notices.failure(e, "Failed to update bookmark"),
        }
        result
    }
}

/// Follow flag plus both follow lists of the profile being viewed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FollowState {
    pub following: bool,
    pub follower_count: u64,
    pub following_count: u64,
    pub graph: FollowGraph,
}

impl FollowState {
    pub fn new(following: bool, graph: FollowGraph) -> Self {
        Self {
            following,
            follower_count: graph.followers.len() as u64,
            following_count: graph.following.len() as u64,
            graph,
        }
    }

    fn reconcile(&mut self, graph: &FollowGraph) {
        self.follower_count = graph.followers.len() as u64;
        self.following_count = graph.following.len() as u64;
        self.graph = graph.clone();
    }
}

pub struct FollowToggle {
    api: BlogApi,
    target: UserId,
    state: Optimistic<FollowState>,
    notices: Notices,
}

impl FollowToggle {
    pub fn new(
        api: BlogApi,
        target: UserId,
        initial: FollowState,
        scope: ViewScope,
        notices: Notices,
    ) -> Self {
        Self {
            api,
            target,
            state: Optimistic::new(initial, scope),
            notices,
        }
    }

    pub fn state(&self) -> FollowState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<FollowState> {
        self.state.subscribe()
    }

    /// Follow or unfollow, then re-read both follow lists
    pub async fn toggle(&self) -> Result<Outcome<bool>> {
        let (api, target) = (&self.api, &self.target);
        let rejection = match api.viewer() {
            None => Some(Error::NotLoggedIn),
            Some(viewer) if &viewer.id == target => {
                Some(Error::InvalidInput("You cannot follow yourself".to_string()))
            }
            Some(_) => None,
        };
        if let Some(error) = rejection {
            self.notices.failure(&error, "Failed to update follow");
            return Err(error);
        }

        let result = self
            .state
            .mutate(
                |s| {
                    s.following = !s.following;
                    s.follower_count = step(s.follower_count, s.following);
                    s.following
                },
                |following| async move {
                    if following {
                        api.follow(target).await?;
                    } else {
                        api.unfollow(target).await?;
                    }
                    // Counts are server-owned; keep the optimistic ones if
                    // the re-read fails
                    let graph = match api.follow_graph(target).await {
                        Ok(graph) => Some(graph),
                        Err(e) => {
                            warn!(user = %target, error = %e, "could not reload follow lists");
                            None
                        }
                    };
                    Ok::<_, Error>((following, graph))
                },
                |s, (_, graph)| {
                    if let Some(graph) = graph {
                        s.reconcile(graph);
                    }
                },
            )
            .await;

        match result {
            Ok(Outcome::Applied((following, _))) => Ok(Outcome::Applied(following)),
            Ok(Outcome::Superseded) => Ok(Outcome::Superseded),
            Err(e) => {
                self.notices.failure(&e, "Failed to update follow");
                Err(e)
            }
        }
    }
}
