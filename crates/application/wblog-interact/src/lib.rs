//! # wblog interact
//!
//! View-side controllers. Every user action updates local state first,
//! publishes it over a `watch` channel, then confirms with the server and
//! rolls back to the exact pre-action snapshot on failure.
//!
//! ```text
//! ┌──────────────┐   mutate   ┌───────────────┐  request  ┌───────────┐
//! │ LikeToggle   │──────────> │ Optimistic<T> │─────────> │ BlogApi   │
//! │ CommentThread│ <───────── │ snapshot/wire │ <──────── │           │
//! └──────────────┘   watch    └───────────────┘  result   └───────────┘
//!         │
//!         └── Notices ──> toast surface
//! ```

pub mod comments;
pub mod notice;
pub mod optimistic;
pub mod pages;
pub mod post;
pub mod scope;
pub mod toggles;

pub use comments::CommentThread;
pub use notice::{notices, Notice, NoticeLevel, Notices};
pub use optimistic::{Optimistic, Outcome};
pub use pages::{PostPage, ProfilePage};
pub use post::{compose_post, PostView};
pub use scope::ViewScope;
pub use toggles::{BookmarkToggle, FollowState, FollowToggle, LikeState, LikeToggle};
