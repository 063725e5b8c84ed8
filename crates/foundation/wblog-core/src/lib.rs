//! # wblog core
//!
//! Domain types shared by every wblog client crate, plus the error taxonomy
//! the session and interaction layers report through.
//!
//! ```text
//! ┌───────────────┐     ┌───────────────┐     ┌───────────────┐
//! │  Session      │     │  Post         │     │  Comment      │
//! │  credentials  │     │  author_id    │     │  Pending(tmp) │
//! │  + user       │     │  profile      │────>│  Server(id)   │
//! └───────────────┘     └───────────────┘     └───────────────┘
//! ```
//!
//! Identifiers arrive from the API as either JSON strings or integers; the id
//! newtypes accept both and always hold the textual form.

pub mod error;
pub mod ids;
pub mod model;

pub use error::{Error, ErrorKind, Result};
pub use ids::{CategoryId, CommentId, PostId, UserId};
pub use model::{
    is_author, AuthResponse, Bookmark, Category, Comment, Credentials, FollowEdge, Post, Profile,
    Session, User,
};
