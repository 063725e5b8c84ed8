//! # wblog API
//!
//! Typed operations over the blog's REST API. Every call goes through the
//! [`SessionClient`], so expired sessions are recovered transparently.
//!
//! The backend is not consistent about envelopes: lists come back bare or
//! under `res` / a resource-named key, counts as a bare number or `{count}`.
//! The helpers in [`envelope`] absorb that.

pub mod auth;
pub mod comments;
pub mod envelope;
pub mod forms;
pub mod posts;
pub mod social;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use forms::{PostForm, SignupForm, Upload};
pub use social::FollowGraph;

use std::sync::Arc;
use wblog_core::{Result, User};
use wblog_session::{ApiRequest, ApiResponse, SessionClient, SessionStore};

/// Blog API handle; cheap to clone
#[derive(Clone)]
pub struct BlogApi {
    client: Arc<SessionClient>,
}

impl BlogApi {
    pub fn new(client: Arc<SessionClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<SessionClient> {
        &self.client
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.client.store()
    }

    /// The logged-in user, if any
    pub fn viewer(&self) -> Option<User> {
        self.client.store().user()
    }

    async fn call(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.client.request(request).await
    }

    async fn value(&self, request: ApiRequest) -> Result<serde_json::Value> {
        self.call(request).await?.value()
    }
}
