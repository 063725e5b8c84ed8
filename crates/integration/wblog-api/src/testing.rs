//! Fixtures for tests: a [`BlogApi`] over a scripted transport

use crate::BlogApi;
use std::sync::Arc;
use wblog_core::{Credentials, Session, User};
use wblog_session::testing::ScriptedTransport;
use wblog_session::{MemoryStorage, SessionClient, SessionStore};

/// User `u1` ("ann"), the viewer of [`logged_in`]
pub fn viewer() -> User {
    User::new("u1").with_username("ann")
}

/// Stored session for [`viewer`]
pub fn logged_in() -> (Arc<ScriptedTransport>, BlogApi) {
    build(MemoryStorage::with_session(Session {
        credentials: Credentials {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
        },
        user: viewer(),
    }))
}

pub fn anonymous() -> (Arc<ScriptedTransport>, BlogApi) {
    build(MemoryStorage::new())
}

fn build(storage: MemoryStorage) -> (Arc<ScriptedTransport>, BlogApi) {
    let transport = Arc::new(ScriptedTransport::new());
    let store = Arc::new(SessionStore::open(storage));
    let client = Arc::new(SessionClient::new(transport.clone(), store));
    (transport, BlogApi::new(client))
}
