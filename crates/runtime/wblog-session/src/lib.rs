//! # wblog session
//!
//! Authenticated access to the blog API.
//!
//! - [`SessionStore`]: the process-wide session, persisted between runs
//! - [`SessionClient`]: sends requests with the session cookies and recovers
//!   from one expired-token 401 per request by refreshing and replaying
//! - [`Transport`]: the wire seam ([`HttpTransport`] in production)

pub mod client;
pub mod store;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{SessionClient, REFRESH_PATH};
pub use store::{FileStorage, MemoryStorage, SessionStatus, SessionStorage, SessionStore};
pub use transport::{ApiRequest, ApiResponse, Body, HttpTransport, Method, Part, Transport};

use std::sync::Arc;
use wblog_config::ClientConfig;
use wblog_core::Result;

/// Wire up store, transport and client from configuration
pub fn connect(config: &ClientConfig) -> Result<Arc<SessionClient>> {
    let store = Arc::new(SessionStore::open(FileStorage::at_path(
        config.session_path(),
    )));
    let transport = Arc::new(HttpTransport::new(config)?);
    Ok(Arc::new(SessionClient::new(transport, store)))
}
