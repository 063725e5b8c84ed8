//! Session Client
//!
//! Sends requests with the session's cookies and survives exactly one kind of
//! failure: an expired access token.
//!
//! ```text
//!   Initial ──send──> 2xx ───────────────> Ok(response)
//!      │              4xx/5xx ───────────> Err(Api)
//!      │              401
//!      v
//!   Refreshing ──fail──> session ended ──> Err(SessionExpired)
//!      │ ok
//!      v
//!   Replayed ──send──> 2xx ──────────────> Ok(response)
//!                      401 ──────────────> Err(Unauthorized)
//! ```
//!
//! Concurrent requests that expire together share a single refresh: the first
//! one in performs it, the rest see the bumped epoch and replay directly.

use crate::store::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wblog_core::{AuthResponse, Credentials, Error, Result, Session};

pub const REFRESH_PATH: &str = "auth/refresh";

const UNAUTHORIZED: u16 = 401;

/// Position of one request in the expiry-recovery cycle.
///
/// `Replayed` has no transition on 401, so a request can never be
/// refreshed-and-replayed twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flight {
    Initial,
    Replayed,
}

/// Outcome of the most recent refresh
#[derive(Debug, Default)]
struct RefreshRecord {
    succeeded: bool,
}

/// Authenticated API client
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    /// Bumped after every refresh attempt, successful or not
    refresh_epoch: AtomicU64,
    refresh_gate: Mutex<RefreshRecord>,
}

impl SessionClient {
    /// Build a client and seed the transport with any persisted credentials
    pub fn new(transport: Arc<dyn Transport>, store: Arc<SessionStore>) -> Self {
        if let Some(credentials) = store.credentials() {
            transport.install_credentials(&credentials);
        }

        Self {
            transport,
            store,
            refresh_epoch: AtomicU64::new(0),
            refresh_gate: Mutex::new(RefreshRecord::default()),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Send `request`, recovering once from session expiry
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut flight = Flight::Initial;

        loop {
            let epoch = self.refresh_epoch.load(Ordering::Acquire);
            debug!(method = %request.method, path = %request.path, ?flight, "dispatch");

            let response = self.transport.send(&request).await?;
            if response.status != UNAUTHORIZED {
                return into_result(response);
            }

            flight = match flight {
                Flight::Initial => {
                    self.recover(epoch).await?;
                    Flight::Replayed
                }
                Flight::Replayed => {
                    warn!(path = %request.path, "still unauthorized after refresh");
                    return Err(Error::Unauthorized);
                }
            };
        }
    }

    /// Send without expiry recovery. Used by login and signup, where a 401
    /// means bad credentials, not an expired session.
    pub async fn request_public(&self, request: ApiRequest) -> Result<ApiResponse> {
        debug!(method = %request.method, path = %request.path, "dispatch public");
        into_result(self.transport.send(&request).await?)
    }

    /// Record a session returned by login or signup
    pub fn establish(&self, auth: AuthResponse) -> Result<Session> {
        let session = auth.into_session();
        self.store.begin(session.clone())?;
        self.transport.install_credentials(&session.credentials);
        Ok(session)
    }

    /// End the session locally: storage, memory and cookies
    pub fn terminate(&self) -> Result<()> {
        self.transport.clear_credentials();
        self.store.end()
    }

    async fn recover(&self, seen_epoch: u64) -> Result<()> {
        let mut record = self.refresh_gate.lock().await;

        if self.refresh_epoch.load(Ordering::Acquire) != seen_epoch {
            debug!("refresh already attempted by a concurrent request");
            return if record.succeeded {
                Ok(())
            } else {
                Err(Error::SessionExpired)
            };
        }

        let outcome = self.refresh().await;
        record.succeeded = outcome.is_ok();
        self.refresh_epoch.fetch_add(1, Ordering::AcqRel);

        match outcome {
            Ok(()) => {
                info!("session refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "refresh failed, ending session");
                if let Err(e) = self.terminate() {
                    warn!(error = %e, "could not clear persisted session");
                }
                Err(Error::SessionExpired)
            }
        }
    }

    async fn refresh(&self) -> Result<()> {
        let request = ApiRequest::post(REFRESH_PATH).json(serde_json::json!({}));
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(Error::from_response(response.status, &response.body));
        }

        // Cookie-only backends answer without a body; the jar already has the new tokens.
        if let Ok(credentials) = response.json::<Credentials>() {
            self.store.refreshed(credentials.clone())?;
            self.transport.install_credentials(&credentials);
        }
        Ok(())
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(Error::from_response(response.status, &response.body))
    }
}
