//! Scripted transport for tests
//!
//! Replies are queued per `(method, path)`; a sticky reply answers once the
//! queue is empty. Unscripted routes answer 404.

use crate::transport::{ApiRequest, ApiResponse, Method, Transport};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use wblog_core::{Credentials, Error, Result};

/// One scripted answer
#[derive(Debug, Clone)]
pub struct Reply {
    outcome: std::result::Result<ApiResponse, String>,
    gate: Option<Arc<Notify>>,
}

impl Reply {
    pub fn status(status: u16, body: serde_json::Value) -> Self {
        Self {
            outcome: Ok(ApiResponse::new(status, body.to_string().into_bytes())),
            gate: None,
        }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::status(200, body)
    }

    pub fn empty(status: u16) -> Self {
        Self {
            outcome: Ok(ApiResponse::new(status, Vec::new())),
            gate: None,
        }
    }

    pub fn network(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            gate: None,
        }
    }

    /// Hold the reply until `gate` is notified
    pub fn held(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

fn route(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

#[derive(Default)]
struct Script {
    queued: HashMap<(Method, String), VecDeque<Reply>>,
    sticky: HashMap<(Method, String), Reply>,
    calls: Vec<(Method, String)>,
    requests: Vec<ApiRequest>,
    installed: Vec<Credentials>,
    cleared: usize,
}

/// In-memory `Transport` driven by a script
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a one-shot reply
    pub fn on(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.lock()
            .queued
            .entry((method, route(path)))
            .or_default()
            .push_back(reply);
        self
    }

    /// Reply used whenever the queue for this route is empty
    pub fn always(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.lock().sticky.insert((method, route(path)), reply);
        self
    }

    /// Every request seen, in order
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.lock().calls.clone()
    }

    /// Full requests seen, in order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// The most recent request sent to this route
    pub fn last(&self, method: Method, path: &str) -> Option<ApiRequest> {
        let path = route(path);
        self.lock()
            .requests
            .iter()
            .rev()
            .find(|r| r.method == method && route(&r.path) == path)
            .cloned()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        let key = (method, route(path));
        self.lock().calls.iter().filter(|c| **c == key).count()
    }

    pub fn installed(&self) -> Vec<Credentials> {
        self.lock().installed.clone()
    }

    pub fn cleared(&self) -> usize {
        self.lock().cleared
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let key = (request.method, route(&request.path));
        let reply = {
            let mut script = self.lock();
            script.calls.push(key.clone());
            script.requests.push(request.clone());
            let queued = script.queued.get_mut(&key).and_then(VecDeque::pop_front);
            queued.or_else(|| script.sticky.get(&key).cloned())
        };

        let Some(reply) = reply else {
            return Ok(ApiResponse::new(
                404,
                serde_json::json!({ "detail": "Not Found" }).to_string().into_bytes(),
            ));
        };

        if let Some(gate) = &reply.gate {
            gate.notified().await;
        }

        reply.outcome.map_err(Error::Network)
    }

    fn install_credentials(&self, credentials: &Credentials) {
        self.lock().installed.push(credentials.clone());
    }

    fn clear_credentials(&self) {
        self.lock().cleared += 1;
    }
}
