//! Scripted collaborators shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tokio::sync::Semaphore;

use crate::api::{ApiClient, ApiError, HttpRequest, HttpResponse, Transport};
use crate::config::Config;
use crate::shell::AppShell;

pub const BASE_URL: &str = "http://api.test";

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    NetworkDown,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Status(200, body.to_string())
    }

    pub fn status(code: u16) -> Self {
        Reply::Status(code, String::new())
    }
}

/// Transport answering from per-route reply queues.
///
/// The last reply queued for a route is sticky. Unknown routes answer 404.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
    holds: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, method: Method, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Park requests to `path` until `release` is called.
    pub fn hold(&self, path: &str) {
        self.holds
            .lock()
            .unwrap()
            .insert(path.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, path: &str) {
        if let Some(gate) = self.holds.lock().unwrap().remove(path) {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        let url = format!("{}{}", BASE_URL, path);
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self, method: Method, path: &str) -> Option<HttpRequest> {
        let url = format!("{}{}", BASE_URL, path);
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.method == method && r.url == url)
            .cloned()
    }

    fn next_reply(&self, method: &Method, path: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(&(method.clone(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        let method = request.method.clone();
        self.requests.lock().unwrap().push(request);

        let gate = self.holds.lock().unwrap().get(&path).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        match self.next_reply(&method, &path) {
            Some(Reply::Status(code, body)) => Ok(HttpResponse::new(
                StatusCode::from_u16(code).unwrap(),
                body,
            )),
            Some(Reply::NetworkDown) => Err(ApiError::NetworkError("connection refused".into())),
            None => Ok(HttpResponse::new(StatusCode::NOT_FOUND, "")),
        }
    }
}

pub fn test_config() -> Config {
    Config {
        api_base_url: BASE_URL.to_string(),
        ..Config::default()
    }
}

pub fn api_client(transport: &Arc<MockTransport>) -> ApiClient {
    ApiClient::new(transport.clone(), &test_config())
}

#[derive(Debug, Default)]
pub struct RecordingShell {
    pub login_redirects: AtomicUsize,
    pub goal_requests: AtomicUsize,
}

impl RecordingShell {
    pub fn logins(&self) -> usize {
        self.login_redirects.load(Ordering::SeqCst)
    }

    pub fn goal_prompts(&self) -> usize {
        self.goal_requests.load(Ordering::SeqCst)
    }
}

impl AppShell for RecordingShell {
    fn navigate_to_login(&self) {
        self.login_redirects.fetch_add(1, Ordering::SeqCst);
    }

    fn request_daily_goal(&self) {
        self.goal_requests.fetch_add(1, Ordering::SeqCst);
    }
}
