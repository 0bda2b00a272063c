//! API client for the quiz backend.
//!
//! This module provides the `ApiClient` struct for the three endpoints the
//! session and stats logic depend on: current user, token refresh and user
//! stats.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;

use crate::config::{Config, Endpoints};
use crate::stats::BackendStreaks;

use super::{ApiError, HttpRequest, Transport};

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

/// Build `Authorization: Bearer <token>` headers.
pub fn bearer_headers(token: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ApiError::InvalidRequest("token is not a valid header value".to_string()))?;
    headers.insert(header::AUTHORIZATION, value);
    Ok(headers)
}

/// API client for the quiz backend.
/// Clone is cheap - the transport is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            transport,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check the token against the current-user endpoint.
    /// A rejected token comes back as `ApiError::Unauthorized`.
    pub async fn current_user(&self, token: &str) -> Result<(), ApiError> {
        let request = HttpRequest::get(self.url(&self.endpoints.current_user), bearer_headers(token)?);
        self.transport.send(request).await?.error_for_status()?;
        Ok(())
    }

    /// Exchange the current token for a fresh one.
    pub async fn refresh(&self, token: &str) -> Result<String, ApiError> {
        let request = HttpRequest::post(self.url(&self.endpoints.refresh), bearer_headers(token)?);
        let response = self.transport.send(request).await?.error_for_status()?;

        let refreshed: RefreshResponse = response.json()?;
        if refreshed.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "refresh response carried an empty access_token".to_string(),
            ));
        }
        debug!("Token refreshed");
        Ok(refreshed.access_token)
    }

    /// Fetch the backend's streak values using already-built auth headers.
    pub async fn user_stats(&self, headers: HeaderMap) -> Result<BackendStreaks, ApiError> {
        let request = HttpRequest::get(self.url(&self.endpoints.user_stats), headers);
        let response = self.transport.send(request).await?.error_for_status()?;
        response.json()
    }
}
