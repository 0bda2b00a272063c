//! REST API client module for the quiz backend.
//!
//! This module provides the `ApiClient` for the authentication and stats
//! endpoints, and the `Transport` seam it sends requests through.
//!
//! The API uses bearer token authentication; tokens are renewed through the
//! refresh endpoint before they expire.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{bearer_headers, ApiClient};
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
