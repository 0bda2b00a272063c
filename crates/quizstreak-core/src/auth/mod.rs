//! Authentication module for managing the user's session token.
//!
//! This module provides:
//! - `SessionManager`: token storage, verification, de-duplicated refresh
//!   and authenticated request headers
//! - `AutoRefreshHandle`: cancellation handle for the periodic refresh task
//!
//! The token is persisted through the `KeyValueStore` the manager is built
//! with and is cleared whenever a refresh fails.

pub mod error;
pub mod session;

pub use error::AuthError;
pub use session::{AutoRefreshHandle, SessionManager, TOKEN_KEY};
