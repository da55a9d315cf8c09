//! REST API client for the academy backend.
//!
//! `ApiClient` is the authenticated request gateway: every call attaches the
//! CSRF header and the stored bearer token, and a 401 triggers a single
//! token renewal followed by one retry. Endpoint wrappers for courses,
//! materials, comments, tests and certificates sit on top of it.

pub mod client;
pub mod error;
pub mod gateway;
pub mod session;

pub use client::ApiClient;
pub use error::{requires_login, ApiError};
pub use gateway::{RequestBody, RequestOptions};
pub use session::AuthState;
