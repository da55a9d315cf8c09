//! Core library for the academy terminal client.
//!
//! - `api`: the authenticated request gateway and endpoint wrappers
//! - `auth`: access/refresh token storage backends
//! - `cache`: offline copies of course data
//! - `config`: user configuration
//! - `models`: API data types
//! - `progress`: course completion math
//! - `quiz`: test answer collection and result handling

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod progress;
pub mod quiz;
pub mod utils;

pub use api::{ApiClient, ApiError, AuthState};
pub use auth::{TokenStore, TokenPair};
pub use config::Config;
