//! Login, logout and token verification.

use anyhow::Result;
use reqwest::header;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::auth::TokenPair;

use super::client::ApiClient;
use super::error::ApiError;

/// Token issue endpoint
pub const TOKEN_PATH: &str = "/api/token/";

/// Token verification endpoint
pub const VERIFY_PATH: &str = "/api/token/verify/";

/// Logout endpoint
pub const LOGOUT_PATH: &str = "/api/token/logout/";

/// Where the session stands, as observed by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No tokens, nobody asked to log in yet (fresh start or after logout)
    SignedOut,
    /// Tokens stored
    Authenticated,
    /// Renewal failed and the tokens were dropped; show the login screen
    LoginRequired,
}

impl ApiClient {
    /// Watch auth state changes (login, logout, renewal failure).
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.auth_state.subscribe()
    }

    pub fn auth_state(&self) -> AuthState {
        *self.auth_state.borrow()
    }

    /// Exchange username and password for a token pair and store it.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let url = self.endpoint(TOKEN_PATH)?;
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let response = self
            .client
            .post(url)
            .headers(self.csrf_headers(true)?)
            .body(body.to_string())
            .send()
            .await
            .map_err(ApiError::Network)?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, username, "Error during login");
            return Err(ApiError::LoginFailed(status).into());
        }

        let tokens: TokenPair = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Bad login response: {}", e)))?;

        self.tokens.set_tokens(&tokens)?;
        self.auth_state.send_replace(AuthState::Authenticated);
        info!(username, "Login successful");
        Ok(tokens)
    }

    /// Revoke the refresh token on the server and clear local tokens.
    ///
    /// Local tokens are cleared whatever the server says. Returns whether
    /// the server acknowledged the logout.
    pub async fn logout(&self) -> Result<bool> {
        let acknowledged = match self.post_logout().await {
            Ok(status) => {
                if !status.is_success() {
                    warn!(%status, "Logout not acknowledged by server");
                }
                status.is_success()
            }
            Err(e) => {
                error!(error = %e, "Error during logout");
                false
            }
        };

        let cleared = self.tokens.clear();
        self.auth_state.send_replace(AuthState::SignedOut);
        cleared?;
        info!(acknowledged, "Logged out");
        Ok(acknowledged)
    }

    async fn post_logout(&self) -> Result<reqwest::StatusCode> {
        let url = self.endpoint(LOGOUT_PATH)?;
        let mut headers = self.csrf_headers(true)?;
        if let Some(access) = self.tokens.access_token() {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", access))?,
            );
        }

        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(serde_json::json!({ "refresh": self.tokens.refresh_token() }).to_string())
            .send()
            .await
            .map_err(ApiError::Network)?;
        Ok(response.status())
    }

    /// Ask the backend whether the stored access token is still valid.
    /// Returns false when no access token is stored.
    pub async fn verify_access_token(&self) -> Result<bool> {
        let Some(access) = self.tokens.access_token() else {
            return Ok(false);
        };

        let url = self.endpoint(VERIFY_PATH)?;
        let response = self
            .client
            .post(url)
            .headers(self.csrf_headers(true)?)
            .body(serde_json::json!({ "token": access }).to_string())
            .send()
            .await
            .map_err(ApiError::Network)?;
        Ok(response.status().is_success())
    }

    /// Startup auth check.
    ///
    /// Verifies the stored access token and, if the backend rejects it,
    /// renews once. Returns true when the session is usable.
    pub async fn ensure_session(&self) -> Result<bool> {
        if !self.tokens.has_access_token() {
            self.auth_state.send_replace(AuthState::LoginRequired);
            return Ok(false);
        }
        if self.verify_access_token().await? {
            self.auth_state.send_replace(AuthState::Authenticated);
            return Ok(true);
        }
        match self.renew_access_token().await {
            Ok(_) => {
                self.auth_state.send_replace(AuthState::Authenticated);
                Ok(true)
            }
            Err(e) if super::error::requires_login(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
