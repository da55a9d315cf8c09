//! Authenticated request flow.
//!
//! A request moves through `RequestState::Initial`, and on a 401 through
//! `Renewing` to `Retried`. It terminates on the first response that is not
//! a 401 in `Initial`, so the renewal runs at most once per request.

use anyhow::Result;
use reqwest::cookie::CookieStore;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{multipart, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use url::Url;

use super::client::ApiClient;
use super::error::ApiError;
use super::session::AuthState;

/// Token renewal endpoint
pub const REFRESH_PATH: &str = "/api/token/refresh/";

/// Name of the CSRF cookie set by the backend
pub const CSRF_COOKIE: &str = "csrftoken";

/// Header carrying the CSRF token
pub const CSRF_HEADER: &str = "x-csrftoken";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Text fields of a multipart form. Kept as plain pairs so the form can
    /// be rebuilt for the retry.
    Multipart(Vec<(String, String)>),
}

/// Method, body and extra headers of a gateway request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: RequestBody,
    /// Merged over the default headers; these win on conflict.
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post_json(body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            body: RequestBody::Json(body),
            headers: HeaderMap::new(),
        }
    }

    pub fn post_multipart(fields: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            body: RequestBody::Multipart(fields),
            headers: HeaderMap::new(),
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestState {
    Initial,
    Renewing,
    Retried,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Renew,
    Finish,
}

impl RequestState {
    /// What to do with a response received in this state.
    pub(crate) fn on_response(self, status: StatusCode) -> Step {
        match self {
            RequestState::Initial if status == StatusCode::UNAUTHORIZED => Step::Renew,
            RequestState::Initial | RequestState::Renewing | RequestState::Retried => Step::Finish,
        }
    }
}

/// Caller headers replace defaults of the same name, keeping every value
/// the caller gave for that name.
fn merge_headers(defaults: &mut HeaderMap, overrides: &HeaderMap) {
    for name in overrides.keys() {
        defaults.remove(name);
    }
    for (name, value) in overrides.iter() {
        defaults.append(name.clone(), value.clone());
    }
}

fn bearer(token: &str) -> Result<HeaderValue> {
    Ok(HeaderValue::from_str(&format!("Bearer {}", token))?)
}

impl ApiClient {
    /// Resolve an API path against the base URL.
    pub(super) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", path, e)))
    }

    /// Current value of the CSRF cookie for the backend origin.
    pub fn csrf_token(&self) -> Option<String> {
        let cookies = self.cookies.cookies(&self.base_url)?;
        let cookies = cookies.to_str().ok()?;
        cookies.split(';').find_map(|cookie| {
            cookie
                .trim()
                .strip_prefix(CSRF_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
    }

    /// Seed the CSRF cookie, e.g. from a value copied out of a browser.
    pub fn set_csrf_token(&self, token: &str) {
        self.cookies
            .add_cookie_str(&format!("{}={}; Path=/", CSRF_COOKIE, token), &self.base_url);
    }

    /// Fetch the login page so the backend sets the CSRF cookie.
    pub async fn prime_csrf_cookie(&self) -> Result<()> {
        let url = self.endpoint("/login/")?;
        let response = self.client.get(url).send().await.map_err(ApiError::Network)?;
        debug!(
            status = %response.status(),
            has_csrf = self.csrf_token().is_some(),
            "Login page fetched for CSRF cookie"
        );
        Ok(())
    }

    /// Headers sent with every request: content type (except multipart),
    /// CSRF token, and the bearer token when one is stored.
    pub(super) fn default_headers(&self, body: &RequestBody) -> Result<HeaderMap> {
        let mut headers = self.csrf_headers(!matches!(body, RequestBody::Multipart(_)))?;
        if let Some(access) = self.tokens.access_token() {
            headers.insert(header::AUTHORIZATION, bearer(&access)?);
        }
        Ok(headers)
    }

    pub(super) fn csrf_headers(&self, json: bool) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if json {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        if let Some(csrf) = self.csrf_token() {
            headers.insert(CSRF_HEADER, HeaderValue::from_str(&csrf)?);
        }
        Ok(headers)
    }

    /// Issue an authenticated request and parse the JSON response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        match self.execute(path, &options).await {
            Ok(value) => Ok(value),
            Err(e) => {
                error!(path, method = %options.method, error = %e, "API request failed");
                Err(e)
            }
        }
    }

    async fn execute<T: DeserializeOwned>(&self, path: &str, options: &RequestOptions) -> Result<T> {
        let url = self.endpoint(path)?;

        let mut headers = self.default_headers(&options.body)?;
        merge_headers(&mut headers, &options.headers);

        let mut state = RequestState::Initial;
        let response = loop {
            let response = self.send(&url, options, &headers).await?;
            match state.on_response(response.status()) {
                Step::Finish => break response,
                Step::Renew => {
                    state = RequestState::Renewing;
                    debug!(url = %url, ?state, "Access token rejected, renewing");
                    let access = self.renew_access_token().await?;
                    headers.insert(header::AUTHORIZATION, bearer(&access)?);
                    state = RequestState::Retried;
                }
            }
        };
        debug!(url = %url, ?state, status = %response.status(), "Request finished");

        let response = Self::check_response(response).await?;
        Self::parse_json(response).await
    }

    async fn send(
        &self,
        url: &Url,
        options: &RequestOptions,
        headers: &HeaderMap,
    ) -> Result<Response, ApiError> {
        let builder = self
            .client
            .request(options.method.clone(), url.clone())
            .headers(headers.clone());

        let builder = match &options.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Multipart(fields) => {
                let form = fields
                    .iter()
                    .fold(multipart::Form::new(), |form, (name, value)| {
                        form.text(name.clone(), value.clone())
                    });
                builder.multipart(form)
            }
        };

        Ok(builder.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    pub(super) async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Parse a JSON body; an empty body parses as `null`.
    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let url = response.url().clone();
        let text = response.text().await.map_err(ApiError::Network)?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e)).into()
        })
    }

    // =========================================================================
    // Renewal
    // =========================================================================

    /// Exchange the stored refresh token for a new access token.
    ///
    /// On any failure both tokens are cleared and the auth state flips to
    /// `LoginRequired` before the error is returned.
    pub async fn renew_access_token(&self) -> Result<String> {
        match self.exchange_refresh_token().await {
            Ok(access) => {
                info!("Access token renewed");
                Ok(access)
            }
            Err(e) => {
                error!(error = %e, "Error refreshing token");
                if let Err(clear_err) = self.tokens.clear() {
                    warn!(error = %clear_err, "Failed to clear tokens after renewal failure");
                }
                self.auth_state.send_replace(AuthState::LoginRequired);
                Err(e)
            }
        }
    }

    async fn exchange_refresh_token(&self) -> Result<String> {
        let refresh = self
            .tokens
            .refresh_token()
            .ok_or(ApiError::MissingRefreshToken)?;

        let url = self.endpoint(REFRESH_PATH)?;
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::json!({ "refresh": refresh }).to_string())
            .send()
            .await
            .map_err(ApiError::Network)?;

        if !response.status().is_success() {
            return Err(ApiError::RenewalFailed(response.status()).into());
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Bad refresh response: {}", e)))?;

        self.tokens.set_access_token(&body.access)?;
        Ok(body.access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::MemoryTokenStore;

    fn client(access: Option<&str>) -> ApiClient {
        let store = Arc::new(MemoryTokenStore::with_tokens(access, Some("r")));
        ApiClient::new("http://localhost:8000/", store).unwrap()
    }

    #[test]
    fn test_state_machine_renews_only_from_initial() {
        assert_eq!(
            RequestState::Initial.on_response(StatusCode::UNAUTHORIZED),
            Step::Renew
        );
        assert_eq!(
            RequestState::Retried.on_response(StatusCode::UNAUTHORIZED),
            Step::Finish
        );
        assert_eq!(RequestState::Initial.on_response(StatusCode::OK), Step::Finish);
        assert_eq!(
            RequestState::Initial.on_response(StatusCode::FORBIDDEN),
            Step::Finish
        );
    }

    #[test]
    fn test_merge_headers_keeps_multiple_values() {
        let mut defaults = HeaderMap::new();
        defaults.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        defaults.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("ky"));

        let mut overrides = HeaderMap::new();
        overrides.append(header::ACCEPT_LANGUAGE, HeaderValue::from_static("ru"));
        overrides.append(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

        merge_headers(&mut defaults, &overrides);

        let languages: Vec<&str> = defaults
            .get_all(header::ACCEPT_LANGUAGE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(languages, vec!["ru", "en"]);
        assert_eq!(defaults[header::AUTHORIZATION], "Bearer abc");
    }

    #[test]
    fn test_default_headers_with_token() {
        let client = client(Some("abc"));
        client.set_csrf_token("csrf-1");
        let headers = client.default_headers(&RequestBody::Empty).unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[CSRF_HEADER], "csrf-1");
    }

    #[test]
    fn test_default_headers_without_token() {
        let client = client(None);
        let headers = client.default_headers(&RequestBody::Empty).unwrap();
        assert!(!headers.contains_key(header::AUTHORIZATION));
        assert!(!headers.contains_key(CSRF_HEADER));
    }

    #[test]
    fn test_multipart_leaves_content_type_to_form() {
        let client = client(Some("abc"));
        let headers = client
            .default_headers(&RequestBody::Multipart(vec![]))
            .unwrap();
        assert!(!headers.contains_key(header::CONTENT_TYPE));
        assert!(headers.contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn test_csrf_token_read_from_jar() {
        let client = client(None);
        assert!(client.csrf_token().is_none());
        client.set_csrf_token("token-value");
        assert_eq!(client.csrf_token().as_deref(), Some("token-value"));
    }

    #[test]
    fn test_endpoint_join() {
        let client = client(None);
        assert_eq!(
            client.endpoint("/api/tests/3/submit/").unwrap().as_str(),
            "http://localhost:8000/api/tests/3/submit/"
        );
        assert_eq!(
            client.endpoint("/api/materials/?course=2").unwrap().query(),
            Some("course=2")
        );
    }
}
