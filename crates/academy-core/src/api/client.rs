//! API client for communicating with the academy REST API.
//!
//! This module provides the `ApiClient` struct and the endpoint wrappers
//! used by the front end. Transport, header and renewal handling live in
//! `gateway`; login, logout and token verification in `session`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::cookie::Jar;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

use crate::auth::TokenStore;
use crate::models::{
    Certificate, Comment, Course, Listing, Material, NewComment, Test, TestResult, TestSummary,
    UserProgress,
};
use crate::quiz::{AnswerSheet, TestOutcome};

use super::gateway::RequestOptions;
use super::session::AuthState;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct TestSubmission<'a> {
    answers: &'a [crate::models::AnswerSelection],
}

/// API client for the academy backend.
/// Clone is cheap - reqwest::Client, the cookie jar and the token store are shared.
#[derive(Clone)]
pub struct ApiClient {
    pub(super) client: Client,
    pub(super) cookies: Arc<Jar>,
    pub(super) base_url: Url,
    pub(super) tokens: Arc<dyn TokenStore>,
    pub(super) auth_state: Arc<watch::Sender<AuthState>>,
}

impl ApiClient {
    /// Create a client for `base_url` using the given token store.
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        Self::with_timeout(base_url, tokens, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: &str,
        tokens: Arc<dyn TokenStore>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid base URL: {}", base_url))?;
        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(cookies.clone())
            .timeout(timeout)
            .build()?;

        let initial = if tokens.has_access_token() {
            AuthState::Authenticated
        } else {
            AuthState::SignedOut
        };
        let (auth_state, _) = watch::channel(initial);

        Ok(Self {
            client,
            cookies,
            base_url,
            tokens,
            auth_state: Arc::new(auth_state),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    // ===== Courses =====

    /// Fetch all courses visible to the current user
    pub async fn fetch_courses(&self) -> Result<Vec<Course>> {
        let listing: Listing<Course> = self
            .request("/api/courses/", RequestOptions::get())
            .await
            .context("Failed to fetch courses")?;
        Ok(listing.into_items())
    }

    /// Enroll in a course, returning the server's detail message
    pub async fn enroll(&self, course_id: i64) -> Result<String> {
        let path = format!("/api/courses/{}/enroll/", course_id);
        let response: DetailResponse = self
            .request(&path, RequestOptions::post_json(serde_json::json!({})))
            .await?;
        Ok(response.detail.unwrap_or_default())
    }

    /// Fetch the user's progress through a course
    pub async fn fetch_course_progress(&self, course_id: i64) -> Result<UserProgress> {
        let path = format!("/api/courses/{}/progress/", course_id);
        self.request(&path, RequestOptions::get())
            .await
            .with_context(|| format!("Failed to fetch progress for course {}", course_id))
    }

    // ===== Materials =====

    /// Fetch materials belonging to a course
    pub async fn fetch_materials(&self, course_id: i64) -> Result<Vec<Material>> {
        let path = format!("/api/materials/?course={}", course_id);
        let listing: Listing<Material> = self
            .request(&path, RequestOptions::get())
            .await
            .context("Failed to fetch materials")?;
        Ok(listing.into_items())
    }

    /// Mark a material as completed.
    /// Returns true when the server acknowledged with a `detail` message.
    pub async fn mark_material_completed(&self, material_id: i64) -> Result<bool> {
        let path = format!("/api/materials/{}/mark_completed/", material_id);
        let response: DetailResponse = self
            .request(&path, RequestOptions::post_json(serde_json::json!({})))
            .await?;
        debug!(material_id, detail = ?response.detail, "Material marked completed");
        Ok(response.detail.is_some())
    }

    // ===== Comments =====

    /// Fetch top-level comments (with replies) for a material
    pub async fn fetch_comments(&self, material_id: i64) -> Result<Vec<Comment>> {
        let path = format!("/api/comments/?material={}", material_id);
        let listing: Listing<Comment> = self
            .request(&path, RequestOptions::get())
            .await
            .context("Failed to fetch comments")?;
        Ok(listing.into_items())
    }

    /// Post a comment as a multipart form
    pub async fn post_comment(&self, comment: &NewComment) -> Result<Comment> {
        self.request("/api/comments/", RequestOptions::post_multipart(comment.form_fields()))
            .await
    }

    // ===== Tests =====

    /// Fetch the tests of a course (the endpoint is not filterable server-side)
    pub async fn fetch_tests(&self, course_id: i64) -> Result<Vec<TestSummary>> {
        let listing: Listing<TestSummary> = self
            .request("/api/tests/", RequestOptions::get())
            .await
            .context("Failed to fetch tests")?;
        Ok(listing
            .into_items()
            .into_iter()
            .filter(|t| t.course == course_id)
            .collect())
    }

    /// Fetch a test with its questions and answer options
    pub async fn fetch_test(&self, test_id: i64) -> Result<Test> {
        let path = format!("/api/tests/{}/", test_id);
        self.request(&path, RequestOptions::get())
            .await
            .with_context(|| format!("Failed to fetch test {}", test_id))
    }

    /// Submit answers for a test
    pub async fn submit_test(
        &self,
        test_id: i64,
        answers: &[crate::models::AnswerSelection],
    ) -> Result<TestResult> {
        let path = format!("/api/tests/{}/submit/", test_id);
        let body = serde_json::to_value(TestSubmission { answers })?;
        self.request(&path, RequestOptions::post_json(body)).await
    }

    /// Submit a filled-in answer sheet.
    ///
    /// Fails locally without any network request if a question is unanswered.
    pub async fn submit_answers(&self, sheet: &AnswerSheet) -> Result<TestOutcome> {
        let answers = sheet.collect()?;
        let result = self.submit_test(sheet.test_id(), &answers).await?;
        info!(
            test_id = sheet.test_id(),
            passed = result.passed,
            score = result.score,
            "Test submitted"
        );
        Ok(TestOutcome::from_result(&result))
    }

    // ===== Certificates =====

    /// Fetch the current user's certificates
    pub async fn fetch_certificates(&self) -> Result<Vec<Certificate>> {
        let listing: Listing<Certificate> = self
            .request("/api/certificates/", RequestOptions::get())
            .await
            .context("Failed to fetch certificates")?;
        Ok(listing.into_items())
    }
}
