//! Application state management for the academy terminal client.
//!
//! This module contains the core `App` struct that manages all application state,
//! including UI state, cached data, the API client and background task coordination.
//! List refreshes run in spawned tasks and report back through an mpsc channel;
//! direct user actions (login, logout, submitting a test or comment) are awaited
//! from the input handler.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use academy_core::api::{requires_login, ApiError};
use academy_core::auth;
use academy_core::cache::CacheManager;
use academy_core::config::Config;
use academy_core::models::{
    Certificate, Comment, Course, Material, NewComment, Question, Test, TestSummary, UserProgress,
};
use academy_core::progress::{animated_percent, animation_finished, completion_percentage};
use academy_core::quiz::{certificate_path, AnswerSheet, QuizError, TestOutcome};
use academy_core::{ApiClient, AuthState};

use crate::messages::Messages;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for username input (Django's username limit).
const MAX_USERNAME_LENGTH: usize = 150;

/// Maximum length for password input.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for a comment draft.
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Maximum concurrent progress requests during a refresh.
const MAX_CONCURRENT_REQUESTS: usize = 5;

/// Status messages disappear after this long.
pub const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(5);

/// How long an empty search submit keeps the input flagged invalid.
pub const SEARCH_INVALID_DURATION: Duration = Duration::from_secs(3);

/// A section counts as active once its top is within this many lines
/// below the scroll offset.
pub const ACTIVE_SECTION_THRESHOLD: u16 = 4;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Courses,
    Materials,
    Tests,
    Certificates,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Courses => "Courses",
            Tab::Materials => "Materials",
            Tab::Tests => "Tests",
            Tab::Certificates => "Certificates",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Courses => Tab::Materials,
            Tab::Materials => Tab::Tests,
            Tab::Tests => Tab::Certificates,
            Tab::Certificates => Tab::Courses,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Courses => Tab::Certificates,
            Tab::Materials => Tab::Courses,
            Tab::Tests => Tab::Materials,
            Tab::Certificates => Tab::Tests,
        }
    }
}

/// Sections of the course detail panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseSection {
    Overview,
    Materials,
    Tests,
}

impl CourseSection {
    pub fn title(&self) -> &'static str {
        match self {
            CourseSection::Overview => "Overview",
            CourseSection::Materials => "Materials",
            CourseSection::Tests => "Tests",
        }
    }
}

/// The last section whose top line is at or above `scroll + ACTIVE_SECTION_THRESHOLD`.
pub fn active_section(tops: &[(CourseSection, u16)], scroll: u16) -> Option<CourseSection> {
    let limit = scroll.saturating_add(ACTIVE_SECTION_THRESHOLD);
    tops.iter()
        .filter(|(_, top)| *top <= limit)
        .last()
        .map(|(section, _)| *section)
}

/// Current UI focus area (list panel or detail panel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Detail,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    LoggingIn,
    Commenting,
    TakingTest,
    /// Blocking alert over the test runner; any key dismisses it
    ShowingAlert,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

/// Transient message in the status bar
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub shown_at: Instant,
}

impl StatusMessage {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= STATUS_MESSAGE_TTL
    }
}

/// A test being taken: the loaded questions, the answer sheet and the cursor.
#[derive(Debug, Clone)]
pub struct TestRun {
    pub test: Test,
    pub sheet: AnswerSheet,
    pub question: usize,
    pub cursor: usize,
    /// Pass/fail block shown after a submission that issued no certificate
    pub outcome: Option<TestOutcome>,
}

impl TestRun {
    pub fn new(test: Test) -> Self {
        let sheet = AnswerSheet::new(&test);
        Self {
            test,
            sheet,
            question: 0,
            cursor: 0,
            outcome: None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.test.questions.get(self.question)
    }

    pub fn next_question(&mut self) {
        if self.question + 1 < self.test.questions.len() {
            self.question += 1;
            self.cursor = self.cursor_for_current();
        }
    }

    pub fn prev_question(&mut self) {
        if self.question > 0 {
            self.question -= 1;
            self.cursor = self.cursor_for_current();
        }
    }

    pub fn go_to_question(&mut self, index: usize) {
        if index < self.test.questions.len() {
            self.question = index;
            self.cursor = self.cursor_for_current();
        }
    }

    pub fn move_cursor(&mut self, down: bool) {
        let count = self.current_question().map(|q| q.answers.len()).unwrap_or(0);
        if count == 0 {
            return;
        }
        self.cursor = if down {
            (self.cursor + 1).min(count - 1)
        } else {
            self.cursor.saturating_sub(1)
        };
    }

    /// Select the answer under the cursor for the current question.
    pub fn select_current(&mut self) -> Result<(), QuizError> {
        let Some(question) = self.current_question() else {
            return Ok(());
        };
        let question_id = question.id;
        let Some(answer) = question.answers.get(self.cursor) else {
            return Ok(());
        };
        let answer_id = answer.id;
        self.sheet.select(question_id, answer_id)
    }

    /// Cursor position of the selected answer, or the top when unanswered
    fn cursor_for_current(&self) -> usize {
        self.current_question()
            .and_then(|q| {
                let selected = self.sheet.selected(q.id)?;
                q.answers.iter().position(|a| a.id == selected)
            })
            .unwrap_or(0)
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from background fetch tasks back to the main loop.
enum RefreshResult {
    Courses(Vec<Course>),
    Certificates(Vec<Certificate>),
    /// Progress for one course
    Progress(UserProgress),
    /// Materials and tests of one course (course_id, materials, tests)
    CourseContent(i64, Vec<Material>, Vec<TestSummary>),
    /// Comments of one material (material_id, comments)
    Comments(i64, Vec<Comment>),
    /// Signal that all refresh tasks have completed
    RefreshComplete,
    /// An error occurred during refresh
    Error(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub api: ApiClient,
    pub cache: CacheManager,
    pub messages: &'static Messages,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub focus: Focus,

    // Search
    pub search_input: String,
    pub course_filter: String,
    search_invalid_since: Option<Instant>,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Selection indices and scroll
    pub course_selection: usize,
    pub course_scroll: u16,
    pub material_selection: usize,
    pub comment_selection: usize,
    pub test_selection: usize,
    pub certificate_selection: usize,

    // Comment composer
    pub comment_draft: String,
    pub reply_to: Option<i64>,

    // Test runner
    pub test_run: Option<TestRun>,
    pub alert: Option<String>,

    // Data
    pub courses: Vec<Course>,
    pub certificates: Vec<Certificate>,
    pub progress: HashMap<i64, UserProgress>,
    pub materials: HashMap<i64, Vec<Material>>,
    pub tests: HashMap<i64, Vec<TestSummary>>,
    pub comments: HashMap<i64, Vec<Comment>>,

    /// When each course's progress gauge started animating
    progress_animation: HashMap<i64, Instant>,
    /// Course content requests in flight, to avoid duplicate fetches
    content_requested: HashSet<i64>,
    comments_requested: HashSet<i64>,
    /// Certificate to select once the certificate list arrives
    pending_certificate: Option<String>,

    // Background task channel
    refresh_rx: mpsc::Receiver<RefreshResult>,
    refresh_tx: mpsc::Sender<RefreshResult>,
    auth_rx: watch::Receiver<AuthState>,

    pub status: Option<StatusMessage>,
    pub refreshing: bool,
    pub last_updated: Option<String>,
}

impl App {
    /// Create the application from config: opens the token store, the API
    /// client and the cache for the configured backend.
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        debug!(?cache_dir, "Cache directory configured");

        let tokens = auth::open_store(config.token_backend, &cache_dir)?;
        let api = ApiClient::with_timeout(
            &config.base_url,
            tokens,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let cache = CacheManager::new(cache_dir)?;

        Ok(Self::with_parts(config, api, cache))
    }

    pub fn with_parts(config: Config, api: ApiClient, cache: CacheManager) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let auth_rx = api.subscribe();
        let messages = Messages::for_language(config.language);
        let login_username = config.last_username.clone().unwrap_or_default();

        Self {
            config,
            api,
            cache,
            messages,

            state: AppState::Normal,
            current_tab: Tab::Courses,
            focus: Focus::List,

            search_input: String::new(),
            course_filter: String::new(),
            search_invalid_since: None,

            login_username,
            login_password: String::new(),
            login_focus: LoginFocus::Username,
            login_error: None,

            course_selection: 0,
            course_scroll: 0,
            material_selection: 0,
            comment_selection: 0,
            test_selection: 0,
            certificate_selection: 0,

            comment_draft: String::new(),
            reply_to: None,

            test_run: None,
            alert: None,

            courses: Vec::new(),
            certificates: Vec::new(),
            progress: HashMap::new(),
            materials: HashMap::new(),
            tests: HashMap::new(),
            comments: HashMap::new(),

            progress_animation: HashMap::new(),
            content_requested: HashSet::new(),
            comments_requested: HashSet::new(),
            pending_certificate: None,

            refresh_rx: rx,
            refresh_tx: tx,
            auth_rx,

            status: None,
            refreshing: false,
            last_updated: None,
        }
    }

    // =========================================================================
    // Status line
    // =========================================================================

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
            shown_at: Instant::now(),
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
            shown_at: Instant::now(),
        });
    }

    /// Report a failed action. Session loss is handled by the auth watch,
    /// so only other failures reach the status line.
    fn report_error(&mut self, action: &str, e: &anyhow::Error) {
        error!(error = %e, action, "Action failed");
        if requires_login(e) {
            return;
        }
        let text = match e.downcast_ref::<ApiError>() {
            Some(ApiError::Network(_)) => self.messages.connection_failed.to_string(),
            _ => format!("{}: {}", action, e),
        };
        self.set_error(text);
    }

    /// Periodic housekeeping: expire the status line, react to session loss
    /// and start progress animations for courses that came into view.
    pub fn tick(&mut self, now: Instant) {
        if self.status.as_ref().is_some_and(|s| s.is_expired(now)) {
            self.status = None;
        }

        if self.auth_rx.has_changed().unwrap_or(false) {
            let state = *self.auth_rx.borrow_and_update();
            debug!(?state, "Auth state changed");
            if state == AuthState::LoginRequired && self.state != AppState::LoggingIn {
                self.test_run = None;
                self.start_login();
                self.login_error = Some(self.messages.session_expired.to_string());
            }
        }

        if self.current_tab == Tab::Courses {
            if let Some(course_id) = self.selected_course().map(|c| c.id) {
                if self.progress.contains_key(&course_id) {
                    self.progress_animation.entry(course_id).or_insert(now);
                }
            }
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let username = self.login_username.trim().to_string();
        let password = self.login_password.clone();

        if username.is_empty() || password.is_empty() {
            self.login_error = Some(self.messages.credentials_required.to_string());
            return Err(anyhow::anyhow!("Username and password required"));
        }

        self.login_error = None;

        if self.api.csrf_token().is_none() {
            if let Err(e) = self.api.prime_csrf_cookie().await {
                debug!(error = %e, "Could not fetch CSRF cookie");
            }
        }

        match self.api.login(&username, &password).await {
            Ok(_) => {
                self.config.last_username = Some(username);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                // The login itself moved the auth state; don't treat it as news
                let _ = self.auth_rx.borrow_and_update();
                self.login_password.clear();
                self.state = AppState::Normal;
                self.current_tab = Tab::Courses;
                self.focus = Focus::List;
                self.refresh_all_background();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                let message = match e.downcast_ref::<ApiError>() {
                    Some(ApiError::LoginFailed(_)) => self.messages.login_failed.to_string(),
                    Some(ApiError::Network(_)) => self.messages.connection_failed.to_string(),
                    _ => format!("{}: {}", self.messages.login_failed, e),
                };
                self.login_error = Some(message);
                Err(e)
            }
        }
    }

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Log out on the server, drop local tokens and cached data, and go back
    /// to the login screen. Local state is cleared whatever the server says.
    pub async fn logout(&mut self) {
        match self.api.logout().await {
            Ok(acknowledged) => {
                debug!(acknowledged, "Logout finished");
            }
            Err(e) => {
                error!(error = %e, "Logout failed");
            }
        }
        let _ = self.auth_rx.borrow_and_update();

        if let Err(e) = self.cache.clear() {
            warn!(error = %e, "Failed to clear cache on logout");
        }
        self.clear_data();
        self.start_login();
        self.set_status(self.messages.logged_out);
    }

    fn clear_data(&mut self) {
        self.courses.clear();
        self.certificates.clear();
        self.progress.clear();
        self.materials.clear();
        self.tests.clear();
        self.comments.clear();
        self.progress_animation.clear();
        self.content_requested.clear();
        self.comments_requested.clear();
        self.test_run = None;
        self.course_selection = 0;
        self.material_selection = 0;
        self.test_selection = 0;
        self.certificate_selection = 0;
        self.current_tab = Tab::Courses;
        self.last_updated = None;
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Load last-known data from the offline cache
    pub fn load_from_cache(&mut self) {
        if let Ok(Some(cached)) = self.cache.load_courses() {
            self.courses = cached.data;
        }
        if let Ok(Some(cached)) = self.cache.load_certificates() {
            self.certificates = cached.data;
        }
        for course in &self.courses {
            if let Ok(Some(cached)) = self.cache.load_progress(course.id) {
                self.progress.insert(course.id, cached.data);
            }
            if let Ok(Some(cached)) = self.cache.load_materials(course.id) {
                self.materials.insert(course.id, cached.data);
            }
        }
        self.last_updated = self.cache.courses_age();
    }

    pub fn is_cache_stale(&self) -> bool {
        self.cache.is_stale()
    }

    // =========================================================================
    // Background Data Refresh
    // =========================================================================

    /// Spawn a background task to refresh courses, certificates and progress
    pub fn refresh_all_background(&mut self) {
        info!("Starting background refresh");
        let api = self.api.clone();
        let tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            Self::execute_background_refresh(api, tx).await;
        });

        self.refreshing = true;
        self.content_requested.clear();
        self.comments_requested.clear();
        self.set_status(self.messages.refreshing);
    }

    async fn send_result(tx: &mpsc::Sender<RefreshResult>, result: RefreshResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send refresh result - channel closed");
        }
    }

    async fn execute_background_refresh(api: ApiClient, tx: mpsc::Sender<RefreshResult>) {
        let (courses_res, certificates_res) =
            tokio::join!(api.fetch_courses(), api.fetch_certificates());

        let course_ids: Vec<i64> = match courses_res {
            Ok(courses) => {
                let ids = courses.iter().map(|c| c.id).collect();
                Self::send_result(&tx, RefreshResult::Courses(courses)).await;
                ids
            }
            Err(e) => {
                Self::send_result(&tx, RefreshResult::Error(format!("Courses: {}", e))).await;
                Vec::new()
            }
        };

        match certificates_res {
            Ok(certificates) => {
                Self::send_result(&tx, RefreshResult::Certificates(certificates)).await;
            }
            Err(e) => {
                debug!(error = %e, "Certificates fetch failed");
            }
        }

        let api_ref = &api;
        stream::iter(course_ids)
            .map(|id| async move { (id, api_ref.fetch_course_progress(id).await) })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .for_each(|(id, result)| {
                let tx = tx.clone();
                async move {
                    match result {
                        Ok(progress) => {
                            Self::send_result(&tx, RefreshResult::Progress(progress)).await;
                        }
                        Err(e) => {
                            debug!(course_id = id, error = %e, "Progress fetch failed");
                        }
                    }
                }
            })
            .await;

        info!("Background refresh complete");
        Self::send_result(&tx, RefreshResult::RefreshComplete).await;
    }

    /// Fetch materials and tests of the selected course unless already loaded
    pub fn ensure_course_content(&mut self) {
        let Some(course_id) = self.selected_course().map(|c| c.id) else {
            return;
        };
        if self.tests.contains_key(&course_id) || !self.content_requested.insert(course_id) {
            return;
        }

        let api = self.api.clone();
        let tx = self.refresh_tx.clone();
        tokio::spawn(async move {
            let (materials, tests) =
                tokio::join!(api.fetch_materials(course_id), api.fetch_tests(course_id));
            match (materials, tests) {
                (Ok(materials), Ok(tests)) => {
                    Self::send_result(&tx, RefreshResult::CourseContent(course_id, materials, tests))
                        .await
                }
                (Err(e), _) | (_, Err(e)) => {
                    Self::send_result(&tx, RefreshResult::Error(format!("Course content: {}", e)))
                        .await
                }
            }
        });
    }

    /// Fetch comments of the selected material unless already loaded
    pub fn ensure_comments(&mut self) {
        let Some(material_id) = self.selected_material().map(|m| m.id) else {
            return;
        };
        if self.comments.contains_key(&material_id) || !self.comments_requested.insert(material_id)
        {
            return;
        }
        self.spawn_comments_fetch(material_id);
    }

    fn spawn_comments_fetch(&self, material_id: i64) {
        let api = self.api.clone();
        let tx = self.refresh_tx.clone();
        tokio::spawn(async move {
            match api.fetch_comments(material_id).await {
                Ok(comments) => {
                    Self::send_result(&tx, RefreshResult::Comments(material_id, comments)).await
                }
                Err(e) => {
                    Self::send_result(&tx, RefreshResult::Error(format!("Comments: {}", e))).await
                }
            }
        });
    }

    fn spawn_certificates_fetch(&self) {
        let api = self.api.clone();
        let tx = self.refresh_tx.clone();
        tokio::spawn(async move {
            match api.fetch_certificates().await {
                Ok(certificates) => {
                    Self::send_result(&tx, RefreshResult::Certificates(certificates)).await
                }
                Err(e) => {
                    Self::send_result(&tx, RefreshResult::Error(format!("Certificates: {}", e)))
                        .await
                }
            }
        });
    }

    /// Check for completed background tasks and process results
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.refresh_rx.try_recv() {
            self.process_refresh_result(result);
        }
    }

    fn process_refresh_result(&mut self, result: RefreshResult) {
        match result {
            RefreshResult::Courses(data) => {
                if let Err(e) = self.cache.save_courses(&data) {
                    warn!(error = %e, "Failed to cache courses");
                }
                self.courses = data;
                self.clamp_selections();
                self.last_updated = self.cache.courses_age();
            }
            RefreshResult::Certificates(data) => {
                if let Err(e) = self.cache.save_certificates(&data) {
                    warn!(error = %e, "Failed to cache certificates");
                }
                self.certificates = data;
                if let Some(id) = self.pending_certificate.take() {
                    match self.certificates.iter().position(|c| c.certificate_id == id) {
                        Some(index) => self.certificate_selection = index,
                        None => self.pending_certificate = Some(id),
                    }
                }
                self.clamp_selections();
            }
            RefreshResult::Progress(progress) => {
                if let Err(e) = self.cache.save_progress(&progress) {
                    warn!(error = %e, "Failed to cache progress");
                }
                self.progress.insert(progress.course, progress);
            }
            RefreshResult::CourseContent(course_id, materials, tests) => {
                for material in materials.iter().filter(|m| m.is_video()) {
                    debug!(material_id = material.id, file = ?material.file, "Video material loaded");
                }
                if let Err(e) = self.cache.save_materials(course_id, &materials) {
                    warn!(error = %e, "Failed to cache materials");
                }
                self.content_requested.remove(&course_id);
                self.materials.insert(course_id, materials);
                self.tests.insert(course_id, tests);
                self.clamp_selections();
            }
            RefreshResult::Comments(material_id, comments) => {
                self.comments_requested.remove(&material_id);
                self.comments.insert(material_id, comments);
            }
            RefreshResult::RefreshComplete => {
                self.refreshing = false;
                if self.status.as_ref().is_some_and(|s| !s.is_error) {
                    self.status = None;
                }
            }
            RefreshResult::Error(message) => {
                self.set_error(message);
            }
        }
    }

    fn clamp_selections(&mut self) {
        let courses = self.filtered_courses().len();
        self.course_selection = self.course_selection.min(courses.saturating_sub(1));
        let materials = self.selected_materials().len();
        self.material_selection = self.material_selection.min(materials.saturating_sub(1));
        let tests = self.selected_tests().len();
        self.test_selection = self.test_selection.min(tests.saturating_sub(1));
        self.certificate_selection = self
            .certificate_selection
            .min(self.certificates.len().saturating_sub(1));
    }

    // =========================================================================
    // Selection helpers
    // =========================================================================

    /// Courses matching the active search filter
    pub fn filtered_courses(&self) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|c| c.matches_search(&self.course_filter))
            .collect()
    }

    pub fn selected_course(&self) -> Option<&Course> {
        self.filtered_courses().get(self.course_selection).copied()
    }

    pub fn selected_materials(&self) -> &[Material] {
        self.selected_course()
            .and_then(|c| self.materials.get(&c.id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn selected_material(&self) -> Option<&Material> {
        self.selected_materials().get(self.material_selection)
    }

    pub fn selected_tests(&self) -> &[TestSummary] {
        self.selected_course()
            .and_then(|c| self.tests.get(&c.id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn selected_test(&self) -> Option<&TestSummary> {
        self.selected_tests().get(self.test_selection)
    }

    /// Comments of the selected material, flattened with nesting depth
    pub fn selected_comments(&self) -> Vec<(usize, &Comment)> {
        self.selected_material()
            .and_then(|m| self.comments.get(&m.id))
            .map(|comments| Comment::flatten(comments))
            .unwrap_or_default()
    }

    pub fn selected_certificate(&self) -> Option<&Certificate> {
        self.certificates.get(self.certificate_selection)
    }

    pub fn course_progress(&self, course_id: i64) -> Option<&UserProgress> {
        self.progress.get(&course_id)
    }

    /// Completion percentage of a course, or None when it has no items or
    /// no progress is known
    pub fn course_percentage(&self, course: &Course) -> Option<u16> {
        let progress = self.progress.get(&course.id)?;
        completion_percentage(progress.completed_items(), course.total_items())
    }

    /// Percentage to draw right now, following the gauge animation
    pub fn displayed_percentage(&self, course: &Course, now: Instant) -> Option<u16> {
        let target = self.course_percentage(course)?;
        Some(match self.progress_animation.get(&course.id) {
            Some(started) => animated_percent(target, now.saturating_duration_since(*started)),
            None => 0,
        })
    }

    /// True while any gauge animation is still running
    pub fn is_animating(&self, now: Instant) -> bool {
        self.progress_animation
            .values()
            .any(|started| !animation_finished(now.saturating_duration_since(*started)))
    }

    /// Web URL of a certificate page
    pub fn certificate_url(&self, certificate_id: &str) -> String {
        let path = certificate_path(certificate_id);
        self.api
            .base_url()
            .join(&path)
            .map(|url| url.to_string())
            .unwrap_or(path)
    }

    pub fn select_course(&mut self, index: usize) {
        if index != self.course_selection {
            self.course_selection = index;
            self.course_scroll = 0;
            self.material_selection = 0;
            self.test_selection = 0;
            self.comment_selection = 0;
        }
    }

    pub fn select_material(&mut self, index: usize) {
        if index != self.material_selection {
            self.material_selection = index;
            self.comment_selection = 0;
        }
        self.ensure_comments();
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.current_tab = tab;
        self.focus = Focus::List;
        match tab {
            Tab::Materials => {
                self.ensure_course_content();
                self.ensure_comments();
            }
            Tab::Tests => self.ensure_course_content(),
            Tab::Courses | Tab::Certificates => {}
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    pub fn start_search(&mut self) {
        self.state = AppState::Searching;
        self.search_input = self.course_filter.clone();
    }

    /// Submitting is disabled while the query is blank
    pub fn can_submit_search(&self) -> bool {
        !self.search_input.trim().is_empty()
    }

    /// Apply the search query. A blank query is refused and flags the input
    /// invalid for a few seconds.
    pub fn submit_search(&mut self, now: Instant) -> bool {
        if !self.can_submit_search() {
            self.search_invalid_since = Some(now);
            return false;
        }
        self.course_filter = self.search_input.trim().to_string();
        self.state = AppState::Normal;
        self.current_tab = Tab::Courses;
        self.select_course(0);
        true
    }

    pub fn cancel_search(&mut self) {
        self.state = AppState::Normal;
        self.search_input.clear();
        self.course_filter.clear();
        self.search_invalid_since = None;
    }

    pub fn is_search_invalid(&self, now: Instant) -> bool {
        self.search_invalid_since
            .is_some_and(|since| now.saturating_duration_since(since) < SEARCH_INVALID_DURATION)
    }

    // =========================================================================
    // Course actions
    // =========================================================================

    pub async fn enroll_selected(&mut self) {
        let Some(course_id) = self.selected_course().map(|c| c.id) else {
            return;
        };
        match self.api.enroll(course_id).await {
            Ok(detail) => {
                info!(course_id, "Enrolled in course");
                self.set_status(detail);
            }
            Err(e) => self.report_error("Enroll", &e),
        }
    }

    /// Scroll the course detail panel so `section` starts at the top
    pub fn jump_to_section(&mut self, tops: &[(CourseSection, u16)], section: CourseSection) {
        if let Some((_, top)) = tops.iter().find(|(s, _)| *s == section) {
            self.course_scroll = *top;
        }
    }

    // =========================================================================
    // Material actions
    // =========================================================================

    pub async fn mark_selected_material_completed(&mut self) {
        let Some(course_id) = self.selected_course().map(|c| c.id) else {
            return;
        };
        let Some(material_id) = self.selected_material().map(|m| m.id) else {
            return;
        };

        match self.api.mark_material_completed(material_id).await {
            Ok(true) => {
                let progress = self.progress.entry(course_id).or_insert_with(|| UserProgress {
                    course: course_id,
                    ..Default::default()
                });
                if !progress.has_completed_material(material_id) {
                    progress.materials_completed.push(material_id);
                    progress.materials_completed_count += 1;
                }
                self.set_status(self.messages.material_completed);
            }
            Ok(false) => {
                debug!(material_id, "Mark completed returned no detail");
            }
            Err(e) => self.report_error("Mark completed", &e),
        }
    }

    /// Open the comment composer, optionally as a reply to the selected comment
    pub fn start_comment(&mut self, reply: bool) {
        if self.selected_material().is_none() {
            return;
        }
        self.reply_to = if reply {
            self.selected_comments()
                .get(self.comment_selection)
                .map(|(_, c)| c.id)
        } else {
            None
        };
        self.comment_draft.clear();
        self.state = AppState::Commenting;
    }

    pub async fn submit_comment(&mut self) {
        let Some(material_id) = self.selected_material().map(|m| m.id) else {
            self.state = AppState::Normal;
            return;
        };
        let content = self.comment_draft.trim().to_string();
        if content.is_empty() {
            self.set_error(self.messages.comment_empty);
            return;
        }

        let comment = NewComment {
            material: material_id,
            content,
            parent: self.reply_to,
        };
        match self.api.post_comment(&comment).await {
            Ok(posted) => {
                info!(comment_id = posted.id, material_id, "Comment posted");
                self.comment_draft.clear();
                self.reply_to = None;
                self.state = AppState::Normal;
                self.set_status(self.messages.comment_posted);
                self.spawn_comments_fetch(material_id);
            }
            Err(e) => self.report_error("Comment", &e),
        }
    }

    // =========================================================================
    // Tests
    // =========================================================================

    pub async fn start_selected_test(&mut self) {
        let Some(test_id) = self.selected_test().map(|t| t.id) else {
            return;
        };
        match self.api.fetch_test(test_id).await {
            Ok(test) => {
                debug!(test_id, questions = test.questions.len(), "Test loaded");
                self.test_run = Some(TestRun::new(test));
                self.state = AppState::TakingTest;
            }
            Err(e) => self.report_error("Load test", &e),
        }
    }

    /// Submit the running test.
    ///
    /// With unanswered questions this raises the blocking alert and jumps to
    /// the first unanswered question without touching the network.
    pub async fn submit_test(&mut self) {
        let Some(run) = self.test_run.as_mut() else {
            return;
        };

        if let Some(index) = run.sheet.first_unanswered() {
            run.go_to_question(index);
            self.alert = Some(self.messages.answer_all_questions.to_string());
            self.state = AppState::ShowingAlert;
            return;
        }

        let sheet = run.sheet.clone();
        match self.api.submit_answers(&sheet).await {
            Ok(TestOutcome::Certificate { certificate_id }) => {
                self.open_certificate(certificate_id);
            }
            Ok(outcome) => {
                if let Some(run) = self.test_run.as_mut() {
                    run.outcome = Some(outcome);
                }
            }
            Err(e) => match e.downcast_ref::<QuizError>() {
                Some(quiz_err) => {
                    self.alert = Some(format!("{} ({})", self.messages.answer_all_questions, quiz_err));
                    self.state = AppState::ShowingAlert;
                }
                None => self.report_error("Submit test", &e),
            },
        }
    }

    /// Leave the test runner for the certificate view
    fn open_certificate(&mut self, certificate_id: String) {
        info!(certificate_id = %certificate_id, "Certificate issued");
        let url = self.certificate_url(&certificate_id);
        self.test_run = None;
        self.state = AppState::Normal;
        self.current_tab = Tab::Certificates;
        self.focus = Focus::Detail;
        match self
            .certificates
            .iter()
            .position(|c| c.certificate_id == certificate_id)
        {
            Some(index) => self.certificate_selection = index,
            None => self.pending_certificate = Some(certificate_id),
        }
        self.set_status(format!("{}: {}", self.messages.certificate_issued, url));
        self.spawn_certificates_fetch();
    }

    pub fn close_test(&mut self) {
        let finished = self
            .test_run
            .as_ref()
            .is_some_and(|run| run.outcome.is_some());
        self.test_run = None;
        self.state = AppState::Normal;
        if finished {
            self.refresh_all_background();
        }
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
        self.state = if self.test_run.is_some() {
            AppState::TakingTest
        } else {
            AppState::Normal
        };
    }
}

// ============================================================================
// Input Validation
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

pub fn can_add_comment_char(current_len: usize, c: char) -> bool {
    current_len < MAX_COMMENT_LENGTH && is_valid_input_char(c)
}
