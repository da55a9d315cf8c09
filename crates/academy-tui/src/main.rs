//! Academy TUI - a terminal user interface for the online academy.
//!
//! This application provides a fast, keyboard-driven interface for browsing
//! courses, studying materials, taking tests and viewing certificates.

mod app;
mod messages;
mod ui;

use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use academy_core::auth;
use academy_core::models::Course;
use academy_core::progress::completion_percentage;
use academy_core::{ApiClient, Config};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name prefix inside the cache directory
const LOG_FILE_NAME: &str = "academy.log";

fn env_filter() -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Logging for the CLI commands goes straight to stderr
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// The TUI owns the terminal, so logs go to a daily file in the cache dir.
/// The returned guard must live until exit or buffered lines are lost.
fn init_file_tracing(config: &Config) -> Result<WorkerGuard> {
    let log_dir = config.cache_dir()?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();
    Ok(guard)
}

fn load_config() -> Config {
    match Config::load_with_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {:#}. Using default settings.", e);
            Config::default()
        }
    }
}

fn open_client(config: &Config) -> Result<ApiClient> {
    let cache_dir = config.cache_dir()?;
    let tokens = auth::open_store(config.token_backend, &cache_dir)?;
    ApiClient::with_timeout(
        &config.base_url,
        tokens,
        Duration::from_secs(config.request_timeout_secs),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = load_config();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if let Some(command) = args.get(1) {
        init_stderr_tracing();
        return match command.as_str() {
            "--verify" => verify_session(&config).await,
            "--logout" => logout(&config).await,
            "--login" => login(config).await,
            "--dump-courses" => dump_courses(&config).await,
            other => {
                eprintln!("Unknown option: {}", other);
                eprintln!("Usage: academy [--verify | --login | --logout | --dump-courses]");
                std::process::exit(2);
            }
        };
    }

    let _log_guard = init_file_tracing(&config)?;
    info!(base_url = %config.base_url, "Academy TUI starting");

    let mut app = App::new(config)?;

    // Credentials from the environment prefill the login form
    if let Ok(username) = std::env::var("ACADEMY_USERNAME") {
        app.login_username = username;
    }
    if let Ok(password) = std::env::var("ACADEMY_PASSWORD") {
        app.login_password = password;
    }

    // Load cached data first (for display behind login)
    app.load_from_cache();

    let authenticated = match app.api.ensure_session().await {
        Ok(valid) => valid,
        Err(e) => {
            warn!(error = %e, "Session check failed");
            false
        }
    };
    if !authenticated {
        app.start_login();
    } else if app.is_cache_stale() {
        app.refresh_all_background();
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        error!(error = %e, "TUI loop failed");
        eprintln!("Error: {}", e);
    }

    info!("Academy TUI shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();
        app.tick(Instant::now());

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// CLI commands
// ============================================================================

/// Print whether the stored session is usable, renewing it if needed
async fn verify_session(config: &Config) -> Result<()> {
    let client = open_client(config)?;
    if client.ensure_session().await? {
        println!("Session valid for {}", client.base_url());
    } else {
        println!("Not logged in. Run with --login first.");
        std::process::exit(1);
    }
    Ok(())
}

async fn logout(config: &Config) -> Result<()> {
    let client = open_client(config)?;
    let acknowledged = client.logout().await.unwrap_or_else(|e| {
        warn!(error = %e, "Server logout failed; local tokens cleared anyway");
        false
    });
    println!(
        "Logged out{}",
        if acknowledged { "" } else { " (locally)" }
    );
    Ok(())
}

/// Log in from the terminal: username on stdin, password without echo
async fn login(mut config: Config) -> Result<()> {
    let client = open_client(&config)?;

    let username = match std::env::var("ACADEMY_USERNAME") {
        Ok(username) => username,
        Err(_) => {
            eprint!("Username: ");
            io::stderr().flush()?;
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read username")?;
            line.trim().to_string()
        }
    };
    let password = match std::env::var("ACADEMY_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    if let Err(e) = client.prime_csrf_cookie().await {
        warn!(error = %e, "Could not fetch CSRF cookie");
    }
    client.login(&username, &password).await?;
    println!("Logged in as {}", username);

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

#[derive(Serialize)]
struct CourseExport {
    #[serde(flatten)]
    course: Course,
    completion_percent: Option<u16>,
}

#[derive(Serialize)]
struct CoursesExport {
    exported_at: chrono::DateTime<chrono::Utc>,
    courses: Vec<CourseExport>,
}

/// Dump all visible courses with the user's completion as JSON on stdout
async fn dump_courses(config: &Config) -> Result<()> {
    let client = open_client(config)?;
    if !client.ensure_session().await? {
        anyhow::bail!("Not logged in. Run with --login first.");
    }

    eprintln!("Fetching courses...");
    let courses = client.fetch_courses().await?;
    eprintln!("Found {} courses", courses.len());

    let progress = futures::future::join_all(
        courses.iter().map(|course| client.fetch_course_progress(course.id)),
    )
    .await;

    let exported: Vec<CourseExport> = courses
        .into_iter()
        .zip(progress)
        .map(|(course, progress)| {
            let completion_percent = match progress {
                Ok(progress) => completion_percentage(progress.completed_items(), course.total_items()),
                Err(e) => {
                    warn!(course_id = course.id, error = %e, "Progress unavailable");
                    None
                }
            };
            CourseExport {
                course,
                completion_percent,
            }
        })
        .collect();

    let output = CoursesExport {
        exported_at: chrono::Utc::now(),
        courses: exported,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
