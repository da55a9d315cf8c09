//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use tracing::debug;

use crate::app::{
    can_add_comment_char, can_add_password_char, can_add_username_char, App, AppState,
    CourseSection, Focus, LoginFocus, Tab, PAGE_SCROLL_SIZE,
};
use crate::ui::tabs::courses;

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => return handle_login_input(app, key).await,
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        // Blocking alert: any key dismisses it
        AppState::ShowingAlert => {
            app.dismiss_alert();
            return Ok(false);
        }
        AppState::Searching => {
            handle_search_input(app, key);
            return Ok(false);
        }
        AppState::Commenting => {
            handle_comment_input(app, key).await;
            return Ok(false);
        }
        AppState::TakingTest => {
            handle_test_runner_input(app, key).await;
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char('1') => app.switch_tab(Tab::Courses),
        KeyCode::Char('2') => app.switch_tab(Tab::Materials),
        KeyCode::Char('3') => app.switch_tab(Tab::Tests),
        KeyCode::Char('4') => app.switch_tab(Tab::Certificates),
        KeyCode::Left => app.switch_tab(app.current_tab.prev()),
        KeyCode::Right => app.switch_tab(app.current_tab.next()),
        KeyCode::Char('u') => {
            if !app.refreshing {
                app.refresh_all_background();
                app.ensure_course_content();
            }
        }
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('L') => app.logout().await,
        KeyCode::Tab => {
            // Toggle focus between list and detail panels
            app.focus = match app.focus {
                Focus::List => Focus::Detail,
                Focus::Detail => Focus::List,
            };
        }
        KeyCode::Esc => {
            if app.focus == Focus::Detail {
                app.focus = Focus::List;
            } else if !app.course_filter.is_empty() {
                app.cancel_search();
            }
        }
        _ => match app.current_tab {
            Tab::Courses => handle_courses_input(app, key).await,
            Tab::Materials => handle_materials_input(app, key).await,
            Tab::Tests => handle_tests_input(app, key).await,
            Tab::Certificates => handle_certificates_input(app, key),
        },
    }

    Ok(false)
}

/// New list position for a navigation key, or None if the key doesn't move
fn navigate(current: usize, len: usize, code: KeyCode) -> Option<usize> {
    let max_index = len.saturating_sub(1);
    match code {
        KeyCode::Char('j') | KeyCode::Down => Some((current + 1).min(max_index)),
        KeyCode::Char('k') | KeyCode::Up => Some(current.saturating_sub(1)),
        KeyCode::Home => Some(0),
        KeyCode::End => Some(max_index),
        KeyCode::PageDown => Some((current + PAGE_SCROLL_SIZE).min(max_index)),
        KeyCode::PageUp => Some(current.saturating_sub(PAGE_SCROLL_SIZE)),
        _ => None,
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Enter => {
            if !app.submit_search(Instant::now()) {
                debug!("Blank search refused");
            }
        }
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char(c) => {
            app.search_input.push(c);
        }
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Username,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Username,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            // Enter in the password field submits, like a form
            LoginFocus::Password | LoginFocus::Button => {
                // Failure lands in login_error
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.chars().count(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

async fn handle_comment_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.comment_draft.clear();
            app.reply_to = None;
            app.state = AppState::Normal;
        }
        KeyCode::Enter => app.submit_comment().await,
        KeyCode::Backspace => {
            app.comment_draft.pop();
        }
        KeyCode::Char(c) => {
            if can_add_comment_char(app.comment_draft.chars().count(), c) {
                app.comment_draft.push(c);
            }
        }
        _ => {}
    }
}

async fn handle_test_runner_input(app: &mut App, key: KeyEvent) {
    let Some(run) = app.test_run.as_mut() else {
        app.state = AppState::Normal;
        return;
    };

    // Once the result is shown only closing is left
    if run.outcome.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.close_test();
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.close_test(),
        KeyCode::Char('j') | KeyCode::Down => run.move_cursor(true),
        KeyCode::Char('k') | KeyCode::Up => run.move_cursor(false),
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let Err(e) = run.select_current() {
                debug!(error = %e, "Answer not recorded");
            }
        }
        KeyCode::Left | KeyCode::Char('h') => run.prev_question(),
        KeyCode::Right | KeyCode::Char('l') => run.next_question(),
        KeyCode::Char('s') => app.submit_test().await,
        _ => {}
    }
}

async fn handle_courses_input(app: &mut App, key: KeyEvent) {
    let section = match key.code {
        KeyCode::Char('O') => Some(CourseSection::Overview),
        KeyCode::Char('M') => Some(CourseSection::Materials),
        KeyCode::Char('T') => Some(CourseSection::Tests),
        _ => None,
    };
    if let Some(section) = section {
        let tops = app
            .selected_course()
            .map(|course| courses::detail_lines(app, course).1)
            .unwrap_or_default();
        app.jump_to_section(&tops, section);
        app.focus = Focus::Detail;
        return;
    }

    if key.code == KeyCode::Char('e') {
        app.enroll_selected().await;
        return;
    }

    if app.focus == Focus::Detail {
        let line_count = app
            .selected_course()
            .map(|course| courses::detail_lines(app, course).0.len())
            .unwrap_or(0);
        if let Some(scroll) = navigate(app.course_scroll as usize, line_count, key.code) {
            app.course_scroll = u16::try_from(scroll).unwrap_or(u16::MAX);
        }
        return;
    }

    let len = app.filtered_courses().len();
    if let Some(index) = navigate(app.course_selection, len, key.code) {
        app.select_course(index);
        app.ensure_course_content();
    } else if key.code == KeyCode::Enter {
        app.switch_tab(Tab::Materials);
    }
}

async fn handle_materials_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('c') => {
            app.mark_selected_material_completed().await;
            return;
        }
        KeyCode::Char('n') => {
            app.start_comment(false);
            return;
        }
        KeyCode::Char('r') => {
            app.start_comment(true);
            return;
        }
        _ => {}
    }

    if app.focus == Focus::Detail {
        let len = app.selected_comments().len();
        if let Some(index) = navigate(app.comment_selection, len, key.code) {
            app.comment_selection = index;
        }
        return;
    }

    let len = app.selected_materials().len();
    if let Some(index) = navigate(app.material_selection, len, key.code) {
        app.select_material(index);
    }
}

async fn handle_tests_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        app.start_selected_test().await;
        return;
    }

    let len = app.selected_tests().len();
    if let Some(index) = navigate(app.test_selection, len, key.code) {
        app.test_selection = index;
    }
}

fn handle_certificates_input(app: &mut App, key: KeyEvent) {
    let len = app.certificates.len();
    if let Some(index) = navigate(app.certificate_selection, len, key.code) {
        app.certificate_selection = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_bounds() {
        assert_eq!(navigate(0, 5, KeyCode::Down), Some(1));
        assert_eq!(navigate(4, 5, KeyCode::Down), Some(4));
        assert_eq!(navigate(0, 5, KeyCode::Up), Some(0));
        assert_eq!(navigate(2, 30, KeyCode::PageDown), Some(12));
        assert_eq!(navigate(25, 30, KeyCode::PageDown), Some(29));
        assert_eq!(navigate(3, 30, KeyCode::PageUp), Some(0));
        assert_eq!(navigate(3, 30, KeyCode::End), Some(29));
        assert_eq!(navigate(3, 0, KeyCode::Down), Some(0));
        assert_eq!(navigate(3, 30, KeyCode::Char('x')), None);
    }
}
