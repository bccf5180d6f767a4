//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use tasktide_core::models::TaskSortColumn;

use crate::app::{
    can_add_email_char, can_add_name_char, can_add_title_char, App, AppState, SignInFocus, Tab,
    PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::SigningIn => return handle_sign_in_input(app, key).await,
        AppState::Searching => return Ok(handle_search_input(app, key)),
        AppState::AddingTask => return Ok(handle_add_task_input(app, key)),
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
        AppState::Normal | AppState::Quitting => {}
    }

    // Any key clears a stale status message
    app.status_message = None;

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('o') => {
            app.sign_out().await;
            return Ok(false);
        }
        KeyCode::Char('1') => app.current_tab = Tab::Timer,
        KeyCode::Char('2') => app.current_tab = Tab::Tasks,
        KeyCode::Char('3') => app.current_tab = Tab::Cache,
        KeyCode::Left => app.current_tab = app.current_tab.prev(),
        KeyCode::Right | KeyCode::Tab => app.current_tab = app.current_tab.next(),
        _ => match app.current_tab {
            Tab::Timer => handle_timer_keys(app, key),
            Tab::Tasks => handle_task_keys(app, key),
            Tab::Cache => handle_cache_keys(app, key),
        },
    }

    Ok(false)
}

fn handle_timer_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('s') | KeyCode::Enter => {
            if app.timer_state.is_paused {
                app.timer_resume();
            } else {
                app.timer_start();
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => app.timer_pause(),
        KeyCode::Char('x') => app.timer_stop(),
        KeyCode::Char('n') => app.timer_skip(),
        KeyCode::Char('[') => app.adjust_work_duration(false),
        KeyCode::Char(']') => app.adjust_work_duration(true),
        KeyCode::Char('b') => app.toggle_auto_start_breaks(),
        KeyCode::Char('w') => app.toggle_auto_start_work(),
        KeyCode::Char('m') => app.toggle_sound(),
        KeyCode::Char('l') => app.unlink_task(),
        _ => {}
    }
}

fn handle_task_keys(app: &mut App, key: KeyEvent) {
    let len = app.get_sorted_tasks().len();
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.task_selection = app.task_selection.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if app.task_selection + 1 < len {
                app.task_selection += 1;
            }
        }
        KeyCode::PageUp => {
            app.task_selection = app.task_selection.saturating_sub(PAGE_SCROLL_SIZE);
        }
        KeyCode::PageDown => {
            app.task_selection = (app.task_selection + PAGE_SCROLL_SIZE).min(len.saturating_sub(1));
        }
        KeyCode::Home => app.task_selection = 0,
        KeyCode::End => app.task_selection = len.saturating_sub(1),
        KeyCode::Char('/') => {
            app.state = AppState::Searching;
        }
        KeyCode::Esc => {
            app.task_filter.search.clear();
            app.task_selection = 0;
        }
        KeyCode::Char('a') => app.start_adding_task(),
        KeyCode::Char(' ') => app.toggle_selected_task(),
        KeyCode::Char('P') => app.cycle_selected_priority(),
        KeyCode::Char('d') => app.delete_selected_task(),
        KeyCode::Char('f') | KeyCode::Enter => app.focus_selected_task(),
        KeyCode::Char('h') => app.toggle_hide_completed(),
        KeyCode::Char('u') => app.force_refresh_tasks(),
        KeyCode::Char('D') => app.toggle_task_sort(TaskSortColumn::DueDate),
        KeyCode::Char('p') => app.toggle_task_sort(TaskSortColumn::Priority),
        KeyCode::Char('t') => app.toggle_task_sort(TaskSortColumn::Title),
        KeyCode::Char('c') => app.toggle_task_sort(TaskSortColumn::Created),
        _ => {}
    }
}

fn handle_cache_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('e') => app.sweep_cache(),
        KeyCode::Char('C') => app.clear_cache(),
        _ => {}
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.task_filter.search.clear();
        }
        KeyCode::Enter => {
            app.state = AppState::Normal;
            // Keep search query active
        }
        KeyCode::Backspace => {
            app.task_filter.search.pop();
        }
        KeyCode::Char(c) => {
            if can_add_title_char(app.task_filter.search.len(), c) {
                app.task_filter.search.push(c);
            }
            // Reset selection when search changes
            app.task_selection = 0;
        }
        _ => {}
    }
    false
}

fn handle_add_task_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.new_task_title.clear();
            app.state = AppState::Normal;
        }
        KeyCode::Enter => app.submit_new_task(),
        KeyCode::Backspace => {
            app.new_task_title.pop();
        }
        KeyCode::Char(c) => {
            if can_add_title_char(app.new_task_title.len(), c) {
                app.new_task_title.push(c);
            }
        }
        _ => {}
    }
    false
}

async fn handle_sign_in_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on sign-in screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.signin_focus = match app.signin_focus {
                SignInFocus::Email => SignInFocus::Name,
                SignInFocus::Name => SignInFocus::Button,
                SignInFocus::Button => SignInFocus::Email,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.signin_focus = match app.signin_focus {
                SignInFocus::Email => SignInFocus::Button,
                SignInFocus::Name => SignInFocus::Email,
                SignInFocus::Button => SignInFocus::Name,
            };
        }
        KeyCode::Enter => match app.signin_focus {
            SignInFocus::Email => app.signin_focus = SignInFocus::Name,
            SignInFocus::Name => app.signin_focus = SignInFocus::Button,
            // On failure signin_error is set and the overlay stays up
            SignInFocus::Button => app.attempt_sign_in().await,
        },
        KeyCode::Backspace => match app.signin_focus {
            SignInFocus::Email => {
                app.signin_email.pop();
            }
            SignInFocus::Name => {
                app.signin_name.pop();
            }
            SignInFocus::Button => {}
        },
        KeyCode::Char(c) => match app.signin_focus {
            SignInFocus::Email => {
                if can_add_email_char(app.signin_email.len(), c) {
                    app.signin_email.push(c);
                }
            }
            SignInFocus::Name => {
                if can_add_name_char(app.signin_name.len(), c) {
                    app.signin_name.push(c);
                }
            }
            SignInFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}
