//! TUI application state and main event loop

use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use futures::StreamExt;
use ratatui::DefaultTerminal;

use super::backend::{Backend, BackendCommand, BackendContext, BackendResponse};
use super::ui;
use crate::auth::AuthState;
use crate::models::IdentitySummary;
use crate::views::ApiPanel;

/// Lines moved by PgUp/PgDn.
const PAGE_SIZE: u16 = 10;

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_exit: bool,
    pub auth: AuthState,
    pub api: ApiPanel,
    pub show_help: bool,
    /// Dashboard scroll offset in lines
    pub scroll: u16,
    pub status_message: Option<String>,
    pub status_is_error: bool,
    /// Protected API endpoint, shown in the status bar
    pub endpoint: String,
}

impl App {
    pub fn new(auth: AuthState, endpoint: String) -> Self {
        Self {
            should_exit: false,
            auth,
            api: ApiPanel::default(),
            show_help: false,
            scroll: 0,
            status_message: None,
            status_is_error: false,
            endpoint,
        }
    }

    fn set_status(&mut self, msg: impl Into<String>, is_error: bool) {
        self.status_message = Some(msg.into());
        self.status_is_error = is_error;
    }

    /// Handle a key press. Returns the backend command to run, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<BackendCommand> {
        if self.show_help {
            self.show_help = false;
            return None;
        }

        self.status_message = None;

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_exit = true;
                None
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                None
            }
            KeyCode::Char('l') => {
                if self.auth.begin_sign_in() {
                    self.scroll = 0;
                    Some(BackendCommand::SignIn)
                } else {
                    None
                }
            }
            KeyCode::Char('c') => {
                if self.auth.account().is_some() && self.api.begin() {
                    Some(BackendCommand::CallApi)
                } else {
                    None
                }
            }
            KeyCode::Char('o') => {
                if self.auth.account().is_some() {
                    self.set_status("Signing out...", false);
                    Some(BackendCommand::SignOut)
                } else {
                    None
                }
            }
            KeyCode::Up => {
                self.scroll = self.scroll.saturating_sub(1);
                None
            }
            KeyCode::Down => {
                self.scroll = self.scroll.saturating_add(1);
                None
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(PAGE_SIZE);
                None
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(PAGE_SIZE);
                None
            }
            KeyCode::Home => {
                self.scroll = 0;
                None
            }
            _ => None,
        }
    }

    /// Apply a backend response to the state.
    pub fn apply(&mut self, response: BackendResponse) {
        match response {
            BackendResponse::Prompt(prompt) => self.auth.show_prompt(prompt),
            BackendResponse::SignedIn(result) => {
                if !self.auth.is_authenticating() {
                    return;
                }
                match &result {
                    Ok(account) => {
                        let name = IdentitySummary::project(Some(account)).name;
                        self.set_status(format!("Signed in as {}", name), false);
                    }
                    Err(e) => self.set_status(e.user_message(), true),
                }
                self.auth.finish_sign_in(result);
                self.api = ApiPanel::default();
                self.scroll = 0;
            }
            BackendResponse::ApiResult { result, account } => {
                // A call outstanding across a sign-out no longer has a panel
                if !self.api.loading || self.auth.account().is_none() {
                    return;
                }
                // The token acquisition may have rotated the ID token
                if result.is_ok() {
                    if let Some(account) = account {
                        self.auth.refresh_account(account);
                    }
                }
                self.api.finish(result);
            }
            BackendResponse::SignedOut(result) => {
                match result {
                    Ok(()) => self.set_status("Signed out", false),
                    Err(e) => {
                        tracing::warn!("Sign-out failed: {}", e);
                        self.set_status(e.user_message(), true);
                    }
                }
                self.auth.signed_out();
                self.api = ApiPanel::default();
                self.scroll = 0;
            }
        }
    }

    /// Render the UI
    pub fn render(&self, frame: &mut ratatui::Frame) {
        ui::render(frame, self);
    }
}

/// Run the TUI application. `ratatui::init` installs a panic hook that
/// restores the terminal.
pub async fn run(ctx: BackendContext) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, ctx).await;
    ratatui::restore();
    result
}

async fn run_app(terminal: &mut DefaultTerminal, ctx: BackendContext) -> Result<()> {
    let mut app = App::new(
        AuthState::from_accounts(ctx.provider.accounts()),
        ctx.api.endpoint().to_string(),
    );
    let mut backend = Backend::start(Arc::new(ctx));
    let mut events = EventStream::new();

    while !app.should_exit {
        terminal.draw(|frame| app.render(frame))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(cmd) = app.handle_key(key) {
                        backend.send(cmd);
                    }
                }
                // Resize and other events are handled on the next draw
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(response) = backend.recv() => app.apply(response),
            else => break,
        }
    }

    Ok(())
}
