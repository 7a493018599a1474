//! Application state machine.
//!
//! [`App`] consumes [`crate::AppEvent`]s and produces [`crate::AppAction`]s.
//! It never touches the network, a terminal, or a clock other than through
//! transcript timestamps, so every screen flow can be tested directly.
//!
//! # Screens
//!
//! `SignIn -> Connecting -> Friends <-> Conversation`, with `Exiting` reachable
//! from anywhere on Ctrl-C, disconnect, or an unrecoverable error.

use duet_proto::{ChatEvent, ColorTag, PresenceSnapshot, TypingEvent, UserId};

use crate::{AppAction, AppEvent, InputState, KeyInput, Transcript, View};

/// Placeholder animation frames, cycled on every tick.
pub const SPINNER: [&str; 4] = ["   ", ".  ", ".. ", "..."];

/// Shown when the user quits with Ctrl-C.
const FAREWELL: &str = "Goodbye";

/// Application state machine.
#[derive(Debug, Clone)]
pub struct App {
    view: View,
    /// Signed-in identity. `None` until sign-in is submitted.
    user: Option<UserId>,
    /// Colour stamped into everything we send.
    color: ColorTag,
    input: InputState,
    /// Online peers, excluding ourselves.
    friends: Vec<UserId>,
    /// Highlighted row in the friend list.
    selected: usize,
    transcript: Transcript,
    /// Lines scrolled back from the bottom of the transcript.
    scroll: usize,
    spinner: usize,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Fresh client on the sign-in screen, sending with `color`.
    pub fn new(color: ColorTag) -> Self {
        Self {
            view: View::SignIn,
            user: None,
            color,
            input: InputState::new(),
            friends: Vec::new(),
            selected: 0,
            transcript: Transcript::new(),
            scroll: 0,
            spinner: 0,
            terminal_size: (80, 24),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        if self.view.is_exiting() {
            return vec![];
        }

        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => self.tick(),
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::Connected => {
                self.view = View::Friends;
                self.status_message = None;
                vec![AppAction::Render]
            },
            AppEvent::ChatReceived(chat) => {
                self.transcript.push_received(&chat);
                self.scroll = 0;
                vec![AppAction::Render]
            },
            AppEvent::ChatSent(chat) => {
                self.transcript.push_sent(&chat);
                self.input.clear();
                self.scroll = 0;
                let stopped =
                    TypingEvent { is_typing: false, to: chat.to, color: chat.color, from: chat.from };
                vec![AppAction::StopTyping(stopped), AppAction::Render]
            },
            AppEvent::TypingReceived(typing) => {
                let changed = if typing.is_typing {
                    self.transcript.begin_typing(&typing.from, typing.color, self.spinner_glyph())
                } else {
                    self.transcript.end_typing(&typing.from)
                };
                if changed && typing.is_typing {
                    self.scroll = 0;
                }
                vec![AppAction::Render]
            },
            AppEvent::PresenceChanged(snapshot) => {
                self.set_friends(&snapshot);
                vec![AppAction::Render]
            },
            AppEvent::Disconnected { reason } => {
                let message = reason.map_or_else(
                    || "Connection closed by server".to_string(),
                    |reason| format!("Connection closed: {reason}"),
                );
                self.exit(message)
            },
            AppEvent::Error { message } => self.exit(format!("Error: {message}")),
        }
    }

    fn handle_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        if key == KeyInput::Interrupt {
            return self.exit(FAREWELL.to_string());
        }

        match self.view.clone() {
            View::SignIn => self.sign_in_key(key),
            View::Connecting | View::Exiting { .. } => vec![],
            View::Friends => self.friends_key(key),
            View::Conversation { peer } => self.conversation_key(key, peer),
        }
    }

    fn sign_in_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        if key != KeyInput::Enter {
            return if self.input.apply(key) { vec![AppAction::Render] } else { vec![] };
        }

        match UserId::parse(self.input.buffer().trim()) {
            Ok(user) => {
                self.input.clear();
                self.user = Some(user.clone());
                self.view = View::Connecting;
                self.status_message = None;
                vec![AppAction::Render, AppAction::Connect { user }]
            },
            Err(e) => {
                self.status_message = Some(format!("Invalid name: {e}"));
                vec![AppAction::Render]
            },
        }
    }

    fn friends_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Up => {
                self.selected = self.selected.saturating_sub(1);
                vec![AppAction::Render]
            },
            KeyInput::Down => {
                if self.selected + 1 < self.friends.len() {
                    self.selected += 1;
                }
                vec![AppAction::Render]
            },
            KeyInput::Enter => match self.selected_friend().cloned() {
                Some(peer) => {
                    self.input.clear();
                    self.scroll = 0;
                    self.view = View::Conversation { peer };
                    vec![AppAction::Render]
                },
                None => vec![],
            },
            _ => vec![],
        }
    }

    fn conversation_key(&mut self, key: KeyInput, peer: UserId) -> Vec<AppAction> {
        match key {
            KeyInput::Enter => self.submit(peer),
            KeyInput::Esc => {
                self.input.clear();
                self.view = View::Friends;
                vec![AppAction::CancelTyping, AppAction::Render]
            },
            KeyInput::PageUp => {
                let page = usize::from(self.terminal_size.1 / 2).max(1);
                self.scroll = (self.scroll + page).min(self.transcript.len().saturating_sub(1));
                vec![AppAction::Render]
            },
            KeyInput::PageDown => {
                let page = usize::from(self.terminal_size.1 / 2).max(1);
                self.scroll = self.scroll.saturating_sub(page);
                vec![AppAction::Render]
            },
            key if key.modifies_content() => {
                self.input.apply(key);
                match self.typing_template(peer) {
                    Some(template) => vec![AppAction::RestartTyping(template), AppAction::Render],
                    None => vec![AppAction::Render],
                }
            },
            key => {
                if self.input.apply(key) { vec![AppAction::Render] } else { vec![] }
            },
        }
    }

    /// Enter in a conversation: publish the buffer as a chat line.
    ///
    /// The buffer is cleared when the send is confirmed via
    /// [`AppEvent::ChatSent`], so a failed send keeps the text.
    fn submit(&mut self, peer: UserId) -> Vec<AppAction> {
        let Some(from) = self.user.clone() else {
            return vec![];
        };
        if self.input.buffer().trim().is_empty() {
            return vec![];
        }
        let chat =
            ChatEvent { to: peer, from, text: self.input.buffer().to_string(), color: self.color };
        vec![AppAction::SendChat(chat)]
    }

    fn tick(&mut self) -> Vec<AppAction> {
        self.spinner = (self.spinner + 1) % SPINNER.len();
        if self.transcript.has_placeholders() {
            let glyph = self.spinner_glyph();
            self.transcript.animate(glyph);
            return vec![AppAction::Render];
        }
        if self.view == View::Connecting {
            return vec![AppAction::Render];
        }
        vec![]
    }

    fn exit(&mut self, message: String) -> Vec<AppAction> {
        self.view = View::Exiting { message };
        vec![AppAction::Render, AppAction::Quit]
    }

    fn set_friends(&mut self, snapshot: &PresenceSnapshot) {
        let friends = match &self.user {
            Some(user) => snapshot.without(user),
            None => snapshot.clone(),
        };
        self.friends = friends.0;
        self.selected = self.selected.min(self.friends.len().saturating_sub(1));
    }

    fn typing_template(&self, peer: UserId) -> Option<TypingEvent> {
        let from = self.user.clone()?;
        Some(TypingEvent { is_typing: true, to: peer, color: self.color, from })
    }

    /// Current screen.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Signed-in identity.
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Our colour.
    pub fn color(&self) -> ColorTag {
        self.color
    }

    /// Input line.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Online peers.
    pub fn friends(&self) -> &[UserId] {
        &self.friends
    }

    /// Highlighted friend-list row.
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Highlighted friend, if the list is not empty.
    pub fn selected_friend(&self) -> Option<&UserId> {
        self.friends.get(self.selected)
    }

    /// Conversation transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Lines scrolled back from the bottom.
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Current spinner frame.
    pub fn spinner_glyph(&self) -> &'static str {
        SPINNER[self.spinner % SPINNER.len()]
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
