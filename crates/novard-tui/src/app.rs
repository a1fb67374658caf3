use anyhow::Result;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use novard_core::chat::ChatSession;
use novard_core::ocr::{self, OcrStatus, TesseractCli, TextExtractor};
use novard_core::{
    ApiError, Backend, BackendClient, Config, DoubtController, DoubtId, DoubtStatus, Identity,
    SessionStore, StatusFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Doubts,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    List,
    Thread,
}

/// Single-line or multi-line text field with a char-indexed cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl TextInput {
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }

    /// (line, column) of the cursor, both zero-based, for multi-line fields.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before: String = self.value.chars().take(self.cursor).collect();
        let line = before.matches('\n').count();
        let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count());
        (line, col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Title,
    Question,
    Image,
}

impl FormField {
    pub fn next(&self) -> Self {
        match self {
            FormField::Title => FormField::Question,
            FormField::Question => FormField::Image,
            FormField::Image => FormField::Title,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FormField::Title => FormField::Image,
            FormField::Question => FormField::Title,
            FormField::Image => FormField::Question,
        }
    }
}

/// The "Ask a doubt" popup.
#[derive(Debug, Clone, Default)]
pub struct CreateForm {
    pub title: TextInput,
    pub question: TextInput,
    pub image: TextInput,
    pub field: FormField,
    pub ocr_status: Option<OcrStatus>,
}

impl CreateForm {
    pub fn active_input(&mut self) -> &mut TextInput {
        match self.field {
            FormField::Title => &mut self.title,
            FormField::Question => &mut self.question,
            FormField::Image => &mut self.image,
        }
    }

    fn image_path(&self) -> Option<PathBuf> {
        let path = self.image.value.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }
}

/// Backend work queued by a key press. The event loop paints one frame and
/// then awaits it, so the UI can show a loading state first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    LoadList(StatusFilter),
    Select {
        id: DoubtId,
        title: String,
        status: DoubtStatus,
    },
    Reply {
        text: String,
        use_ai: bool,
    },
    Resolve(String),
    Create {
        title: String,
        question: String,
    },
    ExtractText,
    StartChat,
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Doubts
    pub controller: DoubtController<BackendClient>,
    pub list_state: ListState,
    pub detail_scroll: u16,
    pub reply_input: TextInput,
    pub use_ai: bool,

    // Popups
    pub create_form: Option<CreateForm>,
    pub resolve_notes: Option<TextInput>,
    pub alert: Option<String>,

    // Chat
    pub chat: ChatSession,
    pub chat_started: bool,
    pub chat_input: TextInput,
    pub chat_scroll: u16,
    pub chat_follow: bool,
    pub chat_task: Option<JoinHandle<Result<String, ApiError>>>,

    pub pending: Option<Action>,
    pub animation_frame: u8,

    // Panel areas for mouse hit-testing (updated during render)
    pub list_area: Option<Rect>,
    pub detail_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    pub backend: BackendClient,
    pub store: SessionStore,
    pub extractor: Box<dyn TextExtractor>,
}

impl App {
    pub fn new(config: &Config, store: SessionStore, identity: Identity) -> Result<Self> {
        let backend = BackendClient::new(&config.base_url, config.request_timeout())?;
        info!(base_url = backend.base_url(), user_id = identity.user_id, "client ready");

        let controller =
            DoubtController::new(backend.clone(), identity.clone(), config.default_filter);

        let mut app = Self {
            should_quit: false,
            screen: Screen::Doubts,
            input_mode: InputMode::Normal,
            focus: FocusPane::List,

            controller,
            list_state: ListState::default(),
            detail_scroll: 0,
            reply_input: TextInput::default(),
            use_ai: false,

            create_form: None,
            resolve_notes: None,
            alert: None,

            chat: ChatSession::new(identity),
            chat_started: false,
            chat_input: TextInput::default(),
            chat_scroll: 0,
            chat_follow: true,
            chat_task: None,

            pending: None,
            animation_frame: 0,

            list_area: None,
            detail_area: None,
            chat_area: None,

            backend,
            store,
            extractor: Box::new(TesseractCli::from_config(config)),
        };
        app.queue(Action::LoadList(config.default_filter));
        Ok(app)
    }

    pub fn queue(&mut self, action: Action) {
        debug!(?action, "queued");
        match &action {
            Action::LoadList(_) => self.controller.mark_list_loading(),
            Action::Select { .. } => self.controller.mark_thread_loading(),
            Action::ExtractText => {
                if let Some(form) = &mut self.create_form {
                    form.ocr_status = Some(OcrStatus::Extracting);
                }
            }
            _ => {}
        }
        self.pending = Some(action);
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Run the queued action to completion. Failures of user-initiated
    /// writes become an alert; loading failures are shown in their panel.
    pub async fn run_pending(&mut self) {
        let Some(action) = self.pending.take() else {
            return;
        };

        match action {
            Action::LoadList(filter) => self.controller.load_list(filter).await,
            Action::Select { id, title, status } => {
                self.controller.select(id, &title, status).await;
                self.detail_scroll = 0;
            }
            Action::Reply { text, use_ai } => match self.controller.reply(&text, use_ai).await {
                Ok(()) => {
                    self.reply_input.clear();
                    self.input_mode = InputMode::Normal;
                }
                Err(e) => self.alert = Some(e.to_string()),
            },
            Action::Resolve(notes) => match self.controller.resolve(&notes).await {
                Ok(()) => self.resolve_notes = None,
                Err(e) => self.alert = Some(e.to_string()),
            },
            Action::Create { title, question } => {
                match self.controller.create(&title, &question).await {
                    Ok(_) => {
                        self.create_form = None;
                        self.focus = FocusPane::Thread;
                    }
                    Err(e) => self.alert = Some(e.to_string()),
                }
            }
            Action::ExtractText => {
                if let Some(form) = self.create_form.as_mut() {
                    let image = form.image_path();
                    let status =
                        ocr::extract_into(self.extractor.as_ref(), image.as_deref(), &mut form.question.value)
                            .await;
                    form.question.end();
                    form.ocr_status = Some(status);
                }
            }
            Action::StartChat => {
                self.chat.start(&self.backend, &mut self.store).await;
                self.chat_follow = true;
            }
        }

        self.sync_list_cursor();
    }

    /// Keep the list cursor on the selected doubt.
    pub fn sync_list_cursor(&mut self) {
        let doubts = self.controller.doubts();
        if doubts.is_empty() {
            self.list_state.select(None);
            return;
        }
        let selected = self
            .controller
            .selection()
            .and_then(|s| doubts.iter().position(|d| d.id == s.id));
        let cursor = selected
            .or(self.list_state.selected())
            .unwrap_or(0)
            .min(doubts.len() - 1);
        self.list_state.select(Some(cursor));
    }

    pub fn list_down(&mut self) {
        let len = self.controller.doubts().len();
        if len > 0 {
            let i = self.list_state.selected().unwrap_or(0);
            self.list_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn list_up(&mut self) {
        let i = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some(i.saturating_sub(1)));
    }

    pub fn list_first(&mut self) {
        if !self.controller.doubts().is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn list_last(&mut self) {
        let len = self.controller.doubts().len();
        if len > 0 {
            self.list_state.select(Some(len - 1));
        }
    }

    /// Queue a thread fetch for the row under the cursor.
    pub fn select_highlighted(&mut self) {
        let Some(doubt) = self
            .list_state
            .selected()
            .and_then(|i| self.controller.doubts().get(i))
            .cloned()
        else {
            return;
        };
        self.queue(Action::Select {
            id: doubt.id,
            title: doubt.title,
            status: doubt.status,
        });
    }

    pub fn cycle_filter(&mut self) {
        self.queue(Action::LoadList(self.controller.filter().next()));
    }

    pub fn refresh(&mut self) {
        self.queue(Action::LoadList(self.controller.filter()));
    }

    pub fn open_create_form(&mut self) {
        self.create_form = Some(CreateForm::default());
    }

    pub fn submit_create_form(&mut self) {
        if let Some(form) = &self.create_form {
            let action = Action::Create {
                title: form.title.value.clone(),
                question: form.question.value.clone(),
            };
            self.queue(action);
        }
    }

    pub fn start_reply(&mut self) {
        if self.controller.detail_panel().reply_enabled {
            self.input_mode = InputMode::Editing;
        }
    }

    pub fn submit_reply(&mut self) {
        self.queue(Action::Reply {
            text: self.reply_input.value.clone(),
            use_ai: self.use_ai,
        });
    }

    pub fn open_resolve(&mut self) {
        if self.controller.detail_panel().resolve_enabled {
            self.resolve_notes = Some(TextInput::default());
        }
    }

    pub fn submit_resolve(&mut self) {
        if let Some(notes) = &self.resolve_notes {
            let action = Action::Resolve(notes.value.clone());
            self.queue(action);
        }
    }

    /// Switch to the chat screen; the first visit starts the session.
    pub fn open_chat(&mut self) {
        self.screen = Screen::Chat;
        if !self.chat_started {
            self.chat_started = true;
            self.queue(Action::StartChat);
        }
    }

    pub fn restart_chat(&mut self) {
        if self.chat_task.is_none() {
            self.queue(Action::StartChat);
        }
    }

    /// Record the user's line and send it in a background task.
    pub fn submit_chat(&mut self) {
        if self.chat_task.is_some() {
            return;
        }
        let input = self.chat_input.take();
        if let Some(message) = self.chat.begin_turn(&input) {
            let backend = self.backend.clone();
            let identity = self.chat.identity().clone();
            self.chat_task = Some(tokio::spawn(async move {
                backend.chat(&message, &identity).await
            }));
            self.chat_follow = true;
        }
    }

    pub async fn poll_chat_task(&mut self) {
        let finished = self.chat_task.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }
        if let Some(task) = self.chat_task.take() {
            match task.await {
                Ok(result) => self.chat.complete_turn(result),
                Err(e) => self.chat.complete_turn(Err::<String, _>(e)),
            }
            self.chat_follow = true;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_waiting() || self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Drop in-flight work and the transcript before exit.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.chat_task.take() {
            task.abort();
        }
        self.chat.end();
        info!("session ended");
    }
}
