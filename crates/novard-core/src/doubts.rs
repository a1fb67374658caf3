//! Doubt thread controller
//!
//! Owns the selection, the active status filter, and the last loaded list
//! and thread. Every operation takes `&mut self`, so a UI driving one
//! controller can only have one request in flight and responses are always
//! applied in the order they were issued.
//!
//! The UI never reads controller state directly. It asks for a
//! [`ListPanel`] and a [`DetailPanel`] and paints those.

use tracing::{debug, info, warn};

use crate::api::Backend;
use crate::error::DoubtError;
use crate::markdown;
use crate::models::{Doubt, DoubtId, DoubtMessage, DoubtStatus, Sender, StatusFilter};
use crate::session::Identity;

pub const PLACEHOLDER: &str = "Select a doubt to view details";
pub const EMPTY_LIST: &str = "No doubts yet.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub id: DoubtId,
    pub title: String,
    pub status: DoubtStatus,
}

#[derive(Debug, Clone)]
enum ListState {
    Idle,
    Loading,
    Loaded(Vec<Doubt>),
    Failed(String),
}

#[derive(Debug, Clone)]
enum ThreadState {
    Idle,
    Loading,
    Loaded(Vec<DoubtMessage>),
    Failed(String),
}

pub struct DoubtController<B: Backend> {
    backend: B,
    identity: Identity,
    filter: StatusFilter,
    selected: Option<Selection>,
    list: ListState,
    thread: ThreadState,
    scroll_to_bottom: bool,
}

impl<B: Backend> DoubtController<B> {
    pub fn new(backend: B, identity: Identity, filter: StatusFilter) -> Self {
        Self {
            backend,
            identity,
            filter,
            selected: None,
            list: ListState::Idle,
            thread: ThreadState::Idle,
            scroll_to_bottom: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selected.as_ref()
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    /// Rows from the last successful list load.
    pub fn doubts(&self) -> &[Doubt] {
        match &self.list {
            ListState::Loaded(doubts) => doubts,
            _ => &[],
        }
    }

    pub fn messages(&self) -> &[DoubtMessage] {
        match &self.thread {
            ThreadState::Loaded(messages) => messages,
            _ => &[],
        }
    }

    /// Show the list as loading before the request is awaited, so a frame
    /// can be painted first.
    pub fn mark_list_loading(&mut self) {
        self.list = ListState::Loading;
    }

    pub fn mark_thread_loading(&mut self) {
        if self.selected.is_some() {
            self.thread = ThreadState::Loading;
        }
    }

    pub async fn load_list(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.fetch_list(true).await;
    }

    async fn fetch_list(&mut self, auto_select: bool) {
        self.list = ListState::Loading;
        let doubts = match self.backend.list_doubts(&self.identity, self.filter).await {
            Ok(doubts) => doubts,
            Err(e) => {
                warn!(error = %e, filter = ?self.filter, "loading doubts failed");
                self.list = ListState::Failed(format!("Error loading doubts: {e}"));
                return;
            }
        };
        debug!(count = doubts.len(), filter = ?self.filter, "doubts loaded");

        if doubts.is_empty() {
            self.clear_selection();
            self.list = ListState::Loaded(doubts);
            return;
        }

        if let Some(selected) = &mut self.selected {
            if let Some(doubt) = doubts.iter().find(|d| d.id == selected.id) {
                selected.title = doubt.title.clone();
                selected.status = doubt.status;
            }
        }

        let first = doubts[0].clone();
        self.list = ListState::Loaded(doubts);

        if auto_select && self.selected.is_none() {
            self.select(first.id, &first.title, first.status).await;
        }
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.thread = ThreadState::Idle;
    }

    pub async fn select(&mut self, id: DoubtId, title: &str, status: DoubtStatus) {
        debug!(%id, "doubt selected");
        self.selected = Some(Selection {
            id,
            title: title.to_string(),
            status,
        });
        self.reload_thread().await;
    }

    pub async fn reload_thread(&mut self) {
        let Some(id) = self.selected.as_ref().map(|s| s.id) else {
            return;
        };

        self.thread = ThreadState::Loading;
        match self.backend.get_thread(&self.identity, id).await {
            Ok(thread) => {
                if let Some(selected) = self.selected.as_mut().filter(|s| s.id == thread.doubt.id) {
                    selected.title = thread.doubt.title;
                    selected.status = thread.doubt.status;
                }
                self.show_messages(thread.messages);
            }
            Err(e) => {
                warn!(error = %e, %id, "loading thread failed");
                self.thread = ThreadState::Failed(format!("Error: {e}"));
            }
        }
    }

    fn show_messages(&mut self, messages: Vec<DoubtMessage>) {
        self.thread = ThreadState::Loaded(messages);
        self.scroll_to_bottom = true;
    }

    pub async fn reply(&mut self, text: &str, use_ai: bool) -> Result<(), DoubtError> {
        let id = self.selected.as_ref().ok_or(DoubtError::NoSelection)?.id;
        let text = text.trim();
        if text.is_empty() {
            return Err(DoubtError::Validation("Please enter a reply.".to_string()));
        }

        let messages = self.backend.reply(&self.identity, id, text, use_ai).await?;
        info!(%id, use_ai, "reply posted");
        self.show_messages(messages);
        self.fetch_list(true).await;
        Ok(())
    }

    pub async fn resolve(&mut self, notes: &str) -> Result<(), DoubtError> {
        let selected = self.selected.as_ref().ok_or(DoubtError::NoSelection)?;
        if selected.status == DoubtStatus::Resolved {
            return Err(DoubtError::AlreadyResolved(selected.id));
        }
        let id = selected.id;

        self.backend.resolve(&self.identity, id, notes.trim()).await?;
        info!(%id, "doubt resolved");
        if let Some(selected) = &mut self.selected {
            selected.status = DoubtStatus::Resolved;
        }
        self.fetch_list(true).await;
        self.reload_thread().await;
        Ok(())
    }

    /// Submit a new doubt, show the open list and select it. The thread is
    /// fetched twice; the backend's automated answer usually lands after the
    /// creation response.
    pub async fn create(&mut self, title: &str, question: &str) -> Result<Option<DoubtId>, DoubtError> {
        let (title, question) = (title.trim(), question.trim());
        if title.is_empty() || question.is_empty() {
            return Err(DoubtError::Validation(
                "Please enter both title and question.".to_string(),
            ));
        }

        let id = self.backend.create_doubt(&self.identity, title, question).await?;
        info!(id = ?id, "doubt created");

        if self.filter == StatusFilter::Resolved {
            self.filter = StatusFilter::Open;
        }
        self.fetch_list(id.is_none()).await;

        if let Some(id) = id {
            self.select(id, title, DoubtStatus::Open).await;
            self.reload_thread().await;
        }
        Ok(id)
    }

    /// Returns the pending scroll request and clears it.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_bottom)
    }

    pub fn list_panel(&self) -> ListPanel {
        match &self.list {
            ListState::Idle => ListPanel::Idle,
            ListState::Loading => ListPanel::Loading,
            ListState::Failed(message) => ListPanel::Failed(message.clone()),
            ListState::Loaded(doubts) if doubts.is_empty() => ListPanel::Empty,
            ListState::Loaded(doubts) => {
                let selected = self.selected.as_ref().map(|s| s.id);
                ListPanel::Rows(
                    doubts
                        .iter()
                        .map(|d| DoubtRow {
                            id: d.id,
                            title: d.title.clone(),
                            status: d.status,
                            meta: format!("#{} • {} • {}", d.id, d.status, d.updated_display()),
                            selected: selected == Some(d.id),
                        })
                        .collect(),
                )
            }
        }
    }

    pub fn detail_panel(&self) -> DetailPanel {
        let Some(selected) = &self.selected else {
            return DetailPanel {
                header: PLACEHOLDER.to_string(),
                body: DetailBody::Placeholder,
                reply_enabled: false,
                resolve_enabled: false,
                scroll_to_bottom: false,
            };
        };

        let body = match &self.thread {
            ThreadState::Idle => DetailBody::Placeholder,
            ThreadState::Loading => DetailBody::Loading,
            ThreadState::Failed(message) => DetailBody::Failed(message.clone()),
            ThreadState::Loaded(messages) => {
                DetailBody::Messages(messages.iter().map(MessageView::from).collect())
            }
        };

        DetailPanel {
            header: format!("#{} • {} • {}", selected.id, selected.title, selected.status),
            body,
            reply_enabled: true,
            resolve_enabled: selected.status == DoubtStatus::Open,
            scroll_to_bottom: self.scroll_to_bottom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListPanel {
    Idle,
    Loading,
    Empty,
    Failed(String),
    Rows(Vec<DoubtRow>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubtRow {
    pub id: DoubtId,
    pub title: String,
    pub status: DoubtStatus,
    /// `#id • status • time`
    pub meta: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPanel {
    pub header: String,
    pub body: DetailBody,
    pub reply_enabled: bool,
    pub resolve_enabled: bool,
    pub scroll_to_bottom: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailBody {
    Placeholder,
    Loading,
    Failed(String),
    Messages(Vec<MessageView>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub sender: Sender,
    pub text: String,
}

impl From<&DoubtMessage> for MessageView {
    fn from(message: &DoubtMessage) -> Self {
        Self {
            sender: message.sender,
            text: message.message.clone(),
        }
    }
}

impl MessageView {
    /// Prefix shown before plain-text messages. Bot messages have none.
    pub fn label(&self) -> Option<&'static str> {
        match self.sender {
            Sender::User => Some("You: "),
            Sender::Mentor => Some("Mentor: "),
            Sender::Bot => None,
        }
    }

    /// Bot text goes through the Markdown renderer; everything else is
    /// escaped verbatim.
    pub fn to_html(&self) -> String {
        match self.label() {
            Some(label) => format!("{label}{}", markdown::escape_html(&self.text)),
            None => markdown::render(&self.text),
        }
    }
}
