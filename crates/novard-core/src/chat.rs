//! Career chat session
//!
//! A chat turn is split into [`ChatSession::begin_turn`] and
//! [`ChatSession::complete_turn`] so a UI can run the request in a
//! background task and keep drawing while it waits.

use std::fmt;
use tracing::{info, warn};

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::UserProfile;
use crate::session::{Identity, SessionStore};
use crate::state::{ChatEntry, ChatSender, Transcript};

pub const ANALYZING: &str = "Analyzing your profile...";
pub const GREETING: &str = "Hello, I'm Novard — your AI career assistant. How can I assist you?";
pub const NO_SUMMARY: &str =
    "Could not generate career summary. Please try asking questions directly.";

pub struct ChatSession {
    identity: Identity,
    transcript: Transcript,
    waiting: bool,
}

impl ChatSession {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            transcript: Transcript::default(),
            waiting: false,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn entries(&self) -> &[ChatEntry] {
        self.transcript.entries()
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Fresh transcript, profile snapshot (fetched and cached when missing),
    /// then a career summary decides the opening line. Failures become a bot
    /// message.
    pub async fn start<B: Backend + ?Sized>(&mut self, backend: &B, store: &mut SessionStore) {
        self.transcript.clear();
        self.waiting = false;
        self.transcript.push(ChatEntry::new(ChatSender::System, ANALYZING));

        let opening = match self.summarize(backend, store).await {
            Ok(Some(_)) => GREETING.to_string(),
            Ok(None) => NO_SUMMARY.to_string(),
            Err(e) => {
                warn!(error = %e, "chat initialization failed");
                format!("Error initializing chat - {e}")
            }
        };
        self.transcript.push(ChatEntry::new(ChatSender::Bot, opening));
    }

    async fn summarize<B: Backend + ?Sized>(
        &self,
        backend: &B,
        store: &mut SessionStore,
    ) -> Result<Option<String>, ApiError> {
        let profile = match store.profile().cloned() {
            Some(profile) => profile,
            None => self.fetch_profile(backend, store).await?,
        };
        backend.career_summary(&profile, &self.identity).await
    }

    async fn fetch_profile<B: Backend + ?Sized>(
        &self,
        backend: &B,
        store: &mut SessionStore,
    ) -> Result<UserProfile, ApiError> {
        let profile = backend.fetch_user(&self.identity).await?;
        info!(user_id = self.identity.user_id, "profile fetched");
        if let Err(e) = store.cache_profile(profile.clone()) {
            warn!(error = %e, "could not cache profile");
        }
        Ok(profile)
    }

    /// Record the user's line and return the message to send. `None` for
    /// blank input or while a turn is already in flight.
    pub fn begin_turn(&mut self, input: &str) -> Option<String> {
        let message = input.trim();
        if message.is_empty() || self.waiting {
            return None;
        }
        self.transcript.push(ChatEntry::new(ChatSender::User, message));
        self.waiting = true;
        Some(message.to_string())
    }

    pub fn complete_turn<E: fmt::Display>(&mut self, result: Result<String, E>) {
        self.waiting = false;
        let text = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "chat turn failed");
                format!("Error processing request - {e}")
            }
        };
        self.transcript.push(ChatEntry::new(ChatSender::Bot, text));
    }

    pub async fn send<B: Backend + ?Sized>(&mut self, backend: &B, input: &str) {
        if let Some(message) = self.begin_turn(input) {
            let result = backend.chat(&message, &self.identity).await;
            self.complete_turn(result);
        }
    }

    /// Drop the transcript; called when the client exits.
    pub fn end(&mut self) {
        self.transcript.clear();
        self.waiting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        let mut store = SessionStore::open(dir.path().join("session.json")).unwrap();
        store.sign_in(&FakeBackend::identity()).unwrap();
        store
    }

    #[tokio::test]
    async fn test_start_greets_and_caches_profile() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        let backend = FakeBackend::new();
        let mut chat = ChatSession::new(FakeBackend::identity());

        chat.start(&backend, &mut store).await;

        let texts: Vec<_> = chat.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec![ANALYZING, GREETING]);
        assert!(store.profile().is_some());

        chat.start(&backend, &mut store).await;
        assert_eq!(backend.calls("fetch_user"), 1);
        assert_eq!(chat.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_start_without_summary() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        let backend = FakeBackend::new();
        backend.set_summary(None);
        let mut chat = ChatSession::new(FakeBackend::identity());

        chat.start(&backend, &mut store).await;

        assert_eq!(chat.entries().last().unwrap().text, NO_SUMMARY);
    }

    #[tokio::test]
    async fn test_start_failure_is_a_bot_message() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        let backend = FakeBackend::new();
        backend.fail_next("User not found");
        let mut chat = ChatSession::new(FakeBackend::identity());

        chat.start(&backend, &mut store).await;

        let last = chat.entries().last().unwrap();
        assert_eq!(last.sender, ChatSender::Bot);
        assert_eq!(last.text, "Error initializing chat - User not found");
    }

    #[tokio::test]
    async fn test_send_appends_user_and_bot() {
        let backend = FakeBackend::new();
        let mut chat = ChatSession::new(FakeBackend::identity());

        chat.send(&backend, "  Which skills for data science?  ").await;

        let entries = chat.entries();
        assert_eq!(entries[0].display(), "You: Which skills for data science?");
        assert_eq!(entries[1].sender, ChatSender::Bot);
        assert!(entries[1].text.contains("Which skills for data science?"));
        assert!(!chat.is_waiting());
    }

    #[tokio::test]
    async fn test_send_ignores_blank_input() {
        let backend = FakeBackend::new();
        let mut chat = ChatSession::new(FakeBackend::identity());

        chat.send(&backend, "   ").await;

        assert!(chat.entries().is_empty());
        assert_eq!(backend.calls("chat"), 0);
    }

    #[tokio::test]
    async fn test_send_failure_is_a_bot_message() {
        let backend = FakeBackend::new();
        backend.fail_next("Failed to get bot response");
        let mut chat = ChatSession::new(FakeBackend::identity());

        chat.send(&backend, "hello").await;

        assert_eq!(
            chat.entries().last().unwrap().text,
            "Error processing request - Failed to get bot response"
        );
    }

    #[test]
    fn test_only_one_turn_in_flight() {
        let mut chat = ChatSession::new(FakeBackend::identity());
        assert!(chat.begin_turn("first").is_some());
        assert!(chat.begin_turn("second").is_none());
        chat.complete_turn(Ok::<_, ApiError>("answer".to_string()));
        assert!(chat.begin_turn("second").is_some());

        chat.end();
        assert!(chat.entries().is_empty());
    }
}
