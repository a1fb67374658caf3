//! In-memory [`Backend`] used by the unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::{
    Doubt, DoubtId, DoubtMessage, DoubtStatus, DoubtThread, Sender, StatusFilter, UserProfile,
};
use crate::session::Identity;

/// Automated replies to a new doubt show up on this many thread fetches
/// later, like the backend's AI answer landing after the creation response.
const AUTO_REPLY_DELAY: usize = 2;

struct StoredDoubt {
    doubt: Doubt,
    messages: Vec<DoubtMessage>,
    tick: u32,
    pending_reply: Option<(usize, String)>,
}

struct FakeState {
    doubts: Vec<StoredDoubt>,
    next_id: i64,
    clock: u32,
    calls: HashMap<&'static str, usize>,
    fail_next: Option<String>,
    summary: Option<String>,
}

pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
}

fn timestamp(tick: u32) -> String {
    format!("Thu, 16 Oct 2025 10:{:02}:{:02} GMT", (tick / 60) % 60, tick % 60)
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                doubts: Vec::new(),
                next_id: 1,
                clock: 0,
                calls: HashMap::new(),
                fail_next: None,
                summary: Some("Strong fit for data roles".to_string()),
            }),
        }
    }

    pub fn identity() -> Identity {
        Identity {
            user_id: 42,
            email: "asha@example.com".to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Count the call and consume a queued failure.
    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if let Some(message) = state.fail_next.take() {
            return Err(ApiError::Backend {
                status: 500,
                message,
            });
        }
        Ok(state)
    }

    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn fail_next(&self, message: &str) {
        self.lock().fail_next = Some(message.to_string());
    }

    pub fn set_summary(&self, summary: Option<&str>) {
        self.lock().summary = summary.map(str::to_string);
    }

    /// Insert a doubt with one user message and return its id.
    pub fn seed(&self, title: &str, status: DoubtStatus) -> DoubtId {
        let mut state = self.lock();
        let id = state.insert(title, &format!("Question about {title}"));
        if let Some(stored) = state.find_mut(id) {
            stored.doubt.status = status;
        }
        id
    }

    pub fn updated_at(&self, id: DoubtId) -> Option<String> {
        let mut state = self.lock();
        state.find_mut(id).and_then(|s| s.doubt.updated_at.clone())
    }
}

impl FakeState {
    fn tick(&mut self) -> u32 {
        self.clock += 1;
        self.clock
    }

    fn insert(&mut self, title: &str, question: &str) -> DoubtId {
        let id = DoubtId(self.next_id);
        self.next_id += 1;
        let tick = self.tick();
        self.doubts.push(StoredDoubt {
            doubt: Doubt {
                id,
                title: title.to_string(),
                status: DoubtStatus::Open,
                updated_at: Some(timestamp(tick)),
                created_at: Some(timestamp(tick)),
                resolution_notes: None,
            },
            messages: vec![DoubtMessage::new(Sender::User, question)],
            tick,
            pending_reply: None,
        });
        id
    }

    fn find_mut(&mut self, id: DoubtId) -> Option<&mut StoredDoubt> {
        self.doubts.iter_mut().find(|s| s.doubt.id == id)
    }

    fn touch(&mut self, id: DoubtId) {
        let tick = self.tick();
        if let Some(stored) = self.find_mut(id) {
            stored.tick = tick;
            stored.doubt.updated_at = Some(timestamp(tick));
        }
    }
}

fn not_found() -> ApiError {
    ApiError::Backend {
        status: 404,
        message: "Doubt not found".to_string(),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let _state = self.enter("login")?;
        if password != "secret" {
            return Err(ApiError::Backend {
                status: 401,
                message: "Invalid credentials".to_string(),
            });
        }
        Ok(Identity {
            user_id: 42,
            email: email.to_string(),
        })
    }

    async fn fetch_user(&self, _identity: &Identity) -> Result<UserProfile, ApiError> {
        let _state = self.enter("fetch_user")?;
        Ok(UserProfile {
            name: Some("Asha".to_string()),
            field_of_study: Some("Mathematics".to_string()),
            ..Default::default()
        })
    }

    async fn career_summary(
        &self,
        _profile: &UserProfile,
        _identity: &Identity,
    ) -> Result<Option<String>, ApiError> {
        let state = self.enter("career_summary")?;
        Ok(state.summary.clone())
    }

    async fn chat(&self, message: &str, _identity: &Identity) -> Result<String, ApiError> {
        let _state = self.enter("chat")?;
        Ok(format!("Echo: {message}"))
    }

    async fn list_doubts(
        &self,
        _identity: &Identity,
        filter: StatusFilter,
    ) -> Result<Vec<Doubt>, ApiError> {
        let state = self.enter("list_doubts")?;
        let mut matching: Vec<&StoredDoubt> = state
            .doubts
            .iter()
            .filter(|s| filter.as_query().map_or(true, |q| s.doubt.status.as_str() == q))
            .collect();
        matching.sort_by(|a, b| b.tick.cmp(&a.tick));
        Ok(matching.into_iter().map(|s| s.doubt.clone()).collect())
    }

    async fn create_doubt(
        &self,
        _identity: &Identity,
        title: &str,
        question: &str,
    ) -> Result<Option<DoubtId>, ApiError> {
        let mut state = self.enter("create_doubt")?;
        let id = state.insert(title, question);
        if let Some(stored) = state.find_mut(id) {
            stored.pending_reply = Some((AUTO_REPLY_DELAY, format!("## {title}\n- Subtract **1** from both sides")));
        }
        Ok(Some(id))
    }

    async fn get_thread(&self, _identity: &Identity, id: DoubtId) -> Result<DoubtThread, ApiError> {
        let mut state = self.enter("get_thread")?;
        let stored = state.find_mut(id).ok_or_else(not_found)?;

        if let Some((remaining, reply)) = stored.pending_reply.take() {
            if remaining <= 1 {
                stored.messages.push(DoubtMessage::new(Sender::Bot, &reply));
            } else {
                stored.pending_reply = Some((remaining - 1, reply));
            }
        }

        Ok(DoubtThread {
            doubt: stored.doubt.clone(),
            messages: stored.messages.clone(),
        })
    }

    async fn reply(
        &self,
        _identity: &Identity,
        id: DoubtId,
        message: &str,
        use_ai: bool,
    ) -> Result<Vec<DoubtMessage>, ApiError> {
        let mut state = self.enter("reply")?;
        let stored = state.find_mut(id).ok_or_else(not_found)?;
        stored.messages.push(DoubtMessage::new(Sender::User, message));
        if use_ai {
            stored
                .messages
                .push(DoubtMessage::new(Sender::Bot, "**Answer:** keep going"));
        }
        let messages = stored.messages.clone();
        state.touch(id);
        Ok(messages)
    }

    async fn resolve(&self, _identity: &Identity, id: DoubtId, notes: &str) -> Result<(), ApiError> {
        let mut state = self.enter("resolve")?;
        let stored = state.find_mut(id).ok_or_else(not_found)?;
        stored.doubt.status = DoubtStatus::Resolved;
        stored.doubt.resolution_notes = Some(notes.to_string()).filter(|n| !n.is_empty());
        state.touch(id);
        Ok(())
    }
}
