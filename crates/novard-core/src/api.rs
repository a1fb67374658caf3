//! HTTP client for the Novard backend
//!
//! Every endpoint goes through [`Backend`] so the doubt controller and the
//! chat session can run against an in-memory fake in tests.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::{Doubt, DoubtId, DoubtMessage, DoubtThread, StatusFilter, UserProfile};
use crate::session::Identity;

#[async_trait]
pub trait Backend: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Identity, ApiError>;

    async fn fetch_user(&self, identity: &Identity) -> Result<UserProfile, ApiError>;

    /// `None` when the backend answered without a summary.
    async fn career_summary(
        &self,
        profile: &UserProfile,
        identity: &Identity,
    ) -> Result<Option<String>, ApiError>;

    async fn chat(&self, message: &str, identity: &Identity) -> Result<String, ApiError>;

    async fn list_doubts(
        &self,
        identity: &Identity,
        filter: StatusFilter,
    ) -> Result<Vec<Doubt>, ApiError>;

    async fn create_doubt(
        &self,
        identity: &Identity,
        title: &str,
        question: &str,
    ) -> Result<Option<DoubtId>, ApiError>;

    async fn get_thread(&self, identity: &Identity, id: DoubtId) -> Result<DoubtThread, ApiError>;

    /// Returns the whole thread after the reply (and AI answer, if asked for).
    async fn reply(
        &self,
        identity: &Identity,
        id: DoubtId,
        message: &str,
        use_ai: bool,
    ) -> Result<Vec<DoubtMessage>, ApiError>;

    async fn resolve(&self, identity: &Identity, id: DoubtId, notes: &str) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    user_id: i64,
    email: String,
}

#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    user_id: i64,
    email: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct DoubtListResponse {
    #[serde(default)]
    doubts: Vec<Doubt>,
}

#[derive(Serialize)]
struct CreateDoubtRequest<'a> {
    user_id: i64,
    title: &'a str,
    question: &'a str,
}

#[derive(Deserialize)]
struct CreateDoubtResponse {
    #[serde(default)]
    doubt_id: Option<DoubtId>,
}

#[derive(Serialize)]
struct ReplyRequest<'a> {
    user_id: i64,
    message: &'a str,
    use_ai: bool,
}

#[derive(Deserialize)]
struct ReplyResponse {
    #[serde(default)]
    messages: Vec<DoubtMessage>,
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    user_id: i64,
    resolution_notes: &'a str,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        fallback: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.client.get(&url).query(query).send().await?;
        decode(response, fallback).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        decode(response, fallback).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = error_message(&body, fallback);
        warn!(status = status.as_u16(), %message, "backend request failed");
        return Err(ApiError::Backend {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// The body's `error` string if there is one, else `fallback`.
fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Profile fields plus `user_id` and `email`, which override any copies
/// already inside the profile.
fn summary_body(profile: &UserProfile, identity: &Identity) -> Result<Value, ApiError> {
    let mut body = serde_json::to_value(profile).map_err(|e| ApiError::Decode(e.to_string()))?;
    if let Value::Object(map) = &mut body {
        map.insert("user_id".to_string(), Value::from(identity.user_id));
        map.insert("email".to_string(), Value::from(identity.email.clone()));
    }
    Ok(body)
}

#[async_trait]
impl Backend for BackendClient {
    async fn login(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let response: LoginResponse = self
            .post_json("/login", &LoginRequest { email, password }, "Login failed")
            .await?;
        Ok(Identity {
            user_id: response.user_id,
            email: response.email,
        })
    }

    async fn fetch_user(&self, identity: &Identity) -> Result<UserProfile, ApiError> {
        self.get_json(
            &format!("/api/user/{}", identity.user_id),
            &[],
            "Failed to fetch user data",
        )
        .await
    }

    async fn career_summary(
        &self,
        profile: &UserProfile,
        identity: &Identity,
    ) -> Result<Option<String>, ApiError> {
        let body = summary_body(profile, identity)?;
        let response: SummaryResponse = self
            .post_json("/career_summary", &body, "Failed to generate career summary")
            .await?;
        Ok(response.summary.filter(|s| !s.trim().is_empty()))
    }

    async fn chat(&self, message: &str, identity: &Identity) -> Result<String, ApiError> {
        let request = ChatRequest {
            message,
            user_id: identity.user_id,
            email: &identity.email,
        };
        let response: ChatResponse = self
            .post_json("/chatbot", &request, "Failed to get bot response")
            .await?;
        Ok(response.response)
    }

    async fn list_doubts(
        &self,
        identity: &Identity,
        filter: StatusFilter,
    ) -> Result<Vec<Doubt>, ApiError> {
        let mut query = vec![("user_id", identity.user_id.to_string())];
        if let Some(status) = filter.as_query() {
            query.push(("status", status.to_string()));
        }
        let response: DoubtListResponse = self
            .get_json("/api/doubts", &query, "Failed to load doubts")
            .await?;
        Ok(response.doubts)
    }

    async fn create_doubt(
        &self,
        identity: &Identity,
        title: &str,
        question: &str,
    ) -> Result<Option<DoubtId>, ApiError> {
        let request = CreateDoubtRequest {
            user_id: identity.user_id,
            title,
            question,
        };
        let response: CreateDoubtResponse = self
            .post_json("/api/doubts", &request, "Failed to create doubt")
            .await?;
        Ok(response.doubt_id)
    }

    async fn get_thread(&self, identity: &Identity, id: DoubtId) -> Result<DoubtThread, ApiError> {
        self.get_json(
            &format!("/api/doubts/{}", id),
            &[("user_id", identity.user_id.to_string())],
            "Failed to load doubt",
        )
        .await
    }

    async fn reply(
        &self,
        identity: &Identity,
        id: DoubtId,
        message: &str,
        use_ai: bool,
    ) -> Result<Vec<DoubtMessage>, ApiError> {
        let request = ReplyRequest {
            user_id: identity.user_id,
            message,
            use_ai,
        };
        let response: ReplyResponse = self
            .post_json(&format!("/api/doubts/{}/reply", id), &request, "Failed to reply")
            .await?;
        Ok(response.messages)
    }

    async fn resolve(&self, identity: &Identity, id: DoubtId, notes: &str) -> Result<(), ApiError> {
        let request = ResolveRequest {
            user_id: identity.user_id,
            resolution_notes: notes,
        };
        let _: Value = self
            .post_json(&format!("/api/doubts/{}/resolve", id), &request, "Failed to resolve")
            .await?;
        Ok(())
    }
}
