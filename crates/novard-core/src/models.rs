//! Wire types shared with the Novard backend
//!
//! These mirror the JSON the backend returns. Unknown fields are ignored so
//! backend additions never break the client.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned doubt identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoubtId(pub i64);

impl fmt::Display for DoubtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoubtStatus {
    Open,
    Resolved,
}

impl DoubtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoubtStatus::Open => "open",
            DoubtStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for DoubtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which doubts the list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    Open,
    Resolved,
    All,
}

impl StatusFilter {
    /// Value of the `status` query parameter; `None` means unfiltered.
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            StatusFilter::Open => Some("open"),
            StatusFilter::Resolved => Some("resolved"),
            StatusFilter::All => None,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            StatusFilter::Open => StatusFilter::Resolved,
            StatusFilter::Resolved => StatusFilter::All,
            StatusFilter::All => StatusFilter::Open,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StatusFilter::Open => "Open",
            StatusFilter::Resolved => "Resolved",
            StatusFilter::All => "All",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doubt {
    pub id: DoubtId,
    pub title: String,
    pub status: DoubtStatus,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub resolution_notes: Option<String>,
}

impl Doubt {
    /// `updated_at` in local time, or a dash when the backend sent none.
    pub fn updated_display(&self) -> String {
        self.updated_at
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Backend timestamps are RFC 2822 (Flask's JSON encoding of datetimes).
/// Anything unparseable is shown as sent.
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    Mentor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubtMessage {
    #[serde(default)]
    pub id: Option<i64>,
    pub sender: Sender,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl DoubtMessage {
    pub fn new(sender: Sender, message: &str) -> Self {
        Self {
            id: None,
            sender,
            message: message.to_string(),
            created_at: None,
        }
    }
}

/// `GET /api/doubts/{id}` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DoubtThread {
    pub doubt: Doubt,
    #[serde(default)]
    pub messages: Vec<DoubtMessage>,
}

/// Student profile as stored by the backend. Fields the client does not know
/// about are carried in `extra` and sent back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_qualification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_skills: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career_interests: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_job_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strengths: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_term_goals: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubt_list_payload() {
        let json = r#"{"doubts": [
            {"id": 7, "title": "Algebra", "status": "open",
             "created_at": "Thu, 16 Oct 2025 10:00:00 GMT",
             "updated_at": "Thu, 16 Oct 2025 10:05:00 GMT"}
        ]}"#;
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        let doubts: Vec<Doubt> = serde_json::from_value(value["doubts"].clone()).unwrap();
        assert_eq!(doubts[0].id, DoubtId(7));
        assert_eq!(doubts[0].status, DoubtStatus::Open);
        assert!(doubts[0].resolution_notes.is_none());
    }

    #[test]
    fn test_thread_payload_with_mentor() {
        let json = r#"{
            "doubt": {"id": 3, "user_id": 1, "title": "Loops", "status": "resolved",
                      "resolution_notes": null},
            "messages": [
                {"id": 1, "sender": "user", "message": "why?", "created_at": "x"},
                {"id": 2, "sender": "mentor", "message": "because", "created_at": "y"}
            ]
        }"#;
        let thread: DoubtThread = serde_json::from_str(json).unwrap();
        assert_eq!(thread.doubt.status, DoubtStatus::Resolved);
        assert_eq!(thread.messages[1].sender, Sender::Mentor);
    }

    #[test]
    fn test_profile_keeps_unknown_fields() {
        let json = r#"{"name": "Asha", "user_id": 4, "id": 9, "strengths": "math"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Asha"));
        assert_eq!(profile.extra["user_id"], serde_json::json!(4));

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["id"], serde_json::json!(9));
        assert!(back.get("email").is_none());
    }

    #[test]
    fn test_filter_cycle_and_query() {
        assert_eq!(StatusFilter::Open.next(), StatusFilter::Resolved);
        assert_eq!(StatusFilter::All.next(), StatusFilter::Open);
        assert_eq!(StatusFilter::All.as_query(), None);
        assert_eq!(StatusFilter::Resolved.as_query(), Some("resolved"));
        let parsed: StatusFilter = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(parsed, StatusFilter::All);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        let shown = format_timestamp("Thu, 16 Oct 2025 10:05:00 GMT");
        assert_eq!(shown.len(), "2025-10-16 10:05".len());
        assert!(shown.starts_with("2025-10-1"));
    }
}
