pub mod api;
pub mod chat;
pub mod config;
pub mod doubts;
pub mod error;
pub mod markdown;
pub mod models;
pub mod ocr;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use api::{Backend, BackendClient};
pub use chat::ChatSession;
pub use config::Config;
pub use doubts::{DetailBody, DetailPanel, DoubtController, DoubtRow, ListPanel, MessageView};
pub use error::{ApiError, DoubtError, SessionError};
pub use models::{Doubt, DoubtId, DoubtMessage, DoubtStatus, Sender, StatusFilter, UserProfile};
pub use ocr::{OcrStatus, TesseractCli, TextExtractor};
pub use session::{Identity, SessionStore};
pub use state::{ChatEntry, ChatSender};
