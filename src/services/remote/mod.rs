pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{AudioClip, Message};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(m: &Message) -> Self {
        Self {
            role: m.role.as_chat_role().to_string(),
            content: m.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Vec<HistoryEntry>,
    pub profile_context: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub full_name: String,
    pub email: String,
    pub company: String,
    pub phone: String,
    pub preferred_slot: String,
    pub message: String,
    pub source: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaTopic {
    Profile,
    Analytics,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<String>;
    async fn ask(&self, topic: QaTopic, question: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait AppointmentProvider: Send + Sync {
    async fn create_appointment(&self, request: &AppointmentRequest) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(&self, text: &str) -> anyhow::Result<AudioClip>;
}
