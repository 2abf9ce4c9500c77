use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_chat_role(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion_tags: Option<Vec<String>>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into(), None)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Role::Bot, text.into(), None)
    }

    pub fn suggestions(text: impl Into<String>, tags: Vec<String>) -> Self {
        Self::new(Role::Bot, text.into(), Some(tags))
    }

    fn new(role: Role, text: String, suggestion_tags: Option<Vec<String>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text,
            timestamp: Utc::now(),
            suggestion_tags,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn window(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn render_window(&self, n: usize) -> String {
        self.window(n)
            .iter()
            .map(|m| {
                let who = match m.role {
                    Role::User => "Visiteur",
                    Role::Bot => "Assistant",
                };
                format!("{who}: {}", m.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
