use std::env;

use crate::services::conversation::AssistantConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub store_path: String,
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub daily_limit: u32,
    pub admin_mode: bool,
    pub voice_enabled: bool,
    pub speech_input: bool,
    pub local_synthesis: bool,
    pub contact_email: String,
    pub contact_phone: String,
    pub profile_context: String,
    pub history_window: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            store_path: env::var("STORE_PATH").unwrap_or_else(|_| "assistant.db".to_string()),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            daily_limit: env::var("DAILY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            admin_mode: flag("ADMIN_MODE", false),
            voice_enabled: flag("VOICE_ENABLED", true),
            speech_input: flag("SPEECH_INPUT", true),
            local_synthesis: flag("LOCAL_SYNTHESIS", true),
            contact_email: env::var("CONTACT_EMAIL")
                .unwrap_or_else(|_| "contact@example.com".to_string()),
            contact_phone: env::var("CONTACT_PHONE")
                .unwrap_or_else(|_| "+33 6 00 00 00 00".to_string()),
            profile_context: env::var("PROFILE_CONTEXT").unwrap_or_else(|_| {
                "Consultant en automatisation et intelligence artificielle.".to_string()
            }),
            history_window: env::var("HISTORY_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }

    pub fn assistant(&self) -> AssistantConfig {
        AssistantConfig {
            daily_limit: self.daily_limit,
            admin_mode: self.admin_mode,
            voice_enabled: self.voice_enabled,
            contact_email: self.contact_email.clone(),
            contact_phone: self.contact_phone.clone(),
            profile_context: self.profile_context.clone(),
            history_window: self.history_window,
        }
    }
}

fn flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
