use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{DialogueState, Intent, Message, ThemeKey};
use crate::services::conversation::{Assistant, Notice};
use crate::services::speech_input::ListenOutcome;
use crate::state::AppState;

pub async fn dev_page() -> Html<&'static str> {
    Html(include_str!("../web/dev_chat.html"))
}

#[derive(Serialize)]
pub struct SessionView {
    pub messages: Vec<Message>,
    pub theme: ThemeKey,
    pub dialogue_state: DialogueState,
    pub voice_enabled: bool,
    pub speaking: bool,
    pub listening: bool,
    pub speech_supported: bool,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_messages: Option<u32>,
    pub daily_limit: u32,
    pub limit_reached: bool,
}

impl SessionView {
    fn of(assistant: &Assistant, daily_limit: u32) -> Self {
        Self {
            messages: assistant.history().to_vec(),
            theme: assistant.theme(),
            dialogue_state: assistant.dialogue_state(),
            voice_enabled: assistant.voice_enabled(),
            speaking: assistant.is_speaking(),
            listening: assistant.is_listening(),
            speech_supported: assistant.speech_supported(),
            input: assistant.input_field().to_string(),
            remaining_messages: assistant.remaining_messages(),
            daily_limit,
            limit_reached: assistant.limit_reached(),
        }
    }
}

// GET /api/dev/history
pub async fn get_history(State(state): State<Arc<AppState>>) -> Result<Json<SessionView>, AppError> {
    let assistant = state.assistant()?;
    Ok(Json(SessionView::of(&assistant, state.config.daily_limit)))
}

// POST /api/dev/turn
#[derive(Deserialize)]
pub struct TurnRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct TurnResponse {
    pub intent: Option<Intent>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
    pub billable: bool,
    pub dialogue_state: DialogueState,
    pub speaking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_messages: Option<u32>,
}

pub async fn send_turn(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let mut assistant = state.assistant()?;

    // What was sent supersedes whatever dictation left in the field.
    assistant.take_input();
    let outcome = assistant.process_turn(&payload.message).await;

    Ok(Json(TurnResponse {
        intent: outcome.intent,
        messages: outcome.messages,
        notices: outcome.notices,
        billable: outcome.billable,
        dialogue_state: assistant.dialogue_state(),
        speaking: assistant.is_speaking(),
        remaining_messages: assistant.remaining_messages(),
    }))
}

// POST /api/dev/voice
#[derive(Deserialize)]
pub struct VoiceToggle {
    pub enabled: bool,
}

// Takes effect even mid-turn: no assistant lock.
pub async fn set_voice(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VoiceToggle>,
) -> Json<serde_json::Value> {
    state.voice.set_enabled(payload.enabled);
    tracing::info!(enabled = payload.enabled, "voice output toggled");
    Json(serde_json::json!({
        "voice_enabled": state.voice.is_enabled(),
        "speaking": state.voice.is_speaking(),
    }))
}

// POST /api/dev/voice/stop
pub async fn stop_voice(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.voice.cancel();
    Json(serde_json::json!({ "speaking": state.voice.is_speaking() }))
}

// POST /api/dev/listen
#[derive(Serialize)]
pub struct ListenResponse {
    pub outcome: &'static str,
    pub listening: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

pub async fn toggle_listening(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListenResponse>, AppError> {
    let mut assistant = state.assistant()?;
    let (outcome, notice) = assistant.toggle_listening();

    let outcome = match outcome {
        ListenOutcome::Started => "started",
        ListenOutcome::Stopped => "stopped",
        ListenOutcome::Unsupported { .. } => "unsupported",
    };

    Ok(Json(ListenResponse {
        outcome,
        listening: assistant.is_listening(),
        notice,
    }))
}

// POST /api/dev/transcript
#[derive(Deserialize)]
pub struct TranscriptEvent {
    pub transcript: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub ended: bool,
}

pub async fn speech_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TranscriptEvent>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut assistant = state.assistant()?;

    if let Some(transcript) = payload.transcript.as_deref() {
        assistant.on_transcript(transcript);
    } else if let Some(error) = payload.error.as_deref() {
        assistant.on_speech_error(error);
    } else if payload.ended {
        assistant.on_speech_end();
    }

    Ok(Json(serde_json::json!({
        "input": assistant.input_field(),
        "listening": assistant.is_listening(),
    })))
}

// POST /api/dev/playback/ended
#[derive(Deserialize)]
pub struct PlaybackEnded {
    pub id: u64,
}

pub async fn playback_ended(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaybackEnded>,
) -> Json<serde_json::Value> {
    state.relay.playback_ended(payload.id);
    Json(serde_json::json!({ "ok": true }))
}

// POST /api/dev/consent
#[derive(Deserialize)]
pub struct ConsentUpdate {
    pub name: String,
    pub granted: bool,
}

pub async fn set_consent(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConsentUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    {
        let conn = db::lock(&state.db)?;
        queries::set_consent(&conn, &payload.name, payload.granted)?;
    }
    tracing::info!(name = %payload.name, granted = payload.granted, "consent updated");
    Ok(Json(serde_json::json!({ "ok": true })))
}
