use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::db::{self, queries, SharedConnection};
use crate::models::{ConversationContext, DialogueState, Intent, Message, ThemeKey};
use crate::services::appointment::{AppointmentDialogue, Step};
use crate::services::intent;
use crate::services::platform::{AudioOutput, LocalSynthesizer, SpeechRecognizer};
use crate::services::quota::{Clock, UsageGate};
use crate::services::remote::{
    AppointmentProvider, AppointmentRequest, ChatProvider, ChatRequest, HistoryEntry, QaTopic,
    SpeechProvider,
};
use crate::services::speech_input::{ListenOutcome, SpeechInput};
use crate::services::theme::{ThemeBus, ThemeChange};
use crate::services::voice::{AudioCache, VoiceControl, VoicePipeline};

pub const APPOINTMENT_CONTEXT_WINDOW: usize = 8;
const ANALYTICS_CONSENT: &str = "analytics";

const GREETING: &str = "Bonjour 👋 Je suis l'assistant de ce site. Je peux vous parler de mon parcours, \
de mes projets d'automatisation, ou organiser un rendez-vous.";
const SUGGESTION_LEAD: &str = "Vous pouvez aussi :";
const RECRUITER_PITCH: &str = "Ravi d'échanger avec vous ! Je suis consultant en automatisation et en IA, \
disponible pour de nouvelles missions. Je peux vous résumer mon parcours, mes compétences clés, \
ou fixer un échange.";
const AUTOMATION_PITCH: &str = "J'automatise les tâches répétitives : intégrations entre outils, \
workflows n8n ou Make, agents IA branchés sur vos données. Le plus simple est d'en parler \
lors d'un court appel.";

const GREETING_SUGGESTIONS: &[&str] = &["Prendre rendez-vous", "Mon parcours", "Automatisation"];
const PROFILE_SUGGESTIONS: &[&str] = &["Mes projets", "Prendre rendez-vous"];
const RECRUITER_SUGGESTIONS: &[&str] = &["Mon parcours", "Compétences clés", "Prendre rendez-vous"];
const AUTOMATION_SUGGESTIONS: &[&str] = &["Exemples d'automatisations", "Prendre rendez-vous"];
const ANALYTICS_SUGGESTIONS: &[&str] = &["Pages les plus vues", "Prendre rendez-vous"];
const FALLBACK_SUGGESTIONS: &[&str] = &["Prendre rendez-vous", "Mon parcours"];

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub daily_limit: u32,
    pub admin_mode: bool,
    pub voice_enabled: bool,
    pub contact_email: String,
    pub contact_phone: String,
    pub profile_context: String,
    pub history_window: usize,
}

pub struct Collaborators {
    pub chat: Arc<dyn ChatProvider>,
    pub appointments: Arc<dyn AppointmentProvider>,
    pub speech: Arc<dyn SpeechProvider>,
}

pub struct Capabilities {
    pub output: Arc<dyn AudioOutput>,
    pub synthesizer: Option<Arc<dyn LocalSynthesizer>>,
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    LimitReached,
    RemoteUnavailable,
    SpeechUnsupported,
}

#[derive(Debug, Default, Serialize)]
pub struct TurnOutcome {
    pub intent: Option<Intent>,
    pub messages: Vec<Message>,
    pub notices: Vec<Notice>,
    pub billable: bool,
}

struct Reply {
    text: String,
    billable: bool,
    suggestions: &'static [&'static str],
    notice: Option<Notice>,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            billable: false,
            suggestions: &[],
            notice: None,
        }
    }

    fn with_suggestions(mut self, suggestions: &'static [&'static str]) -> Self {
        self.suggestions = suggestions;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum ReplySource {
    Chat,
    Qa(QaTopic),
}

#[derive(Debug, Clone, Copy)]
enum ReplyStrategy {
    Remote(ReplySource),
    ContactFallback,
}

pub struct Assistant {
    config: AssistantConfig,
    chat: Arc<dyn ChatProvider>,
    appointments: Arc<dyn AppointmentProvider>,
    db: SharedConnection,
    history: ConversationContext,
    dialogue: AppointmentDialogue,
    quota: UsageGate,
    voice: VoicePipeline,
    speech: SpeechInput,
    theme_bus: ThemeBus,
    theme_rx: broadcast::Receiver<ThemeChange>,
    theme: ThemeKey,
    recruiter_mode: bool,
    attached: bool,
}

impl Assistant {
    pub fn new(
        config: AssistantConfig,
        collaborators: Collaborators,
        capabilities: Capabilities,
        db: SharedConnection,
        clock: Arc<dyn Clock>,
        theme_bus: ThemeBus,
    ) -> Self {
        let theme = db::lock(&db)
            .and_then(|conn| queries::get_theme_preference(&conn))
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to read theme preference");
                None
            })
            .unwrap_or(ThemeKey::Light);

        let quota = UsageGate::new(db.clone(), clock, config.daily_limit, config.admin_mode);

        let voice = VoicePipeline::new(
            collaborators.speech,
            capabilities.output,
            capabilities.synthesizer,
            AudioCache::default(),
        );
        voice.set_enabled(config.voice_enabled);

        let mut history = ConversationContext::default();
        history.push(Message::bot(GREETING));
        history.push(Message::suggestions(SUGGESTION_LEAD, tags(GREETING_SUGGESTIONS)));

        Self {
            chat: collaborators.chat,
            appointments: collaborators.appointments,
            db,
            history,
            dialogue: AppointmentDialogue::new(),
            quota,
            voice,
            speech: SpeechInput::new(capabilities.recognizer),
            theme_rx: theme_bus.subscribe(),
            theme_bus,
            theme,
            recruiter_mode: false,
            attached: true,
            config,
        }
    }

    pub async fn process_turn(&mut self, input: &str) -> TurnOutcome {
        let text = input.trim();
        let mut outcome = TurnOutcome::default();
        self.sync_theme();

        if text.is_empty() {
            if let Step::Prompt(prompt) = self.dialogue.advance(text) {
                self.append(&mut outcome, Message::bot(prompt));
            }
            return outcome;
        }

        let intent = intent::route(text, self.dialogue.is_active());
        outcome.intent = intent;
        tracing::info!(
            intent = intent.map(|i| i.as_str()).unwrap_or("fallback"),
            dialogue = self.dialogue.state().as_str(),
            "processing turn"
        );
        self.record_interaction(intent);

        // A booking already under way may finish even if the quota ran out.
        let permit = if intent == Some(Intent::AppointmentContinuation) {
            None
        } else {
            match self.quota.check_and_consume() {
                Ok(permit) => Some(permit),
                Err(exceeded) => {
                    self.append(&mut outcome, Message::user(text));
                    let notice = format!(
                        "Vous avez atteint la limite de {} messages pour aujourd'hui. \
                         Revenez demain, ou écrivez-moi à {}.",
                        exceeded.ceiling, self.config.contact_email
                    );
                    self.append(&mut outcome, Message::bot(notice));
                    outcome.notices.push(Notice::LimitReached);
                    return outcome;
                }
            }
        };

        self.append(&mut outcome, Message::user(text));

        let reply = self.dispatch(intent, text).await;

        if reply.billable {
            if let Some(permit) = permit {
                self.quota.consume(permit);
                outcome.billable = true;
            }
        }
        outcome.notices.extend(reply.notice);

        self.append(&mut outcome, Message::bot(reply.text.clone()));
        if !reply.suggestions.is_empty() {
            self.append(
                &mut outcome,
                Message::suggestions(SUGGESTION_LEAD, tags(reply.suggestions)),
            );
        }

        if self.attached {
            self.voice.speak(&reply.text).await;
        }

        outcome
    }

    async fn dispatch(&mut self, intent: Option<Intent>, text: &str) -> Reply {
        match intent {
            Some(Intent::AppointmentContinuation) => self.continue_appointment(text).await,
            Some(Intent::AppointmentRequest) => Reply::plain(self.dialogue.start(text)),
            Some(Intent::ThemeChange) => self.change_theme(text),
            Some(Intent::RecruiterIntroduction) => {
                self.recruiter_mode = true;
                Reply::plain(RECRUITER_PITCH).with_suggestions(RECRUITER_SUGGESTIONS)
            }
            Some(Intent::ProfileQuestion) => self
                .answer(ReplySource::Qa(QaTopic::Profile), text)
                .await
                .with_suggestions(PROFILE_SUGGESTIONS),
            Some(Intent::AnalyticsQuestion) => self
                .answer(ReplySource::Qa(QaTopic::Analytics), text)
                .await
                .with_suggestions(ANALYTICS_SUGGESTIONS),
            Some(Intent::AutomationTopic) => {
                Reply::plain(AUTOMATION_PITCH).with_suggestions(AUTOMATION_SUGGESTIONS)
            }
            None => self
                .answer(ReplySource::Chat, text)
                .await
                .with_suggestions(FALLBACK_SUGGESTIONS),
        }
    }

    async fn continue_appointment(&mut self, text: &str) -> Reply {
        let draft = match self.dialogue.advance(text) {
            Step::Prompt(prompt) => return Reply::plain(prompt),
            Step::Inactive => return Reply::plain(self.dialogue.current_prompt()),
            Step::Submit(draft) => draft,
        };

        let request = AppointmentRequest {
            full_name: draft.full_name.clone(),
            email: draft.email.clone(),
            company: draft.company.clone(),
            phone: draft.phone.clone(),
            preferred_slot: draft.preferred_slot.clone(),
            message: draft.initial_intent.clone(),
            source: "chatbot".to_string(),
            context: self.history.render_window(APPOINTMENT_CONTEXT_WINDOW),
        };

        let result = self.appointments.create_appointment(&request).await;
        self.dialogue.complete();

        match result {
            Ok(()) => {
                tracing::info!(slot = %draft.preferred_slot, "appointment request sent");
                Reply::plain(format!(
                    "Merci {} ! Votre demande de rendez-vous pour « {} » est bien envoyée. \
                     Une confirmation suivra à {}.",
                    draft.full_name, draft.preferred_slot, draft.email
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, "appointment creation failed");
                Reply::plain(format!(
                    "Désolé, votre demande n'a pas pu être envoyée. Contactez-moi directement \
                     à {} ou au {}.",
                    self.config.contact_email, self.config.contact_phone
                ))
            }
        }
    }

    fn change_theme(&mut self, text: &str) -> Reply {
        let theme = intent::requested_theme(text).unwrap_or_else(|| self.theme.toggled());
        self.theme = theme;
        self.theme_bus.emit(theme);

        let label = match theme {
            ThemeKey::Dark => "sombre",
            ThemeKey::Light => "clair",
        };
        Reply::plain(format!("C'est fait, le thème {label} est activé."))
    }

    async fn answer(&self, source: ReplySource, text: &str) -> Reply {
        let chain = [ReplyStrategy::Remote(source), ReplyStrategy::ContactFallback];

        for strategy in chain {
            match self.try_reply(strategy, text).await {
                Ok(reply) => return reply,
                Err(e) => {
                    tracing::warn!(error = %e, strategy = ?strategy, "reply strategy failed, falling through");
                }
            }
        }

        self.contact_fallback()
    }

    async fn try_reply(&self, strategy: ReplyStrategy, text: &str) -> anyhow::Result<Reply> {
        let answer = match strategy {
            ReplyStrategy::ContactFallback => return Ok(self.contact_fallback()),
            ReplyStrategy::Remote(ReplySource::Chat) => self.chat.chat(&self.chat_request(text)).await?,
            ReplyStrategy::Remote(ReplySource::Qa(topic)) => self.chat.ask(topic, text).await?,
        };

        Ok(Reply {
            billable: true,
            ..Reply::plain(answer)
        })
    }

    fn contact_fallback(&self) -> Reply {
        Reply {
            notice: Some(Notice::RemoteUnavailable),
            ..Reply::plain(format!(
                "Je rencontre un souci technique pour vous répondre. Vous pouvez me joindre \
                 directement par e-mail ({}) ou par téléphone ({}).",
                self.config.contact_email, self.config.contact_phone
            ))
        }
    }

    fn chat_request(&self, text: &str) -> ChatRequest {
        // The current user message travels as `message`, not as history.
        let messages = self.history.messages();
        let prior = &messages[..messages.len().saturating_sub(1)];
        let conversation: Vec<HistoryEntry> = prior
            .iter()
            .filter(|m| m.suggestion_tags.is_none())
            .map(HistoryEntry::from)
            .collect();
        let start = conversation.len().saturating_sub(self.config.history_window);

        let mut profile_context = self.config.profile_context.clone();
        if self.recruiter_mode {
            profile_context.push_str(" Le visiteur est un recruteur.");
        }

        ChatRequest {
            message: text.to_string(),
            conversation_history: conversation[start..].to_vec(),
            profile_context,
        }
    }

    fn append(&mut self, outcome: &mut TurnOutcome, message: Message) {
        outcome.messages.push(message.clone());
        self.history.push(message);
    }

    fn sync_theme(&mut self) {
        loop {
            match self.theme_rx.try_recv() {
                Ok(change) => self.theme = change.theme,
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    fn record_interaction(&self, intent: Option<Intent>) {
        let label = intent.map(|i| i.as_str()).unwrap_or("fallback");
        let recorded = db::lock(&self.db).and_then(|conn| {
            if queries::get_consent(&conn, ANALYTICS_CONSENT)? {
                queries::record_chat_event(&conn, label)?;
            }
            Ok(())
        });
        if let Err(e) = recorded {
            tracing::warn!(error = %e, "failed to record chat event");
        }
    }

    // ── Voice and speech input ──

    // Mute and stop go through this handle so they work while a turn holds the assistant.
    pub fn voice_control(&self) -> Arc<VoiceControl> {
        self.voice.control()
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice.is_enabled()
    }

    pub fn is_speaking(&self) -> bool {
        self.voice.is_speaking()
    }

    pub fn toggle_listening(&mut self) -> (ListenOutcome, Option<Notice>) {
        let outcome = self.speech.toggle_listening(&self.voice);
        let notice = match outcome {
            ListenOutcome::Unsupported { first_notice: true } => Some(Notice::SpeechUnsupported),
            _ => None,
        };
        (outcome, notice)
    }

    pub fn is_listening(&self) -> bool {
        self.speech.is_listening()
    }

    pub fn speech_supported(&self) -> bool {
        self.speech.is_supported()
    }

    pub fn on_transcript(&mut self, transcript: &str) {
        self.speech.on_final_transcript(transcript);
    }

    pub fn on_speech_error(&mut self, error: &str) {
        self.speech.on_error(error);
    }

    pub fn on_speech_end(&mut self) {
        self.speech.on_end();
    }

    pub fn input_field(&self) -> &str {
        self.speech.input_field()
    }

    pub fn take_input(&mut self) -> String {
        self.speech.take_input()
    }

    // ── Host view ──

    // Later results still land in history, but nothing is spoken.
    pub fn detach(&mut self) {
        self.attached = false;
        self.voice.cancel();
    }

    pub fn history(&self) -> &[Message] {
        self.history.messages()
    }

    pub fn dialogue_state(&self) -> DialogueState {
        self.dialogue.state()
    }

    pub fn theme(&self) -> ThemeKey {
        self.theme
    }

    pub fn recruiter_mode(&self) -> bool {
        self.recruiter_mode
    }

    pub fn remaining_messages(&self) -> Option<u32> {
        self.quota.remaining()
    }

    pub fn limit_reached(&self) -> bool {
        self.quota.limit_reached()
    }
}

fn tags(suggestions: &[&str]) -> Vec<String> {
    suggestions.iter().map(|s| s.to_string()).collect()
}
