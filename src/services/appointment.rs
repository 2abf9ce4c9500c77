use std::sync::LazyLock;

use regex::Regex;

use crate::models::{AppointmentDraft, DialogueState};

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

const PROMPT_NAME: &str =
    "Avec plaisir ! Pour organiser ce rendez-vous, quel est votre nom complet ?";
const PROMPT_EMAIL: &str = "Merci ! Quelle est votre adresse e-mail ?";
const PROMPT_EMAIL_INVALID: &str =
    "Cette adresse e-mail ne semble pas valide. Pouvez-vous la vérifier ? (ex : nom@domaine.com)";
const PROMPT_COMPANY: &str =
    "Pour quelle entreprise travaillez-vous ? (répondez « aucune » si ce n'est pas le cas)";
const PROMPT_PHONE: &str =
    "Un numéro de téléphone pour vous joindre ? (répondez « non » pour passer cette étape)";
const PROMPT_SLOT: &str = "Quel créneau vous conviendrait ? (ex : mardi 14h)";
const PROMPT_SUBMITTING: &str = "Votre demande est en cours d'envoi, un instant…";

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Prompt(String),
    // Submitted exactly once.
    Submit(AppointmentDraft),
    Inactive,
}

#[derive(Debug, Default)]
pub struct AppointmentDialogue {
    state: DialogueState,
    draft: Option<AppointmentDraft>,
}

impl AppointmentDialogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    pub fn draft(&self) -> Option<&AppointmentDraft> {
        self.draft.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state != DialogueState::Idle
    }

    pub fn start(&mut self, initial_text: &str) -> String {
        if self.is_active() {
            return self.current_prompt().to_string();
        }

        self.draft = Some(AppointmentDraft {
            initial_intent: initial_text.trim().to_string(),
            ..AppointmentDraft::default()
        });
        self.state = DialogueState::CollectingName;
        tracing::info!(state = self.state.as_str(), "appointment dialogue started");
        PROMPT_NAME.to_string()
    }

    pub fn advance(&mut self, input: &str) -> Step {
        let input = input.trim();
        let Some(draft) = self.draft.as_mut() else {
            return Step::Inactive;
        };

        if input.is_empty() {
            return Step::Prompt(current_prompt(self.state).to_string());
        }

        let (next, prompt) = match self.state {
            DialogueState::Idle => return Step::Inactive,
            DialogueState::Submitting => return Step::Prompt(PROMPT_SUBMITTING.to_string()),
            DialogueState::CollectingName => {
                draft.full_name = input.to_string();
                (DialogueState::CollectingEmail, PROMPT_EMAIL)
            }
            DialogueState::CollectingEmail => {
                if !is_valid_email(input) {
                    return Step::Prompt(PROMPT_EMAIL_INVALID.to_string());
                }
                draft.email = input.to_string();
                (DialogueState::CollectingCompany, PROMPT_COMPANY)
            }
            DialogueState::CollectingCompany => {
                draft.company = if input.eq_ignore_ascii_case("aucune") {
                    String::new()
                } else {
                    input.to_string()
                };
                (DialogueState::CollectingPhone, PROMPT_PHONE)
            }
            DialogueState::CollectingPhone => {
                draft.phone = if input.eq_ignore_ascii_case("non") {
                    String::new()
                } else {
                    input.to_string()
                };
                (DialogueState::CollectingSlot, PROMPT_SLOT)
            }
            DialogueState::CollectingSlot => {
                draft.preferred_slot = input.to_string();
                self.state = DialogueState::Submitting;
                tracing::info!(state = self.state.as_str(), "appointment draft complete");
                return Step::Submit(draft.clone());
            }
        };

        self.state = next;
        Step::Prompt(prompt.to_string())
    }

    pub fn complete(&mut self) -> Option<AppointmentDraft> {
        self.state = DialogueState::Idle;
        self.draft.take()
    }

    pub fn current_prompt(&self) -> &'static str {
        current_prompt(self.state)
    }
}

fn current_prompt(state: DialogueState) -> &'static str {
    match state {
        DialogueState::Idle | DialogueState::CollectingName => PROMPT_NAME,
        DialogueState::CollectingEmail => PROMPT_EMAIL,
        DialogueState::CollectingCompany => PROMPT_COMPANY,
        DialogueState::CollectingPhone => PROMPT_PHONE,
        DialogueState::CollectingSlot => PROMPT_SLOT,
        DialogueState::Submitting => PROMPT_SUBMITTING,
    }
}

pub fn is_valid_email(input: &str) -> bool {
    EMAIL_SHAPE.is_match(input)
}
