use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDraft {
    pub full_name: String,
    pub email: String,
    pub company: String,
    pub phone: String,
    pub preferred_slot: String,
    pub initial_intent: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    #[default]
    Idle,
    CollectingName,
    CollectingEmail,
    CollectingCompany,
    CollectingPhone,
    CollectingSlot,
    Submitting,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Idle => "idle",
            DialogueState::CollectingName => "collecting_name",
            DialogueState::CollectingEmail => "collecting_email",
            DialogueState::CollectingCompany => "collecting_company",
            DialogueState::CollectingPhone => "collecting_phone",
            DialogueState::CollectingSlot => "collecting_slot",
            DialogueState::Submitting => "submitting",
        }
    }
}
