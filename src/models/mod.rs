pub mod appointment;
pub mod audio;
pub mod intent;
pub mod message;
pub mod theme;
pub mod usage;

pub use appointment::{AppointmentDraft, DialogueState};
pub use audio::AudioClip;
pub use intent::Intent;
pub use message::{ConversationContext, Message, Role};
pub use theme::ThemeKey;
pub use usage::UsageRecord;
