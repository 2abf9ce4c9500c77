use serde::{Deserialize, Serialize};

// Declaration order is routing priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AppointmentContinuation,
    AppointmentRequest,
    ThemeChange,
    RecruiterIntroduction,
    ProfileQuestion,
    AnalyticsQuestion,
    AutomationTopic,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::AppointmentContinuation => "appointment_continuation",
            Intent::AppointmentRequest => "appointment_request",
            Intent::ThemeChange => "theme_change",
            Intent::RecruiterIntroduction => "recruiter_introduction",
            Intent::ProfileQuestion => "profile_question",
            Intent::AnalyticsQuestion => "analytics_question",
            Intent::AutomationTopic => "automation_topic",
        }
    }
}
