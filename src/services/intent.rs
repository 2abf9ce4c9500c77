use crate::models::{Intent, ThemeKey};

const APPOINTMENT_PHRASES: &[&str] = &[
    "rendez-vous",
    "rendez vous",
    "rdv",
    "réserver",
    "reserver",
    "planifier un appel",
    "prendre un appel",
    "disponibilité",
    "disponibilite",
    "réunion",
    "reunion",
    "appointment",
    "book a call",
    "schedule a call",
    "meeting",
];

const THEME_PHRASES: &[&str] = &[
    "thème",
    "theme",
    "mode sombre",
    "mode clair",
    "mode nuit",
    "mode jour",
    "dark mode",
    "light mode",
];

const RECRUITER_PHRASES: &[&str] = &[
    "recruteur",
    "recruteuse",
    "recrutement",
    "recruiter",
    "hiring",
    "embauche",
    "embaucher",
    "offre d'emploi",
    "ton cv",
    "votre cv",
];

const PROFILE_PHRASES: &[&str] = &[
    "qui es-tu",
    "qui êtes-vous",
    "qui etes-vous",
    "présente-toi",
    "presente-toi",
    "parcours",
    "expérience",
    "experience",
    "compétence",
    "competence",
    "skills",
    "ta formation",
    "votre formation",
    "tes formations",
    "vos formations",
    "tes études",
    "vos études",
    "projet",
    "about you",
];

const ANALYTICS_PHRASES: &[&str] = &[
    "statistique",
    "stats",
    "analytics",
    "visiteur",
    "visites",
    "trafic",
    "traffic",
    "audience",
];

const AUTOMATION_PHRASES: &[&str] = &[
    "automatisation",
    "automatiser",
    "automation",
    "workflow",
    "n8n",
    "zapier",
    "make.com",
    "agent ia",
    "chatbot",
];

// First match wins.
const CLASSIFIERS: &[(Intent, &[&str])] = &[
    (Intent::AppointmentRequest, APPOINTMENT_PHRASES),
    (Intent::ThemeChange, THEME_PHRASES),
    (Intent::RecruiterIntroduction, RECRUITER_PHRASES),
    (Intent::ProfileQuestion, PROFILE_PHRASES),
    (Intent::AnalyticsQuestion, ANALYTICS_PHRASES),
    (Intent::AutomationTopic, AUTOMATION_PHRASES),
];

const DARK_MARKERS: &[&str] = &["sombre", "dark", "nuit", "noir"];
const LIGHT_MARKERS: &[&str] = &["clair", "light", "mode jour", "blanc"];

// An active dialogue takes every input, so a booking cannot restart mid-flow.
pub fn route(text: &str, dialogue_active: bool) -> Option<Intent> {
    if dialogue_active {
        return Some(Intent::AppointmentContinuation);
    }

    let lowered = text.to_lowercase();
    CLASSIFIERS
        .iter()
        .find(|(_, phrases)| contains_any(&lowered, phrases))
        .map(|(intent, _)| *intent)
}

pub fn requested_theme(text: &str) -> Option<ThemeKey> {
    let lowered = text.to_lowercase();
    if contains_any(&lowered, DARK_MARKERS) {
        Some(ThemeKey::Dark)
    } else if contains_any(&lowered, LIGHT_MARKERS) {
        Some(ThemeKey::Light)
    } else {
        None
    }
}

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| haystack.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_dialogue_forces_continuation() {
        for text in ["mode sombre", "je suis recruteur", "", "rendez-vous", "jean@ex.com"] {
            assert_eq!(route(text, true), Some(Intent::AppointmentContinuation));
        }
    }

    #[test]
    fn test_each_classifier() {
        assert_eq!(route("Je voudrais prendre RDV", false), Some(Intent::AppointmentRequest));
        assert_eq!(route("Passe en mode sombre", false), Some(Intent::ThemeChange));
        assert_eq!(route("Bonjour, je suis recruteuse", false), Some(Intent::RecruiterIntroduction));
        assert_eq!(route("Quel est ton parcours ?", false), Some(Intent::ProfileQuestion));
        assert_eq!(route("Combien de visiteurs ce mois-ci ?", false), Some(Intent::AnalyticsQuestion));
        assert_eq!(route("Tu fais de l'automatisation ?", false), Some(Intent::AutomationTopic));
        assert_eq!(route("Quelle heure est-il ?", false), None);
    }

    #[test]
    fn test_priority_order_breaks_overlaps() {
        // Recruiter and appointment both match; appointment ranks first.
        assert_eq!(
            route("Je suis recruteur, on peut fixer un rendez-vous ?", false),
            Some(Intent::AppointmentRequest)
        );
        // Profile and automation both match; profile ranks first.
        assert_eq!(
            route("Parle-moi de ton expérience en automatisation", false),
            Some(Intent::ProfileQuestion)
        );
    }

    #[test]
    fn test_words_containing_a_phrase_stem_do_not_match() {
        assert_eq!(route("Je cherche des informations sur vos tarifs", false), None);
        assert_eq!(route("On parle de transformation digitale ?", false), None);
        assert_eq!(
            route("Transformation digitale et automatisation", false),
            Some(Intent::AutomationTopic)
        );
        assert_eq!(route("Quelle est votre formation ?", false), Some(Intent::ProfileQuestion));
    }

    #[test]
    fn test_classifier_table_follows_intent_order() {
        let order: Vec<Intent> = CLASSIFIERS.iter().map(|(i, _)| *i).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_requested_theme() {
        assert_eq!(requested_theme("mode SOMBRE stp"), Some(ThemeKey::Dark));
        assert_eq!(requested_theme("light mode"), Some(ThemeKey::Light));
        assert_eq!(requested_theme("change le thème"), None);
    }
}
