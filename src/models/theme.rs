use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKey {
    Light,
    Dark,
}

impl ThemeKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeKey::Light => "light",
            ThemeKey::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(ThemeKey::Light),
            "dark" => Some(ThemeKey::Dark),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ThemeKey::Light => ThemeKey::Dark,
            ThemeKey::Dark => ThemeKey::Light,
        }
    }
}
