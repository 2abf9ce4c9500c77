use std::sync::LazyLock;

use regex::Regex;

pub const MAX_SPOKEN_CHARS: usize = 500;

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("link pattern is valid"));
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{Extended_Pictographic}\u{FE0F}\u{200D}\u{20E3}]")
        .expect("emoji pattern is valid")
});
static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_#`~>|]").expect("markup pattern is valid"));
static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

pub fn normalize_for_speech(text: &str) -> String {
    let text = LINK.replace_all(text, "$1");
    let text = TAG.replace_all(&text, " ");
    let text = EMOJI.replace_all(&text, "");
    let text = MARKUP.replace_all(&text, "");
    let text = SPACES.replace_all(&text, " ");
    cap(text.trim(), MAX_SPOKEN_CHARS)
}

fn cap(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(idx) if idx > 0 => cut[..idx].to_string(),
        _ => cut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_emoji_and_markup() {
        let spoken = normalize_for_speech("**Bonjour** 👋 ! Voici [mon site](https://ex.com) 🚀✨");
        assert_eq!(spoken, "Bonjour ! Voici mon site");
    }

    #[test]
    fn test_collapses_whitespace_and_tags() {
        assert_eq!(normalize_for_speech("  a\n\n<br/>b\t c  "), "a b c");
    }

    #[test]
    fn test_caps_length_on_word_boundary() {
        let long = "mot ".repeat(200);
        let spoken = normalize_for_speech(&long);
        assert!(spoken.chars().count() <= MAX_SPOKEN_CHARS);
        assert!(spoken.ends_with("mot"));
    }
}
