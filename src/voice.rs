//! Voice Type and built-in catalogue
//!
//! The backend accepts any voice name and validates it itself. [thai_voices]
//! lists the voices the relay is known to serve.

use crate::constants;

/// A voice profile the backend can synthesize with.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Voice {
    /// Voice id sent to the backend, e.g. `th-TH-PremwadeeNeural`.
    pub name: String,
    pub label: Option<String>,
    pub gender: Option<Gender>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Gender {
    Female,
    Male,
}

impl From<String> for Voice {
    fn from(voice_name: String) -> Self {
        Self {
            name: voice_name,
            label: None,
            gender: None,
            locale: None,
        }
    }
}

impl From<&str> for Voice {
    fn from(voice_name: &str) -> Self {
        voice_name.to_string().into()
    }
}

impl Default for Voice {
    fn default() -> Self {
        thai_voices()
            .into_iter()
            .find(|voice| voice.name == constants::DEFAULT_VOICE)
            .unwrap_or_else(|| constants::DEFAULT_VOICE.into())
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} ({})", self.name, label),
            None => f.write_str(&self.name),
        }
    }
}

/// Thai neural voices served by the relay.
pub fn thai_voices() -> Vec<Voice> {
    [
        ("th-TH-PremwadeeNeural", "Premwadee", Gender::Female),
        ("th-TH-NiwatNeural", "Niwat", Gender::Male),
        ("th-TH-AcharaNeural", "Achara", Gender::Female),
    ]
    .into_iter()
    .map(|(name, label, gender)| Voice {
        name: name.to_string(),
        label: Some(label.to_string()),
        gender: Some(gender),
        locale: Some("th-TH".to_string()),
    })
    .collect()
}

/// Find a catalogue voice by full name or by label, ignoring case.
pub fn find_voice(query: &str) -> Option<Voice> {
    thai_voices().into_iter().find(|voice| {
        voice.name.eq_ignore_ascii_case(query)
            || voice
                .label
                .as_deref()
                .is_some_and(|label| label.eq_ignore_ascii_case(query))
    })
}
