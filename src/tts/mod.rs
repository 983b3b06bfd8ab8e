//! Client and Stream, SynthesisRequest, Response Type.
#[cfg(feature = "blocking")]
pub mod blocking;
pub mod client;
pub mod stream;

use crate::{
    constants,
    error::{Result, ValidationError},
    voice::Voice,
};
use http::{HeaderMap, header};

/// Text plus voice parameters for one synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_name: String,
    /// Speaking rate adjustment in percent, `-50..=100`.
    pub rate: i32,
    /// Pitch offset in Hz, `-50..=50`.
    pub pitch: i32,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_name: constants::DEFAULT_VOICE.to_string(),
            rate: constants::DEFAULT_RATE,
            pitch: constants::DEFAULT_PITCH,
        }
    }

    pub fn voice(mut self, voice: impl Into<Voice>) -> Self {
        self.voice_name = voice.into().name;
        self
    }

    pub fn rate(mut self, rate: i32) -> Self {
        self.rate = rate;
        self
    }

    pub fn pitch(mut self, pitch: i32) -> Self {
        self.pitch = pitch;
        self
    }

    /// Reject the request before it reaches the network.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        check_range("rate", self.rate, constants::RATE_RANGE)?;
        check_range("pitch", self.pitch, constants::PITCH_RANGE)?;
        Ok(())
    }

    /// Signed percentage, e.g. `+20%`, `+0%`, `-50%`.
    pub fn rate_string(&self) -> String {
        format!("{:+}%", self.rate)
    }

    /// Signed offset with unit, e.g. `-5Hz`.
    pub fn pitch_string(&self) -> String {
        format!("{:+}Hz", self.pitch)
    }

    pub(crate) fn payload(&self) -> SynthesisPayload<'_> {
        SynthesisPayload {
            text: &self.text,
            voice: &self.voice_name,
            rate: self.rate_string(),
            pitch: self.pitch_string(),
        }
    }
}

fn check_range(name: &'static str, value: i32, (min, max): (i32, i32)) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

/// JSON body shared by both endpoints.
#[derive(Debug, serde::Serialize)]
pub(crate) struct SynthesisPayload<'a> {
    text: &'a str,
    voice: &'a str,
    rate: String,
    pitch: String,
}

/// The complete audio of one finished transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledAudio {
    pub media_type: String,
    pub audio_bytes: Vec<u8>,
}

impl AssembledAudio {
    pub fn mpeg(audio_bytes: Vec<u8>) -> Self {
        Self {
            media_type: constants::AUDIO_MPEG.to_string(),
            audio_bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.audio_bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio_bytes.is_empty()
    }
}

/// Audio returned by the save endpoint along with its resolved file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAudio {
    pub filename: String,
    pub audio: AssembledAudio,
}

/// Pick the file name for a save response: the content-disposition name when
/// present and usable, otherwise `tts_<unix millis>.mp3`.
pub fn resolve_filename(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(fallback_filename)
}

pub fn fallback_filename() -> String {
    format!(
        "{}{}.{}",
        constants::FALLBACK_FILE_PREFIX,
        chrono::Utc::now().timestamp_millis(),
        constants::AUDIO_EXTENSION
    )
}

/// Extract the file name from a content-disposition header value.
///
/// `filename*` (RFC 5987) takes precedence over `filename`. Any directory
/// part is dropped.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let lower = value.to_ascii_lowercase();

    let extended = lower.find("filename*=").and_then(|index| {
        let rest = &value[index + "filename*=".len()..];
        let raw = unquote(rest);
        let encoded = raw.splitn(3, '\'').nth(2)?;
        percent_decode(encoded)
    });

    let name = extended.or_else(|| {
        lower
            .find("filename=")
            .map(|index| unquote(&value[index + "filename=".len()..]))
    })?;

    sanitize_filename(&name)
}

fn unquote(rest: &str) -> String {
    let rest = rest.trim_start();
    if let Some(quoted) = rest.strip_prefix('"') {
        let mut name = String::new();
        let mut chars = quoted.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => break,
                '\\' => name.extend(chars.next()),
                c => name.push(c),
            }
        }
        name
    } else {
        rest.split(';').next().unwrap_or_default().trim().to_string()
    }
}

fn percent_decode(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            let hex = std::str::from_utf8(hex).ok()?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

fn sanitize_filename(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next()?.trim();
    // a drive prefix such as `C:` would escape the save directory on Windows
    if name.is_empty() || name == "." || name == ".." || name.contains(':') {
        None
    } else {
        Some(name.to_string())
    }
}

#[derive(Debug, serde::Deserialize)]
struct ErrorPayload {
    detail: Option<serde_json::Value>,
}

/// Pull a human-readable reason out of a backend error body.
///
/// Accepts `{"detail": "..."}` and the list form
/// `{"detail": [{"msg": "..."}, ...]}`. Anything else yields `None`.
pub fn error_detail(body: &[u8]) -> Option<String> {
    let payload: ErrorPayload = serde_json::from_slice(body).ok()?;
    match payload.detail? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item["msg"].as_str())
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
