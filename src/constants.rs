pub static DEFAULT_BASE_URL: &str = "https://tts-backend-1-h80q.onrender.com";
pub static BASE_URL_ENV: &str = "TTS_API_URL";
pub static TIMEOUT_ENV: &str = "TTS_TIMEOUT_SECS";
pub static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub static STREAM_PATH: &str = "/tts/stream-chunks";
pub static SAVE_PATH: &str = "/tts/save";

pub static AUDIO_MPEG: &str = "audio/mpeg";
pub static AUDIO_EXTENSION: &str = "mp3";
pub static FALLBACK_FILE_PREFIX: &str = "tts_";

pub static DEFAULT_VOICE: &str = "th-TH-PremwadeeNeural";
pub const DEFAULT_RATE: i32 = 20;
pub const DEFAULT_PITCH: i32 = -5;

pub const RATE_RANGE: (i32, i32) = (-50, 100);
pub const PITCH_RANGE: (i32, i32) = (-50, 50);

/// Bytes per percent of indeterminate progress.
pub const INDETERMINATE_BYTES_PER_PERCENT: u64 = 1000;
