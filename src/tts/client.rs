use super::{
    AssembledAudio, SavedAudio, SynthesisRequest, error_detail, resolve_filename,
    stream::{AudioStream, Progress},
};
use crate::{
    config::ClientConfig,
    constants,
    error::{Error, Result},
};
use tracing::{debug, info, warn};

/// Async client for the relay backend.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct TtsClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl TtsClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    /// Client configured from `TTS_API_URL` / `TTS_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request to the streaming endpoint and return the unread body.
    ///
    /// Fails with a validation error before any I/O when the request is
    /// invalid, and with [Error::Status] on a non-success response.
    pub async fn open_stream(&self, request: &SynthesisRequest) -> Result<AudioStream> {
        request.validate()?;
        let url = self.config.endpoint(constants::STREAM_PATH);
        debug!("POST {} voice={}", url, request.voice_name);

        let response = self.http.post(&url).json(&request.payload()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("stream endpoint answered {}", status);
            return Err(Error::Status(status));
        }
        Ok(AudioStream::from_response(response))
    }

    /// Stream a synthesis to completion and return the assembled audio.
    pub async fn synthesize_stream<F>(
        &self,
        request: &SynthesisRequest,
        on_progress: F,
    ) -> Result<AssembledAudio>
    where
        F: FnMut(Progress),
    {
        let stream = self.open_stream(request).await?;
        let audio = stream.assemble(on_progress).await?;
        info!("streamed {} bytes of {}", audio.len(), audio.media_type);
        Ok(audio)
    }

    /// Request a downloadable file from the save endpoint.
    ///
    /// On a non-success status the body is searched for a `detail` reason,
    /// see [Error::Backend].
    pub async fn fetch_file(&self, request: &SynthesisRequest) -> Result<SavedAudio> {
        request.validate()?;
        let url = self.config.endpoint(constants::SAVE_PATH);
        debug!("POST {} voice={}", url, request.voice_name);

        let response = self.http.post(&url).json(&request.payload()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let detail = error_detail(&body);
            warn!("save endpoint answered {}: {:?}", status, detail);
            return Err(Error::Backend { status, detail });
        }

        let filename = resolve_filename(response.headers());
        let audio_bytes = response.bytes().await?.to_vec();
        info!("fetched {} ({} bytes)", filename, audio_bytes.len());
        Ok(SavedAudio {
            filename,
            audio: AssembledAudio::mpeg(audio_bytes),
        })
    }
}
