//! Sync client, enabled with the `blocking` feature.

use super::{
    AssembledAudio, SavedAudio, SynthesisRequest, error_detail, resolve_filename,
    stream::{Progress, StreamingTransferState},
};
use crate::{
    config::ClientConfig,
    constants,
    error::{Error, Result},
};
use bytes::Bytes;
use std::io::Read;
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct TtsClient {
    http: reqwest::blocking::Client,
    config: ClientConfig,
}

impl TtsClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        // the blocking builder defaults to 30s, `None` lifts it
        let http = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            config,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn open_stream(&self, request: &SynthesisRequest) -> Result<AudioStream> {
        request.validate()?;
        let url = self.config.endpoint(constants::STREAM_PATH);
        debug!("POST {} voice={}", url, request.voice_name);

        let response = self.http.post(&url).json(&request.payload()).send()?;
        let status = response.status();
        if !status.is_success() {
            warn!("stream endpoint answered {}", status);
            return Err(Error::Status(status));
        }
        Ok(AudioStream {
            content_length: response.content_length(),
            response,
            finished: false,
        })
    }

    pub fn synthesize_stream<F>(
        &self,
        request: &SynthesisRequest,
        on_progress: F,
    ) -> Result<AssembledAudio>
    where
        F: FnMut(Progress),
    {
        let audio = self.open_stream(request)?.assemble(on_progress)?;
        info!("streamed {} bytes of {}", audio.len(), audio.media_type);
        Ok(audio)
    }

    pub fn fetch_file(&self, request: &SynthesisRequest) -> Result<SavedAudio> {
        request.validate()?;
        let url = self.config.endpoint(constants::SAVE_PATH);
        debug!("POST {} voice={}", url, request.voice_name);

        let response = self.http.post(&url).json(&request.payload()).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().unwrap_or_default();
            let detail = error_detail(&body);
            warn!("save endpoint answered {}: {:?}", status, detail);
            return Err(Error::Backend { status, detail });
        }

        let filename = resolve_filename(response.headers());
        let audio_bytes = response.bytes()?.to_vec();
        info!("fetched {} ({} bytes)", filename, audio_bytes.len());
        Ok(SavedAudio {
            filename,
            audio: AssembledAudio::mpeg(audio_bytes),
        })
    }
}

/// Body of a streaming response, read chunk by chunk from the socket.
#[derive(Debug)]
pub struct AudioStream {
    response: reqwest::blocking::Response,
    content_length: Option<u64>,
    finished: bool,
}

impl AudioStream {
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Read the next chunk, blocking until it arrives. `Ok(None)` signals
    /// end-of-stream.
    pub fn read(&mut self) -> Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }
        let mut buffer = vec![0; READ_BUFFER_SIZE];
        loop {
            match self.response.read(&mut buffer) {
                Ok(0) => {
                    self.finished = true;
                    return Ok(None);
                }
                Ok(len) => {
                    buffer.truncate(len);
                    return Ok(Some(Bytes::from(buffer)));
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.finished = true;
                    return Err(err.into());
                }
            }
        }
    }

    pub fn assemble<F>(mut self, mut on_progress: F) -> Result<AssembledAudio>
    where
        F: FnMut(Progress),
    {
        let mut state = StreamingTransferState::new(self.content_length);
        while let Some(chunk) = self.read()? {
            on_progress(state.push_chunk(chunk));
        }
        on_progress(state.complete());
        Ok(state.into_audio())
    }
}

impl Iterator for AudioStream {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}
