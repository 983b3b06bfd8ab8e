//! TTS Stream module
//!
//! A streamed synthesis response is read as a lazy, finite, non-restartable
//! sequence of byte chunks. [AudioStream::read] returns `Ok(None)` exactly at
//! end-of-stream and keeps returning `Ok(None)` afterwards.

use super::AssembledAudio;
use crate::{
    constants,
    error::{Error, Result},
};
use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream::BoxStream};
use tracing::debug;

/// Snapshot of transfer progress after a chunk or at completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// `0..=100`. Only an exact fraction when `expected_total_bytes` is known.
    pub percent: u8,
    pub received_bytes: u64,
    pub expected_total_bytes: Option<u64>,
}

impl Progress {
    pub fn is_exact(&self) -> bool {
        self.expected_total_bytes.is_some()
    }
}

/// Bookkeeping for one in-flight transfer.
///
/// Chunks are kept in receipt order and never touched again until
/// [into_audio](Self::into_audio) concatenates them.
#[derive(Debug, Default)]
pub struct StreamingTransferState {
    chunks: Vec<Bytes>,
    received_bytes: u64,
    expected_total_bytes: Option<u64>,
    progress_percent: u8,
}

impl StreamingTransferState {
    /// A declared length of zero carries no information and counts as absent.
    pub fn new(expected_total_bytes: Option<u64>) -> Self {
        Self {
            expected_total_bytes: expected_total_bytes.filter(|total| *total > 0),
            ..Self::default()
        }
    }

    pub fn push_chunk(&mut self, chunk: Bytes) -> Progress {
        self.received_bytes += chunk.len() as u64;
        self.chunks.push(chunk);
        // never reaches 100 here, completion is reported by `complete`
        let estimate = match self.expected_total_bytes {
            Some(total) => {
                let percent = (self.received_bytes as f64 / total as f64 * 100.0).round();
                percent.clamp(0.0, 99.0) as u8
            }
            None => (self.received_bytes / constants::INDETERMINATE_BYTES_PER_PERCENT).min(99) as u8,
        };
        self.progress_percent = self.progress_percent.max(estimate);
        self.progress()
    }

    /// Mark end-of-stream and report 100%.
    pub fn complete(&mut self) -> Progress {
        self.progress_percent = 100;
        self.progress()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            percent: self.progress_percent,
            received_bytes: self.received_bytes,
            expected_total_bytes: self.expected_total_bytes,
        }
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn into_audio(self) -> AssembledAudio {
        let mut audio_bytes = Vec::with_capacity(self.received_bytes as usize);
        for chunk in &self.chunks {
            audio_bytes.extend_from_slice(chunk);
        }
        AssembledAudio::mpeg(audio_bytes)
    }
}

/// Body of a streaming synthesis response.
pub struct AudioStream {
    inner: BoxStream<'static, Result<Bytes>>,
    content_length: Option<u64>,
    finished: bool,
}

impl AudioStream {
    /// Wrap any chunk source. `content_length` is the declared total, if any.
    pub fn new<S>(stream: S, content_length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
            content_length,
            finished: false,
        }
    }

    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        let content_length = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::from));
        Self::new(stream, content_length)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Read the next chunk. `Ok(None)` signals end-of-stream.
    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }
        match self.inner.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(err)) => {
                self.finished = true;
                Err(err)
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Drain the stream into one buffer, reporting progress after every chunk
    /// and a final 100% once end-of-stream is reached.
    pub async fn assemble<F>(mut self, mut on_progress: F) -> Result<AssembledAudio>
    where
        F: FnMut(Progress),
    {
        let mut state = StreamingTransferState::new(self.content_length);
        while let Some(chunk) = self.read().await? {
            let progress = state.push_chunk(chunk);
            debug!(
                "received chunk {}: {} bytes, {}%",
                state.chunk_count(),
                progress.received_bytes,
                progress.percent
            );
            on_progress(progress);
        }
        on_progress(state.complete());
        Ok(state.into_audio())
    }
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream")
            .field("content_length", &self.content_length)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunked(data: &[u8], sizes: &[usize]) -> Vec<Result<Bytes>> {
        let mut chunks = Vec::new();
        let mut offset = 0;
        for size in sizes {
            chunks.push(Ok(Bytes::copy_from_slice(&data[offset..offset + size])));
            offset += size;
        }
        assert_eq!(offset, data.len());
        chunks
    }

    async fn assemble(
        chunks: Vec<Result<Bytes>>,
        total: Option<u64>,
    ) -> (Result<AssembledAudio>, Vec<u8>) {
        let mut percents = Vec::new();
        let audio = AudioStream::new(stream::iter(chunks), total)
            .assemble(|progress| percents.push(progress.percent))
            .await;
        (audio, percents)
    }

    #[tokio::test]
    async fn exact_progress_reaches_100_only_at_end() {
        let data: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
        let (audio, percents) = assemble(chunked(&data, &[250, 746, 4]), Some(1000)).await;
        assert_eq!(audio.unwrap().audio_bytes, data);
        assert_eq!(percents, vec![25, 99, 99, 100]);
    }

    #[tokio::test]
    async fn indeterminate_progress_stays_below_100() {
        let data = vec![7u8; 500_000];
        let (audio, percents) = assemble(chunked(&data, &[1500, 200_000, 298_500]), None).await;
        assert_eq!(audio.unwrap().len(), 500_000);
        assert_eq!(percents, vec![1, 99, 99, 100]);
    }

    #[tokio::test]
    async fn every_partition_assembles_identically() {
        let data: Vec<u8> = (0..64u8).collect();
        let partitions: [&[usize]; 5] = [
            &[64],
            &[1; 64],
            &[0, 10, 0, 54],
            &[63, 1],
            &[5, 17, 2, 30, 10],
        ];
        for sizes in partitions {
            let (audio, percents) = assemble(chunked(&data, sizes), Some(64)).await;
            let audio = audio.unwrap();
            assert_eq!(audio.audio_bytes, data, "partition {:?}", sizes);
            assert_eq!(audio.media_type, "audio/mpeg");
            assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
            assert_eq!(percents.iter().filter(|p| **p == 100).count(), 1);
            assert_eq!(percents.last(), Some(&100));
        }
    }

    #[tokio::test]
    async fn overlong_body_is_clamped() {
        let data = vec![1u8; 300];
        let (audio, percents) = assemble(chunked(&data, &[200, 100]), Some(100)).await;
        assert_eq!(audio.unwrap().len(), 300);
        assert_eq!(percents, vec![99, 99, 100]);
    }

    #[tokio::test]
    async fn read_error_aborts_assembly() {
        let chunks = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(Error::Io(std::io::Error::other("connection reset"))),
            Ok(Bytes::from_static(b"def")),
        ];
        let (audio, percents) = assemble(chunks, None).await;
        assert!(audio.is_err());
        assert!(!percents.contains(&100));
    }

    #[tokio::test]
    async fn stream_is_not_restartable() {
        let mut stream = AudioStream::new(stream::iter(vec![Ok(Bytes::from_static(b"x"))]), None);
        assert_eq!(stream.read().await.unwrap(), Some(Bytes::from_static(b"x")));
        assert_eq!(stream.read().await.unwrap(), None);
        assert_eq!(stream.read().await.unwrap(), None);
    }

    #[test]
    fn zero_length_header_is_indeterminate() {
        let mut state = StreamingTransferState::new(Some(0));
        let progress = state.push_chunk(Bytes::from_static(&[0; 2048]));
        assert!(!progress.is_exact());
        assert_eq!(progress.percent, 2);
    }
}
