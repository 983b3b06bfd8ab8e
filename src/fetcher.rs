//! Streaming audio fetcher
//!
//! [StreamingAudioFetcher] drives one request at a time through
//!
//! ```text
//! Idle -> Requesting -> Transferring -> Completed -> Idle
//!             |              |
//!             +-----> Failed <+--> Idle
//! ```
//!
//! Every operation takes `&mut self`, so a fetcher can never have two
//! transfers in flight. Failures never escape as [Error]: they are recorded as
//! a user-facing message, the loading flag and progress are reset, and the
//! caller gets a [Failure]. Nothing is retried. Dropping an operation's future
//! before it resolves fails it as cancelled.

use crate::{
    error::{Error, ErrorKind},
    sink::{PlaybackSink, SaveSink},
    tts::{
        AssembledAudio, SynthesisRequest,
        client::TtsClient,
        stream::Progress,
    },
};
use futures_util::future::{AbortHandle, AbortRegistration, Abortable};
use std::{future::Future, path::PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    /// Request sent, waiting for the status line and headers.
    Requesting,
    /// Streaming path only: reading the body.
    Transferring,
    Completed,
    Failed,
}

impl FetchState {
    pub fn can_transition_to(self, next: FetchState) -> bool {
        use FetchState::*;
        matches!(
            (self, next),
            (Idle, Requesting)
                | (Idle, Failed)
                | (Requesting, Transferring)
                | (Requesting, Completed)
                | (Requesting, Failed)
                | (Transferring, Completed)
                | (Transferring, Failed)
                | (Completed, Idle)
                | (Failed, Idle)
        )
    }
}

/// Receives state changes and progress while an operation runs.
pub trait FetchObserver {
    fn on_state(&mut self, _state: FetchState) {}
    fn on_progress(&mut self, _progress: Progress) {}
}

impl FetchObserver for () {}

/// A failed operation, already rendered for the user.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Aborts the next operation started on the fetcher that issued it.
#[derive(Debug, Clone)]
pub struct CancelHandle(AbortHandle);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_aborted()
    }
}

#[derive(Debug)]
pub struct StreamingAudioFetcher {
    client: TtsClient,
    state: FetchState,
    loading: bool,
    progress: u8,
    playing: bool,
    error: Option<String>,
    abort: Option<AbortRegistration>,
}

impl StreamingAudioFetcher {
    pub fn new(client: TtsClient) -> Self {
        Self {
            client,
            state: FetchState::Idle,
            loading: false,
            progress: 0,
            playing: false,
            error: None,
            abort: None,
        }
    }

    pub fn client(&self) -> &TtsClient {
        &self.client
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// True while a request is in flight. Front ends disable their triggers
    /// while this is set.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Message of the last failure, cleared when the next operation starts.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Arm cancellation for the next operation.
    pub fn cancel_handle(&mut self) -> CancelHandle {
        let (handle, registration) = AbortHandle::new_pair();
        self.abort = Some(registration);
        CancelHandle(handle)
    }

    /// Stream the synthesis, assemble it, and start playback once the sink
    /// reports the audio ready. No partial audio ever reaches the sink.
    pub async fn stream_and_play<P, O>(
        &mut self,
        request: &SynthesisRequest,
        player: &mut P,
        observer: &mut O,
    ) -> Result<(), Failure>
    where
        P: PlaybackSink + ?Sized,
        O: FetchObserver,
    {
        if let Err(err) = request.validate() {
            return Err(self.fail(err.into(), false, observer));
        }
        let mut op = InFlight::start(self, observer);

        let fetcher = &mut *op.fetcher;
        let transfer = stream_audio(
            &fetcher.client,
            request,
            &mut fetcher.state,
            &mut fetcher.progress,
            &mut *op.observer,
        );
        let result = abortable(transfer, fetcher.abort.take()).await;
        let audio = match result {
            Ok(audio) => audio,
            Err(err) => return Err(op.fail(err, false)),
        };

        if let Err(err) = player.load(audio).and_then(|()| player.play()) {
            return Err(op.fail(err, false));
        }
        op.fetcher.playing = true;
        info!("playback started");

        op.finish();
        Ok(())
    }

    /// Fetch the file from the save endpoint and hand it to `saver`.
    pub async fn fetch_and_save<S, O>(
        &mut self,
        request: &SynthesisRequest,
        saver: &mut S,
        observer: &mut O,
    ) -> Result<PathBuf, Failure>
    where
        S: SaveSink + ?Sized,
        O: FetchObserver,
    {
        if let Err(err) = request.validate() {
            return Err(self.fail(err.into(), true, observer));
        }
        let mut op = InFlight::start(self, observer);

        let fetcher = &mut *op.fetcher;
        let result = abortable(fetcher.client.fetch_file(request), fetcher.abort.take())
            .await
            .and_then(|saved| saver.save(saved));
        match result {
            Ok(path) => {
                op.finish();
                Ok(path)
            }
            Err(err) => Err(op.fail(err, true)),
        }
    }

    /// Wait for the player to finish and clear the playing flag.
    pub fn finish_playback<P: PlaybackSink + ?Sized>(&mut self, player: &mut P) -> Result<(), Failure> {
        let result = player.wait();
        self.playing = false;
        result.map_err(|err| {
            let message = err.user_message(false);
            self.error = Some(message.clone());
            Failure {
                kind: err.kind(),
                message,
            }
        })
    }

    fn start<O: FetchObserver>(&mut self, observer: &mut O) {
        self.error = None;
        self.loading = true;
        self.progress = 0;
        advance(&mut self.state, FetchState::Requesting, observer);
    }

    fn finish<O: FetchObserver>(&mut self, observer: &mut O) {
        advance(&mut self.state, FetchState::Completed, observer);
        self.loading = false;
        self.progress = 0;
        advance(&mut self.state, FetchState::Idle, observer);
    }

    fn fail<O: FetchObserver>(&mut self, err: Error, backend_hint: bool, observer: &mut O) -> Failure {
        warn!("request failed in {:?}: {}", self.state, err);
        let message = err.user_message(backend_hint);
        self.error = Some(message.clone());
        self.loading = false;
        self.progress = 0;
        advance(&mut self.state, FetchState::Failed, observer);
        advance(&mut self.state, FetchState::Idle, observer);
        Failure {
            kind: err.kind(),
            message,
        }
    }
}

/// One started operation. Dropping it before it settles, e.g. when the caller
/// drops the future on a timeout, fails the operation as cancelled so the
/// fetcher is back in [FetchState::Idle].
struct InFlight<'a, O: FetchObserver> {
    fetcher: &'a mut StreamingAudioFetcher,
    observer: &'a mut O,
    settled: bool,
}

impl<'a, O: FetchObserver> InFlight<'a, O> {
    fn start(fetcher: &'a mut StreamingAudioFetcher, observer: &'a mut O) -> Self {
        fetcher.start(observer);
        Self {
            fetcher,
            observer,
            settled: false,
        }
    }

    fn finish(&mut self) {
        self.settled = true;
        self.fetcher.finish(&mut *self.observer);
    }

    fn fail(&mut self, err: Error, backend_hint: bool) -> Failure {
        self.settled = true;
        self.fetcher.fail(err, backend_hint, &mut *self.observer)
    }
}

impl<O: FetchObserver> Drop for InFlight<'_, O> {
    fn drop(&mut self) {
        if !self.settled {
            self.fail(Error::Cancelled, false);
        }
    }
}

fn advance<O: FetchObserver>(state: &mut FetchState, next: FetchState, observer: &mut O) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid transition {:?} -> {:?}",
        state,
        next
    );
    debug!("state {:?} -> {:?}", state, next);
    *state = next;
    observer.on_state(next);
}

async fn abortable<T, F>(future: F, registration: Option<AbortRegistration>) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match registration {
        Some(registration) => Abortable::new(future, registration)
            .await
            .unwrap_or(Err(Error::Cancelled)),
        None => future.await,
    }
}

async fn stream_audio<O: FetchObserver>(
    client: &TtsClient,
    request: &SynthesisRequest,
    state: &mut FetchState,
    progress: &mut u8,
    observer: &mut O,
) -> Result<AssembledAudio, Error> {
    let stream = client.open_stream(request).await?;
    advance(state, FetchState::Transferring, observer);
    stream
        .assemble(|update| {
            *progress = update.percent;
            observer.on_progress(update);
        })
        .await
}
