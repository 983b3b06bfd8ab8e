//! Mock relay backend and recording sinks shared by the integration tests.
#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use std::{
    convert::Infallible,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use tts_relay::{
    config::ClientConfig,
    error::Result,
    fetcher::{FetchObserver, FetchState},
    sink::{PlaybackSink, SaveSink},
    tts::{AssembledAudio, SavedAudio, client::TtsClient, stream::Progress},
};

#[derive(Debug, Clone)]
pub enum StreamReply {
    /// Chunked transfer encoding, no content length.
    Chunked(Vec<Vec<u8>>),
    /// Plain body with a content length.
    Sized(Vec<u8>),
    Status(StatusCode),
    /// Sends the chunk and then never finishes.
    Stall(Vec<u8>),
}

#[derive(Debug, Clone)]
pub enum SaveReply {
    File {
        disposition: Option<String>,
        body: Vec<u8>,
    },
    Error {
        status: StatusCode,
        body: String,
    },
}

#[derive(Debug, Clone)]
pub struct MockBackend {
    stream: StreamReply,
    save: SaveReply,
    requests: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl MockBackend {
    pub fn new(stream: StreamReply, save: SaveReply) -> Self {
        Self {
            stream,
            save,
            requests: Arc::default(),
        }
    }

    pub fn streaming(stream: StreamReply) -> Self {
        Self::new(
            stream,
            SaveReply::Error {
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            },
        )
    }

    pub fn saving(save: SaveReply) -> Self {
        Self::new(StreamReply::Status(StatusCode::NOT_FOUND), save)
    }

    /// Recorded `(path, json body)` pairs, in arrival order.
    pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
        self.requests.lock().unwrap().clone()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/tts/stream-chunks", post(stream_chunks))
            .route("/tts/save", post(save))
            .with_state(self.clone())
    }

    pub async fn spawn(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{}", addr)
    }

    /// Serve from a dedicated thread, for clients that block.
    pub fn spawn_in_thread(&self) -> String {
        let (tx, rx) = std::sync::mpsc::channel();
        let router = self.router();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, router).await.unwrap();
            });
        });
        format!("http://{}", rx.recv().unwrap())
    }
}

async fn stream_chunks(
    State(backend): State<MockBackend>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    backend
        .requests
        .lock()
        .unwrap()
        .push(("/tts/stream-chunks".to_string(), body));
    match backend.stream {
        StreamReply::Chunked(chunks) => {
            let chunks = chunks
                .into_iter()
                .map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk)));
            audio_response(Body::from_stream(stream::iter(chunks)))
        }
        StreamReply::Sized(bytes) => audio_response(Body::from(bytes)),
        StreamReply::Status(status) => (status, "synthesis failed").into_response(),
        StreamReply::Stall(first) => {
            let chunks = stream::iter([Ok::<_, Infallible>(Bytes::from(first))])
                .chain(stream::pending());
            audio_response(Body::from_stream(chunks))
        }
    }
}

async fn save(State(backend): State<MockBackend>, Json(body): Json<serde_json::Value>) -> Response {
    backend
        .requests
        .lock()
        .unwrap()
        .push(("/tts/save".to_string(), body));
    match backend.save {
        SaveReply::File { disposition, body } => {
            let mut response = audio_response(Body::from(body));
            if let Some(disposition) = disposition {
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, disposition.parse().unwrap());
            }
            response
        }
        SaveReply::Error { status, body } => (status, body).into_response(),
    }
}

fn audio_response(body: Body) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .body(body)
        .unwrap()
}

pub fn client(base_url: &str) -> TtsClient {
    TtsClient::new(ClientConfig::default().with_base_url(base_url)).unwrap()
}

/// A base url nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[derive(Debug, Default)]
pub struct RecordingPlayer {
    pub loaded: Vec<AssembledAudio>,
    pub plays: usize,
    pub waits: usize,
}

impl PlaybackSink for RecordingPlayer {
    fn load(&mut self, audio: AssembledAudio) -> Result<()> {
        self.loaded.push(audio);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.plays += 1;
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        self.waits += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySaver {
    pub saved: Vec<SavedAudio>,
}

impl SaveSink for MemorySaver {
    fn save(&mut self, saved: SavedAudio) -> Result<PathBuf> {
        let path = PathBuf::from(&saved.filename);
        self.saved.push(saved);
        Ok(path)
    }
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub states: Vec<FetchState>,
    pub progress: Vec<Progress>,
}

impl Recorder {
    pub fn percents(&self) -> Vec<u8> {
        self.progress.iter().map(|progress| progress.percent).collect()
    }
}

impl FetchObserver for Recorder {
    fn on_state(&mut self, state: FetchState) {
        self.states.push(state);
    }

    fn on_progress(&mut self, progress: Progress) {
        self.progress.push(progress);
    }
}
