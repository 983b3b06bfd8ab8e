#![cfg(feature = "blocking")]

mod common;

use axum::http::StatusCode;
use common::{MockBackend, SaveReply, StreamReply};
use tts_relay::{
    config::ClientConfig,
    error::ErrorKind,
    tts::{SynthesisRequest, blocking::TtsClient},
};

fn client(base_url: &str) -> TtsClient {
    TtsClient::new(ClientConfig::default().with_base_url(base_url)).unwrap()
}

#[test]
fn blocking_stream_assembles_audio() {
    let backend = MockBackend::streaming(StreamReply::Chunked(vec![
        b"ID3".to_vec(),
        vec![7; 40_000],
    ]));
    let client = client(&backend.spawn_in_thread());

    let mut percents = Vec::new();
    let audio = client
        .synthesize_stream(&SynthesisRequest::new("สวัสดี"), |progress| {
            percents.push(progress.percent)
        })
        .unwrap();

    assert_eq!(audio.len(), 40_003);
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(backend.requests()[0].1["rate"], "+20%");
}

#[test]
fn blocking_stream_iterates_chunks() {
    let backend = MockBackend::streaming(StreamReply::Sized(b"0123456789".to_vec()));
    let client = client(&backend.spawn_in_thread());

    let stream = client.open_stream(&SynthesisRequest::new("hello")).unwrap();
    assert_eq!(stream.content_length(), Some(10));
    let body: Vec<u8> = stream
        .map(|chunk| chunk.unwrap())
        .flat_map(|chunk| chunk.to_vec())
        .collect();
    assert_eq!(body, b"0123456789");
}

#[test]
fn blocking_save_reports_detail() {
    let backend = MockBackend::saving(SaveReply::Error {
        status: StatusCode::BAD_REQUEST,
        body: r#"{"detail": "text too long"}"#.to_string(),
    });
    let client = client(&backend.spawn_in_thread());

    let err = client
        .fetch_file(&SynthesisRequest::new("hello"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(err.to_string(), "text too long");
}

#[test]
fn blocking_blank_text_is_rejected() {
    let backend = MockBackend::streaming(StreamReply::Sized(b"ID3".to_vec()));
    let client = client(&backend.spawn_in_thread());

    let err = client.open_stream(&SynthesisRequest::new(" ")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(backend.requests().is_empty());
}
