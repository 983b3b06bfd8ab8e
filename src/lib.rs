//! Client for a **text-to-speech relay** backend.
//! Send text with a voice, rate and pitch, then either stream the synthesized
//! audio for playback or download it as a file.
//!
//! # Features
//! + `cli`: the `tts-relay` command line front end. Default
//! + `blocking`: synchronous [TtsClient](tts::blocking::TtsClient)
//! + `playback`: [RodioPlayer](sink::RodioPlayer), playback on the default output device
//!
//! # Configuration
//! [ClientConfig::from_env](config::ClientConfig::from_env) reads the backend
//! url from `TTS_API_URL` and an optional whole-request timeout in seconds from
//! `TTS_TIMEOUT_SECS`. Without `TTS_API_URL` the hosted relay is used.
//!
//! # How to use
//! 1. Build a [SynthesisRequest](tts::SynthesisRequest). The text must not be
//!    blank, `rate` is a percentage in `-50..=100` and `pitch` an offset in Hz
//!    in `-50..=50`. Invalid requests are rejected before any network I/O.
//!     ```rust
//!     use tts_relay::tts::SynthesisRequest;
//!
//!     let request = SynthesisRequest::new("สวัสดีครับ")
//!         .voice("th-TH-NiwatNeural")
//!         .rate(20)
//!         .pitch(-5);
//!     assert_eq!(request.rate_string(), "+20%");
//!     assert_eq!(request.pitch_string(), "-5Hz");
//!     ```
//!
//! 2. Stream it with the async client. Progress is reported after every chunk;
//!    it is an exact fraction only when the backend declares a content length.
//!     ```rust,no_run
//!     use tts_relay::tts::{client::TtsClient, SynthesisRequest};
//!
//!     #[tokio::main]
//!     async fn main() -> tts_relay::error::Result<()> {
//!         let client = TtsClient::from_env()?;
//!         let request = SynthesisRequest::new("Hello, World!");
//!         let audio = client
//!             .synthesize_stream(&request, |progress| println!("{}%", progress.percent))
//!             .await?;
//!         println!("{} bytes of {}", audio.len(), audio.media_type);
//!         Ok(())
//!     }
//!     ```
//!
//! 3. Or let a [StreamingAudioFetcher](fetcher::StreamingAudioFetcher) drive the
//!    whole operation. It tracks state, progress and the last error, and hands
//!    finished audio to a [PlaybackSink](sink::PlaybackSink) or
//!    [SaveSink](sink::SaveSink).
//!     ```rust,no_run
//!     use tts_relay::{
//!         fetcher::StreamingAudioFetcher,
//!         sink::{FileSaver, ProcessPlayer},
//!         tts::{client::TtsClient, SynthesisRequest},
//!     };
//!
//!     #[tokio::main]
//!     async fn main() {
//!         let client = TtsClient::from_env().unwrap();
//!         let mut fetcher = StreamingAudioFetcher::new(client);
//!         let request = SynthesisRequest::new("Hello, World!");
//!
//!         let mut player = ProcessPlayer::ffplay();
//!         if let Err(failure) = fetcher.stream_and_play(&request, &mut player, &mut ()).await {
//!             eprintln!("{}", failure);
//!         }
//!         fetcher.finish_playback(&mut player).ok();
//!
//!         let mut saver = FileSaver::new(".");
//!         match fetcher.fetch_and_save(&request, &mut saver, &mut ()).await {
//!             Ok(path) => println!("saved {}", path.display()),
//!             Err(failure) => eprintln!("{}", failure),
//!         }
//!     }
//!     ```

mod constants;

pub mod config;
pub mod error;
pub mod fetcher;
pub mod sink;
pub mod tts;
pub mod voice;
