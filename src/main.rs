//! tts-relay: read text aloud through the relay backend, or save it as MP3.

use clap::{Args, Parser, Subcommand};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tts_relay::{
    config::ClientConfig,
    error::{Result, ValidationError},
    fetcher::{FetchObserver, FetchState, StreamingAudioFetcher},
    sink::{FileSaver, PlaybackSink, ProcessPlayer},
    tts::{SynthesisRequest, client::TtsClient, stream::Progress},
    voice::{Voice, find_voice, thai_voices},
};

#[derive(Debug, Parser)]
#[command(name = "tts-relay", version)]
#[command(about = "Text-to-speech through a relay backend")]
struct Cli {
    /// Backend base url. Overrides TTS_API_URL.
    #[arg(long, global = true)]
    url: Option<String>,
    /// Whole-request timeout in seconds. Overrides TTS_TIMEOUT_SECS.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Log more (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Stream the speech and play it.
    Play {
        #[command(flatten)]
        request: RequestArgs,
        /// Player program: ffplay, mpv, rodio (with the playback feature) or any
        /// program that takes a file path.
        #[arg(long, default_value = "ffplay")]
        player: String,
    },
    /// Download the speech as an MP3 file.
    Save {
        #[command(flatten)]
        request: RequestArgs,
        /// Directory to save into.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// List the built-in voices.
    Voices,
}

#[derive(Debug, Args)]
struct RequestArgs {
    /// Text to read. Read from --file or stdin when omitted.
    text: Option<String>,
    /// UTF-8 .txt file with the text to read.
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,
    /// Voice name or label, e.g. th-TH-NiwatNeural or Niwat.
    #[arg(long)]
    voice: Option<String>,
    /// Rate adjustment in percent, -50..=100.
    #[arg(long, allow_hyphen_values = true)]
    rate: Option<i32>,
    /// Pitch offset in Hz, -50..=50.
    #[arg(long, allow_hyphen_values = true)]
    pitch: Option<i32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "tts_relay=warn",
        1 => "tts_relay=info",
        _ => "tts_relay=debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), String> {
    let command = match cli.command {
        Commands::Voices => {
            for voice in thai_voices() {
                println!("{}", voice);
            }
            return Ok(());
        }
        command => command,
    };

    let mut config = ClientConfig::from_env();
    if let Some(url) = &cli.url {
        config = config.with_base_url(url);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    debug!("backend {}", config.base_url);
    let client = TtsClient::new(config).map_err(|err| err.user_message(false))?;
    let mut fetcher = StreamingAudioFetcher::new(client);

    let cancel = fetcher.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut reporter = ProgressReporter::new();
    match command {
        Commands::Play { request, player } => {
            let request = build_request(request).await.map_err(|err| err.user_message(false))?;
            let mut player = open_player(&player).map_err(|err| err.user_message(false))?;
            fetcher
                .stream_and_play(&request, player.as_mut(), &mut reporter)
                .await
                .map_err(|failure| failure.message)?;
            tokio::task::block_in_place(|| fetcher.finish_playback(player.as_mut()))
                .map_err(|failure| failure.message)
        }
        Commands::Save {
            request,
            output_dir,
        } => {
            let request = build_request(request).await.map_err(|err| err.user_message(true))?;
            let mut saver = FileSaver::new(output_dir);
            let path = fetcher
                .fetch_and_save(&request, &mut saver, &mut reporter)
                .await
                .map_err(|failure| failure.message)?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Voices => Ok(()),
    }
}

async fn build_request(args: RequestArgs) -> Result<SynthesisRequest> {
    let text = match (args.text, args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => read_text_file(&path).await?,
        (None, None) if !std::io::stdin().is_terminal() => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
        (None, None) => String::new(),
    };

    let mut request = SynthesisRequest::new(text);
    if let Some(voice) = args.voice {
        request = request.voice(find_voice(&voice).unwrap_or_else(|| Voice::from(voice)));
    }
    if let Some(rate) = args.rate {
        request = request.rate(rate);
    }
    if let Some(pitch) = args.pitch {
        request = request.pitch(pitch);
    }
    Ok(request)
}

async fn read_text_file(path: &Path) -> Result<String> {
    let is_txt = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    if !is_txt {
        return Err(ValidationError::NotATextFile(path.display().to_string()).into());
    }
    Ok(tokio::fs::read_to_string(path).await?)
}

fn open_player(name: &str) -> Result<Box<dyn PlaybackSink>> {
    match name {
        #[cfg(feature = "playback")]
        "rodio" => Ok(Box::new(tts_relay::sink::RodioPlayer::new()?)),
        #[cfg(not(feature = "playback"))]
        "rodio" => Err(tts_relay::error::Error::Playback(
            "built without the playback feature".to_string(),
        )),
        other => Ok(Box::new(ProcessPlayer::by_name(other))),
    }
}

/// Draws transfer progress on stderr.
struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    fn exact_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner} {msg} [{bar:40}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl FetchObserver for ProgressReporter {
    fn on_state(&mut self, state: FetchState) {
        match state {
            FetchState::Requesting => {
                self.bar = ProgressBar::new_spinner().with_style(Self::spinner_style());
                self.bar.set_message("processing...");
                self.bar.enable_steady_tick(Duration::from_millis(100));
            }
            FetchState::Transferring => self.bar.set_message("loading"),
            FetchState::Completed | FetchState::Failed => self.bar.finish_and_clear(),
            FetchState::Idle => {}
        }
    }

    fn on_progress(&mut self, progress: Progress) {
        if progress.is_exact() {
            if self.bar.length() != Some(100) {
                self.bar.set_length(100);
                self.bar.set_style(Self::exact_style());
            }
            self.bar.set_position(progress.percent as u64);
        } else {
            self.bar
                .set_message(format!("loading {}", HumanBytes(progress.received_bytes)));
        }
    }
}
