//! Playback and save targets for assembled audio.
//!
//! Both sinks take ownership of the audio they are handed. Any transient
//! resource they create (a temporary file) is owned by the sink and released
//! exactly once, when its handle is dropped.

use crate::{
    constants,
    error::{Error, Result},
    tts::{AssembledAudio, SavedAudio},
};
use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Something that can play one assembled audio at a time.
pub trait PlaybackSink {
    /// Prepare `audio` for playback. Returns only once the resource is ready
    /// to play, not merely received.
    fn load(&mut self, audio: AssembledAudio) -> Result<()>;

    /// Start playing the loaded resource without waiting for it to finish.
    fn play(&mut self) -> Result<()>;

    /// Block until playback ends and release the resource.
    fn wait(&mut self) -> Result<()>;
}

/// Something that stores a downloaded file.
pub trait SaveSink {
    /// Store the file and return where it ended up.
    fn save(&mut self, saved: SavedAudio) -> Result<PathBuf>;
}

fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "audio/mpeg" | "audio/mp3" => constants::AUDIO_EXTENSION,
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        _ => "bin",
    }
}

/// Plays audio through an external program such as `ffplay`.
///
/// The audio is written to a temporary file that lives until playback ends.
#[derive(Debug)]
pub struct ProcessPlayer {
    program: String,
    args: Vec<String>,
    loaded: Option<NamedTempFile>,
    playing: Option<(Child, NamedTempFile)>,
}

impl ProcessPlayer {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            loaded: None,
            playing: None,
        }
    }

    pub fn ffplay() -> Self {
        Self::new("ffplay", ["-autoexit", "-nodisp", "-loglevel", "error"])
    }

    pub fn mpv() -> Self {
        Self::new("mpv", ["--no-video", "--really-quiet"])
    }

    /// Player by short name: `ffplay`, `mpv`, or any program taking a path.
    pub fn by_name(name: &str) -> Self {
        match name {
            "ffplay" => Self::ffplay(),
            "mpv" => Self::mpv(),
            other => Self::new(other, Vec::<String>::new()),
        }
    }

    /// Path of the loaded resource, if one is waiting to be played.
    pub fn loaded_path(&self) -> Option<&Path> {
        self.loaded.as_ref().map(NamedTempFile::path)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    /// Kill and reap the running player, then release its file.
    fn stop(&mut self) {
        if let Some((mut child, file)) = self.playing.take() {
            if let Err(err) = child.kill() {
                warn!("failed to stop player: {}", err);
            }
            let _ = child.wait();
            drop(file);
        }
    }
}

impl PlaybackSink for ProcessPlayer {
    fn load(&mut self, audio: AssembledAudio) -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix("tts-relay-")
            .suffix(&format!(".{}", extension_for(&audio.media_type)))
            .tempfile()?;
        file.write_all(&audio.audio_bytes)?;
        file.as_file().sync_all()?;
        debug!("loaded {} bytes into {:?}", audio.len(), file.path());
        // replaces and deletes any resource that was never played
        self.loaded = Some(file);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let file = self
            .loaded
            .take()
            .ok_or_else(|| Error::Playback("nothing loaded".to_string()))?;
        if self.playing.is_some() {
            debug!("replacing running playback");
            self.stop();
        }
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|err| Error::Playback(format!("failed to launch {}: {}", self.program, err)))?;
        info!("playing with {} (pid {})", self.program, child.id());
        self.playing = Some((child, file));
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        let Some((mut child, file)) = self.playing.take() else {
            return Ok(());
        };
        let status = child.wait()?;
        drop(file);
        if status.success() {
            Ok(())
        } else {
            Err(Error::Playback(format!(
                "{} exited with failure status: {}",
                self.program, status
            )))
        }
    }
}

impl Drop for ProcessPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Saves files into a directory without overwriting existing ones.
///
/// The bytes go to a temporary file in the same directory first and are
/// renamed into place, so a failed save never leaves a partial file.
#[derive(Debug, Clone)]
pub struct FileSaver {
    dir: PathBuf,
}

impl FileSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveSink for FileSaver {
    fn save(&mut self, saved: SavedAudio) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(&saved.audio.audio_bytes)?;
        file.as_file().sync_all()?;

        let target = available_path(&self.dir, &saved.filename);
        file.persist_noclobber(&target)?;
        info!("saved {:?} ({} bytes)", target, saved.audio.len());
        Ok(target)
    }
}

/// `dir/name`, or `dir/stem (n).ext` with the first free `n`.
fn available_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let extension = path.extension().map(|ext| ext.to_string_lossy().into_owned());
    (1..)
        .map(|n| match &extension {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(candidate)
}

#[cfg(feature = "playback")]
pub use self::rodio_player::RodioPlayer;

#[cfg(feature = "playback")]
mod rodio_player {
    use super::PlaybackSink;
    use crate::{
        error::{Error, Result},
        tts::AssembledAudio,
    };
    use std::io::Cursor;

    /// Plays audio on the default output device.
    pub struct RodioPlayer {
        stream: rodio::OutputStream,
        source: Option<rodio::Decoder<Cursor<Vec<u8>>>>,
        sink: Option<rodio::Sink>,
    }

    impl RodioPlayer {
        pub fn new() -> Result<Self> {
            let stream = rodio::OutputStreamBuilder::open_default_stream()
                .map_err(|err| Error::Playback(err.to_string()))?;
            Ok(Self {
                stream,
                source: None,
                sink: None,
            })
        }
    }

    impl PlaybackSink for RodioPlayer {
        fn load(&mut self, audio: AssembledAudio) -> Result<()> {
            // probing the decoder is the ready-to-play signal
            let source = rodio::Decoder::new(Cursor::new(audio.audio_bytes))
                .map_err(|err| Error::Playback(err.to_string()))?;
            self.source = Some(source);
            Ok(())
        }

        fn play(&mut self) -> Result<()> {
            let source = self
                .source
                .take()
                .ok_or_else(|| Error::Playback("nothing loaded".to_string()))?;
            let sink = rodio::Sink::connect_new(self.stream.mixer());
            sink.append(source);
            self.sink = Some(sink);
            Ok(())
        }

        fn wait(&mut self) -> Result<()> {
            if let Some(sink) = self.sink.take() {
                sink.sleep_until_end();
            }
            Ok(())
        }
    }
}
