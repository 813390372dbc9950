//! Background music selection.
//!
//! A render either gets an explicit [`AudioChoice`] or asks the
//! [`AssetResolver`] to pick one. An empty or unreadable music directory is
//! not an error: the render falls back to generated silence.

use std::fmt;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sr_core::config::AudioConfig;
use walkdir::WalkDir;

/// The soundtrack of one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioChoice {
    /// An audio file muxed as the soundtrack.
    Track(PathBuf),
    /// Generated silence.
    Silence,
}

impl AudioChoice {
    /// Encoder input arguments for this soundtrack.
    pub fn input_args(&self, silence: &SilenceSource) -> Vec<String> {
        match self {
            AudioChoice::Track(path) => {
                vec!["-i".to_string(), path.to_string_lossy().into_owned()]
            }
            AudioChoice::Silence => silence.input_args(),
        }
    }
}

impl fmt::Display for AudioChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioChoice::Track(path) => write!(f, "{}", path.display()),
            AudioChoice::Silence => f.write_str("silence"),
        }
    }
}

/// What the caller asks for: a fixed choice or a pick from the music library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AudioSource {
    #[default]
    Auto,
    Explicit(AudioChoice),
}

impl AudioSource {
    pub fn resolve(&self, resolver: &AssetResolver) -> AudioChoice {
        match self {
            AudioSource::Auto => resolver.resolve(),
            AudioSource::Explicit(choice) => choice.clone(),
        }
    }
}

impl From<AudioChoice> for AudioSource {
    fn from(choice: AudioChoice) -> Self {
        AudioSource::Explicit(choice)
    }
}

/// Picks background tracks from a flat music directory.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    dir: Option<PathBuf>,
    extensions: Vec<String>,
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::from_config(&AudioConfig::default())
    }
}

impl AssetResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn from_config(config: &AudioConfig) -> Self {
        Self {
            dir: config.music_dir.clone(),
            extensions: config.extensions.clone(),
        }
    }

    /// Replace the eligible extensions (without the leading dot).
    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Eligible files directly inside the music directory, sorted by name.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let Some(dir) = &self.dir else {
            return Vec::new();
        };

        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    tracing::debug!("skipping music entry in {}: {e}", dir.display());
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && self.is_eligible(e.path()))
            .map(|e| e.into_path())
            .collect()
    }

    /// Pick a track uniformly at random, or silence if there is none.
    pub fn resolve(&self) -> AudioChoice {
        self.resolve_with(&mut rand::thread_rng())
    }

    pub fn resolve_with<R: Rng + ?Sized>(&self, rng: &mut R) -> AudioChoice {
        let candidates = self.candidates();
        match candidates.choose(rng) {
            Some(track) => {
                tracing::debug!(
                    "picked {} of {} tracks",
                    track.display(),
                    candidates.len()
                );
                AudioChoice::Track(track.clone())
            }
            None => {
                tracing::debug!("no music available; using silence");
                AudioChoice::Silence
            }
        }
    }

    fn is_eligible(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
    }
}

/// Generated silent stereo track used when no music is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilenceSource {
    pub channel_layout: String,
    pub sample_rate: u32,
}

impl Default for SilenceSource {
    fn default() -> Self {
        Self {
            channel_layout: "stereo".to_string(),
            sample_rate: 44_100,
        }
    }
}

impl SilenceSource {
    pub fn from_config(config: &AudioConfig) -> Self {
        Self {
            channel_layout: config.channel_layout.clone(),
            sample_rate: config.sample_rate,
        }
    }

    /// `-f lavfi -i anullsrc=...`
    pub fn input_args(&self) -> Vec<String> {
        vec![
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!(
                "anullsrc=channel_layout={}:sample_rate={}",
                self.channel_layout, self.sample_rate
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;

    fn library() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp3", "a.MP3", "notes.txt", "c.wav"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.mp3")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/deep.mp3"), b"").unwrap();
        dir
    }

    #[test]
    fn candidates_are_flat_sorted_and_case_insensitive() {
        let dir = library();
        let resolver = AssetResolver::new(dir.path());
        let names: Vec<_> = resolver
            .candidates()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.MP3", "b.mp3"]);
    }

    #[test]
    fn extensions_are_configurable() {
        let dir = library();
        let resolver = AssetResolver::new(dir.path()).with_extensions(["wav", "mp3"]);
        assert_eq!(resolver.candidates().len(), 3);
    }

    #[test]
    fn resolve_picks_a_candidate() {
        let dir = library();
        let resolver = AssetResolver::new(dir.path());
        let candidates = resolver.candidates();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            match resolver.resolve_with(&mut rng) {
                AudioChoice::Track(p) => assert!(candidates.contains(&p)),
                AudioChoice::Silence => panic!("library is not empty"),
            }
        }
    }

    #[test]
    fn empty_or_missing_directory_means_silence() {
        let empty = tempfile::tempdir().unwrap();
        assert_eq!(AssetResolver::new(empty.path()).resolve(), AudioChoice::Silence);
        assert_eq!(
            AssetResolver::new("/nonexistent/music/dir").resolve(),
            AudioChoice::Silence
        );
        assert_eq!(AssetResolver::default().resolve(), AudioChoice::Silence);
    }

    #[test]
    fn explicit_source_bypasses_library() {
        let dir = library();
        let resolver = AssetResolver::new(dir.path());
        let source = AudioSource::from(AudioChoice::Silence);
        assert_eq!(source.resolve(&resolver), AudioChoice::Silence);
    }

    #[test]
    fn silence_input_args() {
        assert_eq!(
            SilenceSource::default().input_args(),
            [
                "-f",
                "lavfi",
                "-i",
                "anullsrc=channel_layout=stereo:sample_rate=44100"
            ]
        );
        let track = AudioChoice::Track(PathBuf::from("/music/a.mp3"));
        assert_eq!(track.input_args(&SilenceSource::default()), ["-i", "/music/a.mp3"]);
    }
}
