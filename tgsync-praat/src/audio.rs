//! Audio file resolution
//!
//! Session media may be any container, but the external editor is given
//! the companion `.wav` file that sits next to it.

use std::path::{Path, PathBuf};

use tgsync_common::{Error, Result};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AudioResolver {
    project_root: PathBuf,
    media_folders: Vec<PathBuf>,
}

impl AudioResolver {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            media_folders: Vec::new(),
        }
    }

    /// Extra folder searched for relative media paths, after the project
    pub fn with_media_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.media_folders.push(folder.into());
        self
    }

    /// Companion `.wav` for `media`. Relative paths are tried against the
    /// project folder first, then each media folder in order.
    pub fn resolve(&self, media: &Path) -> Result<PathBuf> {
        let candidates: Vec<PathBuf> = if media.is_absolute() {
            vec![media.to_path_buf()]
        } else {
            std::iter::once(&self.project_root)
                .chain(self.media_folders.iter())
                .map(|folder| folder.join(media))
                .collect()
        };

        for candidate in &candidates {
            let wav = wav_sibling(candidate);
            if wav.is_file() {
                debug!("Audio for {} is {}", media.display(), wav.display());
                return Ok(wav);
            }
        }
        Err(Error::NotFound(format!("no .wav audio for {}", media.display())))
    }
}

fn wav_sibling(media: &Path) -> PathBuf {
    let is_wav = media
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if is_wav {
        media.to_path_buf()
    } else {
        media.with_extension("wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_finds_wav_sibling() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("s01.mov"), b"").unwrap();
        std::fs::write(dir.path().join("s01.wav"), b"").unwrap();

        let resolver = AudioResolver::new(dir.path());
        assert_eq!(resolver.resolve(Path::new("s01.mov")).unwrap(), dir.path().join("s01.wav"));
        assert_eq!(
            resolver.resolve(&dir.path().join("s01.wav")).unwrap(),
            dir.path().join("s01.wav")
        );
    }

    #[test]
    fn test_media_folder_fallback() {
        let project = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        std::fs::write(media.path().join("s02.wav"), b"").unwrap();

        let resolver = AudioResolver::new(project.path()).with_media_folder(media.path());
        assert_eq!(resolver.resolve(Path::new("s02.mp4")).unwrap(), media.path().join("s02.wav"));
    }

    #[test]
    fn test_missing_audio_is_not_found() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("s03.mov"), b"").unwrap();
        let err = AudioResolver::new(dir.path()).resolve(Path::new("s03.mov")).unwrap_err();
        assert!(err.is_not_found());
    }
}
