use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];
const VIDEO_EXTS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "3gp"];
const AUDIO_EXTS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac"];

/// Attachment category sent to the backend as `file_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    Image,
    Video,
    Audio,
    Document,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Document => "document",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify by MIME prefix first, then by extension. Anything else is a document.
pub fn detect_file_type(file_name: &str, mime_type: Option<&str>) -> FileType {
    if let Some(mime) = mime_type {
        let mime = mime.to_lowercase();
        if mime.starts_with("image/") {
            return FileType::Image;
        }
        if mime.starts_with("video/") {
            return FileType::Video;
        }
        if mime.starts_with("audio/") {
            return FileType::Audio;
        }
    }

    let lower = file_name.to_lowercase();
    let ext = lower.rsplit('.').next().unwrap_or("");
    if IMAGE_EXTS.contains(&ext) {
        FileType::Image
    } else if VIDEO_EXTS.contains(&ext) {
        FileType::Video
    } else if AUDIO_EXTS.contains(&ext) {
        FileType::Audio
    } else {
        FileType::Document
    }
}

/// A local file chosen for sending, not yet uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub file_name: String,
    /// Guessed from the file name; `application/octet-stream` when unknown.
    pub mime_type: String,
    pub file_type: FileType,
    pub size: u64,
}

impl Attachment {
    /// Stat `path` and classify it. Fails if the path is not a readable file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let md = std::fs::metadata(path)?;
        if !md.is_file() {
            return Err(Error::validation(format!(
                "{} is not a file",
                path.display()
            )));
        }
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("attachment")
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let file_type = detect_file_type(&file_name, Some(&mime_type));
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            mime_type,
            file_type,
            size: md.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_prefix_wins_over_extension() {
        assert_eq!(detect_file_type("clip.pdf", Some("video/mp4")), FileType::Video);
        assert_eq!(detect_file_type("x.bin", Some("IMAGE/PNG")), FileType::Image);
        assert_eq!(detect_file_type("x.bin", Some("audio/ogg")), FileType::Audio);
    }

    #[test]
    fn extension_fallback_is_case_insensitive() {
        assert_eq!(detect_file_type("Photo.JPG", None), FileType::Image);
        assert_eq!(detect_file_type("movie.3gp", Some("")), FileType::Video);
        assert_eq!(detect_file_type("voice.m4a", Some("application/octet-stream")), FileType::Audio);
    }

    #[test]
    fn everything_else_is_a_document() {
        assert_eq!(detect_file_type("report.pdf", None), FileType::Document);
        assert_eq!(detect_file_type("README", None), FileType::Document);
        assert_eq!(detect_file_type("archive.tar.gz", None), FileType::Document);
    }

    #[test]
    fn from_path_reads_size_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("banner.png");
        std::fs::write(&p, b"12345").unwrap();
        let a = Attachment::from_path(&p).unwrap();
        assert_eq!(a.file_name, "banner.png");
        assert_eq!(a.mime_type, "image/png");
        assert_eq!(a.file_type, FileType::Image);
        assert_eq!(a.size, 5);

        assert!(Attachment::from_path(dir.path()).is_err());
    }

    #[test]
    fn from_path_classifies_unlisted_extensions_by_mime() {
        let dir = tempfile::tempdir().unwrap();
        for (name, want) in [
            ("scan.tiff", FileType::Image),
            ("clip.mpeg", FileType::Video),
            ("tune.mid", FileType::Audio),
            ("notes.xyz", FileType::Document),
        ] {
            let p = dir.path().join(name);
            std::fs::write(&p, b"x").unwrap();
            let a = Attachment::from_path(&p).unwrap();
            assert_eq!(a.file_type, want, "{name} ({})", a.mime_type);
        }
    }
}
