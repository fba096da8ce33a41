#![forbid(unsafe_code)]

//! Upload validation, thumbnail/duration probing and media-file housekeeping.
//!
//! Probing shells out to `ffprobe`/`ffmpeg` the same way the rest of the
//! toolchain drives external helpers: spawn, capture output, give up after a
//! fixed timeout. A machine without the ff-tools still works; uploads then
//! get a placeholder thumbnail and an unknown duration instead of failing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;
use tokio::process::Command;
use walkdir::WalkDir;

/// Directory under the media root that holds uploaded video files.
pub const UPLOADS_SUBDIR: &str = "uploads";

/// Hard cap on a single upload.
pub const MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024;

/// Upper bound on the whole thumbnail/duration probe. After this the upload
/// is reported as failed media processing and can be retried.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Shown when the probe could not determine a real duration.
pub const UNKNOWN_DURATION: &str = "0:00";

const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="320" height="180"><rect width="320" height="180" fill="#1f2326"/><text x="160" y="96" fill="#8b9398" font-family="sans-serif" font-size="16" text-anchor="middle">no preview</text></svg>"##;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("a video file is required")]
    MissingFile,
    #[error("the selected file is empty")]
    EmptyFile,
    #[error("file is too large ({size} bytes, limit {MAX_UPLOAD_BYTES})")]
    TooLarge { size: u64 },
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("could not read the video: {0}")]
    ProbeFailed(String),
    #[error("video processing timed out")]
    ProbeTimeout,
}

/// Thumbnail and duration extracted (or substituted) for an upload.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub duration_secs: Option<f64>,
    pub duration_text: String,
    pub thumbnail: String,
}

impl MediaInfo {
    fn unknown() -> Self {
        Self {
            duration_secs: None,
            duration_text: UNKNOWN_DURATION.to_string(),
            thumbnail: placeholder_thumbnail(),
        }
    }
}

/// Checks an incoming upload before any state is touched: a name must be
/// present, the file non-empty and under the size cap, and the extension
/// must map to a video MIME type.
pub fn validate_upload(file_name: &str, size: u64) -> Result<(), MediaError> {
    if file_name.trim().is_empty() {
        return Err(MediaError::MissingFile);
    }
    if size == 0 {
        return Err(MediaError::EmptyFile);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(MediaError::TooLarge { size });
    }
    let guessed = mime_guess::from_path(file_name).first();
    match guessed {
        Some(mime) if mime.type_() == mime_guess::mime::VIDEO => Ok(()),
        _ => Err(MediaError::UnsupportedType(file_name.to_string())),
    }
}

/// Relative storage path for an uploaded media file, derived from the
/// original file name's extension. `file_id` just has to be unique.
pub fn stored_file_path(file_id: &str, original_name: &str) -> Result<String, MediaError> {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| MediaError::UnsupportedType(original_name.to_string()))?;
    Ok(format!("{UPLOADS_SUBDIR}/{file_id}.{extension}"))
}

/// Writes the uploaded bytes to their final location under the media root
/// and returns the relative path stored on the video entity.
pub async fn save_media_file(
    media_root: &Path,
    file_id: &str,
    original_name: &str,
    data: &[u8],
) -> Result<String> {
    let relative = stored_file_path(file_id, original_name)
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    let target = media_root.join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(&target, data)
        .await
        .with_context(|| format!("writing {}", target.display()))?;
    Ok(relative)
}

/// Extracts duration and a single-frame thumbnail from the stored file.
///
/// Soft failure: when the ff-tools are not installed the result degrades to
/// a placeholder. Hard failure: a present tool that rejects the file (corrupt
/// upload, unsupported codec) or the probe running past [`PROBE_TIMEOUT`].
pub async fn probe(path: &Path) -> Result<MediaInfo, MediaError> {
    let duration_secs = match probe_duration(path).await {
        Ok(secs) => secs,
        Err(ToolFailure::NotInstalled) => return Ok(MediaInfo::unknown()),
        Err(ToolFailure::TimedOut) => return Err(MediaError::ProbeTimeout),
        Err(ToolFailure::Failed(message)) => return Err(MediaError::ProbeFailed(message)),
    };

    let thumbnail = match grab_frame(path).await {
        // An empty frame happens when the clip is shorter than the seek
        // offset; treat it like "no preview available".
        Ok(jpeg) if !jpeg.is_empty() => thumbnail_data_url(&jpeg),
        Ok(_) => placeholder_thumbnail(),
        Err(ToolFailure::NotInstalled) => placeholder_thumbnail(),
        Err(ToolFailure::TimedOut) => return Err(MediaError::ProbeTimeout),
        Err(ToolFailure::Failed(message)) => return Err(MediaError::ProbeFailed(message)),
    };

    Ok(MediaInfo {
        duration_secs,
        duration_text: duration_secs
            .map(format_duration)
            .unwrap_or_else(|| UNKNOWN_DURATION.to_string()),
        thumbnail,
    })
}

enum ToolFailure {
    NotInstalled,
    TimedOut,
    Failed(String),
}

async fn probe_duration(path: &Path) -> Result<Option<f64>, ToolFailure> {
    let output = run_tool(
        Command::new("ffprobe").args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path),
    )
    .await?;
    Ok(parse_probed_duration(&String::from_utf8_lossy(&output)))
}

async fn grab_frame(path: &Path) -> Result<Vec<u8>, ToolFailure> {
    run_tool(
        Command::new("ffmpeg")
            .args(["-v", "error", "-ss", "1", "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "mjpeg", "-"]),
    )
    .await
}

async fn run_tool(command: &mut Command) -> Result<Vec<u8>, ToolFailure> {
    let pending = command.output();
    let output = match tokio::time::timeout(PROBE_TIMEOUT, pending).await {
        Err(_) => return Err(ToolFailure::TimedOut),
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolFailure::NotInstalled);
        }
        Ok(Err(err)) => return Err(ToolFailure::Failed(err.to_string())),
        Ok(Ok(output)) => output,
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.lines().next().unwrap_or("tool reported failure");
        return Err(ToolFailure::Failed(detail.to_string()));
    }
    Ok(output.stdout)
}

fn parse_probed_duration(raw: &str) -> Option<f64> {
    let secs: f64 = raw.trim().parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(secs)
    } else {
        None
    }
}

/// Formats seconds as `M:SS` or `H:MM:SS`.
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Wraps raw JPEG bytes as an inline data URL.
pub fn thumbnail_data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg))
}

/// Neutral thumbnail used when no frame could be sampled.
pub fn placeholder_thumbnail() -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        BASE64.encode(PLACEHOLDER_SVG.as_bytes())
    )
}

/// Deletes the stored media file belonging to `relative_path`. Failures are
/// only warned about; a leftover file is picked up by the next sweep.
pub fn remove_media_file(media_root: &Path, relative_path: &str) {
    let target = media_root.join(relative_path);
    if let Err(err) = std::fs::remove_file(&target) {
        if err.kind() != std::io::ErrorKind::NotFound {
            eprintln!("Warning: could not remove {}: {err}", target.display());
        }
    }
}

/// Walks the uploads directory and deletes files no video references any
/// more. Covers crashes that landed between a cascade delete and its file
/// cleanup. `known_files` holds the relative paths stored on the videos.
/// Returns how many files were removed.
pub fn sweep_orphans(media_root: &Path, known_files: &HashSet<String>) -> Result<usize> {
    let uploads = media_root.join(UPLOADS_SUBDIR);
    if !uploads.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in WalkDir::new(&uploads).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("Warning: skipping unreadable media entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path: PathBuf = entry.into_path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if known_files.contains(&format!("{UPLOADS_SUBDIR}/{name}")) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => eprintln!("Warning: could not remove {}: {err}", path.display()),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn format_duration_covers_both_shapes() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(59.4), "0:59");
        assert_eq!(format_duration(61.0), "1:01");
        assert_eq!(format_duration(3661.0), "1:01:01");
        assert_eq!(format_duration(-5.0), "0:00");
    }

    #[test]
    fn parse_probed_duration_handles_garbage() {
        assert_eq!(parse_probed_duration("247.36\n"), Some(247.36));
        assert_eq!(parse_probed_duration("N/A"), None);
        assert_eq!(parse_probed_duration(""), None);
        assert_eq!(parse_probed_duration("-4"), None);
    }

    #[test]
    fn validate_upload_accepts_video_files_only() {
        assert!(validate_upload("run.mp4", 1024).is_ok());
        assert!(validate_upload("clip.webm", 1024).is_ok());
        assert!(matches!(
            validate_upload("", 1024),
            Err(MediaError::MissingFile)
        ));
        assert!(matches!(
            validate_upload("run.mp4", 0),
            Err(MediaError::EmptyFile)
        ));
        assert!(matches!(
            validate_upload("run.mp4", MAX_UPLOAD_BYTES + 1),
            Err(MediaError::TooLarge { .. })
        ));
        assert!(matches!(
            validate_upload("notes.txt", 1024),
            Err(MediaError::UnsupportedType(_))
        ));
        assert!(matches!(
            validate_upload("noextension", 1024),
            Err(MediaError::UnsupportedType(_))
        ));
    }

    #[test]
    fn stored_file_path_normalizes_extension() {
        assert_eq!(
            stored_file_path("abc123", "Track Day.MP4").unwrap(),
            "uploads/abc123.mp4"
        );
        assert!(stored_file_path("abc123", "noext").is_err());
    }

    #[test]
    fn thumbnail_data_url_is_decodable() {
        let url = thumbnail_data_url(&[0xff, 0xd8, 0xff]);
        let encoded = url.strip_prefix("data:image/jpeg;base64,").unwrap();
        assert_eq!(BASE64.decode(encoded).unwrap(), vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn placeholder_thumbnail_is_svg_data_url() {
        assert!(placeholder_thumbnail().starts_with("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn save_media_file_writes_under_uploads() -> Result<()> {
        let dir = tempdir()?;
        let relative = save_media_file(dir.path(), "vid-1", "clip.MOV", b"bytes").await?;
        assert_eq!(relative, "uploads/vid-1.mov");
        assert_eq!(std::fs::read(dir.path().join(&relative))?, b"bytes");
        Ok(())
    }

    #[test]
    fn remove_media_file_is_quiet_about_missing_targets() {
        let dir = tempdir().unwrap();
        // Nothing to assert beyond "does not panic"; the file never existed.
        remove_media_file(dir.path(), "uploads/ghost.mp4");
    }

    #[test]
    fn sweep_orphans_removes_only_unknown_files() -> Result<()> {
        let dir = tempdir()?;
        let uploads = dir.path().join(UPLOADS_SUBDIR);
        std::fs::create_dir_all(&uploads)?;
        std::fs::write(uploads.join("keep.mp4"), b"a")?;
        std::fs::write(uploads.join("drop.mp4"), b"b")?;

        let known: HashSet<String> = ["uploads/keep.mp4".to_string()].into_iter().collect();
        let removed = sweep_orphans(dir.path(), &known)?;

        assert_eq!(removed, 1);
        assert!(uploads.join("keep.mp4").exists());
        assert!(!uploads.join("drop.mp4").exists());
        Ok(())
    }

    #[test]
    fn sweep_orphans_without_uploads_dir_is_a_no_op() -> Result<()> {
        let dir = tempdir()?;
        assert_eq!(sweep_orphans(dir.path(), &HashSet::new())?, 0);
        Ok(())
    }
}
