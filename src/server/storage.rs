//! Temp-file bookkeeping for uploads and converted decks

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use uuid::Uuid;

static UNSAFE_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").unwrap());

const MAX_STEM_LEN: usize = 64;

/// Suffix of a deck that a download has claimed
const CLAIMED_SUFFIX: &str = ".sending";

/// Paths reserved for one conversion
#[derive(Debug, Clone)]
pub struct Reservation {
    pub input: PathBuf,
    pub output: PathBuf,
    /// File name of the output, as used in the download URL
    pub output_name: String,
}

/// Directory holding uploads and converted decks. Every request gets its own
/// uniquely named files.
#[derive(Debug, Clone)]
pub struct TempStore {
    dir: PathBuf,
}

impl TempStore {
    pub fn open<P: Into<PathBuf>>(dir: P) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(TempStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve input and output paths for an upload
    pub fn reserve(&self, upload_name: Option<&str>) -> Reservation {
        let stem = sanitize_stem(upload_name.unwrap_or_default());
        let id = Uuid::new_v4().simple();
        let output_name = format!("{}-{}.pptx", stem, id);
        Reservation {
            input: self.dir.join(format!("{}-{}.pdf", stem, id)),
            output: self.dir.join(&output_name),
            output_name,
        }
    }

    /// Take exclusive ownership of a converted deck by renaming it, so a
    /// second request for the same name finds nothing. Returns the claimed
    /// path, or `None` when the name is unsafe or the file is absent.
    pub async fn claim(&self, name: &str) -> Option<PathBuf> {
        if !is_safe_name(name) {
            debug!("rejected download name {:?}", name);
            return None;
        }
        let path = self.dir.join(name);
        let claimed = self.dir.join(format!("{}{}", name, CLAIMED_SUFFIX));
        match tokio::fs::rename(&path, &claimed).await {
            Ok(()) => Some(claimed),
            Err(e) => {
                debug!("download {} not available: {}", name, e);
                None
            }
        }
    }
}

/// Write an upload to disk; a failed write leaves no partial file behind
pub async fn write_or_remove(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Err(e) = tokio::fs::write(path, data).await {
        remove_quietly(path).await;
        return Err(e);
    }
    Ok(())
}

/// Remove a file, logging instead of failing
pub async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Error removing file {}: {}", path.display(), e);
        }
    }
}

/// File stem of an upload name reduced to `[A-Za-z0-9_-]`
pub fn sanitize_stem(upload_name: &str) -> String {
    // uploads may carry client-side directories, with either separator
    let base = upload_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = Path::new(base)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let cleaned = UNSAFE_CHARS_RE.replace_all(&stem, "_");
    let cleaned: String = cleaned.trim_matches('_').chars().take(MAX_STEM_LEN).collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Only plain `.pptx` names inside the store can be downloaded
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
        && name.ends_with(".pptx")
}
