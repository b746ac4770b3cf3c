//! The `Receiver` scoped resource (§4.3, §9 "Scoped resource
//! acquisition"): atomic per-project file writes driven by `pull`.
//!
//! Grounded on the streaming-hash approach described in §4.3's "streaming
//! vs. buffering" note and on `sha2`'s incremental `Digest` API as used
//! elsewhere in the retrieval pack for content fingerprints.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::WorkspaceResult;

pub const LOCK_FILE: &str = "protato.lock";
pub const GITATTRIBUTES_FILE: &str = ".gitattributes";
const GITATTRIBUTES_CONTENT: &str = "* linguist-generated=true\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockFile {
    snapshot: String,
}

/// Parse a `protato.lock` document's `snapshot` field.
pub fn parse_lock(raw: &str) -> Option<String> {
    serde_yaml::from_str::<LockFile>(raw).ok().map(|l| l.snapshot)
}

fn render_lock(snapshot: &str) -> String {
    serde_yaml::to_string(&LockFile { snapshot: snapshot.to_string() })
        .unwrap_or_else(|_| format!("snapshot: {snapshot}\n"))
}

fn hash_file(path: &Path) -> std::io::Result<Option<[u8; 32]>> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(Some(hasher.finalize().into()))
}

/// An open write handle for one file within a `Receiver` scope.
/// Hashes content incrementally as it is written; `close()` reports
/// whether the final bytes differ from whatever was on disk before this
/// write began.
pub struct FileWriter {
    final_path: PathBuf,
    tmp_path: PathBuf,
    file: std::fs::File,
    hasher: Sha256,
    previous_hash: Option<[u8; 32]>,
}

impl FileWriter {
    fn create(final_path: PathBuf) -> std::io::Result<Self> {
        let previous_hash = hash_file(&final_path)?;
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = final_path.with_extension("protato-tmp");
        let file = std::fs::File::create(&tmp_path)?;
        Ok(Self {
            final_path,
            tmp_path,
            file,
            hasher: Sha256::new(),
            previous_hash,
        })
    }

    /// Finish writing: flush, atomically rename into place, and report
    /// whether content changed relative to what was there before.
    pub fn close(mut self) -> std::io::Result<bool> {
        self.file.flush()?;
        std::fs::rename(&self.tmp_path, &self.final_path)?;
        let new_hash: [u8; 32] = self.hasher.clone().finalize().into();
        Ok(self.previous_hash != Some(new_hash))
    }
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.file.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

/// Scoped receiver for one project's pull. Must be driven to `finish()`
/// on every success path; dropping it without calling `finish()` is the
/// implicit `abandon()` (§9) — whatever files were written remain, but
/// the lock file is not rewritten, so the project stays at its previous
/// recorded snapshot from the caller's point of view.
pub struct Receiver {
    project_root: PathBuf,
    files_changed: usize,
    files_deleted: usize,
}

/// Outcome of a completed receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveSummary {
    pub files_changed: usize,
    pub files_deleted: usize,
}

impl Receiver {
    pub fn open(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            files_changed: 0,
            files_deleted: 0,
        }
    }

    /// Begin writing `rel_path` (forward-slash, relative to the project
    /// root).
    pub fn create_file(&self, rel_path: &str) -> WorkspaceResult<FileWriter> {
        Ok(FileWriter::create(self.project_root.join(rel_path))?)
    }

    /// Record that `create_file` produced a changed/unchanged file.
    pub fn record_write(&mut self, changed: bool) {
        if changed {
            self.files_changed += 1;
        }
    }

    /// Best-effort removal of `rel_path`.
    pub fn delete_file(&mut self, rel_path: &str) -> WorkspaceResult<()> {
        let path = self.project_root.join(rel_path);
        if path.is_file() {
            std::fs::remove_file(&path)?;
            self.files_deleted += 1;
        }
        Ok(())
    }

    /// Write the lock file and `.gitattributes`, making the pull visible.
    /// This is the only externally observable commit point (§5).
    pub fn finish(self, snapshot: &str) -> WorkspaceResult<ReceiveSummary> {
        std::fs::create_dir_all(&self.project_root)?;
        std::fs::write(self.project_root.join(LOCK_FILE), render_lock(snapshot))?;
        std::fs::write(self.project_root.join(GITATTRIBUTES_FILE), GITATTRIBUTES_CONTENT)?;
        Ok(ReceiveSummary {
            files_changed: self.files_changed,
            files_deleted: self.files_deleted,
        })
    }

    /// Explicit abandonment: no lock/gitattributes write, previous state
    /// stands. Equivalent to dropping the receiver, named for clarity at
    /// call sites (§9).
    pub fn abandon(self) {}
}
