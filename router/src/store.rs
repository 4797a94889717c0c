//! Filesystem-backed run storage under a status/project/run-id tree.
//!
//! A run's status is its storage location; there is no manifest or index
//! file, and directory walking is the only discovery mechanism. Writers and
//! readers share nothing but the tree itself.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::reply::ReplyFile;

/// Preview length cap in characters.
const PREVIEW_LIMIT: usize = 400;

/// Lifecycle bucket a run currently occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Incoming,
    Approved,
    Rejected,
    Reports,
}

impl Status {
    /// Lifecycle order; also the order the dashboard reports buckets in.
    pub const ALL: [Status; 4] = [
        Status::Incoming,
        Status::Approved,
        Status::Rejected,
        Status::Reports,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Incoming => "incoming",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
            Status::Reports => "reports",
        }
    }

    /// Parse a status path segment. Unknown values must be rejected before
    /// any filesystem access.
    pub fn parse(raw: &str) -> Option<Status> {
        match raw {
            "incoming" => Some(Status::Incoming),
            "approved" => Some(Status::Approved),
            "rejected" => Some(Status::Rejected),
            "reports" => Some(Status::Reports),
            _ => None,
        }
    }
}

/// Failures raised by store lookups and writes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
    #[error("run '{0}' not found")]
    RunNotFound(String),
    /// A reply-supplied file path that would land outside the run directory.
    #[error("file path '{0}' escapes the run directory")]
    PathEscapes(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Per-file listing entry with preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    pub preview: String,
}

/// Summary of one run, as listed by the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    /// Run directory mtime as unix seconds; derived, never stored.
    pub last_updated: u64,
    pub file_count: usize,
    pub files: Vec<FileEntry>,
}

/// Full detail for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunDetail {
    pub status: Status,
    pub project: String,
    pub run_id: String,
    pub path: String,
    pub file_count: usize,
    pub files: Vec<FileEntry>,
    pub last_updated: u64,
}

/// Filesystem-backed run store rooted at the workspace directory.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of one status bucket.
    pub fn status_dir(&self, status: Status) -> PathBuf {
        self.root.join(status.as_str())
    }

    /// Create the four status directories. Safe to call repeatedly; never
    /// fails on pre-existing directories.
    pub fn ensure_layout(&self) -> Result<(), StoreError> {
        for status in Status::ALL {
            let dir = self.status_dir(status);
            fs::create_dir_all(&dir)
                .map_err(|err| StoreError::io(format!("create {}", dir.display()), err))?;
        }
        Ok(())
    }

    /// Materialize a run directory and its files.
    ///
    /// Every path is checked before anything touches the disk, so a bad path
    /// leaves no partial run behind. Existing files at the same paths are
    /// overwritten; runs are assumed immutable once created since the id
    /// embeds a timestamp and task hash.
    pub fn write_run(
        &self,
        status: Status,
        project: &str,
        run_id: &str,
        files: &[ReplyFile],
    ) -> Result<PathBuf, StoreError> {
        for file in files {
            sanitize_rel_path(&file.path)?;
        }

        let run_dir = self.status_dir(status).join(project).join(run_id);
        fs::create_dir_all(&run_dir)
            .map_err(|err| StoreError::io(format!("create {}", run_dir.display()), err))?;

        for file in files {
            let dest = run_dir.join(&file.path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| StoreError::io(format!("create {}", parent.display()), err))?;
            }
            fs::write(&dest, &file.content)
                .map_err(|err| StoreError::io(format!("write {}", dest.display()), err))?;
        }

        debug!(run_dir = %run_dir.display(), files = files.len(), "run written");
        Ok(run_dir)
    }

    /// List run summaries for `status/project`, most recently updated first.
    ///
    /// A missing project directory is an empty listing, not an error.
    pub fn list_runs(&self, status: Status, project: &str) -> Result<Vec<RunSummary>, StoreError> {
        let project_dir = self.status_dir(status).join(project);
        if !project_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&project_dir)
            .map_err(|err| StoreError::io(format!("read {}", project_dir.display()), err))?;

        let mut runs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(run_id) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let files = gather_run_files(&path)?;
            runs.push(RunSummary {
                run_id: run_id.to_string(),
                last_updated: dir_mtime(&path),
                file_count: files.len(),
                files,
            });
        }

        sort_runs(&mut runs);
        Ok(runs)
    }

    /// Full listing for one run.
    ///
    /// The status string is validated first: an unknown value is
    /// `UnknownStatus` without any filesystem access.
    pub fn run_detail(
        &self,
        status_raw: &str,
        project: &str,
        run_id: &str,
    ) -> Result<RunDetail, StoreError> {
        let status = Status::parse(status_raw)
            .ok_or_else(|| StoreError::UnknownStatus(status_raw.to_string()))?;

        let run_dir = self.status_dir(status).join(project).join(run_id);
        if !run_dir.is_dir() {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }

        let files = gather_run_files(&run_dir)?;
        Ok(RunDetail {
            status,
            project: project.to_string(),
            run_id: run_id.to_string(),
            path: run_dir.display().to_string(),
            file_count: files.len(),
            files,
            last_updated: dir_mtime(&run_dir),
        })
    }
}

/// Newest runs first; listing order is exactly what the dashboard shows.
pub(crate) fn sort_runs(runs: &mut [RunSummary]) {
    runs.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
}

/// Recursively collect a run's files as relative paths, sorted
/// lexicographically.
fn gather_run_files(run_dir: &Path) -> Result<Vec<FileEntry>, StoreError> {
    let mut collected = Vec::new();
    walk_files(run_dir, run_dir, &mut collected)?;
    collected.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(collected)
}

fn walk_files(root: &Path, dir: &Path, out: &mut Vec<FileEntry>) -> Result<(), StoreError> {
    let entries =
        fs::read_dir(dir).map_err(|err| StoreError::io(format!("read {}", dir.display()), err))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_files(root, &path, out)?;
            continue;
        }
        let rel = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        let size = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
        out.push(FileEntry {
            path: rel,
            size,
            preview: preview_file(&path),
        });
    }
    Ok(())
}

/// Read a bounded text preview of a file.
///
/// Undecodable bytes yield the literal `<binary>` marker; a file that
/// disappeared between listing and read yields an empty preview rather than
/// an error.
fn preview_file(path: &Path) -> String {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return String::new(),
    };
    let Ok(text) = String::from_utf8(bytes) else {
        return "<binary>".to_string();
    };
    truncate_preview(&text)
}

/// Cap preview text at [`PREVIEW_LIMIT`] characters plus a trailing ellipsis.
fn truncate_preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_LIMIT) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

fn dir_mtime(path: &Path) -> u64 {
    fs::metadata(path)
        .ok()
        .and_then(|meta| meta.modified().ok())
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Validate that a reply-supplied path stays inside the run directory.
fn sanitize_rel_path(raw: &str) -> Result<(), StoreError> {
    let path = Path::new(raw);
    if raw.is_empty() || path.is_absolute() {
        return Err(StoreError::PathEscapes(raw.to_string()));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(StoreError::PathEscapes(raw.to_string())),
        }
    }
    Ok(())
}
