// Artifact persistence for idox
// Bytes land once under all/, the extension and status views link to that copy

use crate::response_analysis::classify_response;
use crate::transport::TransportResponse;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub const ALL_DIR: &str = "all";
pub const STATUS_DIR: &str = "status_code";

const PROBE_NAME: &str = ".idox-link-probe";

/// How secondary artifact paths are populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    HardLink,
    /// Chosen when the output directory cannot hold hard links.
    Copy,
}

/// Where one response ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedArtifact {
    pub extension: String,
    pub canonical: PathBuf,
    pub by_extension: PathBuf,
    pub by_status: PathBuf,
}

#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    link_mode: LinkMode,
    staged: AtomicU64,
}

impl ArtifactStore {
    /// Create the output root and probe whether it supports hard links.
    pub fn prepare(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(ALL_DIR))?;
        let link_mode = detect_link_mode(&root)?;
        if link_mode == LinkMode::Copy {
            tracing::warn!(root = %root.display(), "hard links unavailable, artifacts will be copied");
        }
        Ok(Self {
            root,
            link_mode,
            staged: AtomicU64::new(0),
        })
    }

    /// Use a fixed link mode instead of probing.
    pub fn with_link_mode(root: impl Into<PathBuf>, link_mode: LinkMode) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(ALL_DIR))?;
        Ok(Self {
            root,
            link_mode,
            staged: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn link_mode(&self) -> LinkMode {
        self.link_mode
    }

    /// Write the body under `all/` and refresh the extension and status links.
    ///
    /// Every path is filled through a staging file that is renamed into place,
    /// so tasks persisting the same file name never see each other's partial
    /// state.
    pub async fn persist(&self, token: &str, response: &TransportResponse) -> io::Result<PersistedArtifact> {
        let extension = classify_response(response);
        let file_name = format!("{}.{}", sanitize_token(token), extension);

        let canonical = self.root.join(ALL_DIR).join(&file_name);
        let by_extension = self.root.join(&extension).join(&file_name);
        let by_status = self
            .root
            .join(STATUS_DIR)
            .join(response.status.to_string())
            .join(&file_name);

        create_parent(&canonical).await?;
        let staging = self.staging_path(&canonical);
        if let Err(e) = tokio::fs::write(&staging, &response.body).await {
            discard(&staging).await;
            return Err(e);
        }
        for target in [&by_extension, &by_status] {
            create_parent(target).await?;
            if let Err(e) = self.link(&staging, target).await {
                discard(&staging).await;
                return Err(e);
            }
        }
        if let Err(e) = tokio::fs::rename(&staging, &canonical).await {
            discard(&staging).await;
            return Err(e);
        }

        Ok(PersistedArtifact {
            extension,
            canonical,
            by_extension,
            by_status,
        })
    }

    /// Populate `target` from `source`, replacing whatever is there.
    async fn link(&self, source: &Path, target: &Path) -> io::Result<()> {
        let staging = self.staging_path(target);
        let linked = match self.link_mode {
            LinkMode::HardLink => tokio::fs::hard_link(source, &staging).await,
            LinkMode::Copy => tokio::fs::copy(source, &staging).await.map(|_| ()),
        };
        if let Err(e) = linked {
            discard(&staging).await;
            return Err(e);
        }
        match tokio::fs::rename(&staging, target).await {
            Ok(()) => Ok(()),
            Err(e) => {
                discard(&staging).await;
                Err(e)
            }
        }
    }

    /// A hidden sibling of `path`, unique within this store.
    fn staging_path(&self, path: &Path) -> PathBuf {
        let n = self.staged.fetch_add(1, Ordering::Relaxed);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %e, "could not remove staging file");
        }
    }
}

async fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => tokio::fs::create_dir_all(parent).await,
        None => Ok(()),
    }
}

fn detect_link_mode(root: &Path) -> io::Result<LinkMode> {
    let source = root.join(ALL_DIR).join(PROBE_NAME);
    let target = root.join(PROBE_NAME);
    std::fs::write(&source, b"probe")?;
    let _ = std::fs::remove_file(&target);
    let mode = match std::fs::hard_link(&source, &target) {
        Ok(()) => LinkMode::HardLink,
        Err(e) => {
            tracing::debug!(error = %e, "hard link probe failed");
            LinkMode::Copy
        }
    };
    let _ = std::fs::remove_file(&target);
    std::fs::remove_file(&source)?;
    Ok(mode)
}

/// Make a token safe to use as a single path component.
pub fn sanitize_token(token: &str) -> String {
    if token.is_empty() {
        return "_".to_string();
    }
    token
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_separators() {
        assert_eq!(sanitize_token("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_token("a\\b\0c"), "a_b_c");
        assert_eq!(sanitize_token(""), "_");
        assert_eq!(sanitize_token("T-USER-1A"), "T-USER-1A");
    }
}
