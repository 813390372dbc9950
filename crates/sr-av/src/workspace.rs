//! Scoped scratch space for one render.
//!
//! A [`RenderWorkspace`] is a temporary directory created next to the
//! destination. The encoder writes into [`RenderWorkspace::staged_output`];
//! only [`RenderWorkspace::finalize`] moves the file to the destination.
//! Dropping the workspace removes the directory with everything in it.

use std::io;
use std::path::{Path, PathBuf};

use sr_core::{Error, Result};
use tempfile::TempDir;

const DIR_PREFIX: &str = ".shortreel-";

/// Workspace for a single encoder invocation.
///
/// # Example
///
/// ```no_run
/// use sr_av::RenderWorkspace;
///
/// let workspace = RenderWorkspace::new(std::path::Path::new("/videos/out.mp4")).unwrap();
/// // ... run the encoder, writing to workspace.staged_output() ...
/// workspace.finalize().unwrap();
/// ```
#[derive(Debug)]
pub struct RenderWorkspace {
    temp_dir: TempDir,
    destination: PathBuf,
}

impl RenderWorkspace {
    /// Create the workspace in the destination's directory, creating that
    /// directory if needed. Staying on the same filesystem lets
    /// [`finalize`](Self::finalize) rename instead of copy.
    pub fn new(destination: &Path) -> Result<Self> {
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let temp_dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(&parent)?;
        tracing::trace!("created render workspace {}", temp_dir.path().display());

        Ok(Self {
            temp_dir,
            destination: destination.to_path_buf(),
        })
    }

    /// Final location of the rendered file.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Path the encoder writes to: the destination's file name inside the
    /// workspace, so the container is still inferred from the extension.
    pub fn staged_output(&self) -> PathBuf {
        let file_name = self
            .destination
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("output.mp4"));
        self.temp_dir.path().join(file_name)
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a named side file inside the workspace.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Move the staged output to the destination, replacing any existing
    /// file, and remove the workspace.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if nothing was staged or the move fails; the destination
    /// is left untouched in the first case.
    pub fn finalize(self) -> Result<PathBuf> {
        let staged = self.staged_output();
        if !staged.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("encoder produced no output at {}", staged.display()),
            )
            .into());
        }

        // Rename first (same filesystem), fall back to copy.
        if let Err(rename_err) = std::fs::rename(&staged, &self.destination) {
            tracing::debug!("rename failed ({rename_err}); copying instead");
            std::fs::copy(&staged, &self.destination)?;
        }

        Ok(self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn workspace_paths() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("short.mp4");
        let ws = RenderWorkspace::new(&dest).unwrap();

        assert_eq!(ws.destination(), dest);
        assert!(ws.staged_output().starts_with(ws.temp_dir()));
        assert_eq!(ws.staged_output().file_name().unwrap(), "short.mp4");
        assert_eq!(ws.temp_dir().parent(), Some(dir.path()));
    }

    #[test]
    fn temp_file_inside_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws = RenderWorkspace::new(&dir.path().join("short.mp4")).unwrap();
        let tf = ws.temp_file("graph.txt");
        assert!(tf.starts_with(ws.temp_dir()));
        assert_eq!(tf.file_name().unwrap(), "graph.txt");
    }

    #[test]
    fn finalize_moves_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("short.mp4");
        fs::write(&dest, b"previous").unwrap();

        let ws = RenderWorkspace::new(&dest).unwrap();
        let scratch = ws.temp_dir().to_path_buf();
        fs::write(ws.staged_output(), b"rendered").unwrap();
        fs::write(ws.temp_file("graph.txt"), b"[0:v]null[outv]").unwrap();

        let final_path = ws.finalize().unwrap();
        assert_eq!(final_path, dest);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "rendered");
        assert!(!scratch.exists());
    }

    #[test]
    fn finalize_fails_when_nothing_staged() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("short.mp4");

        let ws = RenderWorkspace::new(&dest).unwrap();
        let result = ws.finalize();
        assert!(matches!(result, Err(Error::Io { .. })));
        assert!(!dest.exists());
    }

    #[test]
    fn drop_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("short.mp4");

        let ws = RenderWorkspace::new(&dest).unwrap();
        let scratch = ws.temp_dir().to_path_buf();
        fs::write(ws.staged_output(), b"half an mp4").unwrap();
        drop(ws);

        assert!(!scratch.exists());
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn creates_missing_destination_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/out/short.mp4");
        let ws = RenderWorkspace::new(&dest).unwrap();
        assert!(dir.path().join("nested/out").is_dir());
        assert!(ws.temp_dir().starts_with(dir.path().join("nested/out")));
    }
}
