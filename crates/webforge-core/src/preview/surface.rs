//! Rendering surfaces
//!
//! A surface only supports replacing its whole document. The file surface
//! writes the document next to a host page that embeds it in a sandboxed
//! iframe, so a browser pointed at the host page shows the live preview.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{Error, Result};

/// File holding the composed preview document
pub const PREVIEW_FILE: &str = "preview.html";
/// Host page embedding the preview
pub const HOST_FILE: &str = "index.html";

const HOST_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Webforge preview</title>
    <style>html, body, iframe { margin: 0; width: 100%; height: 100%; border: 0; }</style>
</head>
<body>
    <iframe src="preview.html" sandbox="allow-scripts allow-same-origin" title="Preview"></iframe>
</body>
</html>
"#;

/// Something that can display a preview document
pub trait RenderSurface: Send + Sync {
    /// Replace the displayed document with `document`
    fn replace_document(&mut self, document: &str) -> Result<()>;
}

/// Writes the preview into a directory on disk
#[derive(Debug)]
pub struct FileSurface {
    dir: PathBuf,
    host_written: bool,
}

impl FileSurface {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            host_written: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the composed document
    pub fn preview_path(&self) -> PathBuf {
        self.dir.join(PREVIEW_FILE)
    }

    /// Path of the host page to open in a browser
    pub fn host_path(&self) -> PathBuf {
        self.dir.join(HOST_FILE)
    }
}

impl RenderSurface for FileSurface {
    fn replace_document(&mut self, document: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        if !self.host_written {
            std::fs::write(self.host_path(), HOST_PAGE)?;
            self.host_written = true;
        }

        std::fs::write(self.preview_path(), document)?;
        debug!(path = %self.preview_path().display(), bytes = document.len(), "Preview written");
        Ok(())
    }
}

/// Keeps the last document in memory; clones share the same document
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    document: Option<String>,
    renders: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current document, if anything was rendered
    pub fn document(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.document.clone())
    }

    /// How many times the document was replaced
    pub fn render_count(&self) -> usize {
        self.state.lock().map(|s| s.renders).unwrap_or(0)
    }
}

impl RenderSurface for MemorySurface {
    fn replace_document(&mut self, document: &str) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Other("preview surface lock poisoned".to_string()))?;
        state.document = Some(document.to_string());
        state.renders += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_surface_writes_host_and_preview() {
        let dir = TempDir::new().unwrap();
        let mut surface = FileSurface::new(dir.path().join("preview"));

        surface.replace_document("<p>first</p>").unwrap();
        surface.replace_document("<p>second</p>").unwrap();

        let preview = std::fs::read_to_string(surface.preview_path()).unwrap();
        assert_eq!(preview, "<p>second</p>");

        let host = std::fs::read_to_string(surface.host_path()).unwrap();
        assert!(host.contains(r#"sandbox="allow-scripts allow-same-origin""#));
        assert!(host.contains("preview.html"));
    }

    #[test]
    fn test_memory_surface_shares_state() {
        let surface = MemorySurface::new();
        let mut boxed: Box<dyn RenderSurface> = Box::new(surface.clone());

        assert_eq!(surface.document(), None);
        boxed.replace_document("<p>a</p>").unwrap();
        boxed.replace_document("<p>b</p>").unwrap();

        assert_eq!(surface.document().as_deref(), Some("<p>b</p>"));
        assert_eq!(surface.render_count(), 2);
    }
}
