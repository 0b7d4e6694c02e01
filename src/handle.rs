// Image handles: process-local references to image bytes that the UI can
// render. Each handle is materialised as a file inside a per-process
// directory so any image viewer can open it, and the file is removed as
// soon as the handle is dropped. The directory itself goes away once the
// store and every handle it issued are gone.

use crate::error::{Error, Result};
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct StoreDir {
    path: PathBuf,
    next_id: AtomicU64,
}

impl Drop for StoreDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            log::debug!("could not remove handle dir {}: {}", self.path.display(), e);
        }
    }
}

/// Allocates [`ImageHandle`]s. Cheap to clone; clones share one directory
/// and one id counter.
#[derive(Debug, Clone)]
pub struct HandleStore {
    inner: Arc<StoreDir>,
}

impl HandleStore {
    /// Store under the user's cache directory, one subdirectory per process.
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        let dir = base
            .join("rembg-front")
            .join(format!("handles-{}", std::process::id()));
        HandleStore::in_dir(dir)
    }

    pub fn in_dir(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)?;
        Ok(HandleStore {
            inner: Arc::new(StoreDir {
                path,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.inner.path
    }

    /// Sniff `bytes`, write them out and return a handle owning the file.
    /// Bytes that are not a recognisable image yield [`Error::Decode`].
    pub fn create(&self, bytes: &[u8]) -> Result<ImageHandle> {
        if bytes.is_empty() {
            return Err(Error::Decode("empty image data".into()));
        }
        let format = image::guess_format(bytes)?;
        let (width, height) = image::ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let ext = format.extensions_str().first().copied().unwrap_or("img");
        let path = self.inner.path.join(format!("{}.{}", id, ext));
        std::fs::write(&path, bytes)?;
        log::debug!("handle {} -> {} ({} bytes)", id, path.display(), bytes.len());

        Ok(ImageHandle {
            id,
            path,
            format,
            width,
            height,
            len: bytes.len(),
            _store: Arc::clone(&self.inner),
        })
    }
}

/// A displayable image. Not `Clone`: exactly one owner decides when the
/// backing file is released.
#[derive(Debug)]
pub struct ImageHandle {
    id: u64,
    path: PathBuf,
    format: ImageFormat,
    width: u32,
    height: u32,
    len: usize,
    _store: Arc<StoreDir>,
}

impl ImageHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Size of the image data in bytes.
    pub fn byte_len(&self) -> usize {
        self.len
    }

    /// `file://` URL an external viewer or browser can open.
    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }

    /// Read the image bytes back.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("released handle {}", self.id),
            Err(e) => log::debug!("release of handle {} failed: {}", self.id, e),
        }
    }
}
