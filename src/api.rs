// API client module: a small blocking HTTP client that uploads an image
// to the background-removal service and turns the binary answer into an
// `ImageHandle`. One request per call; no retries and no timeout, since
// matting large images on a CPU-only server can take a long time.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::handle::{HandleStore, ImageHandle};
use image::ImageFormat;
use reqwest::blocking::{multipart, Client};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// The two processing modes offered by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Background removal ("matting"); the service answers with a PNG.
    Image,
    /// Mask generation; the service answers with a greyscale JPEG.
    Mask,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Image, Variant::Mask];

    /// Path segment below the base URL.
    pub fn path(self) -> &'static str {
        match self {
            Variant::Image => "rembg/image",
            Variant::Mask => "rembg/mask",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variant::Image => "Remove background",
            Variant::Mask => "Generate mask",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Image => f.write_str("image"),
            Variant::Mask => f.write_str("mask"),
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "image" => Ok(Variant::Image),
            "mask" => Ok(Variant::Mask),
            other => Err(format!("unknown variant '{}', expected 'image' or 'mask'", other)),
        }
    }
}

/// A file picked by the user, read into memory once.
#[derive(Debug, Clone)]
pub struct Payload {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Payload {
    /// Build a payload from raw bytes. Empty data is refused.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::EmptyPayload);
        }
        let file_name = file_name.into();
        // extension first, then the magic bytes (camera files often have none)
        let mime = ImageFormat::from_path(&file_name)
            .or_else(|_| image::guess_format(&bytes))
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");
        Ok(Payload {
            file_name,
            mime,
            bytes,
        })
    }

    /// Read `path`, refusing files larger than `max_bytes` before loading them.
    pub fn from_path(path: &Path, max_bytes: usize) -> Result<Self> {
        let size = usize::try_from(std::fs::metadata(path)?.len()).unwrap_or(usize::MAX);
        if size > max_bytes {
            return Err(Error::TooLarge {
                size,
                max: max_bytes,
            });
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();
        Payload::new(file_name, bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Something that can send a payload for processing and hand back the
/// result as a handle. `ApiClient` talks HTTP; tests plug in fakes.
pub trait Transfer: Sync {
    fn upload_image(
        &self,
        payload: &Payload,
        variant: Variant,
        store: &HandleStore,
    ) -> Result<ImageHandle>;
}

/// Blocking client holding the reqwest client and the service base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    max_upload_bytes: usize,
}

impl ApiClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        // reqwest's blocking client times out after 30s by default.
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(ApiClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for `variant`. Pure: depends only on the base URL.
    pub fn endpoint(&self, variant: Variant) -> String {
        format!("{}/{}", self.base_url, variant.path())
    }

    /// POST the payload as multipart field `file` and return the raw body.
    pub fn send(&self, payload: &Payload, variant: Variant) -> Result<Vec<u8>> {
        if payload.is_empty() {
            return Err(Error::EmptyPayload);
        }
        if payload.len() > self.max_upload_bytes {
            return Err(Error::TooLarge {
                size: payload.len(),
                max: self.max_upload_bytes,
            });
        }

        let url = self.endpoint(variant);
        let part = multipart::Part::bytes(payload.bytes.clone())
            .file_name(payload.file_name.clone())
            .mime_str(payload.mime)
            .map_err(|e| Error::InvalidMime(format!("{}: {}", payload.mime, e)))?;
        let form = multipart::Form::new().part("file", part);

        log::info!("POST {} ({} bytes, {})", url, payload.len(), payload.mime);
        let res = self.client.post(&url).multipart(form).send()?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(Error::Rejected { status, body });
        }
        let body = res.bytes()?;
        log::info!("{} answered {} bytes", url, body.len());
        Ok(body.to_vec())
    }
}

impl Transfer for ApiClient {
    fn upload_image(
        &self,
        payload: &Payload,
        variant: Variant,
        store: &HandleStore,
    ) -> Result<ImageHandle> {
        let body = self.send(payload, variant)?;
        store.create(&body)
    }
}
