// View controller: owns what the two panes show and whether a request is
// outstanding. It does not talk HTTP itself; a `Transfer` does that,
// either inline (`submit`) or on another thread between `select` and
// `complete`.
//
// Every request gets a fresh token. Only the completion carrying the
// current token may touch the panes, so a slow response to a superseded
// request is dropped (and its handle released) instead of overwriting
// newer state.

use crate::api::{Payload, Transfer, Variant};
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::error::{Error, Result};
use crate::handle::{HandleStore, ImageHandle};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// A request that has been started but not yet resolved.
#[derive(Debug)]
pub struct PendingRequest {
    pub token: RequestToken,
    pub variant: Variant,
    pub payload: Payload,
}

impl PendingRequest {
    /// Perform the transfer. Safe to call from a worker thread.
    pub fn execute<T: Transfer + ?Sized>(
        &self,
        transfer: &T,
        store: &HandleStore,
    ) -> Result<ImageHandle> {
        transfer.upload_image(&self.payload, self.variant, store)
    }
}

/// How a completion was applied.
#[derive(Debug)]
pub enum Completion {
    /// The processed pane now shows the new image.
    Displayed,
    /// The transfer failed; the processed pane is unchanged.
    Failed(Error),
    /// A newer request was started meanwhile; the result was discarded.
    Superseded,
}

pub struct ViewController {
    store: HandleStore,
    original: Option<ImageHandle>,
    processed: Option<ImageHandle>,
    generation: u64,
    in_flight: Option<RequestToken>,
    upload_limit: usize,
}

impl ViewController {
    pub fn new(store: HandleStore) -> Self {
        ViewController {
            store,
            original: None,
            processed: None,
            generation: 0,
            in_flight: None,
            upload_limit: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Refuse selected files above `max_bytes` without reading them.
    pub fn with_upload_limit(mut self, max_bytes: usize) -> Self {
        self.upload_limit = max_bytes;
        self
    }

    pub fn store(&self) -> &HandleStore {
        &self.store
    }

    pub fn original(&self) -> Option<&ImageHandle> {
        self.original.as_ref()
    }

    pub fn processed(&self) -> Option<&ImageHandle> {
        self.processed.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Handle a file selection. `None` (dialog cancelled) changes nothing.
    ///
    /// On success the original pane already shows the selected image and
    /// the returned request must be passed back to [`Self::complete`].
    pub fn select(&mut self, file: Option<&Path>, variant: Variant) -> Result<Option<PendingRequest>> {
        let Some(path) = file else {
            return Ok(None);
        };
        let payload = Payload::from_path(path, self.upload_limit).map_err(|e| {
            log::error!("cannot read {}: {}", path.display(), e);
            e
        })?;
        self.begin(payload, variant).map(Some)
    }

    /// Show `payload` as the original image and mark a request in flight.
    pub fn begin(&mut self, payload: Payload, variant: Variant) -> Result<PendingRequest> {
        let preview = self.store.create(&payload.bytes).map_err(|e| {
            log::error!("cannot preview {}: {}", payload.file_name, e);
            e
        })?;
        // replacing the old handle releases it
        self.original = Some(preview);

        self.generation += 1;
        let token = RequestToken(self.generation);
        self.in_flight = Some(token);
        log::info!("request {} started: {} ({})", self.generation, payload.file_name, variant);

        Ok(PendingRequest {
            token,
            variant,
            payload,
        })
    }

    /// Apply the outcome of the request identified by `token`.
    pub fn complete(&mut self, token: RequestToken, result: Result<ImageHandle>) -> Completion {
        if self.in_flight != Some(token) {
            log::debug!("discarding result of superseded request {}", token.0);
            return Completion::Superseded;
        }
        self.in_flight = None;

        match result {
            Ok(handle) => {
                log::info!("request {} done: {:?} {:?}", token.0, handle.format(), handle.dimensions());
                self.processed = Some(handle);
                Completion::Displayed
            }
            Err(e) => {
                log::error!("processing failed ({}): {}", e.kind(), e);
                Completion::Failed(e)
            }
        }
    }

    /// Run the whole select → transfer → complete sequence inline.
    /// Returns `Ok(None)` when no file was chosen.
    pub fn submit<T: Transfer + ?Sized>(
        &mut self,
        file: Option<&Path>,
        variant: Variant,
        transfer: &T,
    ) -> Result<Option<Completion>> {
        let Some(request) = self.select(file, variant)? else {
            return Ok(None);
        };
        let result = request.execute(transfer, &self.store);
        Ok(Some(self.complete(request.token, result)))
    }

    /// Empty both panes, releasing their handles.
    pub fn clear(&mut self) {
        self.original = None;
        self.processed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgba};
    use reqwest::StatusCode;
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(w, h, Rgba([0u8, 0, 0, 0]));
        encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
    }

    fn jpeg(w: u32, h: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(w, h, Luma([200u8]));
        encode(DynamicImage::ImageLuma8(img), ImageFormat::Jpeg)
    }

    fn controller(name: &str) -> ViewController {
        let dir = std::env::temp_dir().join(format!(
            "rembg-front-view-{}-{}",
            name,
            std::process::id()
        ));
        ViewController::new(HandleStore::in_dir(dir).unwrap())
    }

    /// Answers every upload with a fixed body, or a fixed failure.
    struct FakeTransfer {
        body: Option<Vec<u8>>,
    }

    impl Transfer for FakeTransfer {
        fn upload_image(&self, _: &Payload, _: Variant, store: &HandleStore) -> Result<ImageHandle> {
            match &self.body {
                Some(body) => store.create(body),
                None => Err(Error::Rejected {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: "model crashed".into(),
                }),
            }
        }
    }

    #[test]
    fn test_no_file_is_noop() {
        let mut view = controller("noop");
        let outcome = view.submit(None, Variant::Image, &FakeTransfer { body: None }).unwrap();
        assert!(outcome.is_none());
        assert!(view.original().is_none());
        assert!(view.processed().is_none());
        assert!(!view.is_in_flight());
    }

    #[test]
    fn test_in_flight_only_between_begin_and_complete() {
        let mut view = controller("flag");
        assert!(!view.is_in_flight());

        let payload = Payload::new("in.jpg", jpeg(8, 8)).unwrap();
        let request = view.begin(payload, Variant::Image).unwrap();
        assert!(view.is_in_flight());
        assert!(view.original().is_some());

        let result = request.execute(&FakeTransfer { body: Some(png(8, 8)) }, &view.store().clone());
        assert!(view.is_in_flight());
        assert!(matches!(view.complete(request.token, result), Completion::Displayed));
        assert!(!view.is_in_flight());
    }

    #[test]
    fn test_success_shows_distinct_processed_handle() {
        let mut view = controller("success");
        let body = png(5, 5);
        let payload = Payload::new("in.jpg", jpeg(5, 5)).unwrap();
        let request = view.begin(payload, Variant::Image).unwrap();
        let result = request.execute(&FakeTransfer { body: Some(body.clone()) }, &view.store().clone());
        view.complete(request.token, result);

        let original = view.original().unwrap();
        let processed = view.processed().unwrap();
        assert_ne!(original.id(), processed.id());
        assert_eq!(original.format(), ImageFormat::Jpeg);
        assert_eq!(processed.format(), ImageFormat::Png);
        assert_eq!(processed.bytes().unwrap(), body);
    }

    #[test]
    fn test_failure_keeps_previous_processed() {
        let mut view = controller("failure");
        let ok = FakeTransfer { body: Some(png(3, 3)) };
        let request = view.begin(Payload::new("a.jpg", jpeg(3, 3)).unwrap(), Variant::Image).unwrap();
        let result = request.execute(&ok, &view.store().clone());
        view.complete(request.token, result);
        let before = view.processed().unwrap().id();

        let request = view.begin(Payload::new("b.jpg", jpeg(4, 4)).unwrap(), Variant::Mask).unwrap();
        let result = request.execute(&FakeTransfer { body: None }, &view.store().clone());
        match view.complete(request.token, result) {
            Completion::Failed(Error::Rejected { status, .. }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR)
            }
            other => panic!("expected rejection, got {:?}", other),
        }

        assert_eq!(view.processed().unwrap().id(), before);
        assert_eq!(view.original().unwrap().dimensions(), (4, 4));
        assert!(!view.is_in_flight());
    }

    #[test]
    fn test_late_result_of_superseded_request_is_discarded() {
        let mut view = controller("stale");
        let store = view.store().clone();
        let first = view.begin(Payload::new("a.jpg", jpeg(2, 2)).unwrap(), Variant::Image).unwrap();
        let second = view.begin(Payload::new("b.jpg", jpeg(6, 6)).unwrap(), Variant::Mask).unwrap();

        let late = first.execute(&FakeTransfer { body: Some(png(9, 9)) }, &store);
        let late_path = late.as_ref().unwrap().path().to_path_buf();
        assert!(matches!(view.complete(first.token, late), Completion::Superseded));
        assert!(view.processed().is_none());
        assert!(view.is_in_flight());
        // the discarded handle was released
        assert!(!late_path.exists());

        let fresh = second.execute(&FakeTransfer { body: Some(png(6, 6)) }, &store);
        assert!(matches!(view.complete(second.token, fresh), Completion::Displayed));
        assert_eq!(view.processed().unwrap().dimensions(), (6, 6));
        assert!(!view.is_in_flight());
    }

    #[test]
    fn test_superseded_original_is_released() {
        let mut view = controller("supersede");
        let first = view.begin(Payload::new("a.jpg", jpeg(2, 2)).unwrap(), Variant::Image).unwrap();
        let old_path = view.original().unwrap().path().to_path_buf();
        view.complete(first.token, Err(Error::Decode("test".into())));

        view.begin(Payload::new("b.jpg", jpeg(2, 2)).unwrap(), Variant::Image).unwrap();
        assert!(!old_path.exists());
        assert!(view.original().unwrap().path().exists());
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut view = controller("teardown");
        let dir = view.store().dir().to_path_buf();
        let request = view.begin(Payload::new("in.jpg", jpeg(2, 2)).unwrap(), Variant::Image).unwrap();
        let result = request.execute(&FakeTransfer { body: Some(png(2, 2)) }, &view.store().clone());
        view.complete(request.token, result);
        assert!(view.processed().is_some());
        drop(view);
        assert!(!dir.exists());
    }

    #[test]
    fn test_unreadable_file_changes_nothing() {
        let mut view = controller("missing");
        let missing = std::env::temp_dir().join("rembg-front-definitely-missing.jpg");
        let err = view
            .submit(Some(missing.as_path()), Variant::Image, &FakeTransfer { body: None })
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(view.original().is_none());
        assert!(!view.is_in_flight());
    }

    #[test]
    fn test_oversized_selection_changes_nothing() {
        let dir = std::env::temp_dir().join(format!("rembg-front-view-input-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("huge.jpg");
        let bytes = jpeg(16, 16);
        std::fs::write(&path, &bytes).unwrap();

        let mut view = controller("limit").with_upload_limit(bytes.len() - 1);
        let err = view
            .submit(Some(path.as_path()), Variant::Image, &FakeTransfer { body: None })
            .unwrap_err();
        assert!(matches!(err, Error::TooLarge { .. }), "got {:?}", err);
        assert!(view.original().is_none());
        assert!(!view.is_in_flight());
        std::fs::remove_file(&path).ok();
    }
}
