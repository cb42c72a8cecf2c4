//! Editing session: the poster record plus the image-request discipline.
//!
//! Image requests are split in two phases so a host can run the gateway
//! call away from the thread that owns the session:
//!
//! 1. `begin_*` marks the session busy and hands out a [`PendingImageRequest`]
//!    tagged with a fresh [`RequestToken`];
//! 2. [`PendingImageRequest::run`] performs the gateway call;
//! 3. [`EditingSession::settle`] merges the outcome, but only if its token is
//!    still the latest one dispatched. Older outcomes are dropped.
//!
//! `request_background_generation` and `request_image_edit` chain the three
//! steps for synchronous callers.

use crate::export::Exporter;
use crate::image_ref::ImageRef;
use crate::platform::{read_image_file, PrintHost};
use crate::styles::resolve_style;
use crate::{Error, ImageGateway, PosterPatch, PosterRecord, Result, SessionStatus};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Shown when the JPEG export cannot be produced
pub const EXPORT_FAILED_MESSAGE: &str = "No se pudo generar la imagen para descargar.";

/// Monotonically increasing id of a dispatched image request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOperation {
    GenerateBackground,
    EditImage,
}

impl ImageOperation {
    /// Prefix of the error string shown for a failed request
    pub fn error_label(self) -> &'static str {
        match self {
            ImageOperation::GenerateBackground => "Error al generar el fondo: ",
            ImageOperation::EditImage => "Error al editar: ",
        }
    }
}

#[derive(Debug, Clone)]
enum RequestInput {
    Generate { topic: String, style: String },
    Edit { current: String, instruction: String },
}

/// A dispatched image request that has not run yet
#[derive(Debug, Clone)]
pub struct PendingImageRequest {
    token: RequestToken,
    input: RequestInput,
}

impl PendingImageRequest {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn operation(&self) -> ImageOperation {
        match self.input {
            RequestInput::Generate { .. } => ImageOperation::GenerateBackground,
            RequestInput::Edit { .. } => ImageOperation::EditImage,
        }
    }

    /// Perform the gateway call. Does not touch the session.
    pub fn run<G: ImageGateway + ?Sized>(self, gateway: &G) -> ImageOutcome {
        let operation = self.operation();
        let result = match &self.input {
            RequestInput::Generate { topic, style } => gateway.generate_background(topic, style),
            RequestInput::Edit { current, instruction } => ImageRef::parse(current)
                .map_err(|e| Error::ImageFetchError(e.to_string()))
                .and_then(|image| gateway.edit_image(&image, instruction)),
        };
        ImageOutcome {
            token: self.token,
            operation,
            result,
        }
    }
}

/// Result of a gateway call, waiting to be settled into the session
#[derive(Debug)]
pub struct ImageOutcome {
    pub token: RequestToken,
    pub operation: ImageOperation,
    pub result: Result<Option<ImageRef>>,
}

/// What `settle` did with an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum SettleResult {
    /// The new image was merged as the featured image
    Applied,
    /// The service answered without an image; the record is unchanged
    NoImage,
    /// The request failed; the display string was stored
    Failed(String),
    /// A newer request was dispatched meanwhile; the outcome was discarded
    Stale,
}

/// Serializable view of a session for hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub record: PosterRecord,
    pub status: SessionStatus,
    pub error: Option<String>,
    pub capturing: bool,
}

pub struct EditingSession<G> {
    gateway: G,
    record: PosterRecord,
    status: SessionStatus,
    last_error: Option<String>,
    capturing: bool,
    latest: u64,
}

impl<G> EditingSession<G> {
    /// Start a session from the seed record
    pub fn new(gateway: G) -> Self {
        Self::with_record(gateway, PosterRecord::default())
    }

    pub fn with_record(gateway: G, record: PosterRecord) -> Self {
        Self {
            gateway,
            record,
            status: SessionStatus::Idle,
            last_error: None,
            capturing: false,
            latest: 0,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn record(&self) -> &PosterRecord {
        &self.record
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_busy(&self) -> bool {
        self.status == SessionStatus::EditingImage
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            record: self.record.clone(),
            status: self.status,
            error: self.last_error.clone(),
            capturing: self.capturing,
        }
    }

    /// Merge a partial record. No validation.
    pub fn update_fields(&mut self, patch: &PosterPatch) {
        self.record.apply(patch);
    }

    fn dispatch(&mut self, input: RequestInput) -> PendingImageRequest {
        self.latest += 1;
        self.status = SessionStatus::EditingImage;
        self.last_error = None;
        let pending = PendingImageRequest {
            token: RequestToken(self.latest),
            input,
        };
        log::debug!("dispatching {:?} as request {}", pending.operation(), self.latest);
        pending
    }

    /// Start a background generation using title and subtitle as the topic
    pub fn begin_generation(&mut self, style: &str) -> PendingImageRequest {
        let input = RequestInput::Generate {
            topic: self.record.topic(),
            style: resolve_style(style),
        };
        self.dispatch(input)
    }

    /// Start an edit of the current featured image. Blank instructions are
    /// ignored and leave the session untouched.
    pub fn begin_edit(&mut self, instruction: &str) -> Option<PendingImageRequest> {
        if instruction.trim().is_empty() {
            return None;
        }
        let input = RequestInput::Edit {
            current: self.record.featured_image_url.clone(),
            instruction: instruction.to_string(),
        };
        Some(self.dispatch(input))
    }

    /// Merge a finished request. Only the latest dispatched token is applied.
    pub fn settle(&mut self, outcome: ImageOutcome) -> SettleResult {
        if outcome.token.0 != self.latest {
            log::debug!(
                "discarding stale request {} (latest is {})",
                outcome.token.0,
                self.latest
            );
            return SettleResult::Stale;
        }
        self.status = SessionStatus::Idle;
        match outcome.result {
            Ok(Some(image)) => {
                self.record.apply(&PosterPatch::featured_image(&image));
                SettleResult::Applied
            }
            Ok(None) => SettleResult::NoImage,
            Err(e) => {
                log::warn!("{:?} failed: {}", outcome.operation, e);
                let message = format!("{}{}", outcome.operation.error_label(), e);
                self.last_error = Some(message.clone());
                SettleResult::Failed(message)
            }
        }
    }

    /// Read a local image and make it the featured image.
    ///
    /// Bypasses the gateway and the busy status; IO failures go to the caller.
    pub fn import_local_file(&mut self, path: &Path) -> Result<()> {
        let file = read_image_file(path)?;
        log::debug!("importing {} ({}, {} bytes)", file.name, file.mime_type, file.bytes.len());
        let image = file.into_image_ref();
        self.record.apply(&PosterPatch::featured_image(&image));
        Ok(())
    }

    /// Capture the poster into `dir` as JPEG. On failure the export message
    /// is stored as the session error and `None` is returned.
    pub fn export_as_image(&mut self, exporter: &Exporter, dir: &Path) -> Option<PathBuf> {
        self.capturing = true;
        let result = exporter.export_as_image(&self.record, dir);
        self.capturing = false;
        match result {
            Ok(path) => Some(path),
            Err(e) => {
                log::error!("error capturing image: {}", e);
                self.last_error = Some(EXPORT_FAILED_MESSAGE.to_string());
                None
            }
        }
    }

    pub fn export_as_print(&self, exporter: &Exporter, host: &dyn PrintHost) {
        exporter.export_as_print(&self.record, host);
    }
}

impl<G: ImageGateway> EditingSession<G> {
    /// Generate a new background and merge it. Always ends Idle.
    pub fn request_background_generation(&mut self, style: &str) -> SettleResult {
        let pending = self.begin_generation(style);
        let outcome = pending.run(&self.gateway);
        self.settle(outcome)
    }

    /// Edit the current featured image and merge the result. Returns `None`
    /// when the instruction is blank.
    pub fn request_image_edit(&mut self, instruction: &str) -> Option<SettleResult> {
        let pending = self.begin_edit(instruction)?;
        let outcome = pending.run(&self.gateway);
        Some(self.settle(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Gateway returning canned results and recording its inputs
    #[derive(Default)]
    struct ScriptedGateway {
        next: Mutex<Vec<Result<Option<ImageRef>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn returning(results: Vec<Result<Option<ImageRef>>>) -> Self {
            Self {
                next: Mutex::new(results),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn pop(&self) -> Result<Option<ImageRef>> {
            self.next.lock().unwrap().remove(0)
        }
    }

    impl ImageGateway for ScriptedGateway {
        fn generate_background(&self, topic: &str, style: &str) -> Result<Option<ImageRef>> {
            self.calls.lock().unwrap().push(format!("generate|{}|{}", topic, style));
            self.pop()
        }

        fn edit_image(&self, current: &ImageRef, instruction: &str) -> Result<Option<ImageRef>> {
            self.calls.lock().unwrap().push(format!("edit|{}|{}", current.is_inline(), instruction));
            self.pop()
        }
    }

    fn png(bytes: &[u8]) -> ImageRef {
        ImageRef::inline_png(bytes.to_vec())
    }

    #[test]
    fn update_fields_merges_partially() {
        let mut s = EditingSession::new(ScriptedGateway::default());
        s.update_fields(&PosterPatch {
            cta_text: Some("Nuevo CTA".into()),
            ..Default::default()
        });
        let expected = PosterRecord {
            cta_text: "Nuevo CTA".into(),
            ..Default::default()
        };
        assert_eq!(s.record(), &expected);
    }

    #[test]
    fn generation_uses_topic_and_resolved_style() {
        let gw = ScriptedGateway::returning(vec![Ok(Some(png(&[1, 2, 3])))]);
        let mut s = EditingSession::new(gw);
        assert_eq!(s.request_background_generation("cyber"), SettleResult::Applied);
        let calls = s.gateway().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("generate|Agentes Personalizados con IA disponibles las 24 horas. Atiende"));
        assert!(calls[0].contains("cyberpunk"));
        assert_eq!(s.record().featured_image_url, "data:image/png;base64,AQID");
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(s.last_error().is_none());
    }

    #[test]
    fn failure_sets_labelled_error_and_returns_to_idle() {
        let gw = ScriptedGateway::returning(vec![
            Err(Error::UpstreamError("boom".into())),
            Err(Error::ImageFetchError("no se pudo".into())),
        ]);
        let mut s = EditingSession::new(gw);
        let before = s.record().clone();

        match s.request_background_generation("modern") {
            SettleResult::Failed(msg) => assert!(msg.starts_with("Error al generar el fondo: ")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.record(), &before);

        s.request_image_edit("más oscuro");
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.last_error(), Some("Error al editar: no se pudo"));
    }

    #[test]
    fn new_request_clears_previous_error() {
        let gw = ScriptedGateway::returning(vec![Err(Error::UpstreamError("x".into())), Ok(None)]);
        let mut s = EditingSession::new(gw);
        s.request_background_generation("");
        assert!(s.last_error().is_some());
        assert_eq!(s.request_background_generation(""), SettleResult::NoImage);
        assert!(s.last_error().is_none());
    }

    #[test]
    fn no_image_leaves_record_unchanged() {
        let gw = ScriptedGateway::returning(vec![Ok(None)]);
        let mut s = EditingSession::new(gw);
        let before = s.record().clone();
        assert_eq!(s.request_image_edit("brillo azul"), Some(SettleResult::NoImage));
        assert_eq!(s.record(), &before);
        assert!(!s.is_busy());
    }

    #[test]
    fn blank_edit_instruction_is_ignored() {
        let mut s = EditingSession::new(ScriptedGateway::default());
        assert!(s.request_image_edit("   ").is_none());
        assert!(s.gateway().calls.lock().unwrap().is_empty());
        assert_eq!(s.status(), SessionStatus::Idle);
    }

    #[test]
    fn edit_passes_current_featured_image() {
        let gw = ScriptedGateway::returning(vec![Ok(Some(png(&[9])))]);
        let mut s = EditingSession::new(gw);
        s.update_fields(&PosterPatch::featured_image(&png(&[1])));
        s.request_image_edit("hazlo azul");
        let calls = s.gateway().calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["edit|true|hazlo azul".to_string()]);
        assert_eq!(s.record().featured_image_url, png(&[9]).to_reference_string());
    }

    #[test]
    fn unparseable_featured_image_fails_as_fetch_error() {
        let mut s = EditingSession::new(ScriptedGateway::default());
        s.update_fields(&PosterPatch {
            featured_image_url: Some("not a url".into()),
            ..Default::default()
        });
        match s.request_image_edit("x") {
            Some(SettleResult::Failed(msg)) => assert!(msg.starts_with("Error al editar: ")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(s.gateway().calls.lock().unwrap().is_empty());
    }

    #[test]
    fn stale_outcome_is_discarded_and_latest_wins() {
        // Results are handed out in call order: the second request runs first
        let gw = ScriptedGateway::returning(vec![Ok(Some(png(&[2]))), Ok(Some(png(&[1])))]);
        let mut s = EditingSession::new(gw);
        let first = s.begin_generation("modern");
        let second = s.begin_edit("otra cosa").unwrap();
        assert!(second.token() > first.token());

        // The newer request finishes first
        let second_out = second.run(s.gateway());
        let first_out = first.run(s.gateway());
        assert_eq!(s.settle(second_out), SettleResult::Applied);
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.settle(first_out), SettleResult::Stale);
        assert_eq!(s.record().featured_image_url, png(&[2]).to_reference_string());
    }

    #[test]
    fn stale_outcome_does_not_end_the_busy_state() {
        let gw = ScriptedGateway::returning(vec![Err(Error::UpstreamError("old".into()))]);
        let mut s = EditingSession::new(gw);
        let first = s.begin_generation("modern");
        let _second = s.begin_generation("cyber");
        let out = first.run(s.gateway());
        assert_eq!(s.settle(out), SettleResult::Stale);
        assert!(s.is_busy());
        assert!(s.last_error().is_none());
    }

    #[test]
    fn import_local_file_bypasses_gateway_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let mut s = EditingSession::new(ScriptedGateway::default());
        let _busy = s.begin_generation("modern");
        s.import_local_file(&path).unwrap();
        assert!(s.record().featured_image_url.starts_with("data:image/png;base64,"));
        assert!(s.is_busy(), "import does not touch the status");
        assert!(s.gateway().calls.lock().unwrap().is_empty());
    }

    #[test]
    fn export_failure_sets_message_and_clears_capture_flag() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::offline(
            crate::CaptureOptions {
                use_cors: false,
                ..Default::default()
            },
            95,
        );
        let mut s = EditingSession::new(ScriptedGateway::default());
        assert!(s.export_as_image(&exporter, dir.path()).is_none());
        assert!(!s.is_capturing());
        assert!(!s.is_busy());
        assert!(s.last_error().unwrap().contains("No se pudo generar la imagen"));
    }
}
