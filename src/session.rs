//! Booth flow as an explicit state machine.
//!
//! Home → Payment → PhotoCount → Capture → Customize → Download, with `back`
//! at every step and `home`/`retake` from the end. Calls made on the wrong
//! screen fail with `InvalidInput`. Runtime failures (camera denied, bad
//! upload, failed render or export) become notices and leave the session
//! where it was, photos and customization intact.

use log::{debug, error, info, warn};

use crate::camera::{
    run_capture_sequence, CameraDevice, CameraSession, CaptureEvent, CaptureTiming, StreamRequest,
};
use crate::capture::{accept_uploads, CaptureSettings, UploadedFile};
use crate::compositor::{CompositeCanvas, Compositor};
use crate::customization::Customization;
use crate::error::{BoothError, BoothResult, ErrorKind};
use crate::export::{ExportMethod, ExportOutcome, Exporter};
use crate::photo::PhotoSet;
use crate::template::{MAX_PHOTOS, MIN_PHOTOS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Payment,
    PhotoCount,
    Capture,
    Customize,
    Download,
}

impl Screen {
    /// Screen that `back` returns to.
    pub fn previous(&self) -> Screen {
        match self {
            Screen::Home | Screen::Payment => Screen::Home,
            Screen::PhotoCount => Screen::Payment,
            Screen::Capture => Screen::PhotoCount,
            Screen::Customize => Screen::Capture,
            Screen::Download => Screen::Customize,
        }
    }
}

/// Message shown to the user after a recoverable failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&BoothError> for Notice {
    fn from(error: &BoothError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

pub struct BoothSession {
    screen: Screen,
    paid: bool,
    photo_count: usize,
    photos: PhotoSet,
    customization: Customization,
    canvas: Option<CompositeCanvas>,
    camera: Option<CameraSession>,
    capture_settings: CaptureSettings,
    notices: Vec<Notice>,
}

impl BoothSession {
    pub fn new(capture_settings: CaptureSettings) -> Self {
        Self {
            screen: Screen::Home,
            paid: false,
            photo_count: 0,
            photos: PhotoSet::with_capacity(0),
            customization: Customization::default(),
            canvas: None,
            camera: None,
            capture_settings,
            notices: Vec::new(),
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn is_paid(&self) -> bool {
        self.paid
    }

    pub fn photo_count(&self) -> usize {
        self.photo_count
    }

    pub fn photos(&self) -> &PhotoSet {
        &self.photos
    }

    pub fn customization(&self) -> &Customization {
        &self.customization
    }

    /// Edits apply to the next `render`; the published canvas stays until then.
    pub fn customization_mut(&mut self) -> &mut Customization {
        &mut self.customization
    }

    pub fn canvas(&self) -> Option<&CompositeCanvas> {
        self.canvas.as_ref()
    }

    pub fn camera_active(&self) -> bool {
        self.camera.as_ref().is_some_and(|c| c.is_active())
    }

    pub fn capture_settings(&self) -> &CaptureSettings {
        &self.capture_settings
    }

    pub fn capture_settings_mut(&mut self) -> &mut CaptureSettings {
        &mut self.capture_settings
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn start(&mut self) -> BoothResult<()> {
        self.expect_screen(Screen::Home)?;
        self.go_to(Screen::Payment);
        Ok(())
    }

    /// Manual confirmation of the static QR payment.
    pub fn confirm_payment(&mut self) -> BoothResult<()> {
        self.expect_screen(Screen::Payment)?;
        self.paid = true;
        info!("Payment confirmed");
        self.go_to(Screen::PhotoCount);
        Ok(())
    }

    pub fn choose_photo_count(&mut self, count: usize) -> BoothResult<()> {
        self.expect_screen(Screen::PhotoCount)?;
        if !self.paid {
            return Err(BoothError::InvalidInput("Payment not confirmed".to_string()));
        }
        if !(MIN_PHOTOS..=MAX_PHOTOS).contains(&count) {
            return Err(BoothError::InvalidInput(format!(
                "Photo count must be between {} and {}, got {}",
                MIN_PHOTOS, MAX_PHOTOS, count
            )));
        }

        self.photo_count = count;
        self.photos = PhotoSet::with_capacity(count);
        self.canvas = None;
        self.go_to(Screen::Capture);
        Ok(())
    }

    /// Starts the camera. A refused permission leaves the session on the
    /// capture screen with a notice; uploads still work.
    pub async fn open_camera(
        &mut self,
        device: Box<dyn CameraDevice>,
        request: &StreamRequest,
    ) -> BoothResult<()> {
        self.expect_screen(Screen::Capture)?;
        self.camera = None;

        match CameraSession::open(device, request).await {
            Ok(camera) => self.camera = Some(camera),
            Err(e) => self.report(e),
        }
        Ok(())
    }

    /// Runs the countdown sequence for every photo still missing.
    ///
    /// Moves on to Customize once the set is full. If a shot fails, the
    /// shots before it are kept and a later run only fills the rest.
    pub async fn run_capture(
        &mut self,
        timing: &CaptureTiming,
        observer: impl FnMut(CaptureEvent),
    ) -> BoothResult<()> {
        self.expect_screen(Screen::Capture)?;
        let remaining = self.photos.remaining();
        let settings = self.capture_settings;
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| BoothError::InvalidInput("Camera is not open".to_string()))?;

        let mut shots = Vec::with_capacity(remaining);
        let result =
            run_capture_sequence(camera, remaining, timing, &settings, &mut shots, observer).await;
        for shot in shots {
            self.photos.push(shot)?;
        }
        if let Err(e) = result {
            self.report(e);
            return Ok(());
        }

        if self.photos.is_full() {
            self.proceed_to_customize()?;
        }
        Ok(())
    }

    /// Adds uploaded files, up to the selected photo count.
    pub fn upload(&mut self, files: &[UploadedFile]) -> BoothResult<()> {
        self.expect_screen(Screen::Capture)?;

        let outcome = accept_uploads(files, self.photos.remaining(), &self.capture_settings);
        for rejected in &outcome.rejected {
            self.notices.push(Notice {
                kind: rejected.error.kind(),
                message: format!("{}: {}", rejected.name, rejected.error),
            });
        }
        if outcome.ignored > 0 {
            self.notices.push(Notice {
                kind: ErrorKind::InvalidInput,
                message: format!(
                    "Only {} photos can be used, {} files were skipped",
                    self.photo_count, outcome.ignored
                ),
            });
        }
        for photo in outcome.accepted {
            self.photos.push(photo)?;
        }

        if self.photos.is_full() {
            self.proceed_to_customize()?;
        }
        Ok(())
    }

    pub fn proceed_to_customize(&mut self) -> BoothResult<()> {
        self.expect_screen(Screen::Capture)?;
        if !self.photos.is_full() {
            return Err(BoothError::InvalidInput(format!(
                "{} of {} photos taken",
                self.photos.len(),
                self.photo_count
            )));
        }
        self.go_to(Screen::Customize);
        Ok(())
    }

    /// Rebuilds the strip. The canvas is replaced only when composition
    /// succeeds; a failure keeps the previous one and adds a notice.
    pub async fn render(&mut self, compositor: &Compositor) -> BoothResult<bool> {
        self.expect_any(&[Screen::Customize, Screen::Download])?;

        match compositor.compose(&self.photos, &self.customization).await {
            Ok(canvas) => {
                self.canvas = Some(canvas);
                Ok(true)
            }
            Err(e) => {
                error!("Failed to compose strip: {}", e);
                self.report(e);
                Ok(false)
            }
        }
    }

    pub fn proceed_to_download(&mut self) -> BoothResult<()> {
        self.expect_screen(Screen::Customize)?;
        if self.canvas.is_none() {
            return Err(BoothError::InvalidInput("Strip has not been rendered".to_string()));
        }
        self.go_to(Screen::Download);
        Ok(())
    }

    /// Exports the published canvas. Returns `None` when the export failed
    /// or was cancelled; failures are reported as notices.
    pub async fn export(
        &mut self,
        exporter: &Exporter,
        method: ExportMethod,
    ) -> BoothResult<Option<ExportOutcome>> {
        self.expect_screen(Screen::Download)?;
        let canvas = self
            .canvas
            .as_ref()
            .ok_or_else(|| BoothError::InvalidInput("Nothing to export".to_string()))?;

        match exporter.export(canvas, method).await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                self.report(e);
                Ok(None)
            }
        }
    }

    pub fn back(&mut self) {
        let previous = self.screen.previous();
        if previous == Screen::Capture {
            self.reset_photos();
        }
        self.go_to(previous);
    }

    /// Back to Capture with an empty photo set, keeping the photo count and
    /// customization.
    pub fn retake(&mut self) -> BoothResult<()> {
        self.expect_any(&[Screen::Customize, Screen::Download])?;
        self.reset_photos();
        self.go_to(Screen::Capture);
        Ok(())
    }

    /// Ends the session and starts over.
    pub fn home(&mut self) {
        self.go_to(Screen::Home);
        self.paid = false;
        self.photo_count = 0;
        self.photos = PhotoSet::with_capacity(0);
        self.customization = Customization::default();
        self.canvas = None;
        self.notices.clear();
    }

    fn reset_photos(&mut self) {
        self.photos = PhotoSet::with_capacity(self.photo_count);
        self.canvas = None;
    }

    fn go_to(&mut self, next: Screen) {
        if self.screen == Screen::Capture && next != Screen::Capture {
            // Dropping the handle stops every track
            self.camera = None;
        }
        debug!("Screen {:?} -> {:?}", self.screen, next);
        self.screen = next;
    }

    fn report(&mut self, error: BoothError) {
        if matches!(error, BoothError::UserCancelled) {
            debug!("Operation cancelled by user");
            return;
        }
        warn!("{}", error);
        self.notices.push(Notice::from(&error));
    }

    fn expect_screen(&self, expected: Screen) -> BoothResult<()> {
        self.expect_any(&[expected])
    }

    fn expect_any(&self, expected: &[Screen]) -> BoothResult<()> {
        if expected.contains(&self.screen) {
            Ok(())
        } else {
            Err(BoothError::InvalidInput(format!(
                "Not available on the {:?} screen",
                self.screen
            )))
        }
    }
}

impl Default for BoothSession {
    fn default() -> Self {
        Self::new(CaptureSettings::default())
    }
}
