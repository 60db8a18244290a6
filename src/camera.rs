//! Camera handle and the timed multi-shot capture sequence.
//!
//! [`CameraSession`] owns the device for as long as the capture screen is
//! open and stops every track when it goes away, whichever way that happens.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use log::{debug, info};

use crate::capture::{capture_from_live_frame, CaptureSettings};
use crate::cropper::CAPTURE_ASPECT;
use crate::error::{BoothError, BoothResult};
use crate::photo::RasterImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// Stream constraints handed to the device. Ideal values are hints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamRequest {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub ideal_aspect: f64,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            ideal_width: 1280,
            ideal_height: 720,
            ideal_aspect: CAPTURE_ASPECT,
        }
    }
}

#[async_trait]
pub trait CameraDevice: Send {
    /// Starts streaming. Fails with `PermissionDenied` when access is refused.
    async fn start(&mut self, request: &StreamRequest) -> BoothResult<()>;

    /// Current video frame.
    async fn grab_frame(&mut self) -> BoothResult<RgbaImage>;

    /// Stops all media tracks. Must be safe to call more than once.
    fn stop_tracks(&mut self);
}

pub struct CameraSession {
    device: Box<dyn CameraDevice>,
    active: bool,
}

impl CameraSession {
    pub async fn open(
        mut device: Box<dyn CameraDevice>,
        request: &StreamRequest,
    ) -> BoothResult<Self> {
        if let Err(e) = device.start(request).await {
            device.stop_tracks();
            return Err(e);
        }

        info!(
            "Camera started ({:?}, ideal {}x{})",
            request.facing, request.ideal_width, request.ideal_height
        );
        Ok(Self {
            device,
            active: true,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub async fn capture(&mut self, settings: &CaptureSettings) -> BoothResult<RasterImage> {
        if !self.active {
            return Err(BoothError::InvalidInput("Camera is not running".to_string()));
        }
        let frame = self.device.grab_frame().await?;
        capture_from_live_frame(&frame, settings)
    }

    pub fn release(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.active {
            self.device.stop_tracks();
            self.active = false;
            info!("Camera released");
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTiming {
    pub countdown_from: u32,
    pub tick: Duration,
    pub pause_between: Duration,
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            tick: Duration::from_secs(1),
            pause_between: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Countdown { shot: usize, remaining: u32 },
    Captured { shot: usize, total: usize },
}

/// Takes `count` photos one after another, appending each to `photos` as
/// soon as it is captured.
///
/// Each shot is preceded by a countdown and followed by a pause (except the
/// last). Nothing overlaps: the next countdown only starts once the previous
/// frame is captured. Dropping the returned future cancels the sequence.
/// Shots taken before a failure or cancellation stay in `photos`.
pub async fn run_capture_sequence(
    camera: &mut CameraSession,
    count: usize,
    timing: &CaptureTiming,
    settings: &CaptureSettings,
    photos: &mut Vec<RasterImage>,
    mut observer: impl FnMut(CaptureEvent),
) -> BoothResult<()> {
    for shot in 1..=count {
        for remaining in (1..=timing.countdown_from).rev() {
            observer(CaptureEvent::Countdown { shot, remaining });
            tokio::time::sleep(timing.tick).await;
        }

        photos.push(camera.capture(settings).await?);
        observer(CaptureEvent::Captured { shot, total: count });
        info!("Photo {} of {} captured", shot, count);

        if shot < count {
            tokio::time::sleep(timing.pause_between).await;
        }
    }

    Ok(())
}

/// Camera that replays still images in a loop, for rehearsing the booth
/// without hardware.
pub struct ReplayCamera {
    frames: Vec<RgbaImage>,
    next: usize,
    streaming: bool,
}

impl ReplayCamera {
    pub fn new(frames: Vec<RgbaImage>) -> Self {
        Self {
            frames,
            next: 0,
            streaming: false,
        }
    }

    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> BoothResult<Self> {
        let frames = paths
            .iter()
            .map(|p| {
                image::open(p.as_ref())
                    .map(|img| img.to_rgba8())
                    .map_err(|e| {
                        BoothError::DecodeFailure(format!(
                            "Failed to load frame {}: {}",
                            p.as_ref().display(),
                            e
                        ))
                    })
            })
            .collect::<BoothResult<Vec<_>>>()?;
        Ok(Self::new(frames))
    }
}

#[async_trait]
impl CameraDevice for ReplayCamera {
    async fn start(&mut self, _request: &StreamRequest) -> BoothResult<()> {
        if self.frames.is_empty() {
            return Err(BoothError::PermissionDenied(
                "No video source available".to_string(),
            ));
        }
        self.streaming = true;
        Ok(())
    }

    async fn grab_frame(&mut self) -> BoothResult<RgbaImage> {
        if !self.streaming {
            return Err(BoothError::InvalidInput("Camera is not streaming".to_string()));
        }
        let frame = self.frames[self.next % self.frames.len()].clone();
        self.next += 1;
        debug!("Replaying frame {}", self.next);
        Ok(frame)
    }

    fn stop_tracks(&mut self) {
        self.streaming = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    /// Device that records how often its tracks were stopped.
    struct CountingCamera {
        stops: Arc<AtomicUsize>,
        deny: bool,
    }

    #[async_trait]
    impl CameraDevice for CountingCamera {
        async fn start(&mut self, _request: &StreamRequest) -> BoothResult<()> {
            if self.deny {
                return Err(BoothError::PermissionDenied("denied".to_string()));
            }
            Ok(())
        }

        async fn grab_frame(&mut self) -> BoothResult<RgbaImage> {
            Ok(RgbaImage::from_pixel(1280, 720, Rgba([10, 10, 10, 255])))
        }

        fn stop_tracks(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting(deny: bool) -> (Box<dyn CameraDevice>, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        (
            Box::new(CountingCamera {
                stops: Arc::clone(&stops),
                deny,
            }),
            stops,
        )
    }

    #[tokio::test]
    async fn test_drop_releases_camera_once() {
        let (device, stops) = counting(false);
        let session = CameraSession::open(device, &StreamRequest::default())
            .await
            .unwrap();
        assert!(session.is_active());

        drop(session);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_explicit_release_does_not_double_stop() {
        let (device, stops) = counting(false);
        let session = CameraSession::open(device, &StreamRequest::default())
            .await
            .unwrap();
        session.release();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permission_denied_still_stops_tracks() {
        let (device, stops) = counting(true);
        let result = CameraSession::open(device, &StreamRequest::default()).await;
        assert!(matches!(result, Err(BoothError::PermissionDenied(_))));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_timing_and_events() {
        // GIVEN: A running camera and the default 3-2-1 timing
        let (device, _stops) = counting(false);
        let mut session = CameraSession::open(device, &StreamRequest::default())
            .await
            .unwrap();
        let mut events = Vec::new();
        let started = Instant::now();

        // WHEN: Taking two photos
        let mut photos = Vec::new();
        run_capture_sequence(
            &mut session,
            2,
            &CaptureTiming::default(),
            &CaptureSettings::default(),
            &mut photos,
            |e| events.push(e),
        )
        .await
        .unwrap();

        // THEN: 3s + capture + 1s pause + 3s + capture
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(7) && elapsed < Duration::from_millis(7_100));
        assert_eq!(photos.len(), 2);
        assert_eq!(
            events,
            vec![
                CaptureEvent::Countdown { shot: 1, remaining: 3 },
                CaptureEvent::Countdown { shot: 1, remaining: 2 },
                CaptureEvent::Countdown { shot: 1, remaining: 1 },
                CaptureEvent::Captured { shot: 1, total: 2 },
                CaptureEvent::Countdown { shot: 2, remaining: 3 },
                CaptureEvent::Countdown { shot: 2, remaining: 2 },
                CaptureEvent::Countdown { shot: 2, remaining: 1 },
                CaptureEvent::Captured { shot: 2, total: 2 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_countdown_releases_camera() {
        let (device, stops) = counting(false);
        let mut session = CameraSession::open(device, &StreamRequest::default())
            .await
            .unwrap();

        // Navigate away during the second countdown
        let mut photos = Vec::new();
        let timing = CaptureTiming::default();
        let settings = CaptureSettings::default();
        let sequence = run_capture_sequence(
            &mut session,
            4,
            &timing,
            &settings,
            &mut photos,
            |_| {},
        );
        let cancelled = tokio::time::timeout(Duration::from_millis(5500), sequence).await;
        assert!(cancelled.is_err());
        assert_eq!(photos.len(), 1);

        drop(session);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    /// Device whose `fail_on`-th frame (1-based) cannot be read.
    struct FlakyCamera {
        fail_on: usize,
        grabbed: usize,
    }

    #[async_trait]
    impl CameraDevice for FlakyCamera {
        async fn start(&mut self, _request: &StreamRequest) -> BoothResult<()> {
            Ok(())
        }

        async fn grab_frame(&mut self) -> BoothResult<RgbaImage> {
            self.grabbed += 1;
            if self.grabbed == self.fail_on {
                return Err(BoothError::DecodeFailure("Frame unavailable".to_string()));
            }
            Ok(RgbaImage::new(250, 100))
        }

        fn stop_tracks(&mut self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_shot_keeps_earlier_shots() {
        // GIVEN: A camera that fails on its third frame
        let device = Box::new(FlakyCamera {
            fail_on: 3,
            grabbed: 0,
        });
        let mut session = CameraSession::open(device, &StreamRequest::default())
            .await
            .unwrap();

        // WHEN: Asking for four photos
        let mut photos = Vec::new();
        let result = run_capture_sequence(
            &mut session,
            4,
            &CaptureTiming::default(),
            &CaptureSettings::default(),
            &mut photos,
            |_| {},
        )
        .await;

        // THEN: The error surfaces and the first two shots survive
        assert!(matches!(result, Err(BoothError::DecodeFailure(_))));
        assert_eq!(photos.len(), 2);
    }

    #[tokio::test]
    async fn test_replay_camera_cycles_frames() {
        let frames = vec![
            RgbaImage::from_pixel(50, 20, Rgba([1, 0, 0, 255])),
            RgbaImage::from_pixel(50, 20, Rgba([2, 0, 0, 255])),
        ];
        let mut session = CameraSession::open(
            Box::new(ReplayCamera::new(frames)),
            &StreamRequest::default(),
        )
        .await
        .unwrap();

        let settings = CaptureSettings::default();
        let reds: Vec<u8> = [
            session.capture(&settings).await.unwrap(),
            session.capture(&settings).await.unwrap(),
            session.capture(&settings).await.unwrap(),
        ]
        .iter()
        .map(|p| p.pixels().get_pixel(0, 0)[0])
        .collect();
        assert_eq!(reds, vec![1, 2, 1]);
    }

    #[tokio::test]
    async fn test_replay_camera_without_frames_is_denied() {
        let result =
            CameraSession::open(Box::new(ReplayCamera::new(Vec::new())), &StreamRequest::default())
                .await;
        assert!(matches!(result, Err(BoothError::PermissionDenied(_))));
    }
}
