//! Capture loop handle and public API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::capture_loop::{refresh_interval, run_capture_loop};
use super::frame_utils::encode_png;
use super::source::FrameSource;
use super::types::{CameraError, CaptureSettings, LoopState, ProcessedFrame};
use crate::palette::PaletteMode;
use crate::store::{now_millis, EntityStore, Photo};

/// Capture loop handle.
///
/// `start()` attaches a frame source and spawns a task that, once per display
/// refresh, crops and quantizes the newest frame into a shared buffer. Call
/// `current_frame()` to display it and `capture()` to save it as a photo.
pub struct CaptureLoop {
    /// Latest processed frame (shared with the loop task)
    frame_buffer: Arc<Mutex<Option<ProcessedFrame>>>,
    /// Palette applied by the loop; can change while running
    mode: Arc<Mutex<PaletteMode>>,
    /// Signal to stop the loop task
    stop_signal: Arc<AtomicBool>,
    /// Loop task handle
    task: Option<JoinHandle<()>>,
    settings: CaptureSettings,
}

impl std::fmt::Debug for CaptureLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLoop")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CaptureLoop {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            frame_buffer: Arc::new(Mutex::new(None)),
            mode: Arc::new(Mutex::new(settings.mode)),
            stop_signal: Arc::new(AtomicBool::new(false)),
            task: None,
            settings,
        }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// `Active` while a source is attached and the loop task is alive.
    pub fn state(&self) -> LoopState {
        match &self.task {
            Some(handle) if !handle.is_finished() => LoopState::Active,
            _ => LoopState::Idle,
        }
    }

    /// Palette currently applied to new frames.
    pub fn mode(&self) -> PaletteMode {
        self.mode.lock().map(|m| *m).unwrap_or(self.settings.mode)
    }

    /// Switch palettes. Takes effect from the next processed frame.
    pub fn set_mode(&self, mode: PaletteMode) {
        if let Ok(mut current) = self.mode.lock() {
            *current = mode;
        }
    }

    /// Attach `source` and start processing frames.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// * `CameraError::AlreadyRunning` - If a source is already attached
    pub fn start(&mut self, source: Box<dyn FrameSource>) -> Result<(), CameraError> {
        if self.state() == LoopState::Active {
            return Err(CameraError::AlreadyRunning);
        }

        self.stop_signal.store(false, Ordering::SeqCst);

        let buffer = Arc::clone(&self.frame_buffer);
        let mode = Arc::clone(&self.mode);
        let stop = Arc::clone(&self.stop_signal);
        let settings = self.settings.clone();

        let (width, height) = source.dimensions();
        log::info!(
            "Starting capture loop at {} Hz (source {}x{})",
            settings.refresh_hz,
            width,
            height
        );

        self.task = Some(tokio::spawn(run_capture_loop(
            source, settings, buffer, mode, stop,
        )));
        Ok(())
    }

    /// Stop the loop and release the source.
    ///
    /// Safe to call repeatedly. The loop observes the request at the top of
    /// its next iteration; this waits for it to finish.
    pub async fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);

        if let Some(handle) = self.task.take() {
            if let Err(e) = handle.await {
                log::warn!("Capture loop task ended abnormally: {}", e);
            }
            log::info!("Capture loop stopped");
        }

        if let Ok(mut buf) = self.frame_buffer.lock() {
            *buf = None;
        }
    }

    /// The most recently processed frame.
    ///
    /// Returns `None` if no frame has been processed yet or the loop is idle.
    pub fn current_frame(&self) -> Option<ProcessedFrame> {
        let buffer = self.frame_buffer.lock().ok()?;
        buffer.clone()
    }

    /// Wait until a processed frame is available, checking once per refresh.
    pub async fn wait_for_frame(&self, timeout: Duration) -> Option<ProcessedFrame> {
        let poll = refresh_interval(self.settings.refresh_hz);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(frame) = self.current_frame() {
                return Some(frame);
            }
            if self.state() == LoopState::Idle || tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Save the current frame as a photo tagged with the palette it was
    /// processed with.
    ///
    /// Only copies the shared buffer; the loop keeps running while the photo
    /// is encoded and stored.
    ///
    /// # Errors
    /// * `CameraError::NoFrame` - If nothing has been processed yet
    /// * `CameraError::Encode` - If PNG encoding fails
    /// * `CameraError::Store` - If the store rejects the photo
    pub async fn capture(&self, store: &EntityStore) -> Result<Photo, CameraError> {
        let processed = self.current_frame().ok_or(CameraError::NoFrame)?;
        let pixels = encode_png(&processed.frame).map_err(|e| CameraError::Encode(e.to_string()))?;

        let photo = Photo::new(store.next_id(), pixels, now_millis(), processed.mode);
        let photo = store.photos().put(photo).await?;

        log::info!("Captured photo {} ({})", photo.id, photo.filter);
        Ok(photo)
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }
}
