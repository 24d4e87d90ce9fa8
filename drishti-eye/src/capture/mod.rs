//! Capture sources feeding frames to the orchestrator
//!
//! The orchestrator only needs to open a source, read frames and poke
//! properties; the device itself is somebody else's problem.

#[cfg(feature = "opencv")]
mod device;
mod sequence;

#[cfg(feature = "opencv")]
pub use device::OpenCvCamera;
pub use sequence::ImageSequenceSource;

use drishti_core::config::CameraConfig;
use drishti_core::{CameraProperty, Frame, Result, VisionError};
use tracing::info;

/// A video source in the style of OpenCV's `VideoCapture`.
pub trait VideoSource: Send {
    /// Open device `index`. Opening an already open source is a no-op.
    fn open(&mut self, index: u32) -> Result<()>;

    fn is_opened(&self) -> bool;

    /// Read the next frame into `frame`. `Ok(false)` means no frame was
    /// available and `frame` is untouched.
    fn read(&mut self, frame: &mut Frame) -> Result<bool>;

    fn release(&mut self);

    /// Current value of `prop`, 0.0 when unsupported.
    fn get(&self, prop: CameraProperty) -> f64;

    /// Returns false when the property is unsupported or was rejected.
    fn set(&mut self, prop: CameraProperty, value: f64) -> bool;
}

/// Pick the source described by `config`.
pub fn from_config(config: &CameraConfig) -> Box<dyn VideoSource> {
    if let Some(dir) = &config.frames_dir {
        info!("Capturing from image sequence in {}", dir.display());
        return Box::new(ImageSequenceSource::new(dir.clone()));
    }
    device_source()
}

#[cfg(feature = "opencv")]
fn device_source() -> Box<dyn VideoSource> {
    Box::new(OpenCvCamera::new())
}

#[cfg(not(feature = "opencv"))]
fn device_source() -> Box<dyn VideoSource> {
    tracing::warn!("Built without the opencv feature, camera devices are unavailable");
    Box::new(NullSource)
}

/// Source that never opens.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSource;

impl VideoSource for NullSource {
    fn open(&mut self, index: u32) -> Result<()> {
        Err(VisionError::Failed(format!("no capture device {}", index)))
    }

    fn is_opened(&self) -> bool {
        false
    }

    fn read(&mut self, _frame: &mut Frame) -> Result<bool> {
        Ok(false)
    }

    fn release(&mut self) {}

    fn get(&self, _prop: CameraProperty) -> f64 {
        0.0
    }

    fn set(&mut self, _prop: CameraProperty, _value: f64) -> bool {
        false
    }
}

/// Source that returns the same frame on every read. Handy as a test pattern.
#[derive(Debug, Clone)]
pub struct StillSource {
    frame: Frame,
    opened: bool,
    reads: u64,
}

impl StillSource {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            opened: false,
            reads: 0,
        }
    }

    /// Solid-colour frame of the given size.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        Self::new(Frame::from_image(image))
    }

    /// Number of frames served so far
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl VideoSource for StillSource {
    fn open(&mut self, _index: u32) -> Result<()> {
        self.opened = true;
        Ok(())
    }

    fn is_opened(&self) -> bool {
        self.opened
    }

    fn read(&mut self, frame: &mut Frame) -> Result<bool> {
        if !self.opened || self.frame.is_empty() {
            return Ok(false);
        }
        frame.copy_from(&self.frame);
        self.reads += 1;
        Ok(true)
    }

    fn release(&mut self) {
        self.opened = false;
    }

    fn get(&self, prop: CameraProperty) -> f64 {
        match prop {
            CameraProperty::FrameWidth => self.frame.width() as f64,
            CameraProperty::FrameHeight => self.frame.height() as f64,
            CameraProperty::PosFrames => self.reads as f64,
            _ => 0.0,
        }
    }

    fn set(&mut self, _prop: CameraProperty, _value: f64) -> bool {
        false
    }
}
