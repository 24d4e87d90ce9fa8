//! USB webcam capture through OpenCV

use drishti_core::{CameraProperty, Frame, Result, VisionError};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY},
};
use tracing::{info, warn};

fn cv_error(context: &str, err: opencv::Error) -> VisionError {
    VisionError::Failed(format!("{}: {}", context, err.message))
}

/// Camera device read through `VideoCapture`. Frames are converted from BGR.
pub struct OpenCvCamera {
    capture: Option<VideoCapture>,
    raw: Mat,
    rgb: Mat,
}

impl OpenCvCamera {
    pub fn new() -> Self {
        Self {
            capture: None,
            raw: Mat::default(),
            rgb: Mat::default(),
        }
    }
}

impl Default for OpenCvCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl super::VideoSource for OpenCvCamera {
    fn open(&mut self, index: u32) -> Result<()> {
        if self.is_opened() {
            return Ok(());
        }
        let capture = VideoCapture::new(index as i32, CAP_ANY)
            .map_err(|e| cv_error(&format!("Failed to open camera {}", index), e))?;
        let opened = capture
            .is_opened()
            .map_err(|e| cv_error(&format!("Camera {} not opened", index), e))?;
        if !opened {
            return Err(VisionError::Failed(format!("Camera {} failed to open", index)));
        }
        info!("Camera {} opened", index);
        self.capture = Some(capture);
        Ok(())
    }

    fn is_opened(&self) -> bool {
        self.capture
            .as_ref()
            .and_then(|c| c.is_opened().ok())
            .unwrap_or(false)
    }

    fn read(&mut self, frame: &mut Frame) -> Result<bool> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(false);
        };
        let grabbed = capture
            .read(&mut self.raw)
            .map_err(|e| cv_error("Failed to read frame", e))?;
        if !grabbed || self.raw.empty() {
            return Ok(false);
        }
        imgproc::cvt_color(&self.raw, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| cv_error("Failed to convert frame", e))?;
        let width = self.rgb.cols() as u32;
        let height = self.rgb.rows() as u32;
        let data = self
            .rgb
            .data_bytes()
            .map_err(|e| cv_error("Frame is not continuous", e))?
            .to_vec();
        match Frame::from_raw(width, height, data) {
            Some(decoded) => {
                *frame = decoded;
                Ok(true)
            }
            None => Err(VisionError::Failed(format!(
                "Unexpected frame layout {}x{}",
                width, height
            ))),
        }
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                warn!("Failed to release camera: {}", e.message);
            }
        }
    }

    fn get(&self, prop: CameraProperty) -> f64 {
        self.capture
            .as_ref()
            .and_then(|c| c.get(prop.id()).ok())
            .unwrap_or(0.0)
    }

    fn set(&mut self, prop: CameraProperty, value: f64) -> bool {
        self.capture
            .as_mut()
            .and_then(|c| c.set(prop.id(), value).ok())
            .unwrap_or(false)
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        use super::VideoSource;
        self.release();
    }
}
