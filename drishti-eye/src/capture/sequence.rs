//! Directory of still images played back as a video

use drishti_core::{CameraProperty, Frame, Result, VisionError};
use image::imageops::{self, FilterType};
use std::path::PathBuf;
use tracing::{debug, info};

const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Plays the images of a directory in file-name order, looping at the end.
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    opened: bool,
    /// Requested output size; 0 keeps the decoded size
    width: u32,
    height: u32,
    /// Size of the images on disk, from the first file until a frame is read
    native: (u32, u32),
    fps: f64,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            position: 0,
            opened: false,
            width: 0,
            height: 0,
            native: (0, 0),
            fps: 0.0,
        }
    }

    fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| {
                        EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                    })
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

impl super::VideoSource for ImageSequenceSource {
    fn open(&mut self, index: u32) -> Result<()> {
        if self.opened {
            return Ok(());
        }
        let files = self.scan()?;
        if files.is_empty() {
            return Err(VisionError::Failed(format!(
                "no images in {}",
                self.dir.display()
            )));
        }
        debug!("Sequence source ignores device index {}", index);
        self.native = image::image_dimensions(&files[0])?;
        info!("Opened {} frames from {}", files.len(), self.dir.display());
        self.files = files;
        self.position = 0;
        self.opened = true;
        Ok(())
    }

    fn is_opened(&self) -> bool {
        self.opened
    }

    fn read(&mut self, frame: &mut Frame) -> Result<bool> {
        if !self.opened || self.files.is_empty() {
            return Ok(false);
        }
        let path = &self.files[self.position % self.files.len()];
        let mut image = image::open(path)?.to_rgb8();
        self.native = image.dimensions();
        if self.width > 0 && self.height > 0 && image.dimensions() != (self.width, self.height) {
            image = imageops::resize(&image, self.width, self.height, FilterType::Triangle);
        }
        *frame = Frame::from_image(image);
        self.position = (self.position + 1) % self.files.len();
        Ok(true)
    }

    fn release(&mut self) {
        self.opened = false;
        self.files.clear();
        self.position = 0;
        self.native = (0, 0);
    }

    fn get(&self, prop: CameraProperty) -> f64 {
        match prop {
            CameraProperty::FrameWidth if self.width > 0 => self.width as f64,
            CameraProperty::FrameWidth => self.native.0 as f64,
            CameraProperty::FrameHeight if self.height > 0 => self.height as f64,
            CameraProperty::FrameHeight => self.native.1 as f64,
            CameraProperty::Fps => self.fps,
            CameraProperty::PosFrames => self.position as f64,
            CameraProperty::FrameCount => self.files.len() as f64,
            _ => 0.0,
        }
    }

    fn set(&mut self, prop: CameraProperty, value: f64) -> bool {
        if !value.is_finite() || value < 0.0 {
            return false;
        }
        match prop {
            CameraProperty::FrameWidth => self.width = value as u32,
            CameraProperty::FrameHeight => self.height = value as u32,
            CameraProperty::Fps => self.fps = value,
            CameraProperty::PosFrames if !self.files.is_empty() => {
                self.position = value as usize % self.files.len();
            }
            _ => return false,
        }
        true
    }
}
