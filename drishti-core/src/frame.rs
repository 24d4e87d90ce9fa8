//! Frame buffers shared between the capture source and the detectors

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};

use crate::payload::{Point2D, Rect};

/// Packed 8-bit, 3-channel image. A 0x0 frame means "no image".
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from packed RGB bytes. Returns `None` when the buffer
    /// length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::from_image)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Copy `other` into this frame, reusing the allocation when the sizes match.
    pub fn copy_from(&mut self, other: &Frame) {
        if self.image.dimensions() == other.image.dimensions() {
            self.image.copy_from_slice(other.image.as_raw());
        } else {
            self.image = other.image.clone();
        }
    }

    pub fn clear(&mut self) {
        self.image = RgbImage::new(0, 0);
    }
}

/// Drawing helpers used by engines to annotate the display frame.
pub mod overlay {
    use super::*;

    pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
    pub const POINT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

    /// Outline each rectangle. Rectangles with zero width or height are skipped.
    pub fn draw_rects(frame: &mut Frame, rects: &[Rect], color: Rgb<u8>) {
        if frame.is_empty() {
            return;
        }
        for rect in rects.iter().filter(|r| r.width > 0 && r.height > 0) {
            let shape = imageproc::rect::Rect::at(rect.x, rect.y).of_size(rect.width, rect.height);
            draw_hollow_rect_mut(frame.image_mut(), shape, color);
        }
    }

    pub fn draw_points(frame: &mut Frame, points: &[Point2D], radius: i32, color: Rgb<u8>) {
        if frame.is_empty() {
            return;
        }
        for point in points {
            let center = (point.x.round() as i32, point.y.round() as i32);
            draw_filled_circle_mut(frame.image_mut(), center, radius, color);
        }
    }
}
