//! Image acquisition and PNG output.

use std::path::Path;
use std::sync::mpsc::Receiver;

use image::{ImageFormat, RgbaImage};
use kdray_core::{Fragment, Rgba};

use crate::error::{RenderError, RenderResult};

const GAMMA: f64 = 2.2;

/// A `width` x `height` grid of linear RGBA values.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Rgba>,
}

impl Image {
    /// A fully transparent image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width * height],
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Rgba>) -> RenderResult<Self> {
        if pixels.len() != width * height {
            return Err(RenderError::SizeMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Rgba::TRANSPARENT);
    }

    pub fn get(&self, x: usize, y: usize) -> Rgba {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, color: Rgba) {
        self.pixels[y * self.width + x] = color;
    }

    /// Writes every fragment from `fragments` until all senders hang up.
    /// Returns the number of fragments received.
    pub fn acquire(&mut self, fragments: Receiver<Fragment>) -> usize {
        let mut count = 0;
        for frag in fragments {
            self.set(frag.x, frag.y, frag.color);
            count += 1;
        }
        count
    }

    /// 8-bit sRGB-ish conversion: clamp to `[0, 1]`, then gamma 2.2.
    pub fn to_rgba8(&self) -> RenderResult<RgbaImage> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for px in &self.pixels {
            bytes.extend_from_slice(&[
                encode_channel(px.r),
                encode_channel(px.g),
                encode_channel(px.b),
                (255.0 * px.a.clamp(0.0, 1.0)).round() as u8,
            ]);
        }
        RgbaImage::from_raw(self.width as u32, self.height as u32, bytes).ok_or(
            RenderError::SizeMismatch {
                width: self.width,
                height: self.height,
                len: self.pixels.len(),
            },
        )
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        self.to_rgba8()?
            .save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

#[inline]
fn encode_channel(linear: f64) -> u8 {
    (255.0 * linear.clamp(0.0, 1.0).powf(1.0 / GAMMA)).round() as u8
}
