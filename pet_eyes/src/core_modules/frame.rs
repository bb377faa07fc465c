// THEORY:
// The `frame` module owns the one piece of data that flows through the loop: a
// `FrameBuffer`, a flat RGBA8 image exactly `width * height * 4` bytes long.
// It also owns the per-frame work unit, `filter_frame`, which runs a profile over
// every pixel of a buffer.
//
// Key architectural principles:
// 1.  **Exclusive Ownership**: A cycle takes a buffer from the source by value,
//     mutates it in place and hands it to the sink by value. Nothing keeps a
//     reference across cycles, so memory stays flat no matter how long the
//     stream runs.
// 2.  **Embarrassingly Parallel**: The transform is pure and per-pixel. A frame
//     can be cut into horizontal bands and each band filtered on its own thread
//     with no coordination; the output is byte-identical to a sequential pass.
// 3.  **Synchronous Work**: `filter_frame` returns only when every band is done,
//     so a half-filtered frame is never observable outside this module.

use crate::core_modules::pixel::pixel::CHANNELS;
use crate::core_modules::vision_model::VisionProfile;
use crate::error::{Result, VisionError};
use image::RgbaImage;

/// Below this many pixels a frame is filtered on the calling thread.
const PARALLEL_MIN_PIXELS: usize = 64 * 64;

/// One captured image in RGBA8 layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Wraps raw RGBA bytes. Fails if the length does not match the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(VisionError::InvalidFrame {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// A frame where every pixel is `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let data = rgba.iter().copied().cycle().take(pixels * CHANNELS).collect();
        Self { width, height, data }
    }

    fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The RGBA value at `(x, y)`, if inside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = &self.data[start..start + CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn into_image(self) -> Result<RgbaImage> {
        let (width, height) = (self.width, self.height);
        let actual = self.data.len();
        RgbaImage::from_raw(width, height, self.data).ok_or(VisionError::InvalidFrame {
            width,
            height,
            expected: Self::byte_len(width, height),
            actual,
        })
    }
}

impl From<RgbaImage> for FrameBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

/// How a frame's pixels are walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStrategy {
    /// One pass on the calling thread.
    Sequential,
    /// Horizontal bands on up to `workers` scoped threads.
    Parallel { workers: usize },
}

impl Default for FilterStrategy {
    fn default() -> Self {
        FilterStrategy::Parallel {
            workers: num_cpus::get(),
        }
    }
}

/// Applies `profile` to every pixel of `frame`. Alpha bytes are never written.
pub fn filter_frame(profile: &VisionProfile, frame: &mut FrameBuffer, strategy: FilterStrategy) {
    match strategy {
        FilterStrategy::Parallel { workers } if workers > 1 && frame.pixel_count() >= PARALLEL_MIN_PIXELS => {
            filter_bands(profile, frame, workers)
        }
        _ => filter_pixels(profile, &mut frame.data),
    }
}

fn filter_pixels(profile: &VisionProfile, bytes: &mut [u8]) {
    for rgba in bytes.chunks_exact_mut(CHANNELS) {
        profile.apply_to_pixel(rgba);
    }
}

fn filter_bands(profile: &VisionProfile, frame: &mut FrameBuffer, workers: usize) {
    let row_bytes = frame.width as usize * CHANNELS;
    let rows_per_band = (frame.height as usize).div_ceil(workers).max(1);
    std::thread::scope(|scope| {
        for band in frame.data.chunks_mut(rows_per_band * row_bytes) {
            scope.spawn(move || filter_pixels(profile, band));
        }
    });
}
