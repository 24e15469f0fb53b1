// Core types shared by the pipeline, the surface and the window.

use serde::Deserialize;

/// What the window shows: one u32 per pixel, 0x00RRGGBB for minifb.
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }
}

/// Flat RGBA snapshot of a surface, row-major, 4 channels per pixel.
/// Writes are expected to saturate to 0..=255 like a clamped byte array.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,     // length = width * height * 4
}

impl ImageData {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0u8; width * height * 4] }
    }
}

/// Per-frame layer toggles. Copied into every `draw` call so a change made
/// by the UI mid-frame only shows up on the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DrawParams {
    pub show_gradient: bool,
    pub show_bars: bool,
    pub show_noise: bool,
    pub show_circles: bool,
    pub show_emboss: bool,
    pub show_invert: bool,
    pub show_wave: bool,
    /// Probability in [0,1] that an element is hit by noise. `None` means
    /// "use whatever `Visualizer::set_noise_value` stored".
    pub noise_intensity: Option<f32>,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            show_gradient: true,
            show_bars: true,
            show_noise: false,
            show_circles: true,
            show_emboss: true,
            show_invert: true,
            show_wave: false,
            noise_intensity: None,
        }
    }
}

impl DrawParams {
    /// Everything off. Handy as a starting point when only one layer matters.
    pub fn none() -> Self {
        Self {
            show_gradient: false,
            show_bars: false,
            show_noise: false,
            show_circles: false,
            show_emboss: false,
            show_invert: false,
            show_wave: false,
            noise_intensity: None,
        }
    }
}
