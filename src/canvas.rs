// The drawing surface: a CPU raster with a small 2D-context style API.
// Layers are painted with straight-alpha source-over compositing, and the
// whole raster can be read out as RGBA and written back after pixel effects.

use std::rc::Rc;

use image::RgbaImage;

use crate::color::{LinearGradient, Rgba};
use crate::error::Error;
use crate::types::{FrameBuffer, ImageData};

/// Axis-aligned rectangle in canvas pixels. Width/height may be negative
/// (the rectangle then extends left/up from x,y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 { (self.x + self.width, -self.width) } else { (self.x, self.width) };
        let (y, height) = if self.height < 0.0 { (self.y + self.height, -self.height) } else { (self.y, self.height) };
        Self { x, y, width, height }
    }
}

/// What a fill paints with. Gradients are shared so setting them as the
/// fill style every frame doesn't copy the stop list.
#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    Linear(Rc<LinearGradient>),
}

impl Paint {
    /// True when painting with this can't change any pixel.
    #[inline]
    fn is_clear(&self) -> bool {
        matches!(self, Paint::Solid(c) if c.alpha() <= 0.0)
    }

    #[inline]
    fn color_at(&self, x: f32, y: f32) -> Rgba {
        match self {
            Paint::Solid(c) => *c,
            Paint::Linear(g) => g.color_at(x, y),
        }
    }
}

/// Raster target the render pipeline draws into.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Push the drawing state (fill, stroke, global alpha, line width).
    fn save(&mut self);
    /// Pop the drawing state; a restore without a matching save is a no-op.
    fn restore(&mut self);
    fn set_global_alpha(&mut self, alpha: f32);
    fn set_fill_style(&mut self, paint: Paint);
    fn set_stroke_style(&mut self, color: Rgba);

    fn fill_rect(&mut self, rect: Rect);
    fn stroke_rect(&mut self, rect: Rect);
    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32);

    /// Copy every pixel into `out`, reusing its allocation when it fits.
    fn read_pixels(&self, out: &mut ImageData);
    /// Replace every pixel. Dimensions must match the surface.
    fn put_image_data(&mut self, image: &ImageData) -> Result<(), Error>;

    fn get_image_data(&self) -> ImageData {
        let mut out = ImageData::new(0, 0);
        self.read_pixels(&mut out);
        out
    }
}

#[derive(Clone, Debug)]
struct DrawState {
    fill: Paint,
    stroke: Rgba,
    global_alpha: f32,
    line_width: f32,
}

impl Default for DrawState {
    fn default() -> Self {
        Self { fill: Paint::Solid(Rgba::BLACK), stroke: Rgba::BLACK, global_alpha: 1.0, line_width: 1.0 }
    }
}

/// `Surface` backed by an `image::RgbaImage`. Starts fully transparent.
pub struct Canvas {
    pixels: RgbaImage,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: RgbaImage::new(width as u32, height as u32),
            state: DrawState::default(),
            stack: Vec::new(),
        }
    }

    /// Change the raster size. Contents are cleared, like a canvas element.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.pixels = RgbaImage::new(width as u32, height as u32);
    }

    pub fn raw(&self) -> &[u8] {
        &self.pixels
    }

    /// Flatten onto black into a window buffer (0x00RRGGBB).
    pub fn present_into(&self, fb: &mut FrameBuffer) {
        fb.width = self.width();
        fb.height = self.height();
        fb.pixels.resize(fb.width * fb.height, 0);
        for (dst, px) in fb.pixels.iter_mut().zip(self.pixels.chunks_exact(4)) {
            let a = px[3] as u32;
            let r = px[0] as u32 * a / 255;
            let g = px[1] as u32 * a / 255;
            let b = px[2] as u32 * a / 255;
            *dst = (r << 16) | (g << 8) | b;
        }
    }

    /// Pixel index range whose centers fall inside [lo, hi).
    #[inline]
    fn span(lo: f32, hi: f32, limit: usize) -> (usize, usize) {
        let start = (lo - 0.5).ceil().max(0.0) as usize;
        let end = ((hi - 0.5).ceil().max(0.0) as usize).min(limit);
        (start.min(limit), end)
    }

    fn paint_rect(&mut self, rect: Rect, paint: &Paint) {
        let r = rect.normalized();
        if !(r.width > 0.0 && r.height > 0.0) || paint.is_clear() || self.state.global_alpha <= 0.0 {
            return;
        }
        let alpha = self.state.global_alpha;
        let (x0, x1) = Self::span(r.x, r.x + r.width, self.width());
        let (y0, y1) = Self::span(r.y, r.y + r.height, self.height());
        let stride = self.width() * 4;
        let data: &mut [u8] = &mut self.pixels;
        for y in y0..y1 {
            let row = &mut data[y * stride..(y + 1) * stride];
            for x in x0..x1 {
                let c = paint.color_at(x as f32 + 0.5, y as f32 + 0.5);
                blend_over(&mut row[x * 4..x * 4 + 4], c, alpha);
            }
        }
    }
}

impl Surface for Canvas {
    fn width(&self) -> usize {
        self.pixels.width() as usize
    }

    fn height(&self) -> usize {
        self.pixels.height() as usize
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(s) = self.stack.pop() {
            self.state = s;
        }
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        // Out-of-range values are ignored, matching a 2D context.
        if (0.0..=1.0).contains(&alpha) {
            self.state.global_alpha = alpha;
        }
    }

    fn set_fill_style(&mut self, paint: Paint) {
        self.state.fill = paint;
    }

    fn set_stroke_style(&mut self, color: Rgba) {
        self.state.stroke = color;
    }

    fn fill_rect(&mut self, rect: Rect) {
        let paint = self.state.fill.clone();
        self.paint_rect(rect, &paint);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let r = rect.normalized();
        let lw = self.state.line_width.min(r.width).min(r.height);
        if !(lw > 0.0) {
            return;
        }
        let paint = Paint::Solid(self.state.stroke);
        // Bands just inside the edge; sides skip the top/bottom rows so
        // corners are only blended once.
        self.paint_rect(Rect::new(r.x, r.y, r.width, lw), &paint);
        if r.height > lw {
            self.paint_rect(Rect::new(r.x, r.y + r.height - lw, r.width, lw), &paint);
        }
        if r.height > 2.0 * lw {
            let side = r.height - 2.0 * lw;
            self.paint_rect(Rect::new(r.x, r.y + lw, lw, side), &paint);
            if r.width > lw {
                self.paint_rect(Rect::new(r.x + r.width - lw, r.y + lw, lw, side), &paint);
            }
        }
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32) {
        let alpha = self.state.global_alpha;
        let paint = self.state.fill.clone();
        if !(radius > 0.0) || paint.is_clear() || alpha <= 0.0 {
            return;
        }
        let (x0, x1) = Self::span(cx - radius, cx + radius, self.width());
        let (y0, y1) = Self::span(cy - radius, cy + radius, self.height());
        let r2 = radius * radius;
        let stride = self.width() * 4;
        let data: &mut [u8] = &mut self.pixels;
        for y in y0..y1 {
            let py = y as f32 + 0.5 - cy;
            for x in x0..x1 {
                let px = x as f32 + 0.5 - cx;
                if px * px + py * py > r2 {
                    continue; // outside the circle
                }
                let c = paint.color_at(x as f32 + 0.5, y as f32 + 0.5);
                let i = y * stride + x * 4;
                blend_over(&mut data[i..i + 4], c, alpha);
            }
        }
    }

    fn read_pixels(&self, out: &mut ImageData) {
        out.width = self.width();
        out.height = self.height();
        out.data.clear();
        out.data.extend_from_slice(&self.pixels);
    }

    fn put_image_data(&mut self, image: &ImageData) -> Result<(), Error> {
        if image.width != self.width() || image.height != self.height() {
            return Err(Error::SizeMismatch {
                what: "image data",
                expected: self.width() * self.height() * 4,
                actual: image.width * image.height * 4,
            });
        }
        if image.data.len() != self.pixels.len() {
            return Err(Error::SizeMismatch {
                what: "image data",
                expected: self.pixels.len(),
                actual: image.data.len(),
            });
        }
        let data: &mut [u8] = &mut self.pixels;
        data.copy_from_slice(&image.data);
        Ok(())
    }
}

/// Straight-alpha source-over of `c` (scaled by `global_alpha`) onto one RGBA pixel.
#[inline]
fn blend_over(px: &mut [u8], c: Rgba, global_alpha: f32) {
    let sa = c.alpha() * global_alpha;
    if sa <= 0.0 {
        return;
    }
    let da = px[3] as f32 / 255.0;
    let keep = da * (1.0 - sa);
    let oa = sa + keep;
    let mix = |s: u8, d: u8| ((s as f32 * sa + d as f32 * keep) / oa).round().clamp(0.0, 255.0) as u8;
    px[0] = mix(c.r, px[0]);
    px[1] = mix(c.g, px[1]);
    px[2] = mix(c.b, px[2]);
    px[3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
}
