// The render pipeline. One `draw` paints one frame, back to front:
// fade, gradient, bars, waveform, circles, then the pixel passes
// (noise/invert, emboss) and a single write-back of the pixel buffer.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info};

use crate::analyser::AnalysisSource;
use crate::canvas::{Paint, Rect, Surface};
use crate::color::{get_linear_gradient, make_color, LinearGradient, Rgba};
use crate::error::Error;
use crate::fx;
use crate::types::{DrawParams, ImageData};

/// Top-to-bottom wash: blue through sky tones to white.
pub const GRADIENT_STOPS: [(f32, &str); 6] = [
    (0.0, "blue"),
    (0.25, "#0080ff"),
    (0.46, "#1a8dff"),
    (0.70, "#3399ff"),
    (0.90, "#4da6ff"),
    (1.0, "white"),
];

const FADE_ALPHA: f32 = 0.1;
const GRADIENT_ALPHA: f32 = 0.3;
const CIRCLE_ALPHA: f32 = 0.5;

/// Geometry and paint of one row of sample bars.
#[derive(Clone, Copy, Debug)]
pub struct BarStyle {
    pub spacing: f32,
    pub margin: f32,
    pub bar_height: f32,
    pub top: f32,
    pub fill: Rgba,
    pub stroke: Rgba,
}

pub const FREQUENCY_BARS: BarStyle = BarStyle {
    spacing: 4.0,
    margin: 5.0,
    bar_height: 200.0,
    top: 100.0,
    fill: Rgba { r: 255, g: 255, b: 255, a: 0.5 },
    stroke: Rgba { r: 0, g: 0, b: 255, a: 0.5 },
};

pub const WAVEFORM_BARS: BarStyle = BarStyle {
    spacing: 3.0,
    margin: 5.0,
    bar_height: 200.0,
    top: 50.0,
    fill: Rgba { r: 128, g: 0, b: 128, a: 0.8 },
    stroke: Rgba { r: 0, g: 0, b: 0, a: 0.3 },
};

/// One rectangle per sample. The width left after margins and spacing is
/// shared evenly; louder samples sit higher (`y = top + 256 - sample`).
pub fn bar_layout<'a>(samples: &'a [u8], surface_width: f32, style: &BarStyle) -> impl Iterator<Item = Rect> + 'a {
    let n = samples.len().max(1) as f32;
    let free = surface_width - n * style.spacing - style.margin * 2.0;
    let bar_width = (free / n).max(0.0);
    let style = *style;
    samples.iter().enumerate().map(move |(i, &v)| {
        Rect::new(
            style.margin + i as f32 * (bar_width + style.spacing),
            style.top + 256.0 - v as f32,
            bar_width,
            style.bar_height,
        )
    })
}

/// Everything `setup_canvas` establishes.
struct Stage<S> {
    surface: Weak<RefCell<S>>,
    analyser: Box<dyn AnalysisSource>,
    width: usize,
    height: usize,
    gradient: Rc<LinearGradient>,
    audio_data: Vec<u8>,
    wave_data: Vec<u8>,
}

pub struct Visualizer<S: Surface> {
    stage: Option<Stage<S>>,
    noise_value: f32,
    rng: fastrand::Rng,
    image: ImageData, // reused every frame
}

impl<S: Surface> Default for Visualizer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Surface> Visualizer<S> {
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    /// Same as `new`, but the noise pattern is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(rng: fastrand::Rng) -> Self {
        Self { stage: None, noise_value: 0.0, rng, image: ImageData::new(0, 0) }
    }

    /// Bind the surface and the analysis source. Must run before `draw`;
    /// calling it again replaces the gradient and both sample buffers.
    pub fn setup_canvas(&mut self, surface: &Rc<RefCell<S>>, analyser: Box<dyn AnalysisSource>) -> Result<(), Error> {
        let (width, height) = {
            let s = surface.try_borrow().map_err(|_| Error::SurfaceUnavailable)?;
            (s.width(), s.height())
        };
        let fft_size = analyser.fft_size();
        if fft_size < 2 {
            return Err(Error::SizeMismatch { what: "analysis window", expected: 2, actual: fft_size });
        }

        let gradient = get_linear_gradient(0.0, 0.0, 0.0, height as f32, &GRADIENT_STOPS)?;
        let bins = analyser.frequency_bin_count();

        self.stage = Some(Stage {
            surface: Rc::downgrade(surface),
            analyser,
            width,
            height,
            gradient: Rc::new(gradient),
            audio_data: vec![0u8; bins],
            wave_data: vec![0u8; bins],
        });
        self.image = ImageData::new(width, height);
        info!(width, height, fft_size, "visualizer ready");
        Ok(())
    }

    /// Probability used by the noise pass when the params don't carry one.
    /// Not clamped.
    pub fn set_noise_value(&mut self, value: f32) {
        self.noise_value = value;
    }

    pub fn noise_value(&self) -> f32 {
        self.noise_value
    }

    pub fn is_ready(&self) -> bool {
        self.stage.is_some()
    }

    /// Latest frequency bytes, empty before setup.
    pub fn frequency_data(&self) -> &[u8] {
        self.stage.as_ref().map_or(&[][..], |s| s.audio_data.as_slice())
    }

    /// Latest waveform bytes, empty before setup.
    pub fn waveform_data(&self) -> &[u8] {
        self.stage.as_ref().map_or(&[][..], |s| s.wave_data.as_slice())
    }

    /// Paint one frame. On error nothing has been committed to the surface
    /// unless the failure came from the final write-back itself.
    pub fn draw(&mut self, params: DrawParams) -> Result<(), Error> {
        let Self { stage, noise_value, rng, image } = self;
        let stage = stage.as_mut().ok_or(Error::NotInitialized)?;
        let surface = stage.surface.upgrade().ok_or(Error::SurfaceUnavailable)?;
        let mut s = surface.try_borrow_mut().map_err(|_| Error::SurfaceUnavailable)?;

        if s.width() != stage.width || s.height() != stage.height {
            return Err(Error::SizeMismatch {
                what: "surface",
                expected: stage.width * stage.height,
                actual: s.width() * s.height(),
            });
        }

        // 1) Fresh samples, whatever layers are on.
        stage.analyser.fill_frequency_domain(&mut stage.audio_data)?;
        stage.analyser.fill_time_domain(&mut stage.wave_data)?;

        let (w, h) = (stage.width as f32, stage.height as f32);
        let full = Rect::new(0.0, 0.0, w, h);

        // 2) Translucent black: old frames fade out instead of clearing.
        s.save();
        s.set_fill_style(Paint::Solid(Rgba::BLACK));
        s.set_global_alpha(FADE_ALPHA);
        s.fill_rect(full);
        s.restore();

        // 3) Gradient wash.
        if params.show_gradient {
            s.save();
            s.set_fill_style(Paint::Linear(Rc::clone(&stage.gradient)));
            s.set_global_alpha(GRADIENT_ALPHA);
            s.fill_rect(full);
            s.restore();
        }

        // 4) Frequency bars, 5) waveform on top of them.
        if params.show_bars {
            draw_bars(&mut *s, &stage.audio_data, w, &FREQUENCY_BARS);
        }
        if params.show_wave {
            draw_bars(&mut *s, &stage.wave_data, w, &WAVEFORM_BARS);
        }

        // 6) Radial pulses.
        if params.show_circles {
            draw_circles(&mut *s, &stage.audio_data, w, h);
        }

        // 7) Pixel pass on a snapshot of the whole frame.
        s.read_pixels(image);
        let expected = stage.width * stage.height * 4;
        if image.data.len() != expected {
            return Err(Error::SizeMismatch { what: "pixel buffer", expected, actual: image.data.len() });
        }
        let noise = params
            .show_noise
            .then(|| params.noise_intensity.unwrap_or(*noise_value));
        fx::pixel_pass(image, noise, params.show_invert, rng);

        // 8) Emboss, after noise/invert.
        if params.show_emboss {
            fx::emboss(&mut image.data, image.width);
        }

        // 9) Commit.
        s.put_image_data(image)?;
        debug!(?params, "frame drawn");
        Ok(())
    }
}

fn draw_bars<S: Surface + ?Sized>(s: &mut S, samples: &[u8], width: f32, style: &BarStyle) {
    s.save();
    s.set_fill_style(Paint::Solid(style.fill));
    s.set_stroke_style(style.stroke);
    for rect in bar_layout(samples, width, style) {
        s.fill_rect(rect);
        s.stroke_rect(rect);
    }
    s.restore();
}

/// Three concentric rings per frequency bin. Louder bins draw bigger but
/// fainter rings.
fn draw_circles<S: Surface + ?Sized>(s: &mut S, samples: &[u8], width: f32, height: f32) {
    let max_radius = height / 4.0;
    let (cx, cy) = (width / 2.0, height / 2.0);
    s.save();
    s.set_global_alpha(CIRCLE_ALPHA);
    for &v in samples {
        let percent = v as f32 / 255.0;
        let radius = percent * max_radius;

        s.set_fill_style(Paint::Solid(make_color(255, 255, 177, 0.34 - percent / 3.0)));
        s.fill_circle(cx, cy, radius);

        s.set_fill_style(Paint::Solid(make_color(255, 255, 118, 0.10 - percent / 10.0)));
        s.fill_circle(cx, cy, radius * 1.5);

        s.set_fill_style(Paint::Solid(make_color(255, 255, 228, 0.5 - percent / 5.0)));
        s.fill_circle(cx, cy, radius * 0.5);
    }
    s.restore();
}
