// Live UI state. Key handlers flip fields here between frames; the loop
// takes a copy with `snapshot()` right before each draw.

use tracing::warn;

use crate::canvas::Surface;
use crate::types::DrawParams;
use crate::visualizer::Visualizer;

pub const NOISE_STEP: f32 = 0.05;

/// One user action, already decoupled from the window's key codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Gradient,
    Bars,
    Wave,
    Circles,
    Noise,
    Invert,
    Emboss,
    NoiseUp,
    NoiseDown,
}

#[derive(Clone, Debug)]
pub struct Controls {
    params: DrawParams,
    noise: f32,
}

impl Controls {
    /// Noise starts off when its level is zero, whatever `params` says.
    pub fn new(params: DrawParams, noise: f32) -> Self {
        let noise = if noise.is_finite() { noise.clamp(0.0, 1.0) } else { 0.0 };
        let show_noise = params.show_noise && noise > 0.0;
        Self { params: DrawParams { noise_intensity: None, show_noise, ..params }, noise }
    }

    pub fn noise(&self) -> f32 {
        self.noise
    }

    /// Apply one action. Returns the new noise value when it changed, so the
    /// caller can forward it to the pipeline.
    pub fn apply(&mut self, control: Control) -> Option<f32> {
        let p = &mut self.params;
        match control {
            Control::Gradient => p.show_gradient = !p.show_gradient,
            Control::Bars => p.show_bars = !p.show_bars,
            Control::Wave => p.show_wave = !p.show_wave,
            Control::Circles => p.show_circles = !p.show_circles,
            Control::Invert => p.show_invert = !p.show_invert,
            Control::Emboss => p.show_emboss = !p.show_emboss,
            Control::Noise => {
                p.show_noise = !p.show_noise;
                if p.show_noise && self.noise <= 0.0 {
                    return self.set_noise(NOISE_STEP);
                }
            }
            Control::NoiseUp => return self.set_noise(self.noise + NOISE_STEP),
            Control::NoiseDown => return self.set_noise(self.noise - NOISE_STEP),
        }
        None
    }

    /// Same rules as the noise slider: a positive value switches noise on
    /// and is forwarded, zero switches it off.
    pub fn set_noise(&mut self, value: f32) -> Option<f32> {
        // Round to the slider's step so repeated presses don't drift.
        let value = ((value.clamp(0.0, 1.0) / NOISE_STEP).round() * NOISE_STEP).clamp(0.0, 1.0);
        if value > 0.0 {
            self.params.show_noise = true;
        } else {
            self.params.show_noise = false;
        }
        if value == self.noise {
            return None;
        }
        self.noise = value;
        (value > 0.0).then_some(value)
    }

    pub fn snapshot(&self) -> DrawParams {
        self.params
    }

    /// Short status line naming the active layers.
    pub fn hud_label(&self) -> String {
        let p = &self.params;
        let mut parts: Vec<String> = Vec::new();
        for (on, name) in [
            (p.show_gradient, "GRAD"),
            (p.show_bars, "BARS"),
            (p.show_wave, "WAVE"),
            (p.show_circles, "CIRC"),
            (p.show_invert, "INV"),
            (p.show_emboss, "EMB"),
        ] {
            if on {
                parts.push(name.to_string());
            }
        }
        if p.show_noise {
            parts.push(format!("NOISE {:.2}", self.noise));
        }
        if parts.is_empty() {
            parts.push("-".into());
        }
        parts.join(" ")
    }
}

/// The window-independent half of a loop tick: apply this tick's controls,
/// then draw. A failed frame is logged and counted and never stops the loop.
pub struct Driver {
    controls: Controls,
    skipped: u64,
}

impl Driver {
    pub fn new(controls: Controls) -> Self {
        Self { controls, skipped: 0 }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Frames dropped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Returns true when the frame reached the surface.
    pub fn tick<S: Surface>(&mut self, viz: &mut Visualizer<S>, input: &[Control]) -> bool {
        for &control in input {
            if let Some(v) = self.controls.apply(control) {
                viz.set_noise_value(v);
            }
        }
        match viz.draw(self.controls.snapshot()) {
            Ok(()) => true,
            Err(e) => {
                self.skipped += 1;
                warn!(skipped = self.skipped, "frame skipped: {e}");
                false
            }
        }
    }
}
