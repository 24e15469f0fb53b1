// Colors and multi-stop linear gradients used as paint on the canvas.

use crate::error::Error;

/// Straight (non-premultiplied) color. Alpha is kept as given; painting
/// clamps it to [0,1], so callers may hand in negative alphas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 1.0 };
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 1.0 };

    /// Alpha as it is actually painted.
    #[inline]
    pub fn alpha(&self) -> f32 {
        if self.a.is_nan() { 0.0 } else { self.a.clamp(0.0, 1.0) }
    }
}

pub fn make_color(r: u8, g: u8, b: u8, a: f32) -> Rgba {
    Rgba { r, g, b, a }
}

/// Parse `#rgb`, `#rrggbb` or one of a handful of named colors.
pub fn parse_color(s: &str) -> Result<Rgba, Error> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        let bad = || Error::Config(format!("invalid hex color '{s}'"));
        if !hex.is_ascii() {
            return Err(bad());
        }
        let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map_err(|_| bad());
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
        return match hex.len() {
            3 => Ok(make_color(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 1.0)),
            6 => Ok(make_color(byte(0)?, byte(2)?, byte(4)?, 1.0)),
            _ => Err(bad()),
        };
    }
    let c = match s.to_ascii_lowercase().as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "lime" => (0, 255, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "purple" => (128, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        _ => return Err(Error::Config(format!("unknown color '{s}'"))),
    };
    Ok(make_color(c.0, c.1, c.2, 1.0))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba,
}

/// Gradient along the line (x0,y0) -> (x1,y1). Stops are sorted by offset.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    x0: f32,
    y0: f32,
    dx: f32,
    dy: f32,
    len2: f32,
    stops: Vec<ColorStop>,
}

impl LinearGradient {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32, stops: &[(f32, Rgba)]) -> Result<Self, Error> {
        if stops.is_empty() {
            return Err(Error::Config("gradient needs at least one stop".into()));
        }
        let mut sorted = Vec::with_capacity(stops.len());
        for &(offset, color) in stops {
            if !(0.0..=1.0).contains(&offset) {
                return Err(Error::Config(format!("gradient stop {offset} outside [0,1]")));
            }
            sorted.push(ColorStop { offset, color });
        }
        // Stable: equal offsets keep insertion order (hard edge).
        sorted.sort_by(|a, b| a.offset.total_cmp(&b.offset));

        let (dx, dy) = (x1 - x0, y1 - y0);
        Ok(Self { x0, y0, dx, dy, len2: dx * dx + dy * dy, stops: sorted })
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color of the gradient at canvas point (x,y).
    pub fn color_at(&self, x: f32, y: f32) -> Rgba {
        if self.len2 == 0.0 {
            return self.stops[0].color;
        }
        let t = (((x - self.x0) * self.dx + (y - self.y0) * self.dy) / self.len2).clamp(0.0, 1.0);
        self.sample(t)
    }

    /// Color at position t in [0,1] along the gradient line.
    pub fn sample(&self, t: f32) -> Rgba {
        let first = self.stops[0];
        if t <= first.offset {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let span = b.offset - a.offset;
                let f = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
                return lerp(a.color, b.color, f);
            }
        }
        self.stops[self.stops.len() - 1].color
    }
}

/// Build a gradient from color literals, e.g. `[(0.0, "blue"), (1.0, "white")]`.
pub fn get_linear_gradient(
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    stops: &[(f32, &str)],
) -> Result<LinearGradient, Error> {
    let parsed = stops
        .iter()
        .map(|&(offset, lit)| parse_color(lit).map(|c| (offset, c)))
        .collect::<Result<Vec<_>, _>>()?;
    LinearGradient::new(x0, y0, x1, y1, &parsed)
}

fn lerp(a: Rgba, b: Rgba, f: f32) -> Rgba {
    let ch = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * f).round().clamp(0.0, 255.0) as u8;
    Rgba { r: ch(a.r, b.r), g: ch(a.g, b.g), b: ch(a.b, b.b), a: a.a + (b.a - a.a) * f }
}
