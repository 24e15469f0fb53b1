use std::cell::RefCell;
use std::rc::Rc;

use audioviz::{
    AnalysisSource, Canvas, Control, Controls, DrawParams, Driver, Error, ImageData, Paint, Rect, Surface, Visualizer,
    FREQUENCY_BARS,
};

/// Analyser stand-in that reports fixed bytes.
struct Fixed {
    freq: Vec<u8>,
    wave: Vec<u8>,
}

impl Fixed {
    fn new(freq: &[u8]) -> Self {
        Self { freq: freq.to_vec(), wave: vec![128; freq.len()] }
    }
}

impl AnalysisSource for Fixed {
    fn fft_size(&self) -> usize {
        self.freq.len() * 2
    }

    fn fill_frequency_domain(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        audioviz::analyser::check_len("frequency buffer", self.freq.len(), buf)?;
        buf.copy_from_slice(&self.freq);
        Ok(())
    }

    fn fill_time_domain(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        audioviz::analyser::check_len("time-domain buffer", self.wave.len(), buf)?;
        buf.copy_from_slice(&self.wave);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fill { rect: Rect, paint: Paint, alpha: f32 },
    Stroke { rect: Rect },
    Circle { cx: f32, cy: f32, radius: f32, alpha: f32 },
}

/// Records drawing calls instead of rasterising them; the pixel store is
/// only touched by `put_image_data`, so pixel passes can be checked exactly.
struct Recorder {
    image: ImageData,
    calls: Vec<Call>,
    fill: Paint,
    alpha: f32,
    stack: Vec<(Paint, f32)>,
    commits: usize,
}

impl Recorder {
    fn new(width: usize, height: usize) -> Self {
        Self {
            image: ImageData::new(width, height),
            calls: Vec::new(),
            fill: Paint::Solid(audioviz::Rgba::BLACK),
            alpha: 1.0,
            stack: Vec::new(),
            commits: 0,
        }
    }

    fn filled_with(width: usize, height: usize, px: [u8; 4]) -> Self {
        let mut r = Self::new(width, height);
        r.image.data = px.repeat(width * height);
        r
    }
}

impl Surface for Recorder {
    fn width(&self) -> usize {
        self.image.width
    }
    fn height(&self) -> usize {
        self.image.height
    }
    fn save(&mut self) {
        self.stack.push((self.fill.clone(), self.alpha));
    }
    fn restore(&mut self) {
        if let Some((fill, alpha)) = self.stack.pop() {
            self.fill = fill;
            self.alpha = alpha;
        }
    }
    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }
    fn set_fill_style(&mut self, paint: Paint) {
        self.fill = paint;
    }
    fn set_stroke_style(&mut self, _color: audioviz::Rgba) {}
    fn fill_rect(&mut self, rect: Rect) {
        self.calls.push(Call::Fill { rect, paint: self.fill.clone(), alpha: self.alpha });
    }
    fn stroke_rect(&mut self, rect: Rect) {
        self.calls.push(Call::Stroke { rect });
    }
    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32) {
        self.calls.push(Call::Circle { cx, cy, radius, alpha: self.alpha });
    }
    fn read_pixels(&self, out: &mut ImageData) {
        out.clone_from(&self.image);
    }
    fn put_image_data(&mut self, image: &ImageData) -> Result<(), Error> {
        self.image.data.copy_from_slice(&image.data);
        self.commits += 1;
        Ok(())
    }
}

fn setup<S: Surface>(surface: &Rc<RefCell<S>>, freq: &[u8]) -> Visualizer<S> {
    let mut viz = Visualizer::with_seed(42);
    viz.setup_canvas(surface, Box::new(Fixed::new(freq))).unwrap();
    viz
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn bars_scenario_320x240() {
    let surface = Rc::new(RefCell::new(Recorder::new(320, 240)));
    let mut viz = setup(&surface, &[0, 128, 255]);
    viz.draw(DrawParams { show_bars: true, ..DrawParams::none() }).unwrap();

    let rec = surface.borrow();
    let fills: Vec<Rect> = rec
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Fill { rect, .. } => Some(*rect),
            _ => None,
        })
        .collect();
    let strokes = rec.calls.iter().filter(|c| matches!(c, Call::Stroke { .. })).count();

    // Background fade, then one rect per sample.
    assert_eq!(fills.len(), 4);
    assert_eq!(fills[0], Rect::new(0.0, 0.0, 320.0, 240.0));
    assert_eq!(strokes, 3);

    let bar_width = (320.0 - 3.0 * 4.0 - 2.0 * 5.0) / 3.0;
    for (i, (rect, offset)) in fills[1..].iter().zip([256.0, 128.0, 1.0]).enumerate() {
        assert!(approx(rect.x, 5.0 + i as f32 * (bar_width + 4.0)), "bar {i} x = {}", rect.x);
        assert!(approx(rect.y - FREQUENCY_BARS.top, offset), "bar {i} y = {}", rect.y);
        assert!(approx(rect.width, bar_width));
        assert_eq!(rect.height, 200.0);
    }
    let last = fills[3];
    assert!(last.x + last.width + 4.0 + 5.0 <= 320.0 + 1e-3);
}

#[test]
fn layers_draw_in_fixed_order() {
    let surface = Rc::new(RefCell::new(Recorder::new(100, 80)));
    let mut viz = setup(&surface, &[10, 20]);
    let params = DrawParams { show_gradient: true, show_bars: true, show_wave: true, show_circles: true, ..DrawParams::none() };
    viz.draw(params).unwrap();

    let rec = surface.borrow();
    // fade, gradient, 2 bars, 2 wave bars, then 6 circles
    match &rec.calls[0] {
        Call::Fill { paint: Paint::Solid(c), alpha, .. } => {
            assert_eq!(*c, audioviz::Rgba::BLACK);
            assert!(approx(*alpha, 0.1));
        }
        other => panic!("expected fade, got {other:?}"),
    }
    match &rec.calls[1] {
        Call::Fill { paint: Paint::Linear(_), alpha, .. } => assert!(approx(*alpha, 0.3)),
        other => panic!("expected gradient, got {other:?}"),
    }
    let wave_tops: Vec<f32> = rec.calls[6..10]
        .iter()
        .filter_map(|c| match c {
            Call::Fill { rect, .. } => Some(rect.y),
            _ => None,
        })
        .collect();
    // Waveform bytes are 128, drawn with the 50px top offset.
    assert_eq!(wave_tops, vec![50.0 + 128.0, 50.0 + 128.0]);
    let circles = rec.calls[10..].iter().filter(|c| matches!(c, Call::Circle { .. })).count();
    assert_eq!(circles, 6);
    assert_eq!(rec.calls.len(), 16);
    assert_eq!(rec.commits, 1);
}

#[test]
fn circles_share_centre_and_scale() {
    let surface = Rc::new(RefCell::new(Recorder::new(320, 240)));
    let mut viz = setup(&surface, &[0, 255]);
    viz.draw(DrawParams { show_circles: true, ..DrawParams::none() }).unwrap();

    let rec = surface.borrow();
    let circles: Vec<(f32, f32, f32, f32)> = rec
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Circle { cx, cy, radius, alpha } => Some((*cx, *cy, *radius, *alpha)),
            _ => None,
        })
        .collect();
    assert_eq!(circles.len(), 6);
    assert!(circles.iter().all(|&(cx, cy, _, a)| cx == 160.0 && cy == 120.0 && a == 0.5));
    let radii: Vec<f32> = circles.iter().map(|c| c.2).collect();
    assert_eq!(radii, vec![0.0, 0.0, 0.0, 60.0, 90.0, 30.0]);
}

#[test]
fn invert_scenario() {
    let surface = Rc::new(RefCell::new(Recorder::filled_with(3, 2, [10, 20, 30, 255])));
    let mut viz = setup(&surface, &[0]);
    viz.draw(DrawParams { show_invert: true, ..DrawParams::none() }).unwrap();
    let rec = surface.borrow();
    assert!(rec.image.data.chunks_exact(4).all(|px| px == [245, 235, 225, 255]));
}

#[test]
fn invert_twice_restores_frame() {
    let surface = Rc::new(RefCell::new(Recorder::filled_with(4, 4, [1, 99, 200, 17])));
    let mut viz = setup(&surface, &[0]);
    let params = DrawParams { show_invert: true, ..DrawParams::none() };
    viz.draw(params).unwrap();
    viz.draw(params).unwrap();
    assert!(surface.borrow().image.data.chunks_exact(4).all(|px| px == [1, 99, 200, 17]));
}

#[test]
fn full_noise_scenario() {
    let surface = Rc::new(RefCell::new(Recorder::filled_with(5, 3, [10, 20, 30, 128])));
    let mut viz = setup(&surface, &[0]);
    viz.draw(DrawParams { show_noise: true, noise_intensity: Some(1.0), ..DrawParams::none() }).unwrap();
    let rec = surface.borrow();
    for px in rec.image.data.chunks_exact(4) {
        assert_eq!(px, [255, 255, 255, 128]);
    }
}

#[test]
fn zero_noise_changes_nothing() {
    let surface = Rc::new(RefCell::new(Recorder::filled_with(5, 3, [10, 20, 30, 128])));
    let mut viz = setup(&surface, &[0]);
    viz.draw(DrawParams { show_noise: true, noise_intensity: Some(0.0), ..DrawParams::none() }).unwrap();
    assert!(surface.borrow().image.data.chunks_exact(4).all(|px| px == [10, 20, 30, 128]));
}

#[test]
fn emboss_runs_after_invert() {
    let surface = Rc::new(RefCell::new(Recorder::filled_with(3, 3, [200, 100, 0, 255])));
    let mut viz = setup(&surface, &[0]);
    viz.draw(DrawParams { show_invert: true, show_emboss: true, ..DrawParams::none() }).unwrap();
    let rec = surface.borrow();
    // Flat frame: interior goes to 127, last row to 0, alpha kept.
    assert_eq!(&rec.image.data[..4], &[127, 127, 127, 255]);
    let last_row = &rec.image.data[2 * 3 * 4..];
    assert!(last_row.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn draw_before_setup_touches_nothing() {
    let surface = Rc::new(RefCell::new(Canvas::new(16, 16)));
    let mut viz: Visualizer<Canvas> = Visualizer::new();
    assert_eq!(viz.draw(DrawParams::default()), Err(Error::NotInitialized));
    assert!(surface.borrow().raw().iter().all(|&b| b == 0));
    assert!(!viz.is_ready());
}

#[test]
fn analyser_size_mismatch_skips_frame() {
    struct Liar;
    impl AnalysisSource for Liar {
        fn fft_size(&self) -> usize {
            8
        }
        fn fill_frequency_domain(&mut self, buf: &mut [u8]) -> Result<(), Error> {
            audioviz::analyser::check_len("frequency buffer", 3, buf)
        }
        fn fill_time_domain(&mut self, _buf: &mut [u8]) -> Result<(), Error> {
            Ok(())
        }
    }

    let surface = Rc::new(RefCell::new(Recorder::new(4, 4)));
    let mut viz = Visualizer::with_seed(1);
    viz.setup_canvas(&surface, Box::new(Liar)).unwrap();
    let err = viz.draw(DrawParams::default()).unwrap_err();
    assert_eq!(err, Error::SizeMismatch { what: "frequency buffer", expected: 3, actual: 4 });
    assert!(surface.borrow().calls.is_empty());
    assert_eq!(surface.borrow().commits, 0);
}

#[test]
fn real_canvas_frames_are_reproducible() {
    let freq: Vec<u8> = (0..64).map(|i| (i * 4) as u8).collect();
    let params = DrawParams { show_noise: true, noise_intensity: Some(0.01), show_wave: true, ..DrawParams::default() };

    let run = || {
        let surface = Rc::new(RefCell::new(Canvas::new(200, 150)));
        let mut viz = setup(&surface, &freq);
        for _ in 0..3 {
            viz.draw(params).unwrap();
        }
        let raw = surface.borrow().raw().to_vec();
        raw
    };
    let a = run();
    let b = run();
    assert_eq!(a, b);
    assert!(a.iter().any(|&v| v != 0));
}

/// Fails the first `failures` frequency reads, then reports `inner`.
struct Flaky {
    failures: usize,
    inner: Fixed,
}

impl AnalysisSource for Flaky {
    fn fft_size(&self) -> usize {
        self.inner.fft_size()
    }

    fn fill_frequency_domain(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(Error::SizeMismatch { what: "frequency buffer", expected: 0, actual: buf.len() });
        }
        self.inner.fill_frequency_domain(buf)
    }

    fn fill_time_domain(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.inner.fill_time_domain(buf)
    }
}

#[test]
fn failed_tick_is_skipped_and_the_next_one_commits() {
    let surface = Rc::new(RefCell::new(Recorder::new(64, 32)));
    let mut viz = Visualizer::with_seed(3);
    let source = Flaky { failures: 1, inner: Fixed::new(&[40, 80]) };
    viz.setup_canvas(&surface, Box::new(source)).unwrap();
    let mut driver = Driver::new(Controls::new(DrawParams::none(), 0.0));

    assert!(!driver.tick(&mut viz, &[]));
    assert_eq!(driver.skipped(), 1);
    assert_eq!(surface.borrow().commits, 0);

    // Controls from this tick apply to this tick's frame.
    assert!(driver.tick(&mut viz, &[Control::Bars, Control::NoiseUp]));
    assert_eq!(driver.skipped(), 1);
    assert_eq!(surface.borrow().commits, 1);
    let strokes = surface.borrow().calls.iter().filter(|c| matches!(c, Call::Stroke { .. })).count();
    assert_eq!(strokes, 2);
    assert_eq!(viz.noise_value(), 0.05);
    assert!(driver.controls().snapshot().show_noise);

    assert!(driver.tick(&mut viz, &[]));
    assert_eq!(surface.borrow().commits, 2);
}
