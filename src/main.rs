// What you SEE:
// • The canvas fades toward black every frame, leaving motion trails.
// • Bars/waveform/circles pulse with whatever the input device hears.
// • G B W C N I E toggle gradient, bars, wave, circles, noise, invert, emboss.
// • Up/Down change the noise amount. ESC quits.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use audioviz::draw::{draw_text_5x7, Drawer};
use audioviz::{
    telemetry, Analyser, Args, AudioCapture, Canvas, Config, Controls, Driver, Error, FrameBuffer, SampleRing,
    Visualizer,
};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    telemetry::init();
    let args = Args::parse();

    // Setup errors end the program with a message; frame errors never do.
    if let Err(e) = Config::load(&args).and_then(run) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cfg: Config) -> Result<(), Error> {
    let (w, h) = (cfg.width, cfg.height);

    /* --- Audio in ---
       Visual: nothing yet; samples start piling into the ring. */
    let ring = Arc::new(Mutex::new(SampleRing::new(cfg.fft_size * 4)));
    let capture = AudioCapture::start(cfg.device.as_deref(), Arc::clone(&ring))?;
    let analyser = Analyser::new(cfg.fft_size, ring)?
        .with_smoothing(cfg.smoothing)
        .with_decibel_range(cfg.min_db, cfg.max_db)?;

    /* --- Canvas + window ---
       Visual: window opens, black. */
    let canvas = Rc::new(RefCell::new(Canvas::new(w, h)));
    let title = format!("audioviz | {} @ {} Hz", capture.label(), capture.sample_rate());
    let mut drawer = Drawer::new(&title, w, h, cfg.target_fps)?;
    let mut screen = FrameBuffer::new(w, h);

    let mut viz = match cfg.seed {
        Some(seed) => Visualizer::with_seed(seed),
        None => Visualizer::new(),
    };
    viz.setup_canvas(&canvas, Box::new(analyser))?;
    viz.set_noise_value(cfg.noise);

    let mut driver = Driver::new(Controls::new(cfg.params, cfg.noise));

    /* --- HUD / FPS --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut hud_fps_text = String::from("FPS: 0.0");

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();

        /* 1) Inputs mutate the live controls, then the frame is painted from
              a copy of them. A failed frame is skipped; the next tick retries. */
        driver.tick(&mut viz, &drawer.controls());

        /* 2) Canvas -> window buffer, HUD on top (never fed back into the canvas). */
        canvas.borrow().present_into(&mut screen);
        let hud = format!("{} | {}", driver.controls().hud_label(), hud_fps_text);
        draw_text_5x7(&mut screen, 8, 8, &hud, 0x00_FF_FF_FF);

        /* 3) Present; this also paces the loop to the target FPS. */
        drawer.present(&screen)?;

        /* 4) FPS counter (log + HUD once per second) */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            debug!(fps, "frame rate");
            hud_fps_text = format!("FPS: {:.1}", fps);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    info!(skipped = driver.skipped(), "window closed");
    Ok(())
}
