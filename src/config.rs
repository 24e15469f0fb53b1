// Startup configuration: defaults, then a TOML file, then AUDIOVIZ_*
// environment variables, then command-line flags. Out-of-range values are
// clamped instead of rejected.

use std::path::{Path, PathBuf};
use std::{env, fs};

use clap::Parser;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::analyser::{MAX_FFT_SIZE, MIN_FFT_SIZE};
use crate::error::Error;
use crate::types::DrawParams;
use crate::visualizer::FREQUENCY_BARS;

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "audioviz")]
#[command(about = "Audio-reactive raster visualizer", long_about = None)]
pub struct Args {
    /// Canvas width in pixels
    #[arg(long, value_name = "PX")]
    pub width: Option<usize>,

    /// Canvas height in pixels
    #[arg(long, value_name = "PX")]
    pub height: Option<usize>,

    /// Analysis window size (power of two); each layer gets half as many samples
    #[arg(long, value_name = "N")]
    pub fft_size: Option<usize>,

    /// Target frames per second
    #[arg(long, value_name = "FPS")]
    pub fps: Option<usize>,

    /// Use the first input device whose name contains this text
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Config file (default: <config dir>/audioviz.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seed for the noise pattern
    #[arg(long)]
    pub seed: Option<u64>,

    /// Initial noise intensity in [0,1]; above 0 turns noise on
    #[arg(long, value_name = "P")]
    pub noise: Option<f32>,

    /// Spectrum smoothing in [0,1]; higher is steadier
    #[arg(long, value_name = "TAU")]
    pub smoothing: Option<f32>,

    /// Level drawn as an empty bar, in dB
    #[arg(long, value_name = "DB", allow_negative_numbers = true)]
    pub min_db: Option<f32>,

    /// Level drawn as a full bar, in dB
    #[arg(long, value_name = "DB", allow_negative_numbers = true)]
    pub max_db: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub width: usize,
    pub height: usize,
    pub fft_size: usize,
    pub target_fps: usize,
    pub device: Option<String>,
    pub seed: Option<u64>,
    pub noise: f32,
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
    pub params: DrawParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            fft_size: 256,
            target_fps: 60,
            device: None,
            seed: None,
            noise: 0.0,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
            params: DrawParams::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    width: Option<usize>,
    height: Option<usize>,
    fft_size: Option<usize>,
    target_fps: Option<usize>,
    device: Option<String>,
    seed: Option<u64>,
    noise: Option<f32>,
    smoothing: Option<f32>,
    min_db: Option<f32>,
    max_db: Option<f32>,
    params: Option<DrawParams>,
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, Error> {
        let mut cfg = Self::default();

        // file first, env second, flags last.
        if let Some(text) = read_config_file(args.config.as_deref())? {
            cfg.apply_toml(&text)?;
        }
        cfg.apply_env(|k| env::var(k).ok());
        cfg.apply_args(args);
        cfg.sanitize();

        debug!(?cfg, "configuration loaded");
        Ok(cfg)
    }

    pub fn apply_toml(&mut self, text: &str) -> Result<(), Error> {
        let fc: FileConfig = toml::from_str(text).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        if let Some(v) = fc.width {
            self.width = v;
        }
        if let Some(v) = fc.height {
            self.height = v;
        }
        if let Some(v) = fc.fft_size {
            self.fft_size = v;
        }
        if let Some(v) = fc.target_fps {
            self.target_fps = v;
        }
        if fc.device.is_some() {
            self.device = fc.device;
        }
        if fc.seed.is_some() {
            self.seed = fc.seed;
        }
        if let Some(v) = fc.noise {
            self.noise = v;
        }
        if let Some(v) = fc.smoothing {
            self.smoothing = v;
        }
        if let Some(v) = fc.min_db {
            self.min_db = v;
        }
        if let Some(v) = fc.max_db {
            self.max_db = v;
        }
        if let Some(mut p) = fc.params {
            // `[params] noise_intensity` is the starting noise level.
            if let Some(v) = p.noise_intensity.take() {
                self.noise = v;
            }
            self.params = p;
        }
        Ok(())
    }

    /// `lookup` is `env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(lookup("AUDIOVIZ_WIDTH")) {
            self.width = v;
        }
        if let Some(v) = parse_var(lookup("AUDIOVIZ_HEIGHT")) {
            self.height = v;
        }
        if let Some(v) = parse_var(lookup("AUDIOVIZ_FFT_SIZE")) {
            self.fft_size = v;
        }
        if let Some(v) = parse_var(lookup("AUDIOVIZ_FPS")) {
            self.target_fps = v;
        }
        if let Some(v) = parse_var(lookup("AUDIOVIZ_SEED")) {
            self.seed = Some(v);
        }
        if let Some(v) = parse_var(lookup("AUDIOVIZ_NOISE")) {
            self.noise = v;
        }
        if let Some(v) = parse_var(lookup("AUDIOVIZ_SMOOTHING")) {
            self.smoothing = v;
        }
        if let Some(v) = parse_var(lookup("AUDIOVIZ_MIN_DB")) {
            self.min_db = v;
        }
        if let Some(v) = parse_var(lookup("AUDIOVIZ_MAX_DB")) {
            self.max_db = v;
        }
        if let Some(v) = lookup("AUDIOVIZ_DEVICE") {
            self.device = Some(v);
        }
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(v) = args.width {
            self.width = v;
        }
        if let Some(v) = args.height {
            self.height = v;
        }
        if let Some(v) = args.fft_size {
            self.fft_size = v;
        }
        if let Some(v) = args.fps {
            self.target_fps = v;
        }
        if args.device.is_some() {
            self.device = args.device.clone();
        }
        if args.seed.is_some() {
            self.seed = args.seed;
        }
        if let Some(v) = args.noise {
            self.noise = v;
        }
        if let Some(v) = args.smoothing {
            self.smoothing = v;
        }
        if let Some(v) = args.min_db {
            self.min_db = v;
        }
        if let Some(v) = args.max_db {
            self.max_db = v;
        }
    }

    fn sanitize(&mut self) {
        // clamp instead of failing
        self.width = self.width.clamp(128, 3840);
        self.height = self.height.clamp(64, 2160);
        self.fft_size = self.fft_size.clamp(MIN_FFT_SIZE, MAX_FFT_SIZE).next_power_of_two();

        // Every frequency bar needs its spacing inside the margins.
        let max_bins = (self.width as f32 - 2.0 * FREQUENCY_BARS.margin) / FREQUENCY_BARS.spacing;
        let requested = self.fft_size;
        while self.fft_size > MIN_FFT_SIZE && (self.fft_size / 2) as f32 > max_bins {
            self.fft_size /= 2;
        }
        if self.fft_size != requested {
            warn!(requested, fft_size = self.fft_size, width = self.width, "fft size reduced to fit the bars");
        }

        self.target_fps = self.target_fps.clamp(1, 240);
        self.noise = if self.noise.is_finite() { self.noise.clamp(0.0, 1.0) } else { 0.0 };
        // Noise is on exactly when it has a level, like the slider.
        self.params.show_noise = self.noise > 0.0;
        self.params.noise_intensity = None;

        self.smoothing = if self.smoothing.is_finite() { self.smoothing.clamp(0.0, 1.0) } else { 0.8 };
        if !(self.min_db < self.max_db) {
            warn!(min_db = self.min_db, max_db = self.max_db, "empty dB range, using -100..-30");
            self.min_db = -100.0;
            self.max_db = -30.0;
        }
    }
}

fn parse_var<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
    v.and_then(|v| v.trim().parse::<T>().ok())
}

fn read_config_file(explicit: Option<&Path>) -> Result<Option<String>, Error> {
    let explicit = explicit.map(Path::to_path_buf).or_else(|| env::var_os("AUDIOVIZ_CONFIG").map(PathBuf::from));
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!("config file {} does not exist", path.display())));
        }
        return read(&path).map(Some);
    }

    let Some(dir) = dirs::config_dir() else {
        return Ok(None);
    };
    let path = dir.join("audioviz.toml");
    if path.exists() { read(&path).map(Some) } else { Ok(None) }
}

fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))
}
